//! ledgerdesk: command-line client for wallet-side ledger orchestration.

mod config;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use ledgerdesk_chain::{HistoryEntry, RpcProviderFactory};
use ledgerdesk_crypto::{derive_keypair, generate_seed};
use ledgerdesk_store::{CredentialVault, JsonFileStore, LocalEntityStore};
use ledgerdesk_types::{Hash, NewNode, NewOrganization, NewWallet, Organization, SignatureScheme, Wallet};
use ledgerdesk_utils::{init_logging, LogFormat};
use ledgerdesk_wallet_core::{HistoryPager, LedgerLifecycle, OperatorClient, OrganizationDescription};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ClientConfig;

#[derive(Parser)]
#[command(name = "ledgerdesk", about = "Manage wallets, organizations and validator nodes on a remote ledger")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "LEDGERDESK_CONFIG")]
    config: Option<PathBuf>,

    /// JSON document holding the local wallet hierarchy.
    #[arg(long, env = "LEDGERDESK_DATA_FILE")]
    data_file: Option<PathBuf>,

    /// Signature scheme: "secp256k1" or "ed25519".
    #[arg(long, env = "LEDGERDESK_SIGNATURE_SCHEME")]
    signature_scheme: Option<SignatureScheme>,

    /// Entries per history page.
    #[arg(long, env = "LEDGERDESK_HISTORY_PAGE_SIZE")]
    history_page_size: Option<u32>,

    /// Log format: "human" or "json".
    #[arg(long, env = "LEDGERDESK_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "LEDGERDESK_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Local wallets.
    Wallet {
        #[command(subcommand)]
        action: WalletAction,
    },
    /// Organizations and their publication.
    Org {
        #[command(subcommand)]
        action: OrgAction,
    },
    /// Validator nodes, claims and staking.
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },
    /// Remote account queries.
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },
    /// Operator admin API.
    Operator {
        #[command(subcommand)]
        action: OperatorAction,
    },
}

#[derive(Subcommand)]
enum WalletAction {
    /// Generate a fresh seed and store a wallet for it.
    Create {
        name: String,
        #[arg(long)]
        node_endpoint: String,
    },
    /// Store a wallet for an existing seed (hex or BIP39 phrase).
    Add {
        name: String,
        #[arg(long)]
        node_endpoint: String,
        #[arg(long, env = "LEDGERDESK_SEED", hide_env_values = true)]
        seed: String,
    },
    List,
    Remove { wallet_id: u64 },
}

#[derive(Args)]
struct DescriptionArgs {
    #[arg(long)]
    name: String,
    #[arg(long, default_value = "")]
    city: String,
    #[arg(long, default_value = "")]
    country_code: String,
    #[arg(long, default_value = "")]
    website: String,
}

impl From<DescriptionArgs> for OrganizationDescription {
    fn from(args: DescriptionArgs) -> Self {
        Self {
            name: args.name,
            city: args.city,
            country_code: args.country_code,
            website: args.website,
        }
    }
}

#[derive(Subcommand)]
enum OrgAction {
    Add { wallet_id: u64, name: String },
    /// Remove an organization with its nodes and applications.
    Remove { wallet_id: u64, org_id: u64 },
    /// Create the organization's chain.
    Publish {
        wallet_id: u64,
        org_id: u64,
        #[command(flatten)]
        description: DescriptionArgs,
    },
    /// Publish a new description for an already published organization.
    Update {
        wallet_id: u64,
        org_id: u64,
        #[command(flatten)]
        description: DescriptionArgs,
    },
}

#[derive(Subcommand)]
enum NodeAction {
    Add {
        wallet_id: u64,
        org_id: u64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        rpc_endpoint: String,
    },
    /// Import nodes from a JSON array of `{name, rpcEndpoint, vbId?}`.
    Import {
        wallet_id: u64,
        org_id: u64,
        file: PathBuf,
    },
    Remove {
        wallet_id: u64,
        org_id: u64,
        node_id: u64,
    },
    /// Create the node's validator chain under its published organization.
    Claim {
        wallet_id: u64,
        org_id: u64,
        node_id: u64,
    },
    Stake {
        wallet_id: u64,
        org_id: u64,
        node_id: u64,
        amount: u64,
    },
    Unstake {
        wallet_id: u64,
        org_id: u64,
        node_id: u64,
        amount: u64,
    },
}

#[derive(Subcommand)]
enum AccountAction {
    Id { wallet_id: u64 },
    State { wallet_id: u64 },
    Breakdown { wallet_id: u64 },
    /// Walk the account history backward from the latest entry.
    History {
        wallet_id: u64,
        /// Start from this history hash instead of the latest entry.
        #[arg(long)]
        cursor: Option<Hash>,
        /// Number of pages to fetch.
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
}

#[derive(Subcommand)]
enum OperatorAction {
    /// Whether the operator has been set up.
    Status { endpoint: String },
    /// Log in with a wallet and list what the operator manages.
    Inspect {
        endpoint: String,
        #[arg(long)]
        wallet_id: u64,
        #[arg(long, default_value_t = 1)]
        operator_id: u64,
    },
}

// ── Output views ───────────────────────────────────────────────────────

/// Wallet without its seed.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WalletView<'a> {
    id: u64,
    name: &'a str,
    node_endpoint: &'a str,
    organizations: &'a [Organization],
}

impl<'a> From<&'a Wallet> for WalletView<'a> {
    fn from(wallet: &'a Wallet) -> Self {
        Self {
            id: wallet.id,
            name: &wallet.name,
            node_endpoint: &wallet.node_endpoint,
            organizations: &wallet.organizations,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportedNode {
    name: String,
    rpc_endpoint: String,
    #[serde(default)]
    vb_id: Option<Hash>,
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_hash(label: &str, hash: Hash) -> anyhow::Result<()> {
    let mut object = serde_json::Map::new();
    object.insert(label.to_string(), serde_json::to_value(hash)?);
    print_json(&object)
}

// ── Main ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let file_config = match cli.config {
        Some(ref path) => ClientConfig::from_toml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ClientConfig::default(),
    };
    let config = ClientConfig {
        data_file: cli.data_file.clone().unwrap_or(file_config.data_file),
        signature_scheme: cli.signature_scheme.unwrap_or(file_config.signature_scheme),
        history_page_size: cli.history_page_size.unwrap_or(file_config.history_page_size),
        log_format: cli.log_format.unwrap_or(file_config.log_format),
        log_level: cli.log_level.clone().unwrap_or(file_config.log_level),
        ..file_config
    };

    init_logging(config.log_format, &config.log_level)?;
    tracing::debug!(data_file = %config.data_file.display(), scheme = %config.signature_scheme, "configuration loaded");

    let kv = JsonFileStore::open(&config.data_file)
        .await
        .with_context(|| format!("opening {}", config.data_file.display()))?;
    let store = Arc::new(LocalEntityStore::new(Arc::new(kv)));
    let lifecycle = LedgerLifecycle::new(
        Arc::clone(&store),
        Arc::new(RpcProviderFactory::new(config.rpc_timeouts())),
    )
    .with_signature_scheme(config.signature_scheme)
    .with_history_page_size(config.history_page_size);

    match cli.command {
        Command::Wallet { action } => run_wallet(&store, action).await,
        Command::Org { action } => run_org(&store, &lifecycle, action).await,
        Command::Node { action } => run_node(&store, &lifecycle, action).await,
        Command::Account { action } => run_account(&lifecycle, action).await,
        Command::Operator { action } => run_operator(&store, &config, action).await,
    }
}

async fn run_wallet(store: &LocalEntityStore, action: WalletAction) -> anyhow::Result<()> {
    match action {
        WalletAction::Create {
            name,
            node_endpoint,
        } => {
            let seed = generate_seed()?;
            let wallet = store
                .add_wallet(NewWallet {
                    name,
                    seed: seed.clone(),
                    node_endpoint,
                })
                .await?;
            tracing::info!(wallet_id = wallet.id, "wallet created");
            print_json(&serde_json::json!({ "id": wallet.id, "seed": seed }))
        }
        WalletAction::Add {
            name,
            node_endpoint,
            seed,
        } => {
            ledgerdesk_crypto::decode_seed(&seed)?;
            let wallet = store
                .add_wallet(NewWallet {
                    name,
                    seed,
                    node_endpoint,
                })
                .await?;
            print_json(&WalletView::from(&wallet))
        }
        WalletAction::List => {
            let wallets = store.load().await?;
            let views: Vec<WalletView<'_>> = wallets.iter().map(WalletView::from).collect();
            print_json(&views)
        }
        WalletAction::Remove { wallet_id } => {
            if !store.remove_wallet(wallet_id).await? {
                bail!("wallet {wallet_id} not found");
            }
            Ok(())
        }
    }
}

async fn run_org(
    store: &LocalEntityStore,
    lifecycle: &LedgerLifecycle,
    action: OrgAction,
) -> anyhow::Result<()> {
    match action {
        OrgAction::Add { wallet_id, name } => {
            let org = store
                .add_organization(wallet_id, NewOrganization::new(name))
                .await?
                .with_context(|| format!("wallet {wallet_id} not found"))?;
            print_json(&org)
        }
        OrgAction::Remove { wallet_id, org_id } => {
            if !store.remove_organization(wallet_id, org_id).await? {
                bail!("organization {org_id} not found in wallet {wallet_id}");
            }
            Ok(())
        }
        OrgAction::Publish {
            wallet_id,
            org_id,
            description,
        } => {
            let vb_id = lifecycle
                .publish_organization(wallet_id, org_id, description.into())
                .await?;
            print_hash("vbId", vb_id)
        }
        OrgAction::Update {
            wallet_id,
            org_id,
            description,
        } => {
            let head = lifecycle
                .update_organization_description(wallet_id, org_id, description.into())
                .await?;
            print_hash("microblockHash", head)
        }
    }
}

async fn run_node(
    store: &LocalEntityStore,
    lifecycle: &LedgerLifecycle,
    action: NodeAction,
) -> anyhow::Result<()> {
    match action {
        NodeAction::Add {
            wallet_id,
            org_id,
            name,
            rpc_endpoint,
        } => {
            let node = store
                .add_node(wallet_id, org_id, NewNode::new(name, rpc_endpoint))
                .await?
                .with_context(|| format!("organization {org_id} not found in wallet {wallet_id}"))?;
            print_json(&node)
        }
        NodeAction::Import {
            wallet_id,
            org_id,
            file,
        } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let nodes: Vec<ImportedNode> = serde_json::from_slice(&bytes)
                .with_context(|| format!("parsing {}", file.display()))?;
            let nodes = nodes
                .into_iter()
                .map(|n| NewNode {
                    name: n.name,
                    rpc_endpoint: n.rpc_endpoint,
                    vb_id: n.vb_id,
                })
                .collect();
            let imported = store.import_nodes(wallet_id, org_id, nodes).await?;
            print_json(&imported)
        }
        NodeAction::Remove {
            wallet_id,
            org_id,
            node_id,
        } => {
            if !store.delete_node(wallet_id, org_id, node_id).await? {
                bail!("node {node_id} not found in organization {org_id}");
            }
            Ok(())
        }
        NodeAction::Claim {
            wallet_id,
            org_id,
            node_id,
        } => {
            let vb_id = lifecycle.claim_node(wallet_id, org_id, node_id).await?;
            print_hash("vbId", vb_id)
        }
        NodeAction::Stake {
            wallet_id,
            org_id,
            node_id,
            amount,
        } => {
            let hash = lifecycle
                .stake_on_node(wallet_id, org_id, node_id, amount)
                .await?;
            print_hash("microblockHash", hash)
        }
        NodeAction::Unstake {
            wallet_id,
            org_id,
            node_id,
            amount,
        } => {
            let hash = lifecycle
                .unstake_from_node(wallet_id, org_id, node_id, amount)
                .await?;
            print_hash("microblockHash", hash)
        }
    }
}

async fn run_account(lifecycle: &LedgerLifecycle, action: AccountAction) -> anyhow::Result<()> {
    match action {
        AccountAction::Id { wallet_id } => {
            let account_id = lifecycle.account_id(wallet_id).await?;
            print_json(&serde_json::json!({ "accountId": account_id }))
        }
        AccountAction::State { wallet_id } => print_json(&lifecycle.account_state(wallet_id).await?),
        AccountAction::Breakdown { wallet_id } => {
            print_json(&lifecycle.account_breakdown(wallet_id).await?)
        }
        AccountAction::History {
            wallet_id,
            cursor,
            pages,
        } => {
            let mut pager = lifecycle.history_pager(wallet_id).await?;
            if let Some(cursor) = cursor {
                pager.set_cursor(cursor);
            }
            let mut entries: Vec<HistoryEntry> = Vec::new();
            for _ in 0..pages.max(1) {
                if pager.cursor().is_none() {
                    break;
                }
                let page = pager.fetch_page().await?;
                let next = HistoryPager::next_cursor(&page);
                entries.extend(page);
                match next {
                    Some(cursor) => pager.set_cursor(cursor),
                    None => break,
                }
            }
            print_json(&entries)
        }
    }
}

async fn run_operator(
    store: &LocalEntityStore,
    config: &ClientConfig,
    action: OperatorAction,
) -> anyhow::Result<()> {
    let vault = Arc::new(CredentialVault::in_memory());
    match action {
        OperatorAction::Status { endpoint } => {
            let client = OperatorClient::new(0, &endpoint, vault)?;
            let initialized = client.is_initialized().await?;
            print_json(&serde_json::json!({ "isInitialized": initialized }))
        }
        OperatorAction::Inspect {
            endpoint,
            wallet_id,
            operator_id,
        } => {
            let wallet = store
                .get_wallet(wallet_id)
                .await?
                .with_context(|| format!("wallet {wallet_id} not found"))?;
            let keys = derive_keypair(&wallet.seed, config.signature_scheme)?;
            let client = OperatorClient::new(operator_id, &endpoint, vault)?.for_wallet(wallet_id);
            client.login(wallet_id, &keys).await?;

            let report = serde_json::json!({
                "users": client.list_users().await?,
                "wallets": client.list_wallets().await?,
                "applications": client.list_applications().await?,
                "apiKeys": client.list_api_keys().await?,
            });
            client.disconnect().await?;
            print_json(&report)
        }
    }
}
