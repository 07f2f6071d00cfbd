//! Backward history paging against the nullable ledger.

use std::sync::Arc;

use ledgerdesk_chain::{AccountState, HistoryEntry};
use ledgerdesk_crypto::{account_id_from_public_key, derive_keypair};
use ledgerdesk_nullables::{NullChainProvider, NullKvStore, NullProviderFactory};
use ledgerdesk_store::LocalEntityStore;
use ledgerdesk_types::{AccountId, Hash, NewWallet, SignatureScheme, Timestamp};
use ledgerdesk_wallet_core::{ErrorKind, HistoryPager, LedgerLifecycle, WalletError};

const SEED: &str = "2222222222222222222222222222222222222222222222222222222222222222";

fn h(byte: u8) -> Hash {
    Hash::new([byte; 32])
}

/// Entries `count..=1`, newest first, each linked to its predecessor.
fn history(count: u8) -> Vec<HistoryEntry> {
    (1..=count)
        .rev()
        .map(|n| HistoryEntry {
            history_hash: h(n),
            previous_history_hash: (n > 1).then(|| h(n - 1)),
            height: n as u64,
            timestamp: Timestamp::new(1_700_000_000 + n as u64),
            kind: if n % 2 == 0 { "transfer" } else { "fees" }.into(),
            amount: if n % 2 == 0 { 1_000 } else { -10 },
            linked_account: None,
            microblock_hash: h(100 + n),
        })
        .collect()
}

fn account() -> AccountId {
    let keys = derive_keypair(SEED, SignatureScheme::Secp256k1).unwrap();
    account_id_from_public_key(&keys.public)
}

async fn lifecycle(provider: &Arc<NullChainProvider>, page_size: u32) -> LedgerLifecycle {
    let store = Arc::new(LocalEntityStore::new(Arc::new(NullKvStore::new())));
    store
        .add_wallet(NewWallet {
            name: "history".into(),
            seed: SEED.into(),
            node_endpoint: "http://ledger.test".into(),
        })
        .await
        .unwrap();
    LedgerLifecycle::new(store, Arc::new(NullProviderFactory::new(Arc::clone(provider))))
        .with_history_page_size(page_size)
}

fn ids(page: &[HistoryEntry]) -> Vec<u64> {
    page.iter().map(|e| e.height).collect()
}

#[tokio::test]
async fn pages_walk_backward_to_the_first_entry() {
    let provider = Arc::new(NullChainProvider::new());
    provider.set_history(account(), history(5));
    provider.set_account_state(
        account(),
        AccountState {
            last_history_hash: Some(h(5)),
            ..Default::default()
        },
    );
    let lifecycle = lifecycle(&provider, 2).await;
    let mut pager = lifecycle.history_pager(1).await.unwrap();
    assert_eq!(pager.cursor(), Some(h(5)));
    assert_eq!(pager.limit(), 2);

    let mut seen = Vec::new();
    loop {
        let page = pager.fetch_page().await.unwrap();
        seen.extend(ids(&page));
        match HistoryPager::next_cursor(&page) {
            Some(cursor) => pager.set_cursor(cursor),
            None => break,
        }
    }
    assert_eq!(seen, vec![5, 4, 3, 2, 1]);
}

#[tokio::test]
async fn fetching_without_moving_the_cursor_is_idempotent() {
    let provider = Arc::new(NullChainProvider::new());
    provider.set_history(account(), history(4));
    let pager = HistoryPager::new(provider.clone(), account(), Some(h(4)));

    let first = pager.fetch_page().await.unwrap();
    let second = pager.fetch_page().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(pager.cursor(), Some(h(4)));
}

#[tokio::test]
async fn account_without_history_has_undefined_cursor() {
    let provider = Arc::new(NullChainProvider::new());
    provider.set_account_state(account(), AccountState::default());
    let lifecycle = lifecycle(&provider, 10).await;

    let pager = lifecycle.history_pager(1).await.unwrap();
    assert!(pager.cursor().is_none());
    assert!(matches!(
        pager.fetch_page().await,
        Err(WalletError::CursorUndefined)
    ));
    assert_eq!(provider.call_count("get_account_history"), 0);
}

#[tokio::test]
async fn account_unknown_to_the_ledger_has_undefined_cursor() {
    let provider = Arc::new(NullChainProvider::new());
    let lifecycle = lifecycle(&provider, 10).await;

    let pager = lifecycle.history_pager(1).await.unwrap();
    assert_eq!(pager.account_id(), &account());
    assert!(pager.cursor().is_none());
    assert!(matches!(
        pager.fetch_page().await,
        Err(WalletError::CursorUndefined)
    ));
    assert_eq!(provider.call_count("get_account_state"), 1);
    assert_eq!(provider.call_count("get_account_history"), 0);
}

#[tokio::test]
async fn unreachable_ledger_fails_pager_creation() {
    let provider = Arc::new(NullChainProvider::new());
    provider.fail_on("get_account_state");
    let lifecycle = lifecycle(&provider, 10).await;

    let err = lifecycle.history_pager(1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
}

#[tokio::test]
async fn limit_bounds_page_size() {
    let provider = Arc::new(NullChainProvider::new());
    provider.set_history(account(), history(30));
    let mut pager = HistoryPager::new(provider.clone(), account(), Some(h(30)));

    assert_eq!(pager.fetch_page().await.unwrap().len(), 10);
    pager.set_limit(25);
    assert_eq!(ids(&pager.fetch_page().await.unwrap()).last(), Some(&6));
    pager.set_limit(0);
    assert_eq!(pager.limit(), 1);
    assert_eq!(pager.fetch_page().await.unwrap().len(), 1);
}

#[tokio::test]
async fn cursor_can_jump_anywhere_in_history() {
    let provider = Arc::new(NullChainProvider::new());
    provider.set_history(account(), history(8));
    let mut pager = HistoryPager::new(provider.clone(), account(), Some(h(8)));
    pager.set_limit(3);

    pager.set_cursor(h(2));
    let page = pager.fetch_page().await.unwrap();
    assert_eq!(ids(&page), vec![2, 1]);
    assert_eq!(HistoryPager::next_cursor(&page), None);
}

#[tokio::test]
async fn ledger_errors_surface_from_fetch() {
    let provider = Arc::new(NullChainProvider::new());
    provider.set_history(account(), history(3));
    let pager = HistoryPager::new(provider.clone(), account(), Some(h(3)));

    provider.fail_on("get_account_history");
    assert_eq!(pager.fetch_page().await.unwrap_err().kind(), ErrorKind::Network);

    provider.clear_failures();
    let unknown = HistoryPager::new(provider.clone(), account(), Some(h(42)));
    assert_eq!(unknown.fetch_page().await.unwrap_err().kind(), ErrorKind::NotFound);
}
