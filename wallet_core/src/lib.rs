//! Wallet-side orchestration for ledgerdesk.
//!
//! Provides everything a wallet application needs to act on a remote ledger:
//! - Organization publication and description updates
//! - Validator node claims, staking and unstaking
//! - Single-flight guarding of chain-mutating operations
//! - Account queries and backward history paging
//! - Operator admin API access with session credentials

pub mod breakdown;
pub mod error;
pub mod lifecycle;
pub mod operator;
pub mod pager;
pub mod single_flight;

pub use breakdown::AccountBreakdown;
pub use error::{ErrorKind, WalletError};
pub use lifecycle::{is_declared_validator_node, LedgerLifecycle, OrganizationDescription};
pub use operator::{
    sign_challenge, NewApiKey, OperatorApiKey, OperatorApplication, OperatorChallenge,
    OperatorChallengeResponse, OperatorClient, OperatorUser, OperatorWallet,
};
pub use pager::{HistoryPager, DEFAULT_PAGE_SIZE};
pub use single_flight::{EntityKey, FlightGuard, OperationKind, SingleFlight};
