//! Balance availability derived from a remote account state.

use ledgerdesk_chain::AccountState;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBreakdown {
    pub spendable: u64,
    pub staked: u64,
    pub locked: u64,
    pub total: u64,
}

impl AccountBreakdown {
    /// `spendable = balance − staked − locked`, saturating at zero.
    pub fn from_state(state: &AccountState) -> Self {
        Self {
            spendable: state
                .balance
                .saturating_sub(state.staked)
                .saturating_sub(state.locked),
            staked: state.staked,
            locked: state.locked,
            total: state.balance,
        }
    }
}
