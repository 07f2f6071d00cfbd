//! Backward pagination through an account's history.
//!
//! The pager holds a cursor (a history hash) and a page size. It never moves
//! the cursor on its own: fetching twice without [`HistoryPager::set_cursor`]
//! returns the same page.

use ledgerdesk_chain::{ChainProvider, HistoryEntry};
use ledgerdesk_types::{AccountId, Hash};
use std::sync::Arc;

use crate::error::WalletError;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

pub struct HistoryPager {
    provider: Arc<dyn ChainProvider>,
    account_id: AccountId,
    cursor: Option<Hash>,
    limit: u32,
}

impl std::fmt::Debug for HistoryPager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryPager")
            .field("account_id", &self.account_id)
            .field("cursor", &self.cursor)
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}

impl HistoryPager {
    /// `cursor` is normally the account's last history hash; `None` for an
    /// account without history.
    pub fn new(provider: Arc<dyn ChainProvider>, account_id: AccountId, cursor: Option<Hash>) -> Self {
        Self {
            provider,
            account_id,
            cursor,
            limit: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    pub fn cursor(&self) -> Option<Hash> {
        self.cursor
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn set_cursor(&mut self, cursor: Hash) {
        self.cursor = Some(cursor);
    }

    /// A limit of zero is raised to one.
    pub fn set_limit(&mut self, limit: u32) {
        self.limit = limit.max(1);
    }

    /// Up to `limit` entries walking backward from the cursor.
    pub async fn fetch_page(&self) -> Result<Vec<HistoryEntry>, WalletError> {
        let cursor = self.cursor.ok_or(WalletError::CursorUndefined)?;
        tracing::debug!(account = %self.account_id, cursor = %cursor, limit = self.limit, "fetching history page");
        Ok(self
            .provider
            .get_account_history(&self.account_id, &cursor, self.limit)
            .await?)
    }

    /// Cursor for the page after `page`: the predecessor of its oldest entry.
    pub fn next_cursor(page: &[HistoryEntry]) -> Option<Hash> {
        page.last().and_then(|entry| entry.previous_history_hash)
    }
}
