//! Nullable key-value store: in-memory, with switchable write failures.

use async_trait::async_trait;
use ledgerdesk_store::{KeyValueStore, MemoryStore, StoreError};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Wraps a [`MemoryStore`]. While `fail_writes` is on, `set` and `delete`
/// return a backend error and leave the contents untouched.
#[derive(Default)]
pub struct NullKvStore {
    inner: MemoryStore,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl NullKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_writable(&self, key: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(format!("write to '{key}' rejected")));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for NullKvStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.check_writable(key)?;
        self.inner.set(key, value).await?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.check_writable(key)?;
        self.inner.delete(key).await?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn failing_writes_keep_previous_value() {
        let kv = NullKvStore::new();
        kv.set("k", json!(1)).await.unwrap();
        kv.set_fail_writes(true);
        assert!(matches!(kv.set("k", json!(2)).await, Err(StoreError::Backend(_))));
        assert!(kv.delete("k").await.is_err());
        assert_eq!(kv.get("k").await.unwrap(), Some(json!(1)));
        assert_eq!(kv.write_count(), 1);

        kv.set_fail_writes(false);
        kv.set("k", json!(3)).await.unwrap();
        assert_eq!(kv.get("k").await.unwrap(), Some(json!(3)));
    }
}
