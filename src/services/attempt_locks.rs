use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Per-attempt mutual exclusion. Every attempt-mutating operation serializes
/// on its attempt's mutex so read-modify-write sequences stay atomic against
/// racing requests (double-click submit, violation report racing an answer).
/// Different attempts never contend.
#[derive(Default)]
pub struct AttemptLocks {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AttemptLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the lock for one attempt; lock it for the duration of the
    /// mutation. Entries no request holds a handle to are pruned here, so
    /// the registry stays bounded by in-flight work even when terminal
    /// attempts keep getting re-fetched.
    pub async fn acquire(&self, attempt_id: &str) -> Arc<Mutex<()>> {
        let mut registry = self.inner.lock().await;
        registry.retain(|_, lock| Arc::strong_count(lock) > 1);
        registry
            .entry(attempt_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drops the registry entry eagerly once an attempt is terminal. Late
    /// callers still work; they just allocate a fresh entry.
    pub async fn release(&self, attempt_id: &str) {
        let mut registry = self.inner.lock().await;
        registry.remove(attempt_id);
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}
