//! In-flight request registry. Coalesces concurrent translation requests for
//! the same cache key onto one backend call: the first caller starts the
//! work, later callers get a clone of the same shared future. The entry is
//! removed when the call settles, success or failure, so callers arriving
//! afterwards start a fresh call.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;

/// The shared handle every coalesced caller awaits.
pub type SharedTranslation = Shared<BoxFuture<'static, String>>;

/// Clone handle over the shared registry map.
#[derive(Clone, Default)]
pub struct PendingRequests {
    inner: Arc<Mutex<HashMap<String, SharedTranslation>>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the in-flight future for `key`, or start `work` as the new one.
    /// The check and insert happen under one lock so two racing callers can
    /// never both start a backend call.
    pub fn join_or_start(&self, key: &str, work: BoxFuture<'static, String>) -> SharedTranslation {
        let mut map = self.inner.lock();
        if let Some(existing) = map.get(key) {
            return existing.clone();
        }

        let registry = self.clone();
        let owned_key = key.to_string();
        let shared: SharedTranslation = async move {
            let result = work.await;
            // Unconditional removal on settlement; clones already handed out
            // keep resolving from the Shared state.
            registry.inner.lock().remove(&owned_key);
            result
        }
        .boxed()
        .shared();

        map.insert(key.to_string(), shared.clone());
        shared
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn concurrent_joiners_share_one_execution() {
        let registry = PendingRequests::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let calls = Arc::clone(&calls);
            let fut = registry.join_or_start(
                "key",
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    "done".to_string()
                }
                .boxed(),
            );
            handles.push(tokio::spawn(fut));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), "done");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn entry_removed_after_settlement() {
        let registry = PendingRequests::new();
        let fut = registry.join_or_start("key", async { "v".to_string() }.boxed());
        assert!(registry.contains("key"));
        fut.await;
        assert!(!registry.contains("key"));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn late_caller_starts_fresh_call() {
        let registry = PendingRequests::new();
        registry
            .join_or_start("key", async { "first".to_string() }.boxed())
            .await;

        let second = registry
            .join_or_start("key", async { "second".to_string() }.boxed())
            .await;
        assert_eq!(second, "second");
    }

    #[tokio::test]
    async fn distinct_keys_run_independently() {
        let registry = PendingRequests::new();
        let a = registry.join_or_start("a", async { "A".to_string() }.boxed());
        let b = registry.join_or_start("b", async { "B".to_string() }.boxed());
        assert_eq!(registry.len(), 2);
        assert_eq!(a.await, "A");
        assert_eq!(b.await, "B");
    }
}
