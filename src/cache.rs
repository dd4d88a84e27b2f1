//! In-memory translation cache: the runtime source of truth mapping cache
//! keys to translated text. LRU-bounded at the configured capacity so a long
//! session cannot grow without limit; the persisted file is rewritten from
//! snapshots of this map.

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

pub struct TranslationCache {
    inner: Mutex<LruCache<String, String>>,
}

impl TranslationCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Look up a cached translation, promoting the entry to most recent.
    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.lock().get(key).cloned()
    }

    /// Insert a translation, evicting the least recently used entry at
    /// capacity.
    pub fn insert(&self, key: String, translated: String) {
        self.inner.lock().put(key, translated);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().contains(key)
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// All (key, translation) pairs, most recently used first. Used by the
    /// debounced saver to serialize the whole cache.
    pub fn snapshot(&self) -> Vec<(String, String)> {
        self.inner
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_clear() {
        let cache = TranslationCache::new(16);
        cache.insert("Hello|42628b2|zh-CN".into(), "你好".into());
        assert_eq!(cache.get("Hello|42628b2|zh-CN").as_deref(), Some("你好"));
        assert_eq!(cache.get("missing"), None);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get("Hello|42628b2|zh-CN"), None);
    }

    #[test]
    fn evicts_least_recently_used_at_capacity() {
        let cache = TranslationCache::new(2);
        cache.insert("a".into(), "1".into());
        cache.insert("b".into(), "2".into());
        // Touch "a" so "b" becomes the eviction candidate.
        cache.get("a");
        cache.insert("c".into(), "3".into());

        assert_eq!(cache.len(), 2);
        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        assert!(cache.contains("c"));
    }

    #[test]
    fn snapshot_contains_all_entries() {
        let cache = TranslationCache::new(8);
        cache.insert("a".into(), "1".into());
        cache.insert("b".into(), "2".into());
        let mut snap = cache.snapshot();
        snap.sort();
        assert_eq!(
            snap,
            vec![("a".into(), "1".into()), ("b".into(), "2".into())]
        );
    }
}
