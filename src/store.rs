//! Durable persistence for the translation cache, plus session statistics.
//!
//! The cache file is a single JSON document rewritten wholesale on every
//! save. Version 2 stores records as an array of `{original, translated,
//! key}` objects so the file stays readable and hand-editable; version 1
//! files (a flat key -> translated object) are still accepted on load.
//! All IO and parse failures are logged and absorbed: a broken file means
//! "no cache", a failed write means "try again on the next debounce".

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::key::key_prefix;

const CACHE_FILE_NAME: &str = "translation_cache.json";
const CURRENT_VERSION: u32 = 2;

/// Default quiet period before a scheduled save fires.
pub const DEFAULT_SAVE_DEBOUNCE: Duration = Duration::from_secs(5);

// --- Statistics ---

/// Monotonic session counters. Persisted with the cache and merged (not
/// reset) across restarts when the loaded file matches provider + language.
#[derive(Debug, Default)]
pub struct TranslationStats {
    total_translated: AtomicU64,
    cache_hits: AtomicU64,
    api_calls: AtomicU64,
    errors: AtomicU64,
}

impl TranslationStats {
    pub fn record_translation(&self) {
        self.total_translated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_api_call(&self) {
        self.api_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Fold previously persisted counters into the live ones.
    pub fn merge(&self, loaded: &StatsSnapshot) {
        self.total_translated
            .fetch_add(loaded.total_translated, Ordering::Relaxed);
        self.cache_hits.fetch_add(loaded.cache_hits, Ordering::Relaxed);
        self.api_calls.fetch_add(loaded.api_calls, Ordering::Relaxed);
        self.errors.fetch_add(loaded.errors, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_translated: self.total_translated.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            api_calls: self.api_calls.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the counters; the shape persisted in the cache file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatsSnapshot {
    pub total_translated: u64,
    pub cache_hits: u64,
    pub api_calls: u64,
    pub errors: u64,
}

// --- Persisted file schema ---

/// One cache record in the version-2 array form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord {
    pub original: String,
    pub translated: String,
    pub key: String,
}

/// The `cache` field across schema versions: v2 array of records, v1 flat
/// key -> translated object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CacheField {
    Records(Vec<CacheRecord>),
    Flat(HashMap<String, String>),
}

/// On-disk container, read once at service construction and rewritten
/// wholesale on every debounced save.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedCacheFile {
    #[serde(default = "legacy_version")]
    pub version: u32,
    /// Epoch milliseconds of the last save.
    #[serde(default)]
    pub timestamp: u64,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub target_language: String,
    #[serde(default)]
    pub stats: StatsSnapshot,
    pub cache: CacheField,
}

fn legacy_version() -> u32 {
    1
}

impl PersistedCacheFile {
    /// Normalize either schema version into (key, translated) pairs.
    pub fn entries(&self) -> Vec<(String, String)> {
        match &self.cache {
            CacheField::Records(records) => records
                .iter()
                .map(|r| (r.key.clone(), r.translated.clone()))
                .collect(),
            CacheField::Flat(map) => map
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

// --- File store ---

/// File-backed cache persistence under a dedicated cache directory.
pub struct CacheStore {
    file: PathBuf,
}

impl CacheStore {
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            file: cache_dir.join(CACHE_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file
    }

    /// Read the cache file if present. Parse or IO failures are logged and
    /// treated as "no cache".
    pub fn load(&self) -> Option<PersistedCacheFile> {
        if !self.file.exists() {
            return None;
        }
        let content = match std::fs::read_to_string(&self.file) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %self.file.display(), error = %e, "cache file read failed");
                return None;
            }
        };
        match serde_json::from_str::<PersistedCacheFile>(&content) {
            Ok(file) => {
                debug!(
                    version = file.version,
                    entries = file.entries().len(),
                    "cache file loaded"
                );
                Some(file)
            }
            Err(e) => {
                warn!(path = %self.file.display(), error = %e, "cache file parse failed, starting empty");
                None
            }
        }
    }

    /// Serialize the entire cache (version-2 record array) and overwrite the
    /// file. Write failures are logged, never raised.
    pub fn save(
        &self,
        entries: &[(String, String)],
        stats: StatsSnapshot,
        provider: &str,
        target_language: &str,
    ) {
        if let Some(dir) = self.file.parent() {
            if let Err(e) = std::fs::create_dir_all(dir) {
                warn!(path = %dir.display(), error = %e, "cache directory create failed");
                return;
            }
        }

        let records: Vec<CacheRecord> = entries
            .iter()
            .map(|(key, translated)| CacheRecord {
                original: key_prefix(key).to_string(),
                translated: translated.clone(),
                key: key.clone(),
            })
            .collect();

        let file = PersistedCacheFile {
            version: CURRENT_VERSION,
            timestamp: now_epoch_ms(),
            provider: provider.to_string(),
            target_language: target_language.to_string(),
            stats,
            cache: CacheField::Records(records),
        };

        let json = match serde_json::to_string_pretty(&file) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "cache serialization failed");
                return;
            }
        };

        match std::fs::write(&self.file, json) {
            Ok(()) => {
                debug!(path = %self.file.display(), entries = entries.len(), "cache saved");
            }
            Err(e) => {
                warn!(path = %self.file.display(), error = %e, "cache file write failed");
            }
        }
    }

    /// Delete the cache file. Returns whether a deletion occurred.
    pub fn clear(&self) -> bool {
        if !self.file.exists() {
            return false;
        }
        match std::fs::remove_file(&self.file) {
            Ok(()) => {
                info!(path = %self.file.display(), "cache file deleted");
                true
            }
            Err(e) => {
                warn!(path = %self.file.display(), error = %e, "cache file delete failed");
                false
            }
        }
    }
}

fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

// --- Debounced saving ---

/// Collapses bursts of save requests into one write: each schedule aborts
/// any still-pending delayed save and starts a new countdown, so the write
/// happens once a quiet period has elapsed and captures the state current at
/// fire time.
pub struct DebouncedSaver {
    pending: Mutex<Option<JoinHandle<()>>>,
    delay: Duration,
}

impl DebouncedSaver {
    pub fn new(delay: Duration) -> Self {
        Self {
            pending: Mutex::new(None),
            delay,
        }
    }

    /// Schedule `save` to run after the quiet period. Must be called from
    /// within a tokio runtime. `save` snapshots state when it runs, not when
    /// it is scheduled; the blocking write runs off the async workers.
    pub fn schedule(&self, save: impl FnOnce() + Send + 'static) {
        let mut slot = self.pending.lock();
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        let delay = self.delay;
        *slot = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = tokio::task::spawn_blocking(save).await {
                warn!(error = %e, "debounced save task failed");
            }
        }));
    }

    /// Drop any pending save without running it.
    pub fn cancel(&self) {
        if let Some(previous) = self.pending.lock().take() {
            previous.abort();
        }
    }
}

impl Drop for DebouncedSaver {
    fn drop(&mut self) {
        self.cancel();
    }
}
