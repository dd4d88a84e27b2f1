//! Translation service: decides per string whether to serve the cache, join
//! an in-flight request, or issue a new backend call, and keeps the cache
//! durable. Both entry points are total: every call returns a string and no
//! backend, config, or persistence failure ever reaches the caller.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::FutureExt;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::backend::{RequestOptions, TranslationBackend};
use crate::blacklist::Blacklist;
use crate::cache::TranslationCache;
use crate::config::TranslatorConfig;
use crate::context::ContextWindow;
use crate::key::derive_key;
use crate::pending::PendingRequests;
use crate::store::{CacheStore, DebouncedSaver, StatsSnapshot, TranslationStats, DEFAULT_SAVE_DEBOUNCE};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Published when a background translation started by [`TranslationService::translate`]
/// completes. Rendering collaborators subscribe and re-render the text they
/// drew with the original.
#[derive(Debug, Clone)]
pub struct TranslationReady {
    pub original: String,
    pub translated: String,
}

/// Readiness and identity report, for status displays and logs.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub enabled: bool,
    pub has_api_key: bool,
    pub api_key_prefix: String,
    pub provider: String,
    pub target_language: String,
    pub cache_size: usize,
    pub is_ready: bool,
}

struct ServiceInner {
    config: TranslatorConfig,
    backend: Arc<dyn TranslationBackend>,
    cache: TranslationCache,
    context: Mutex<ContextWindow>,
    pending: PendingRequests,
    stats: TranslationStats,
    store: CacheStore,
    saver: DebouncedSaver,
    blacklist: Blacklist,
    enabled: AtomicBool,
    events: broadcast::Sender<TranslationReady>,
}

/// Cheaply cloneable handle; all clones share one cache, context window,
/// pending registry, and statistics. Construct one per process and hand
/// clones to whatever rendering layer needs translation.
#[derive(Clone)]
pub struct TranslationService {
    inner: Arc<ServiceInner>,
}

impl TranslationService {
    /// Construct the service and load the persisted cache. Entries are
    /// adopted (and stats merged) only when the file's provider and target
    /// language match the current configuration; otherwise the load is
    /// discarded and the cache starts empty.
    pub fn new(config: TranslatorConfig, backend: Arc<dyn TranslationBackend>) -> Self {
        let config = config.clamped();
        let cache = TranslationCache::new(config.max_cache_size);
        let context = Mutex::new(ContextWindow::new(config.context_window));
        let blacklist = Blacklist::new(&config.blacklist);
        let store = CacheStore::new(&config.cache_dir);
        let stats = TranslationStats::default();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        if let Some(file) = store.load() {
            if file.provider == config.provider.as_str()
                && file.target_language == config.target_language
            {
                let entries = file.entries();
                let count = entries.len();
                for (key, translated) in entries {
                    cache.insert(key, translated);
                }
                stats.merge(&file.stats);
                info!(entries = count, "translation cache loaded from file");
            } else {
                info!(
                    file_provider = %file.provider,
                    file_language = %file.target_language,
                    "cache provider/language mismatch, starting empty"
                );
            }
        }

        if !config.has_api_key() {
            warn!("no API key configured, translation disabled until one is set");
        }

        Self {
            inner: Arc::new(ServiceInner {
                blacklist,
                cache,
                context,
                pending: PendingRequests::new(),
                stats,
                store,
                saver: DebouncedSaver::new(DEFAULT_SAVE_DEBOUNCE),
                backend,
                enabled: AtomicBool::new(true),
                events,
                config,
            }),
        }
    }

    // --- Enablement ---

    /// Enabled flag AND a configured credential; re-checked on every call so
    /// toggling takes effect immediately.
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Relaxed) && self.inner.config.has_api_key()
    }

    pub fn enable(&self) {
        self.inner.enabled.store(true, Ordering::Relaxed);
    }

    pub fn disable(&self) {
        self.inner.enabled.store(false, Ordering::Relaxed);
    }

    /// Flip the enabled flag; returns the new value.
    pub fn toggle(&self) -> bool {
        !self.inner.enabled.fetch_xor(true, Ordering::Relaxed)
    }

    // --- Translation entry points ---

    /// Synchronous-return shape for callers that cannot block (text
    /// rendering). Disabled or blacklisted text comes back unchanged; a
    /// cache hit returns the stored translation; a miss returns the input
    /// immediately while a background task performs the coalesced backend
    /// call and publishes a [`TranslationReady`] event on completion.
    ///
    /// Must be called from within a tokio runtime.
    pub fn translate(&self, text: &str) -> String {
        if !self.is_enabled() || self.inner.blacklist.is_blocked(text) {
            return text.to_string();
        }

        let key = derive_key(text, &self.inner.config.target_language);
        if self.inner.config.enable_cache {
            if let Some(cached) = self.inner.cache.get(&key) {
                self.inner.stats.record_cache_hit();
                return cached;
            }
        }

        debug!(chars = text.len(), "cache miss, translating in background");
        let service = self.clone();
        let original = text.to_string();
        tokio::spawn(async move {
            let translated = service.request_translation(original.clone()).await;
            let _ = service
                .inner
                .events
                .send(TranslationReady { original, translated });
        });

        text.to_string()
    }

    /// Fully asynchronous shape: same gating and caching, but the caller
    /// awaits the final value.
    pub async fn translate_async(&self, text: &str) -> String {
        if !self.is_enabled() || self.inner.blacklist.is_blocked(text) {
            return text.to_string();
        }
        self.request_translation(text.to_string()).await
    }

    /// Subscribe to background-translation completion events.
    pub fn subscribe(&self) -> broadcast::Receiver<TranslationReady> {
        self.inner.events.subscribe()
    }

    // --- Miss path ---

    /// Cache check, then coalesced backend call. The coalesce check happens
    /// before any backend work is started, so N concurrent misses for one
    /// key produce exactly one network exchange.
    async fn request_translation(&self, text: String) -> String {
        let key = derive_key(&text, &self.inner.config.target_language);

        if self.inner.config.enable_cache {
            if let Some(cached) = self.inner.cache.get(&key) {
                self.inner.stats.record_cache_hit();
                return cached;
            }
        }

        let service = self.clone();
        let work_key = key.clone();
        let shared = self.inner.pending.join_or_start(
            &key,
            async move { service.perform_translation(text, work_key).await }.boxed(),
        );
        shared.await
    }

    /// One backend call, with every failure absorbed: on error the original
    /// text stands in as the translation and the key stays uncached so a
    /// later call retries.
    async fn perform_translation(&self, text: String, key: String) -> String {
        self.inner.stats.record_api_call();

        let context = self.inner.context.lock().recent();
        let options = RequestOptions {
            model: self.inner.config.model.clone(),
            temperature: self.inner.config.temperature,
            max_tokens: self.inner.config.max_tokens,
            target_language: self.inner.config.target_language.clone(),
        };

        match self.inner.backend.translate(&text, &context, &options).await {
            Ok(translated) => {
                let translated = translated.trim().to_string();
                if self.inner.config.enable_cache {
                    self.inner.cache.insert(key, translated.clone());
                    self.schedule_save();
                }
                self.inner.context.lock().push(text, translated.clone());
                self.inner.stats.record_translation();
                translated
            }
            Err(e) => {
                self.inner.stats.record_error();
                warn!(error = %e, "translation failed, returning source text");
                text
            }
        }
    }

    // --- Persistence ---

    fn schedule_save(&self) {
        let service = self.clone();
        self.inner.saver.schedule(move || {
            service.save_now();
        });
    }

    fn save_now(&self) {
        self.inner.store.save(
            &self.inner.cache.snapshot(),
            self.inner.stats.snapshot(),
            self.inner.config.provider.as_str(),
            &self.inner.config.target_language,
        );
    }

    /// Write the current cache immediately, bypassing the debounce window.
    /// Intended for shutdown.
    pub fn flush(&self) {
        self.inner.saver.cancel();
        self.save_now();
    }

    /// Drop every cached translation, the context window, and the cache
    /// file. The next call for any key issues a fresh backend request.
    pub fn clear_cache(&self) {
        self.inner.saver.cancel();
        self.inner.cache.clear();
        self.inner.context.lock().clear();
        self.inner.store.clear();
        info!("translation cache cleared");
    }

    // --- Reporting ---

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    pub fn cache_size(&self) -> usize {
        self.inner.cache.len()
    }

    pub fn cache_file_path(&self) -> &Path {
        self.inner.store.path()
    }

    pub fn status(&self) -> ServiceStatus {
        let has_api_key = self.inner.config.has_api_key();
        let enabled = self.inner.enabled.load(Ordering::Relaxed);
        let api_key_prefix = if has_api_key {
            let prefix: String = self.inner.config.api_key.chars().take(10).collect();
            format!("{prefix}...")
        } else {
            "none".to_string()
        };
        ServiceStatus {
            enabled,
            has_api_key,
            api_key_prefix,
            provider: self.inner.config.provider.as_str().to_string(),
            target_language: self.inner.config.target_language.clone(),
            cache_size: self.inner.cache.len(),
            is_ready: enabled && has_api_key,
        }
    }
}
