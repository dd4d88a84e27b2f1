//! autolingo: on-demand LLM translation for short strings, with a durable
//! cache and request coalescing to keep paid API calls to a minimum.
//!
//! The entry point is [`TranslationService`]: construct one per process with
//! a [`TranslatorConfig`] and a [`backend::TranslationBackend`] (the bundled
//! [`backend::llm::LlmClient`] covers OpenAI-compatible providers and
//! Claude), then call [`TranslationService::translate`] from rendering code
//! that cannot block, or [`TranslationService::translate_async`] where the
//! caller can await the result.

pub mod backend;
pub mod blacklist;
pub mod cache;
pub mod config;
pub mod context;
pub mod key;
pub mod pending;
pub mod service;
pub mod store;

pub use backend::{BackendError, RequestOptions, TranslationBackend};
pub use blacklist::Blacklist;
pub use config::{ConfigError, Provider, TranslatorConfig};
pub use context::{ContextEntry, ContextWindow};
pub use key::derive_key;
pub use service::{ServiceStatus, TranslationReady, TranslationService};
pub use store::StatsSnapshot;
