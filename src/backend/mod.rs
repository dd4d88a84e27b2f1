//! Translation backend capability: one network call given text + context.
//! The service core only knows this trait; vendor specifics live in
//! implementations like [`llm::LlmClient`].

pub mod llm;

use async_trait::async_trait;

use crate::context::ContextEntry;

/// Per-request parameters handed to the backend alongside the text.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub target_language: String,
}

/// Performs one translation call. Implementations must be shareable across
/// tasks; the service holds a single instance for the process lifetime.
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Translate `text`, priming the request with the recent context pairs.
    /// Returns the translated text, or a `BackendError` on transport, HTTP,
    /// or response-parse failure.
    async fn translate(
        &self,
        text: &str,
        context: &[ContextEntry],
        options: &RequestOptions,
    ) -> Result<String, BackendError>;
}

/// Failure of a single backend call. Absorbed at the service boundary: the
/// caller gets the original text back and the key stays uncached.
#[derive(Debug)]
pub enum BackendError {
    /// Connection, DNS, or timeout failure before a response arrived.
    Transport(String),
    /// Non-success HTTP status, with a truncated response body.
    Status(u16, String),
    /// The response arrived but held no usable translation.
    Parse(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::Transport(msg) => write!(f, "transport error: {msg}"),
            BackendError::Status(code, body) => write!(f, "HTTP {code}: {body}"),
            BackendError::Parse(msg) => write!(f, "response parse error: {msg}"),
        }
    }
}

impl std::error::Error for BackendError {}
