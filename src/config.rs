//! Translator configuration: provider selection, API credentials, caching and
//! context knobs. Loadable from a TOML file; out-of-range values are clamped
//! rather than rejected so a hand-edited config never prevents startup.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::blacklist::DEFAULT_PATTERNS;

/// Supported LLM API providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    SiliconFlow,
    OpenAi,
    Claude,
    Moonshot,
    Custom,
}

impl Provider {
    /// Well-known chat endpoint for the provider. `Custom` has none; the
    /// configured `api_url` is used instead.
    pub fn endpoint(&self) -> Option<&'static str> {
        match self {
            Provider::SiliconFlow => Some("https://api.siliconflow.cn/v1/chat/completions"),
            Provider::OpenAi => Some("https://api.openai.com/v1/chat/completions"),
            Provider::Claude => Some("https://api.anthropic.com/v1/messages"),
            Provider::Moonshot => Some("https://api.moonshot.cn/v1/chat/completions"),
            Provider::Custom => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::SiliconFlow => "siliconflow",
            Provider::OpenAi => "openai",
            Provider::Claude => "claude",
            Provider::Moonshot => "moonshot",
            Provider::Custom => "custom",
        }
    }
}

/// Full configuration surface of the translation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    pub provider: Provider,
    pub api_key: String,
    /// Endpoint override; only consulted for `Provider::Custom`.
    pub api_url: String,
    pub model: String,
    /// Sampling temperature, clamped to [0, 1].
    pub temperature: f32,
    /// Per-request token budget, clamped to [1, 4096].
    pub max_tokens: u32,
    pub target_language: String,
    pub enable_cache: bool,
    /// In-memory cache capacity (entries). Floor of 100.
    pub max_cache_size: usize,
    /// Context pairs kept for prompt priming, clamped to [0, 50]. 0 disables.
    pub context_window: usize,
    /// Pipe-delimited never-translate patterns.
    pub blacklist: String,
    /// Directory holding the persisted cache file.
    pub cache_dir: PathBuf,
    /// Optional file whose contents replace the built-in system prompt.
    pub prompt_file: Option<PathBuf>,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            provider: Provider::SiliconFlow,
            api_key: String::new(),
            api_url: "https://api.siliconflow.cn/v1/chat/completions".into(),
            model: "Qwen/Qwen2.5-7B-Instruct".into(),
            temperature: 0.3,
            max_tokens: 1000,
            target_language: "zh-CN".into(),
            enable_cache: true,
            max_cache_size: 10_000,
            context_window: 10,
            blacklist: DEFAULT_PATTERNS.into(),
            cache_dir: PathBuf::from("translation_cache"),
            prompt_file: None,
        }
    }
}

impl TranslatorConfig {
    /// Load from a TOML file, clamping numeric fields into their valid
    /// ranges. Missing fields take their defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: TranslatorConfig = toml::from_str(&content)?;
        Ok(config.clamped())
    }

    /// Load from `path` if it exists, defaults otherwise. Load failures are
    /// logged and absorbed; this never prevents service construction.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::from_toml_file(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "config load failed, using defaults");
                Self::default()
            }
        }
    }

    /// Return a copy with all numeric fields forced into range.
    pub fn clamped(mut self) -> Self {
        self.temperature = self.temperature.clamp(0.0, 1.0);
        self.max_tokens = self.max_tokens.clamp(1, 4096);
        self.context_window = self.context_window.min(50);
        self.max_cache_size = self.max_cache_size.max(100);
        self
    }

    /// Resolved chat endpoint for the configured provider.
    pub fn endpoint(&self) -> &str {
        self.provider.endpoint().unwrap_or(&self.api_url)
    }

    /// A credential is present (the enablement gate requires this).
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// Configuration loading failure. Always absorbed by callers with a fallback
/// to defaults; never surfaced to translation callers.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config IO error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_plugin_parameters() {
        let config = TranslatorConfig::default();
        assert_eq!(config.provider, Provider::SiliconFlow);
        assert_eq!(config.model, "Qwen/Qwen2.5-7B-Instruct");
        assert_eq!(config.target_language, "zh-CN");
        assert!(config.enable_cache);
        assert_eq!(config.context_window, 10);
        assert!(!config.has_api_key());
    }

    #[test]
    fn clamping_forces_ranges() {
        let config = TranslatorConfig {
            temperature: 7.5,
            max_tokens: 0,
            context_window: 500,
            max_cache_size: 3,
            ..TranslatorConfig::default()
        }
        .clamped();
        assert_eq!(config.temperature, 1.0);
        assert_eq!(config.max_tokens, 1);
        assert_eq!(config.context_window, 50);
        assert_eq!(config.max_cache_size, 100);
    }

    #[test]
    fn toml_round_trip() {
        let toml_src = r#"
            provider = "claude"
            api_key = "sk-test"
            temperature = 0.7
            target_language = "en"
        "#;
        let config: TranslatorConfig = toml::from_str(toml_src).unwrap();
        let config = config.clamped();
        assert_eq!(config.provider, Provider::Claude);
        assert_eq!(config.target_language, "en");
        assert!(config.has_api_key());
        // Unspecified fields keep their defaults.
        assert_eq!(config.max_tokens, 1000);
    }

    #[test]
    fn custom_provider_uses_configured_url() {
        let config = TranslatorConfig {
            provider: Provider::Custom,
            api_url: "http://localhost:8080/v1/chat/completions".into(),
            ..TranslatorConfig::default()
        };
        assert_eq!(config.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = TranslatorConfig::load_or_default(Path::new("/nonexistent/config.toml"));
        assert_eq!(config.provider, Provider::SiliconFlow);
    }
}
