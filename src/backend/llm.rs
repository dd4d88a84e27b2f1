//! LLM chat-completions translation client.
//! One client covers the OpenAI-compatible providers (SiliconFlow, OpenAI,
//! Moonshot, custom endpoints) and Claude, which differs only in auth
//! headers and response shape. Connection pooling via reqwest, retry on
//! 429/5xx with backoff.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{BackendError, RequestOptions, TranslationBackend};
use crate::config::{Provider, TranslatorConfig};
use crate::context::ContextEntry;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Built-in system prompt, used when no external prompt file is configured.
fn default_system_prompt(target_language: &str) -> String {
    let lang_name = match target_language {
        "zh-CN" => "简体中文",
        "zh-TW" => "繁体中文",
        "en" => "English",
        "ko" => "Korean",
        "ja" => "日本語",
        other => other,
    };
    format!(
        "You are a professional game translator. Translate the following Japanese text to {lang_name}. \
         Maintain the tone, style, and context. Preserve escape sequences like \\n, \\c[n], etc. \
         Only return the translated text without explanations."
    )
}

pub struct LlmClient {
    http: reqwest::Client,
    provider: Provider,
    endpoint: String,
    api_key: String,
    /// Loaded once at construction; replaces the built-in system prompt.
    prompt_override: Option<String>,
}

impl LlmClient {
    /// Build a client from the service configuration. Never fails: a missing
    /// prompt file is logged and the built-in prompt used instead. A missing
    /// API key is not this layer's concern (the service gates on it).
    pub fn new(config: &TranslatorConfig) -> Self {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        let prompt_override = config
            .prompt_file
            .as_deref()
            .and_then(|path| load_prompt_file(path));

        Self {
            http,
            provider: config.provider,
            endpoint: config.endpoint().to_string(),
            api_key: config.api_key.clone(),
            prompt_override,
        }
    }

    fn system_prompt(&self, target_language: &str) -> String {
        match &self.prompt_override {
            Some(prompt) => prompt.clone(),
            None => default_system_prompt(target_language),
        }
    }

    /// POST with retry: 429 honors Retry-After (else 1s/2s/4s, max 3
    /// retries), 5xx backs off exponentially (max 2), a timeout is retried
    /// once immediately.
    async fn send_with_retry(
        &self,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, BackendError> {
        let mut attempt: u32 = 0;
        let max_429_retries: u32 = 3;
        let max_5xx_retries: u32 = 2;
        let mut timeout_retried = false;

        loop {
            let mut request = self
                .http
                .post(&self.endpoint)
                .header("Content-Type", "application/json")
                .json(body);

            request = if self.provider == Provider::Claude {
                request
                    .header("x-api-key", &self.api_key)
                    .header("anthropic-version", ANTHROPIC_VERSION)
            } else {
                request.header("Authorization", format!("Bearer {}", self.api_key))
            };

            match request.send().await {
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(resp) if resp.status().as_u16() == 429 => {
                    if attempt >= max_429_retries {
                        return Err(BackendError::Status(429, "rate limited".into()));
                    }
                    let wait = resp
                        .headers()
                        .get("retry-after")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .map(Duration::from_secs)
                        .unwrap_or_else(|| Duration::from_secs(1 << attempt));
                    warn!(attempt, wait_ms = wait.as_millis() as u64, "429 rate limited, retrying");
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Ok(resp) if resp.status().is_server_error() => {
                    if attempt >= max_5xx_retries {
                        return Err(BackendError::Status(
                            resp.status().as_u16(),
                            "server error".into(),
                        ));
                    }
                    let wait = Duration::from_millis(500 * (1 << attempt));
                    warn!(
                        attempt,
                        status = resp.status().as_u16(),
                        wait_ms = wait.as_millis() as u64,
                        "5xx error, retrying"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    let body_text = resp.text().await.unwrap_or_default();
                    return Err(BackendError::Status(
                        status,
                        body_text.chars().take(200).collect(),
                    ));
                }
                Err(e) if e.is_timeout() => {
                    if timeout_retried {
                        return Err(BackendError::Transport("request timeout".into()));
                    }
                    warn!("request timeout, retrying once");
                    timeout_retried = true;
                }
                Err(e) => return Err(BackendError::Transport(e.to_string())),
            }
        }
    }
}

#[async_trait]
impl TranslationBackend for LlmClient {
    async fn translate(
        &self,
        text: &str,
        context: &[ContextEntry],
        options: &RequestOptions,
    ) -> Result<String, BackendError> {
        let body = serde_json::json!({
            "model": options.model,
            "messages": [
                {"role": "system", "content": self.system_prompt(&options.target_language)},
                {"role": "user", "content": build_user_prompt(text, context)},
            ],
            "temperature": options.temperature,
            "max_tokens": options.max_tokens,
        });

        debug!(provider = self.provider.as_str(), chars = text.len(), "translation request");
        let response = self.send_with_retry(&body).await?;

        let translated = if self.provider == Provider::Claude {
            let parsed: ClaudeResponse = response
                .json()
                .await
                .map_err(|e| BackendError::Parse(e.to_string()))?;
            parsed
                .content
                .into_iter()
                .next()
                .map(|block| block.text)
                .ok_or_else(|| BackendError::Parse("empty content array".into()))?
        } else {
            let parsed: ChatResponse = response
                .json()
                .await
                .map_err(|e| BackendError::Parse(e.to_string()))?;
            parsed
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .ok_or_else(|| BackendError::Parse("no message content".into()))?
        };

        Ok(translated.trim().to_string())
    }
}

/// Prompt body: recent (original, translated) pairs first, then the text to
/// translate, so short consecutive lines keep their shared context.
fn build_user_prompt(text: &str, context: &[ContextEntry]) -> String {
    let mut prompt = String::new();
    if !context.is_empty() {
        prompt.push_str("Previous translations for context:\n");
        for entry in context {
            prompt.push_str(&format!(
                "Japanese: {}\nTranslation: {}\n\n",
                entry.original, entry.translated
            ));
        }
        prompt.push_str("---\n\n");
    }
    prompt.push_str(&format!("Current text to translate:\n{text}"));
    prompt
}

fn load_prompt_file(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(content) if !content.trim().is_empty() => {
            info!(path = %path.display(), "external system prompt loaded");
            Some(content)
        }
        Ok(_) => {
            warn!(path = %path.display(), "prompt file is empty, using built-in prompt");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "prompt file read failed, using built-in prompt");
            None
        }
    }
}

// --- Response shapes ---

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeBlock>,
}

#[derive(Deserialize)]
struct ClaudeBlock {
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(o: &str, t: &str) -> ContextEntry {
        ContextEntry {
            original: o.to_string(),
            translated: t.to_string(),
        }
    }

    #[test]
    fn prompt_without_context_is_bare() {
        let prompt = build_user_prompt("こんにちは", &[]);
        assert_eq!(prompt, "Current text to translate:\nこんにちは");
    }

    #[test]
    fn prompt_lists_context_pairs_in_order() {
        let ctx = vec![entry("A", "a"), entry("B", "b")];
        let prompt = build_user_prompt("C", &ctx);
        let a_pos = prompt.find("Japanese: A").unwrap();
        let b_pos = prompt.find("Japanese: B").unwrap();
        assert!(a_pos < b_pos);
        assert!(prompt.contains("Translation: a"));
        assert!(prompt.ends_with("Current text to translate:\nC"));
    }

    #[test]
    fn chat_response_parses_content() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":"你好"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("你好"));
    }

    #[test]
    fn claude_response_parses_first_block() {
        let json = r#"{"content":[{"type":"text","text":"你好"}]}"#;
        let parsed: ClaudeResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.content[0].text, "你好");
    }

    #[test]
    fn default_prompt_names_known_languages() {
        assert!(default_system_prompt("zh-CN").contains("简体中文"));
        assert!(default_system_prompt("ko").contains("Korean"));
        // Unknown codes pass through verbatim.
        assert!(default_system_prompt("fr-FR").contains("fr-FR"));
    }
}
