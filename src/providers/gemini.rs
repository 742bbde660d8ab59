//! Gemini REST provider.
//!
//! Speaks the v1beta `generateContent` endpoint directly over reqwest.
//! Auth priority: config key → GEMINI_API_KEY → GOOGLE_API_KEY.
//!
//! Thinking models (Gemini 2.5) return parts tagged `thought: true`; those
//! are intermediate reasoning and are filtered from the returned text.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{CraftError, Result};

use super::{parse_provider_error, GenerateParams, ModelProvider};

/// Gemini v1beta REST API base.
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model when none is configured or passed at call time.
const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-pro";

/// Native Gemini provider that authenticates with an API key.
///
/// Use [`GeminiProvider::from_config`] to build from configuration and the
/// environment, or [`GeminiProvider::new_with_key`] for manual construction.
pub struct GeminiProvider {
    api_key: String,
    model: String,
    client: Client,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish()
    }
}

impl GeminiProvider {
    /// Build a provider with an explicit API key.
    pub fn new_with_key(api_key: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            client: Self::build_client(Duration::from_secs(30)),
        }
    }

    /// Resolve credentials in priority order and build the provider.
    ///
    /// 1. `api_key` — value from the config file
    /// 2. `GEMINI_API_KEY` environment variable
    /// 3. `GOOGLE_API_KEY` environment variable
    ///
    /// # Errors
    /// Returns [`CraftError::Config`] when no credential is available.
    pub fn from_config(api_key: Option<&str>, model: &str, timeout: Duration) -> Result<Self> {
        let resolved = api_key
            .filter(|k| !k.is_empty())
            .map(String::from)
            .or_else(|| std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty()))
            .or_else(|| std::env::var("GOOGLE_API_KEY").ok().filter(|k| !k.is_empty()))
            .ok_or_else(|| {
                CraftError::Config(
                    "no Gemini API key found (set provider.api_key, GEMINI_API_KEY, \
                     or GOOGLE_API_KEY)"
                        .to_string(),
                )
            })?;

        Ok(Self {
            api_key: resolved,
            model: model.to_string(),
            client: Self::build_client(timeout),
        })
    }

    pub fn default_gemini_model() -> &'static str {
        DEFAULT_GEMINI_MODEL
    }

    fn build_client(timeout: Duration) -> Client {
        Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default()
    }

    /// Build a `generateContent` request body for a single user prompt.
    fn build_request_body(prompt: &str, params: &GenerateParams) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }]
            }],
            "generationConfig": {
                "temperature": params.temperature,
                "maxOutputTokens": params.max_tokens
            }
        })
    }

    /// Extract final answer text from a Gemini API response.
    ///
    /// Parts tagged `"thought": true` are skipped. If only thought parts
    /// exist (unusual), their text is returned so the caller always gets
    /// *something*.
    pub fn extract_text(response: &Value) -> Option<String> {
        let parts = response["candidates"][0]["content"]["parts"].as_array()?;

        let final_parts: Vec<&str> = parts
            .iter()
            .filter(|p| !p["thought"].as_bool().unwrap_or(false))
            .filter_map(|p| p["text"].as_str())
            .collect();

        if !final_parts.is_empty() {
            return Some(final_parts.join(""));
        }

        let thought_parts: Vec<&str> = parts.iter().filter_map(|p| p["text"].as_str()).collect();
        if !thought_parts.is_empty() {
            Some(thought_parts.join(""))
        } else {
            None
        }
    }

    fn api_url(&self, model: &str) -> String {
        format!("{GEMINI_API_BASE}/models/{model}:generateContent")
    }
}

#[async_trait]
impl ModelProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, params: &GenerateParams) -> Result<String> {
        let model = params.model.as_deref().unwrap_or(&self.model);
        let body = Self::build_request_body(prompt, params);

        debug!(model = %model, prompt_len = prompt.len(), "Calling Gemini generateContent");

        let response = self
            .client
            .post(self.api_url(model))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CraftError::ExternalCall(format!("request timed out: {e}"))
                } else {
                    CraftError::ExternalCall(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(parse_provider_error(status, &text));
        }

        let parsed: Value = serde_json::from_str(&text)
            .map_err(|e| CraftError::ExternalCall(format!("unparseable response body: {e}")))?;

        Self::extract_text(&parsed).ok_or_else(|| {
            CraftError::ExternalCall("response contained no candidate text".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_carries_generation_config() {
        let params = GenerateParams {
            model: None,
            temperature: 0.2,
            max_tokens: 512,
        };
        let body = GeminiProvider::build_request_body("hello", &params);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 512);
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(body["contents"][0]["role"], "user");
    }

    #[test]
    fn test_extract_text_simple() {
        let response = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "4" }] }
            }]
        });
        assert_eq!(GeminiProvider::extract_text(&response), Some("4".to_string()));
    }

    #[test]
    fn test_extract_text_filters_thoughts() {
        let response = json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "let me think...", "thought": true },
                    { "text": "The answer is 4." }
                ]}
            }]
        });
        assert_eq!(
            GeminiProvider::extract_text(&response),
            Some("The answer is 4.".to_string())
        );
    }

    #[test]
    fn test_extract_text_thought_only_fallback() {
        let response = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "only thoughts", "thought": true }] }
            }]
        });
        assert_eq!(
            GeminiProvider::extract_text(&response),
            Some("only thoughts".to_string())
        );
    }

    #[test]
    fn test_extract_text_empty_candidates() {
        let response = json!({ "candidates": [] });
        assert_eq!(GeminiProvider::extract_text(&response), None);
    }

    #[test]
    fn test_debug_redacts_key() {
        let provider = GeminiProvider::new_with_key("secret-key-123", "gemini-1.5-pro");
        let dbg = format!("{provider:?}");
        assert!(!dbg.contains("secret-key-123"));
        assert!(dbg.contains("[REDACTED]"));
    }
}
