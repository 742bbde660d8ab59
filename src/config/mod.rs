//! Configuration loading.
//!
//! JSON config at `~/.geminicraft/config.json`, every section optional and
//! defaulted. The API key may also come from the environment
//! (GEMINI_API_KEY / GOOGLE_API_KEY), which takes effect inside the
//! provider's credential resolution rather than here.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CraftError, Result};

/// Top-level configuration for the gateway core.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderConfig,
    pub cache: CacheConfig,
    pub rate_limit: RateLimitConfig,
    pub history: HistoryConfig,
}

/// External model provider settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProviderConfig {
    /// Explicit API key. Usually left unset in favour of the environment.
    pub api_key: Option<String>,
    /// Default model for requests that do not override it.
    pub model: String,
    /// Default sampling temperature.
    pub temperature: f32,
    /// Default output token limit.
    pub max_tokens: u32,
    /// HTTP timeout for a single external call, in seconds.
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-1.5-pro".to_string(),
            temperature: 0.7,
            max_tokens: 2048,
            timeout_secs: 30,
        }
    }
}

/// Response cache settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Entry time-to-live in seconds.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 3600,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Fixed-window rate limiter settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Window duration in seconds.
    pub window_secs: u64,
    /// Calls allowed per window.
    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 60,
            max_requests: 60,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Conversation history settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HistoryConfig {
    pub enabled: bool,
    /// Turns of prior context prepended to follow-up prompts.
    pub context_turns: usize,
    /// Maximum turns retained per conversation.
    pub max_turns: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            context_turns: 10,
            max_turns: 20,
        }
    }
}

impl Config {
    /// `~/.geminicraft/config.json`.
    pub fn path() -> PathBuf {
        Self::data_dir().join("config.json")
    }

    /// `~/.geminicraft` — root for config, cache, and history files.
    pub fn data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".geminicraft")
    }

    /// Default location of the persisted response cache.
    pub fn cache_path() -> PathBuf {
        Self::data_dir().join("cache").join("responses.json")
    }

    /// Default root of the conversation history store.
    pub fn history_dir() -> PathBuf {
        Self::data_dir().join("history")
    }

    /// Load from the default path, falling back to defaults when the file
    /// does not exist.
    pub fn load() -> Result<Self> {
        let path = Self::path();
        if path.exists() {
            Self::load_from_path(&path)
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Load and parse a specific config file.
    pub fn load_from_path(path: &std::path::Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| CraftError::Config(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&data)
            .map_err(|e| CraftError::Config(format!("invalid config {}: {e}", path.display())))
    }
}
