//! Model provider abstraction.
//!
//! The external AI call is modelled as a narrow capability
//! ([`ModelProvider::generate`]) so the gateway can be exercised against a
//! deterministic stub in tests and against the Gemini REST API in
//! production.

pub mod gemini;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{CraftError, Result};

pub use gemini::GeminiProvider;

/// The six studio tools a request can originate from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    SmartChat,
    VisionAnalysis,
    DocumentIntelligence,
    CodeAssistant,
    CreativeWriter,
    DataAnalyst,
}

impl ToolKind {
    /// Stable identifier used in fingerprints, history records, and the CLI.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SmartChat => "smart_chat",
            Self::VisionAnalysis => "vision_analysis",
            Self::DocumentIntelligence => "document_intelligence",
            Self::CodeAssistant => "code_assistant",
            Self::CreativeWriter => "creative_writer",
            Self::DataAnalyst => "data_analyst",
        }
    }

    /// All known tools, for CLI help text.
    pub const ALL: [ToolKind; 6] = [
        Self::SmartChat,
        Self::VisionAnalysis,
        Self::DocumentIntelligence,
        Self::CodeAssistant,
        Self::CreativeWriter,
        Self::DataAnalyst,
    ];
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ToolKind {
    type Err = CraftError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "smart_chat" => Ok(Self::SmartChat),
            "vision_analysis" => Ok(Self::VisionAnalysis),
            "document_intelligence" => Ok(Self::DocumentIntelligence),
            "code_assistant" => Ok(Self::CodeAssistant),
            "creative_writer" => Ok(Self::CreativeWriter),
            "data_analyst" => Ok(Self::DataAnalyst),
            other => Err(CraftError::Config(format!(
                "unknown tool '{other}' (expected one of: smart_chat, vision_analysis, \
                 document_intelligence, code_assistant, creative_writer, data_analyst)"
            ))),
        }
    }
}

/// Generation parameters that affect model output.
///
/// Every field here participates in the request fingerprint — omitting an
/// output-affecting parameter would make stale cache hits possible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateParams {
    /// Model override. `None` uses the provider's default model.
    pub model: Option<String>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum output tokens.
    pub max_tokens: u32,
}

impl Default for GenerateParams {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.7,
            max_tokens: 2048,
        }
    }
}

/// A single request entering the gateway from a UI panel or the CLI.
#[derive(Debug, Clone)]
pub struct ToolRequest {
    pub tool: ToolKind,
    pub prompt: String,
    pub params: GenerateParams,
    /// When set, prior turns of this conversation are prepended as context
    /// and the resulting turns are recorded under this id.
    pub conversation_id: Option<String>,
    /// Per-request cache opt-out (e.g. vision payloads).
    pub use_cache: bool,
}

impl ToolRequest {
    pub fn new(tool: ToolKind, prompt: impl Into<String>) -> Self {
        Self {
            tool,
            prompt: prompt.into(),
            params: GenerateParams::default(),
            conversation_id: None,
            use_cache: true,
        }
    }
}

/// The external AI call, reduced to the one capability the gateway needs.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider name for logs and history records.
    fn name(&self) -> &str;

    /// Model used when a request does not override it.
    fn default_model(&self) -> &str;

    /// Perform one synchronous generation call. No retries.
    async fn generate(&self, prompt: &str, params: &GenerateParams) -> Result<String>;
}

/// Map a non-success provider HTTP response to an error variant.
///
/// Pulls `error.message` out of the JSON body when present so logs carry
/// the provider's reason without dumping the whole payload.
pub(crate) fn parse_provider_error(status: reqwest::StatusCode, body: &str) -> CraftError {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "no error body".to_string()
            } else {
                trimmed.chars().take(200).collect()
            }
        });
    CraftError::ExternalCall(format!("{status}: {detail}"))
}
