//! Request fingerprint derivation.
//!
//! A fingerprint is a SHA-256 digest over every output-affecting input of a
//! request: tool identifier, resolved model, normalized prompt, temperature,
//! and token limit. Two requests with identical normalized content always
//! map to the same fingerprint; this is an equality contract, not a
//! commitment to a specific algorithm.

use sha2::{Digest, Sha256};

use crate::providers::{GenerateParams, ToolKind};

/// An opaque, reproducible cache key for a gateway request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Derive the fingerprint for `(tool, prompt, params)` against a
    /// resolved model name.
    ///
    /// Fields are length-prefixed before hashing to prevent separator
    /// collisions (e.g. prompt `"a"` + model `"b"` vs prompt `"ab"` +
    /// empty model). Temperature enters as its exact bit pattern so that
    /// `0.7` and `0.70000001` are distinct.
    pub fn compute(tool: ToolKind, prompt: &str, params: &GenerateParams, model: &str) -> Self {
        let normalized = normalize_prompt(prompt);

        let mut hasher = Sha256::new();
        for field in [tool.as_str(), model, normalized.as_str()] {
            hasher.update((field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
        hasher.update(params.temperature.to_bits().to_le_bytes());
        hasher.update(params.max_tokens.to_le_bytes());

        Self(format!("{:x}", hasher.finalize()))
    }

    /// Full hex digest, used as the storage key.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log fields.
    pub fn short(&self) -> &str {
        &self.0[..8.min(self.0.len())]
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Collapse insignificant whitespace so trivially reformatted prompts hit
/// the same entry. Case is preserved: it can change model output.
fn normalize_prompt(prompt: &str) -> String {
    prompt.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> GenerateParams {
        GenerateParams::default()
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let a = Fingerprint::compute(ToolKind::SmartChat, "What is 2+2?", &params(), "gemini-1.5-pro");
        let b = Fingerprint::compute(ToolKind::SmartChat, "What is 2+2?", &params(), "gemini-1.5-pro");
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_tool_aware() {
        let a = Fingerprint::compute(ToolKind::SmartChat, "hello", &params(), "m");
        let b = Fingerprint::compute(ToolKind::CodeAssistant, "hello", &params(), "m");
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_model_aware() {
        let a = Fingerprint::compute(ToolKind::SmartChat, "hello", &params(), "gemini-1.5-pro");
        let b = Fingerprint::compute(ToolKind::SmartChat, "hello", &params(), "gemini-1.5-flash");
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_temperature_aware() {
        let mut hot = params();
        hot.temperature = 0.9;
        let a = Fingerprint::compute(ToolKind::SmartChat, "hello", &params(), "m");
        let b = Fingerprint::compute(ToolKind::SmartChat, "hello", &hot, "m");
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_max_tokens_aware() {
        let mut long = params();
        long.max_tokens = 4096;
        let a = Fingerprint::compute(ToolKind::SmartChat, "hello", &params(), "m");
        let b = Fingerprint::compute(ToolKind::SmartChat, "hello", &long, "m");
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_whitespace_normalized() {
        let a = Fingerprint::compute(ToolKind::SmartChat, "  What is\n2+2?  ", &params(), "m");
        let b = Fingerprint::compute(ToolKind::SmartChat, "What is 2+2?", &params(), "m");
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_case_preserved() {
        let a = Fingerprint::compute(ToolKind::SmartChat, "Hello", &params(), "m");
        let b = Fingerprint::compute(ToolKind::SmartChat, "hello", &params(), "m");
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_no_separator_collision() {
        // prompt "ab" + model "" must differ from prompt "a" + model "b"
        let a = Fingerprint::compute(ToolKind::SmartChat, "ab", &params(), "");
        let b = Fingerprint::compute(ToolKind::SmartChat, "a", &params(), "b");
        assert_ne!(a, b);
    }

    #[test]
    fn test_short_prefix() {
        let fp = Fingerprint::compute(ToolKind::SmartChat, "x", &params(), "m");
        assert_eq!(fp.short().len(), 8);
        assert!(fp.as_str().starts_with(fp.short()));
    }
}
