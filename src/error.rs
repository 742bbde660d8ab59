//! Crate-wide error type and result alias.
//!
//! Every condition here is user-visible and non-fatal: the gateway surfaces
//! them to the caller as messages, never as a crash. Cache faults in
//! particular degrade to a miss rather than propagating.

use thiserror::Error;

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, CraftError>;

/// All error conditions surfaced by the gateway core.
#[derive(Debug, Error)]
pub enum CraftError {
    /// The rate limiter denied the request for the current window.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// The external model call returned an error or timed out.
    #[error("External call failed: {0}")]
    ExternalCall(String),

    /// Cache storage could not be read or written. Soft failure: callers
    /// proceed as on a miss (get) or skip caching (put).
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),

    /// History store read or write failed.
    #[error("History store error: {0}")]
    History(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CraftError {
    /// Sanitized message suitable for end-user display.
    ///
    /// Provider error bodies can contain request echoes or internal detail;
    /// this keeps the UI string short and actionable.
    pub fn user_message(&self) -> String {
        match self {
            Self::RateLimited(_) => {
                "Rate limit reached. Please try again shortly.".to_string()
            }
            Self::ExternalCall(_) => {
                "The AI service could not complete the request. Please try again.".to_string()
            }
            Self::CacheUnavailable(_) => {
                "Response cache is unavailable; the request was served without it.".to_string()
            }
            Self::History(_) => "Conversation history could not be updated.".to_string(),
            Self::Config(msg) => format!("Configuration problem: {msg}"),
            Self::Json(_) | Self::Io(_) => "An internal error occurred.".to_string(),
        }
    }

    /// True for conditions the caller may retry after a short delay.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::ExternalCall(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_user_message_suggests_retry() {
        let err = CraftError::RateLimited("60/60 in window".into());
        assert!(err.user_message().contains("try again"));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_external_call_message_is_sanitized() {
        let err = CraftError::ExternalCall("400 INVALID_ARGUMENT: key=AIza...".into());
        assert!(!err.user_message().contains("AIza"));
    }

    #[test]
    fn test_cache_unavailable_is_soft() {
        let err = CraftError::CacheUnavailable("permission denied".into());
        assert!(!err.is_retryable());
    }
}
