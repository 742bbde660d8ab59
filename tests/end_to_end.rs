//! End-to-end gateway scenarios against a deterministic stub provider.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use geminicraft::cache::ResponseCache;
use geminicraft::error::{CraftError, Result};
use geminicraft::gateway::RequestGateway;
use geminicraft::limiter::FixedWindowLimiter;
use geminicraft::providers::{GenerateParams, ModelProvider, ToolKind, ToolRequest};

struct SpyProvider {
    calls: AtomicUsize,
}

impl SpyProvider {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ModelProvider for SpyProvider {
    fn name(&self) -> &str {
        "spy"
    }

    fn default_model(&self) -> &str {
        "gemini-1.5-pro"
    }

    async fn generate(&self, prompt: &str, _params: &GenerateParams) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if prompt.contains("2+2") {
            Ok("2+2 equals 4.".to_string())
        } else {
            Ok(format!("response to: {prompt}"))
        }
    }
}

fn build(provider: Arc<SpyProvider>, limit: u32) -> RequestGateway {
    RequestGateway::new(
        provider,
        Arc::new(ResponseCache::in_memory(Duration::from_secs(3600))),
        Arc::new(FixedWindowLimiter::new(limit, Duration::from_secs(60))),
    )
}

#[tokio::test]
async fn smart_chat_round_trip_then_cache_hit() {
    let provider = Arc::new(SpyProvider::new());
    let gateway = build(Arc::clone(&provider), 60);

    let mut request = ToolRequest::new(ToolKind::SmartChat, "What is 2+2?");
    request.params.temperature = 0.7;

    // First call: cache miss, passes the limiter, reaches the provider.
    let first = gateway.handle(request.clone()).await.unwrap();
    assert!(!first.cached);
    assert_eq!(first.content, "2+2 equals 4.");
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

    // Identical second call: same payload, no second external invocation.
    let second = gateway.handle(request).await.unwrap();
    assert!(second.cached);
    assert_eq!(second.content, first.content);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rate_limit_of_one_denies_second_distinct_request() {
    let provider = Arc::new(SpyProvider::new());
    let gateway = build(Arc::clone(&provider), 1);

    let first = gateway
        .handle(ToolRequest::new(ToolKind::CodeAssistant, "write a haiku about rust"))
        .await
        .unwrap();
    assert!(!first.cached);

    // Different fingerprint, same window: denied all the same.
    let err = gateway
        .handle(ToolRequest::new(ToolKind::CreativeWriter, "write a sonnet"))
        .await
        .unwrap_err();
    assert!(matches!(err, CraftError::RateLimited(_)));
    assert!(err.user_message().contains("try again"));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn tools_do_not_share_cache_entries() {
    let provider = Arc::new(SpyProvider::new());
    let gateway = build(Arc::clone(&provider), 60);

    gateway
        .handle(ToolRequest::new(ToolKind::SmartChat, "summarize this"))
        .await
        .unwrap();
    gateway
        .handle(ToolRequest::new(ToolKind::DocumentIntelligence, "summarize this"))
        .await
        .unwrap();

    assert_eq!(
        provider.calls.load(Ordering::SeqCst),
        2,
        "same prompt under a different tool is a different fingerprint"
    );
}
