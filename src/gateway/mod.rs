//! Request gateway: cache lookup, rate-limit gating, and the external call.
//!
//! The gateway owns no ambient state — cache, limiter, provider, and history
//! store are injected at construction and shared by reference across
//! sessions. Sequence per request:
//!
//! 1. compute the fingerprint (conversation context included when present)
//! 2. cache hit → return immediately, no limiter interaction
//! 3. miss → claim a rate-limit slot or fail `RateLimited`
//! 4. call the provider; cache on success, propagate failure uncached
//! 5. hand the turns to the history store fire-and-forget

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::{Fingerprint, ResponseCache};
use crate::error::{CraftError, Result};
use crate::history::{ConversationTurn, HistoryStore, Role};
use crate::limiter::{FixedWindowLimiter, RateDecision};
use crate::providers::{ModelProvider, ToolRequest};

/// Response returned to the UI layer.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub content: String,
    /// True when served from the response cache.
    pub cached: bool,
    /// Model that produced (or originally produced) the content.
    pub model: String,
}

/// Orchestrates one tool request through cache, limiter, and provider.
pub struct RequestGateway {
    provider: Arc<dyn ModelProvider>,
    cache: Arc<ResponseCache>,
    limiter: Arc<FixedWindowLimiter>,
    history: Option<Arc<HistoryStore>>,
    cache_enabled: bool,
    context_turns: usize,
}

impl RequestGateway {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        cache: Arc<ResponseCache>,
        limiter: Arc<FixedWindowLimiter>,
    ) -> Self {
        Self {
            provider,
            cache,
            limiter,
            history: None,
            cache_enabled: true,
            context_turns: 10,
        }
    }

    /// Attach a history store; prior turns feed follow-up prompts and
    /// successful responses are recorded there.
    pub fn with_history(mut self, history: Arc<HistoryStore>, context_turns: usize) -> Self {
        self.history = Some(history);
        self.context_turns = context_turns;
        self
    }

    /// Disable the cache globally (config `cache.enabled = false`).
    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    /// Run one request through the gateway.
    pub async fn handle(&self, request: ToolRequest) -> Result<GatewayResponse> {
        let model = request
            .params
            .model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string());

        let prompt = self.effective_prompt(&request);
        let use_cache = self.cache_enabled && request.use_cache;
        let fingerprint = Fingerprint::compute(request.tool, &prompt, &request.params, &model);

        if use_cache {
            if let Some(cached) = self.cache.get(&fingerprint) {
                debug!(tool = %request.tool, key = %fingerprint.short(), "Serving from cache");
                self.record_turns(&request, &cached);
                return Ok(GatewayResponse {
                    content: cached,
                    cached: true,
                    model,
                });
            }
        }

        match self.limiter.try_acquire() {
            RateDecision::Allowed => {}
            RateDecision::Denied { retry_after } => {
                return Err(CraftError::RateLimited(format!(
                    "window exhausted, retry in ~{}s",
                    retry_after.as_secs().max(1)
                )));
            }
        }

        // External call. Failures propagate as-is and are never cached.
        let content = self.provider.generate(&prompt, &request.params).await?;

        if use_cache {
            self.cache.put(&fingerprint, content.clone());
        }
        self.record_turns(&request, &content);

        Ok(GatewayResponse {
            content,
            cached: false,
            model,
        })
    }

    /// Prepend conversation context to the prompt when a conversation id is
    /// set and history is available. Context failures degrade to the bare
    /// prompt.
    fn effective_prompt(&self, request: &ToolRequest) -> String {
        let (Some(id), Some(history)) = (&request.conversation_id, &self.history) else {
            return request.prompt.clone();
        };
        match history.context(id, self.context_turns) {
            Ok(ctx) if !ctx.is_empty() => format!("{ctx}User: {}", request.prompt),
            Ok(_) => request.prompt.clone(),
            Err(e) => {
                warn!(conversation = %id, "Could not load context: {}", e);
                request.prompt.clone()
            }
        }
    }

    /// Hand the user and assistant turns to the history store on a detached
    /// task. Persistence failures never block or fail the response.
    fn record_turns(&self, request: &ToolRequest, response: &str) {
        let (Some(id), Some(history)) = (&request.conversation_id, &self.history) else {
            return;
        };
        let history = Arc::clone(history);
        let id = id.clone();
        let tool = request.tool;
        let user = ConversationTurn::now(Role::User, request.prompt.clone(), tool);
        let assistant = ConversationTurn::now(Role::Assistant, response.to_string(), tool);

        tokio::task::spawn_blocking(move || {
            for turn in [user, assistant] {
                if let Err(e) = history.record(&id, turn) {
                    warn!(conversation = %id, "History write failed: {}", e);
                    return;
                }
            }
        });
    }
}
