//! CLI command definitions and shared component wiring.

pub(crate) mod cache;
pub(crate) mod chat;
pub(crate) mod history;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Subcommand;

use geminicraft::cache::ResponseCache;
use geminicraft::config::Config;
use geminicraft::gateway::RequestGateway;
use geminicraft::history::HistoryStore;
use geminicraft::limiter::FixedWindowLimiter;
use geminicraft::providers::GeminiProvider;

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Send one prompt through the gateway and print the response.
    Chat {
        /// Tool the request originates from (smart_chat, vision_analysis,
        /// document_intelligence, code_assistant, creative_writer,
        /// data_analyst).
        #[arg(long, default_value = "smart_chat")]
        tool: String,
        /// The prompt text.
        prompt: String,
        /// Sampling temperature.
        #[arg(long)]
        temperature: Option<f32>,
        /// Maximum output tokens.
        #[arg(long)]
        max_tokens: Option<u32>,
        /// Model override.
        #[arg(long)]
        model: Option<String>,
        /// Continue an existing conversation by id. A fresh id is minted
        /// when omitted.
        #[arg(long)]
        conversation: Option<String>,
        /// Skip the response cache for this request.
        #[arg(long)]
        no_cache: bool,
        /// Do not record this exchange in conversation history.
        #[arg(long)]
        no_history: bool,
    },
    /// Inspect or clear the response cache.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Manage conversation history.
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(Debug, Subcommand)]
pub(crate) enum CacheAction {
    /// Print entry count and hit/miss counters.
    Stats,
    /// Remove cached responses.
    Clear {
        /// Only remove entries older than this many seconds.
        #[arg(long)]
        older_than_secs: Option<u64>,
    },
}

#[derive(Debug, Subcommand)]
pub(crate) enum HistoryAction {
    /// List stored conversations.
    List {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Print all turns of a conversation.
    Show { id: String },
    /// Export a conversation as JSON to stdout.
    Export { id: String },
    /// Delete all but the most recent conversations.
    Cleanup {
        #[arg(long, default_value_t = 10)]
        keep: usize,
    },
}

/// Wire up the gateway and its collaborators from configuration.
pub(crate) fn build_gateway(config: &Config) -> Result<RequestGateway> {
    let provider = GeminiProvider::from_config(
        config.provider.api_key.as_deref(),
        &config.provider.model,
        std::time::Duration::from_secs(config.provider.timeout_secs),
    )
    .context("Failed to initialize the Gemini provider")?;

    let cache = Arc::new(ResponseCache::new(config.cache.ttl(), Config::cache_path()));
    let limiter = Arc::new(FixedWindowLimiter::new(
        config.rate_limit.max_requests,
        config.rate_limit.window(),
    ));

    let mut gateway = RequestGateway::new(Arc::new(provider), cache, limiter)
        .with_cache_enabled(config.cache.enabled);

    if config.history.enabled {
        let history = Arc::new(
            HistoryStore::new(Config::history_dir(), config.history.max_turns)
                .context("Failed to open history store")?,
        );
        gateway = gateway.with_history(history, config.history.context_turns);
    }

    Ok(gateway)
}
