//! One-shot chat command handler.

use anyhow::Result;
use tracing::debug;

use geminicraft::config::Config;
use geminicraft::providers::{ToolKind, ToolRequest};

use super::build_gateway;

#[allow(clippy::too_many_arguments)]
pub(crate) async fn cmd_chat(
    config: &Config,
    tool: &str,
    prompt: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    model: Option<String>,
    conversation: Option<String>,
    no_cache: bool,
    no_history: bool,
) -> Result<()> {
    let tool: ToolKind = tool.parse()?;
    let gateway = build_gateway(config)?;

    let conversation_id = if no_history {
        None
    } else {
        Some(conversation.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()))
    };

    let mut request = ToolRequest::new(tool, prompt);
    request.params.temperature = temperature.unwrap_or(config.provider.temperature);
    request.params.max_tokens = max_tokens.unwrap_or(config.provider.max_tokens);
    request.params.model = model;
    request.conversation_id = conversation_id.clone();
    request.use_cache = !no_cache;

    match gateway.handle(request).await {
        Ok(response) => {
            println!("{}", response.content);
            if response.cached {
                eprintln!("(served from cache, model {})", response.model);
            }
            if let Some(id) = conversation_id {
                eprintln!("(conversation {id} — pass --conversation {id} to continue)");
            }
            Ok(())
        }
        Err(e) => {
            // Gateway conditions are user-facing messages, not stack traces.
            debug!(error = %e, "Gateway request failed");
            anyhow::bail!("{}", e.user_message())
        }
    }
}
