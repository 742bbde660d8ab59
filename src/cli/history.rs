//! Conversation history command handler.

use anyhow::{Context, Result};

use geminicraft::config::Config;
use geminicraft::history::{HistoryStore, Role};

use super::HistoryAction;

pub(crate) fn cmd_history(config: &Config, action: HistoryAction) -> Result<()> {
    let history = HistoryStore::new(Config::history_dir(), config.history.max_turns)
        .with_context(|| "Failed to open history store")?;

    match action {
        HistoryAction::List { limit } => {
            let entries = history.list()?;
            if entries.is_empty() {
                println!("No conversation history found.");
                return Ok(());
            }

            let shown = entries.len().min(limit);
            println!("Showing {} of {} conversation(s):", shown, entries.len());
            for entry in entries.iter().take(limit) {
                println!(
                    "- {} | {} turns | {}",
                    entry.id,
                    entry.turns,
                    entry.updated_at.to_rfc3339()
                );
            }
        }
        HistoryAction::Show { id } => {
            let turns = history.conversation(&id)?;
            if turns.is_empty() {
                anyhow::bail!("No conversation found for id '{}'", id);
            }

            println!("Conversation: {id}");
            println!("Turns: {}", turns.len());
            println!();
            for turn in turns {
                let role = match turn.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                };
                println!("[{} | {} | {}]", role, turn.tool, turn.timestamp.to_rfc3339());
                println!("{}", turn.content);
                println!();
            }
        }
        HistoryAction::Export { id } => {
            println!("{}", history.export(&id)?);
        }
        HistoryAction::Cleanup { keep } => {
            let deleted = history.cleanup_old(keep)?;
            println!(
                "Cleanup complete: deleted {} old conversation(s), kept {} most recent.",
                deleted, keep
            );
        }
    }

    Ok(())
}
