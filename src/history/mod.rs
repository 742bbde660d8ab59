//! Conversation history store.
//!
//! Persists turns as one JSON file per conversation under a configurable
//! root. The gateway writes here fire-and-forget after a successful
//! response; failures are logged, never propagated to the original request.
//! Reads feed the CLI (`history list/show/export`) and the contextual
//! prompt the gateway builds for follow-up turns.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::error::{CraftError, Result};
use crate::providers::ToolKind;

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    fn label(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

/// One persisted turn of a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub tool: ToolKind,
}

impl ConversationTurn {
    pub fn now(role: Role, content: impl Into<String>, tool: ToolKind) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            tool,
        }
    }
}

/// Listing entry for one stored conversation.
#[derive(Debug, Clone)]
pub struct ConversationSummary {
    pub id: String,
    pub turns: usize,
    pub updated_at: DateTime<Utc>,
}

/// File-backed conversation store, one JSON document per conversation.
pub struct HistoryStore {
    root: PathBuf,
    max_turns: usize,
    // Serializes read-modify-write cycles on conversation files.
    io_lock: Mutex<()>,
}

impl HistoryStore {
    /// Open (and create if needed) a store rooted at `root`.
    ///
    /// Conversations are trimmed to the most recent `max_turns` turns on
    /// every write.
    pub fn new(root: PathBuf, max_turns: usize) -> Result<Self> {
        std::fs::create_dir_all(&root)
            .map_err(|e| CraftError::History(format!("cannot create {}: {e}", root.display())))?;
        Ok(Self {
            root,
            max_turns: max_turns.max(1),
            io_lock: Mutex::new(()),
        })
    }

    /// Append a turn to a conversation, creating it on first write.
    pub fn record(&self, conversation_id: &str, turn: ConversationTurn) -> Result<()> {
        let path = self.conversation_path(conversation_id)?;
        let _guard = self.io_lock.lock().expect("history lock poisoned");

        let mut turns = read_turns(&path)?;
        turns.push(turn);
        if turns.len() > self.max_turns {
            turns.drain(..turns.len() - self.max_turns);
        }

        let data = serde_json::to_string_pretty(&turns)?;
        std::fs::write(&path, data)
            .map_err(|e| CraftError::History(format!("cannot write {}: {e}", path.display())))?;
        Ok(())
    }

    /// All turns of a conversation, oldest first. Empty when unknown.
    pub fn conversation(&self, conversation_id: &str) -> Result<Vec<ConversationTurn>> {
        let path = self.conversation_path(conversation_id)?;
        let _guard = self.io_lock.lock().expect("history lock poisoned");
        read_turns(&path)
    }

    /// Format the most recent `max_turns` turns as `Role: content` lines,
    /// for prepending to a follow-up prompt.
    pub fn context(&self, conversation_id: &str, max_turns: usize) -> Result<String> {
        let turns = self.conversation(conversation_id)?;
        let skip = turns.len().saturating_sub(max_turns);
        let mut out = String::new();
        for turn in &turns[skip..] {
            out.push_str(turn.role.label());
            out.push_str(": ");
            out.push_str(&turn.content);
            out.push('\n');
        }
        Ok(out)
    }

    /// Summaries of all stored conversations, most recently updated first.
    ///
    /// A conversation file that fails to parse is skipped with a warning so
    /// one damaged file cannot take down listing or cleanup.
    pub fn list(&self) -> Result<Vec<ConversationSummary>> {
        let _guard = self.io_lock.lock().expect("history lock poisoned");
        let mut summaries = Vec::new();

        let entries = std::fs::read_dir(&self.root)
            .map_err(|e| CraftError::History(format!("cannot read {}: {e}", self.root.display())))?;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let turns = match read_turns(&path) {
                Ok(turns) => turns,
                Err(e) => {
                    warn!(path = %path.display(), "Skipping unreadable conversation: {}", e);
                    continue;
                }
            };
            let Some(last) = turns.last() else {
                continue;
            };
            summaries.push(ConversationSummary {
                id: id.to_string(),
                turns: turns.len(),
                updated_at: last.timestamp,
            });
        }

        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    /// Export a conversation as a pretty-printed JSON document.
    pub fn export(&self, conversation_id: &str) -> Result<String> {
        let turns = self.conversation(conversation_id)?;
        if turns.is_empty() {
            return Err(CraftError::History(format!(
                "no conversation found for id '{conversation_id}'"
            )));
        }
        let doc = json!({
            "conversation_id": conversation_id,
            "exported_at": Utc::now(),
            "message_count": turns.len(),
            "messages": turns,
        });
        Ok(serde_json::to_string_pretty(&doc)?)
    }

    /// Delete all but the `keep` most recently updated conversations.
    ///
    /// Returns the number of conversations deleted.
    pub fn cleanup_old(&self, keep: usize) -> Result<usize> {
        let summaries = self.list()?;
        let _guard = self.io_lock.lock().expect("history lock poisoned");
        let mut deleted = 0;
        for summary in summaries.iter().skip(keep) {
            let path = self.root.join(format!("{}.json", summary.id));
            if std::fs::remove_file(&path).is_ok() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    /// Resolve and validate a conversation file path.
    ///
    /// Ids are restricted to a filename-safe alphabet so they cannot
    /// escape the store root.
    fn conversation_path(&self, conversation_id: &str) -> Result<PathBuf> {
        if conversation_id.is_empty()
            || !conversation_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(CraftError::History(format!(
                "invalid conversation id '{conversation_id}'"
            )));
        }
        Ok(self.root.join(format!("{conversation_id}.json")))
    }
}

fn read_turns(path: &Path) -> Result<Vec<ConversationTurn>> {
    match std::fs::read_to_string(path) {
        Ok(data) => Ok(serde_json::from_str(&data)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(CraftError::History(format!(
            "cannot read {}: {e}",
            path.display()
        ))),
    }
}
