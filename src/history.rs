//! Read model for a conversation's persisted history.

use crate::SessionId;
use crate::context::ChatRole;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One persisted history entry.
///
/// An entry's *position* is its index within the list at read time; the
/// dispatcher keys delivery state on positions, so sources must return
/// the full history in stored order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: ChatRole,
    /// Tool identifier, present on `tool` entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Entry payload. For `tool` entries this is kind-specific JSON.
    #[serde(default)]
    pub content: String,
}

impl HistoryEntry {
    pub fn text(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            tool_call_id: None,
            content: content.into(),
        }
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Tool,
            tool_call_id: Some(tool_call_id.into()),
            content: content.into(),
        }
    }
}

/// Source of a session's ordered history (the host's conversation store).
#[async_trait]
pub trait HistorySource: Send + Sync {
    async fn history(&self, session: &SessionId) -> Result<Vec<HistoryEntry>>;
}
