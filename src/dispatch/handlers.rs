//! Kind-specific renderers for deferred tool results.

use crate::error::Result;
use crate::transport::Transport;
use crate::{MediaSource, OutboundMessage, SessionId};
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// Renders one kind of tool result as an outbound message.
///
/// Handlers must tolerate malformed historical payloads: log a warning
/// and return `Ok(())` so the scan never re-blocks on the same entry.
/// An `Err` is reserved for transport failures; the dispatcher marks the
/// position processed either way.
#[async_trait]
pub trait ToolResultHandler: Send + Sync {
    /// Identifier prefix matched against a history entry's tool id.
    fn prefix(&self) -> &str;

    /// Parse the payload and emit one outbound message.
    async fn deliver(
        &self,
        session: &SessionId,
        payload: &str,
        transport: &dyn Transport,
    ) -> Result<()>;
}

/// Maps tool-id prefixes to handlers, checked in registration order.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: Vec<Arc<dyn ToolResultHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn ToolResultHandler>) {
        self.handlers.push(handler);
    }

    /// First handler whose prefix matches the tool id, in registration
    /// order.
    pub fn find(&self, tool_call_id: &str) -> Option<&Arc<dyn ToolResultHandler>> {
        self.handlers
            .iter()
            .find(|handler| tool_call_id.starts_with(handler.prefix()))
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Delivers free-text answers carried in an `answerText` field.
pub struct AnswerTextHandler {
    prefix: String,
}

impl AnswerTextHandler {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

#[async_trait]
impl ToolResultHandler for AnswerTextHandler {
    fn prefix(&self) -> &str {
        &self.prefix
    }

    async fn deliver(
        &self,
        session: &SessionId,
        payload: &str,
        transport: &dyn Transport,
    ) -> Result<()> {
        let Some(json) = parse_payload(self.prefix(), payload) else {
            return Ok(());
        };
        let Some(answer) = json.get("answerText").and_then(Value::as_str) else {
            tracing::warn!(prefix = %self.prefix, "tool payload has no answerText; skipping");
            return Ok(());
        };

        transport
            .send(session, OutboundMessage::Text(answer.to_string()))
            .await
    }
}

/// Delivers image results referenced by `imageUrl` or `imagePath`.
pub struct ImageResultHandler {
    prefix: String,
}

impl ImageResultHandler {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

#[async_trait]
impl ToolResultHandler for ImageResultHandler {
    fn prefix(&self) -> &str {
        &self.prefix
    }

    async fn deliver(
        &self,
        session: &SessionId,
        payload: &str,
        transport: &dyn Transport,
    ) -> Result<()> {
        let Some(json) = parse_payload(self.prefix(), payload) else {
            return Ok(());
        };

        let source = if let Some(url) = json.get("imageUrl").and_then(Value::as_str) {
            MediaSource::Url(url.to_string())
        } else if let Some(path) = json.get("imagePath").and_then(Value::as_str) {
            if !Path::new(path).is_file() {
                tracing::warn!(prefix = %self.prefix, path = %path, "image result file missing; skipping");
                return Ok(());
            }
            MediaSource::Path(path.into())
        } else {
            tracing::warn!(prefix = %self.prefix, "tool payload has no image reference; skipping");
            return Ok(());
        };

        transport.send(session, OutboundMessage::Image(source)).await
    }
}

/// Delivers audio results referenced by `audioUrl` or `audioPath`.
pub struct AudioResultHandler {
    prefix: String,
}

impl AudioResultHandler {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

#[async_trait]
impl ToolResultHandler for AudioResultHandler {
    fn prefix(&self) -> &str {
        &self.prefix
    }

    async fn deliver(
        &self,
        session: &SessionId,
        payload: &str,
        transport: &dyn Transport,
    ) -> Result<()> {
        let Some(json) = parse_payload(self.prefix(), payload) else {
            return Ok(());
        };

        let source = if let Some(url) = json.get("audioUrl").and_then(Value::as_str) {
            MediaSource::Url(url.to_string())
        } else if let Some(path) = json.get("audioPath").and_then(Value::as_str) {
            if !Path::new(path).is_file() {
                tracing::warn!(prefix = %self.prefix, path = %path, "audio result file missing; skipping");
                return Ok(());
            }
            MediaSource::Path(path.into())
        } else {
            tracing::warn!(prefix = %self.prefix, "tool payload has no audio reference; skipping");
            return Ok(());
        };

        transport.send(session, OutboundMessage::Audio(source)).await
    }
}

fn parse_payload(prefix: &str, payload: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(payload) {
        Ok(json) => Some(json),
        Err(error) => {
            tracing::warn!(%error, prefix = %prefix, "unparseable tool payload; skipping");
            None
        }
    }
}
