//! Conversation context types and quoted-message assembly.

pub mod parts;
pub mod splice;

pub use parts::{ContentPart, build_parts};
pub use splice::{SpliceResult, splice};

use crate::error::Result;
use crate::media::FetchMedia;
use crate::transport::Transport;
use serde::{Deserialize, Serialize};

/// Role of a conversation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
}

/// Content of a conversation entry: plain text or multimodal parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// One role-tagged entry in a conversation's message list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub role: ChatRole,
    pub content: EntryContent,
}

impl ContextEntry {
    pub fn text(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: EntryContent::Text(content.into()),
        }
    }

    pub fn parts(role: ChatRole, parts: Vec<ContentPart>) -> Self {
        Self {
            role,
            content: EntryContent::Parts(parts),
        }
    }
}

/// Ordered message list for one LLM request. A `system` entry, if
/// present, always stays first.
pub type ConversationContext = Vec<ContextEntry>;

/// Fetch a quoted message via the transport, build content parts from
/// its segments, and splice them into `context`.
///
/// A missing quoted message leaves the context untouched.
pub async fn assemble_quoted(
    transport: &dyn Transport,
    fetcher: &dyn FetchMedia,
    message_id: &str,
    context: ConversationContext,
    sender_name: &str,
    prompt: &str,
    multimodal_enabled: bool,
) -> Result<splice::SpliceResult> {
    let Some(quoted) = transport.quoted_message(message_id).await? else {
        tracing::debug!(message_id, "quoted message not found; context unchanged");
        return Ok(splice::SpliceResult {
            context,
            prompt_consumed: false,
        });
    };

    let quoted_parts = parts::build_parts(&quoted.segments, multimodal_enabled, fetcher).await;
    Ok(splice::splice(
        context,
        quoted_parts,
        sender_name,
        &quoted.sender_name,
        prompt,
        multimodal_enabled,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MediaError;
    use crate::transport::test_support::RecordingTransport;
    use crate::{MessageSegment, QuotedMessage};
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};

    struct NoFetch;

    #[async_trait]
    impl FetchMedia for NoFetch {
        async fn fetch(&self, url: &str) -> std::result::Result<PathBuf, MediaError> {
            Err(MediaError::Download {
                url: url.to_string(),
                reason: "offline".into(),
            })
        }

        fn mime_type(&self, _path: &Path) -> Option<String> {
            None
        }

        async fn to_base64(&self, _path: &Path) -> std::result::Result<String, MediaError> {
            Err(MediaError::Other(anyhow::anyhow!("offline")))
        }
    }

    #[tokio::test]
    async fn assembles_quoted_content_end_to_end() {
        let transport = RecordingTransport::with_quoted(QuotedMessage {
            sender_name: "bob".into(),
            segments: vec![MessageSegment::Text {
                text: "original message".into(),
            }],
        });
        let context = vec![ContextEntry::text(ChatRole::System, "sys")];

        let result = assemble_quoted(
            &transport,
            &NoFetch,
            "msg-1",
            context,
            "alice",
            "what was that?",
            false,
        )
        .await
        .unwrap();

        assert!(result.prompt_consumed);
        assert_eq!(result.context.len(), 3);
        assert_eq!(result.context[0].role, ChatRole::System);
        let EntryContent::Text(text) = &result.context[1].content else {
            panic!("expected flattened quoted entry");
        };
        assert!(text.contains("user alice quoted bob's message"));
        assert!(text.contains("original message"));
        assert_eq!(
            result.context[2],
            ContextEntry::text(ChatRole::User, "what was that?")
        );
    }

    #[tokio::test]
    async fn missing_quoted_message_leaves_context_unchanged() {
        let transport = RecordingTransport::default();
        let context = vec![ContextEntry::text(ChatRole::User, "hi")];

        let result = assemble_quoted(&transport, &NoFetch, "gone", context.clone(), "a", "p", true)
            .await
            .unwrap();

        assert!(!result.prompt_consumed);
        assert_eq!(result.context, context);
    }
}
