//! Messaging transport seam and outbound response relay.

use crate::error::Result;
use crate::media::{MediaKind, Outcome, ResponseSegment, segment_response};
use crate::{MediaSource, OutboundMessage, QuotedMessage, SessionId};
use async_trait::async_trait;

/// Messaging platform adapter.
///
/// Implemented by the host; one instance per platform connection.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Adapter name for logs.
    fn name(&self) -> &str;

    /// Send one outbound message to a session.
    async fn send(&self, session: &SessionId, message: OutboundMessage) -> Result<()>;

    /// Fetch a quoted/replied-to message's raw content by platform id.
    async fn quoted_message(&self, message_id: &str) -> Result<Option<QuotedMessage>>;
}

/// What [`relay_response`] did with a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayDisposition {
    /// Media references were found and the response went out as ordered
    /// segments. The caller must clear the response's storage slot to
    /// [`crate::media::DELIVERED_SENTINEL`] so the full text is not sent
    /// again.
    Segmented { messages_sent: usize },
    /// No media references; the caller delivers the text unchanged.
    Passthrough,
}

/// Relay an assistant response, splitting embedded media references into
/// separate messages.
///
/// Text chunks are trimmed before sending and whitespace-only chunks are
/// skipped; media segments are sent as their classified kind, in the
/// order they appeared in the response.
pub async fn relay_response(
    transport: &dyn Transport,
    session: &SessionId,
    text: &str,
) -> Result<RelayDisposition> {
    let Outcome::Segmented(segments) = segment_response(text) else {
        return Ok(RelayDisposition::Passthrough);
    };

    let mut messages_sent = 0;
    for segment in segments {
        let message = match segment {
            ResponseSegment::Text(chunk) => {
                let chunk = chunk.trim();
                if chunk.is_empty() {
                    continue;
                }
                OutboundMessage::Text(chunk.to_string())
            }
            ResponseSegment::Media(media) => {
                let source = MediaSource::from_corrected(&media.corrected_path);
                match media.kind {
                    MediaKind::Image => OutboundMessage::Image(source),
                    MediaKind::Audio => OutboundMessage::Audio(source),
                    MediaKind::Video => OutboundMessage::Video(source),
                    MediaKind::Document => OutboundMessage::File(source),
                    // extract() never emits unclassified matches.
                    MediaKind::None => continue,
                }
            }
        };
        transport.send(session, message).await?;
        messages_sent += 1;
    }

    tracing::debug!(
        transport = transport.name(),
        session = %session,
        messages_sent,
        "relayed segmented response"
    );
    Ok(RelayDisposition::Segmented { messages_sent })
}
