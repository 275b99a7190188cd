//! Relaybot: a relay layer between free-form LLM text and structured
//! multi-part chat messages.

pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod history;
pub mod media;
pub mod telemetry;
pub mod transport;
pub mod understand;

pub use error::{Error, Result};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Session identifier type (one persisted chat context).
pub type SessionId = Arc<str>;

/// A single typed chunk of an inbound message, as provided by the
/// messaging transport. Owned by the transport; read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageSegment {
    Text { text: String },
    Image { url: String },
    /// A voice message. Never transcribed by this crate.
    Record { url: String },
    Video { url: String },
    /// Any segment type this crate does not understand.
    #[serde(other)]
    Other,
}

/// A quoted/replied-to message fetched from the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotedMessage {
    /// Display name of the quoted message's author.
    pub sender_name: String,
    /// Ordered segments of the quoted message.
    pub segments: Vec<MessageSegment>,
}

/// Where outbound media lives: a remote URL or a local file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaSource {
    Url(String),
    Path(PathBuf),
}

impl MediaSource {
    /// Build a source from a corrected path string: anything carrying a
    /// scheme is a URL, everything else is a local file.
    pub fn from_corrected(path: &str) -> Self {
        if path.contains("://") {
            MediaSource::Url(path.to_string())
        } else {
            MediaSource::Path(PathBuf::from(path))
        }
    }
}

/// Outbound message to the messaging transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboundMessage {
    Text(String),
    Image(MediaSource),
    Audio(MediaSource),
    Video(MediaSource),
    File(MediaSource),
}
