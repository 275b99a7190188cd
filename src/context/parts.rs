//! Builds LLM-ready content parts from quoted-message segments.

use crate::MessageSegment;
use crate::error::MediaError;
use crate::media::FetchMedia;
use serde::{Deserialize, Serialize};

/// A typed chunk of an LLM request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    /// Inline binary image data. `url` records where the bytes came from
    /// so flattened rendering can still reference the original.
    ImageInline {
        mime: String,
        data: String,
        url: String,
    },
    /// Remote image reference for providers that fetch URLs themselves.
    /// The part builder prefers inlining; this form is for hosts that
    /// construct parts directly.
    ImageRef { url: String },
    /// Text stand-in for media that was not (or could not be) inlined.
    Placeholder { text: String },
}

/// Convert quoted-message segments into LLM content parts.
///
/// Media fetch or encode failures degrade to placeholders; this function
/// never fails and never mutates anything beyond its return value.
pub async fn build_parts(
    segments: &[MessageSegment],
    multimodal_enabled: bool,
    fetcher: &dyn FetchMedia,
) -> Vec<ContentPart> {
    let mut parts = Vec::with_capacity(segments.len());

    for segment in segments {
        match segment {
            MessageSegment::Text { text } => {
                parts.push(ContentPart::Text { text: text.clone() });
            }
            MessageSegment::Image { url } => {
                if !multimodal_enabled {
                    parts.push(ContentPart::Placeholder {
                        text: format!("[quoted image URL: {url}]"),
                    });
                    continue;
                }
                match inline_image(fetcher, url).await {
                    Ok(part) => {
                        parts.push(part);
                        // Traceability: keep the original URL next to the
                        // inlined bytes.
                        parts.push(ContentPart::Text {
                            text: format!("[image URL: {url}]"),
                        });
                    }
                    Err(error) => {
                        tracing::warn!(%error, url = %url, "failed to inline quoted image");
                        parts.push(ContentPart::Placeholder {
                            text: format!("[quoted image (unavailable): {url}]"),
                        });
                    }
                }
            }
            MessageSegment::Record { url } => {
                parts.push(ContentPart::Placeholder {
                    text: format!("[quoted voice message (not transcribed): {url}]"),
                });
            }
            MessageSegment::Video { url } => {
                parts.push(ContentPart::Placeholder {
                    text: format!("[quoted video: {url}]"),
                });
            }
            MessageSegment::Other => {
                tracing::debug!("dropping unsupported quoted segment");
            }
        }
    }

    parts
}

async fn inline_image(fetcher: &dyn FetchMedia, url: &str) -> Result<ContentPart, MediaError> {
    let path = fetcher.fetch(url).await?;
    let mime = fetcher
        .mime_type(&path)
        .unwrap_or_else(|| "image/jpeg".to_string());
    let data = fetcher.to_base64(&path).await?;

    Ok(ContentPart::ImageInline {
        mime,
        data,
        url: url.to_string(),
    })
}
