//! Generative-media understanding API client.
//!
//! Used by tools that explicitly ask to interpret a quoted video or
//! voice message. Sends one OpenAI-style chat completion carrying a text
//! prompt plus the media inline, and returns the model's text.

use crate::config::UnderstandConfig;
use crate::error::{ConfigError, Result, UnderstandError};
use serde_json::json;

/// Reject media larger than this (decoded bytes) before calling out.
pub const MAX_UNDERSTAND_BYTES: usize = 20 * 1024 * 1024;

/// Client for the understanding endpoint.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl Client {
    /// Build a client from config. Missing key or base URL is surfaced
    /// immediately so the calling tool can report it to the user.
    pub fn from_config(config: &UnderstandConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| ConfigError::MissingKey("understand.api_key".into()))?;
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| ConfigError::MissingKey("understand.base_url".into()))?;

        Ok(Self {
            http: reqwest::Client::new(),
            api_key,
            base_url,
            model: config.model.clone(),
        })
    }

    /// Ask the model to describe/interpret one piece of media.
    ///
    /// `data` is standard base64 of the raw bytes. Audio goes out as an
    /// `input_audio` part; everything else as a data-URI `image_url`
    /// part, which OpenAI-compatible multimodal endpoints accept for
    /// stills and short clips alike.
    pub async fn understand(&self, mime: &str, data: &str, prompt: &str) -> Result<String> {
        let decoded_size = data.len() / 4 * 3;
        if decoded_size > MAX_UNDERSTAND_BYTES {
            return Err(UnderstandError::PayloadTooLarge {
                bytes: decoded_size,
                limit: MAX_UNDERSTAND_BYTES,
            }
            .into());
        }

        let media_part = if mime.starts_with("audio/") {
            let format = mime.rsplit('/').next().unwrap_or("wav");
            json!({
                "type": "input_audio",
                "input_audio": { "data": data, "format": format }
            })
        } else {
            json!({
                "type": "image_url",
                "image_url": { "url": format!("data:{mime};base64,{data}") }
            })
        };

        let body = json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    media_part
                ]
            }]
        });

        let endpoint = format!(
            "{}/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        );
        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| UnderstandError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(300).collect();
            return Err(UnderstandError::Api {
                status: status.as_u16(),
                body: snippet,
            }
            .into());
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| UnderstandError::MalformedResponse(e.to_string()))?;

        value["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                UnderstandError::MalformedResponse("no choices[0].message.content".into()).into()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn client() -> Client {
        Client::from_config(&UnderstandConfig {
            api_key: Some("key".into()),
            base_url: Some("http://localhost:1".into()),
            model: "test-model".into(),
        })
        .unwrap()
    }

    #[test]
    fn missing_key_is_a_config_error() {
        let result = Client::from_config(&UnderstandConfig {
            api_key: None,
            base_url: Some("http://localhost:1".into()),
            model: "m".into(),
        });

        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::MissingKey(key))) if key.contains("api_key")
        ));
    }

    #[tokio::test]
    async fn oversized_payload_is_rejected_before_any_request() {
        // ~28MB decoded: the client must fail fast even though the
        // endpoint is unreachable.
        let data = "A".repeat(38_000_000);
        let result = client().understand("video/mp4", &data, "describe").await;

        assert!(matches!(
            result,
            Err(Error::Understand(UnderstandError::PayloadTooLarge { .. }))
        ));
    }
}
