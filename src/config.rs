//! Configuration loading and validation.

use crate::error::Result;
use anyhow::Context as _;
use std::path::PathBuf;

/// Relaybot configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Data directory path.
    pub data_dir: PathBuf,

    /// Multimodal context settings.
    pub multimodal: MultimodalConfig,

    /// Generative-media understanding API settings.
    pub understand: UnderstandConfig,

    /// Temp-media cleanup settings.
    pub cleanup: CleanupConfig,
}

/// Multimodal context settings.
#[derive(Debug, Clone, Copy)]
pub struct MultimodalConfig {
    /// When true, quoted images are fetched and inlined into LLM requests.
    /// When false, images degrade to text placeholders.
    pub enabled: bool,
}

impl Default for MultimodalConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Generative-media understanding API settings.
///
/// Both `api_key` and `base_url` are optional at load time; the
/// understanding client surfaces a clear error when it is constructed
/// without them. The extractor/splicer paths never need them.
#[derive(Debug, Clone, Default)]
pub struct UnderstandConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
}

/// Temp-media cleanup settings.
#[derive(Debug, Clone, Copy)]
pub struct CleanupConfig {
    /// Files older than this many minutes are removed by the cleanup pass.
    /// Zero disables cleanup.
    pub max_age_minutes: u64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            max_age_minutes: 60,
        }
    }
}

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self> {
        let data_dir = std::env::var("RELAYBOT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::data_dir()
                    .map(|d| d.join("relaybot"))
                    .unwrap_or_else(|| PathBuf::from("./data"))
            });

        // Ensure data directory exists
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

        let multimodal = MultimodalConfig {
            enabled: std::env::var("RELAYBOT_MULTIMODAL")
                .map(|v| parse_bool(&v))
                .unwrap_or(true),
        };

        let understand = UnderstandConfig {
            api_key: std::env::var("RELAYBOT_UNDERSTAND_API_KEY").ok(),
            base_url: std::env::var("RELAYBOT_UNDERSTAND_BASE_URL").ok(),
            model: std::env::var("RELAYBOT_UNDERSTAND_MODEL")
                .unwrap_or_else(|_| "gemini-2.0-flash".into()),
        };

        let cleanup = CleanupConfig {
            max_age_minutes: std::env::var("RELAYBOT_TEMP_MAX_AGE_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
        };

        Ok(Self {
            data_dir,
            multimodal,
            understand,
            cleanup,
        })
    }

    /// Directory where fetched media is staged before delivery.
    pub fn temp_media_dir(&self) -> PathBuf {
        self.data_dir.join("temp_media")
    }

    /// Path of the processed-state file.
    pub fn state_path(&self) -> PathBuf {
        self.data_dir.join("processed_state.json")
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
