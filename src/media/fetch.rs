//! Media download, MIME lookup, and base64 encoding.

use crate::error::MediaError;
use async_trait::async_trait;
use base64::Engine as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Fetch collaborator seam for the multimodal part builder.
///
/// All three operations are fallible and never fatal to request
/// assembly: callers degrade to placeholders on error.
#[async_trait]
pub trait FetchMedia: Send + Sync {
    /// Fetch a media reference to a local file and return its path.
    async fn fetch(&self, url: &str) -> Result<PathBuf, MediaError>;

    /// Best-effort MIME type for a local file.
    fn mime_type(&self, path: &Path) -> Option<String>;

    /// Read a local file and encode it as standard base64.
    async fn to_base64(&self, path: &Path) -> Result<String, MediaError>;
}

/// Downloads media into a temp directory and keeps it tidy.
#[derive(Debug, Clone)]
pub struct MediaFetcher {
    http: reqwest::Client,
    temp_dir: PathBuf,
}

impl MediaFetcher {
    /// Create a fetcher rooted at `temp_dir`, creating the directory if
    /// needed.
    pub fn new(temp_dir: PathBuf) -> Result<Self, MediaError> {
        std::fs::create_dir_all(&temp_dir).map_err(|source| MediaError::Read {
            path: temp_dir.clone(),
            source,
        })?;

        Ok(Self {
            http: reqwest::Client::new(),
            temp_dir,
        })
    }

    /// Delete temp files older than `max_age`. Returns the number removed.
    ///
    /// A zero age disables cleanup entirely rather than deleting
    /// everything.
    pub async fn cleanup_older_than(&self, max_age: Duration) -> usize {
        if max_age.is_zero() {
            tracing::warn!(dir = %self.temp_dir.display(), "temp cleanup skipped: zero max age");
            return 0;
        }

        let mut entries = match tokio::fs::read_dir(&self.temp_dir).await {
            Ok(entries) => entries,
            Err(error) => {
                tracing::warn!(%error, dir = %self.temp_dir.display(), "temp cleanup skipped: unreadable directory");
                return 0;
            }
        };

        let mut removed = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let expired = metadata
                .modified()
                .ok()
                .and_then(|modified| modified.elapsed().ok())
                .is_some_and(|age| age > max_age);
            if !expired {
                continue;
            }
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(error) => {
                    tracing::warn!(%error, path = %path.display(), "failed to remove expired temp file");
                }
            }
        }

        if removed > 0 {
            tracing::info!(removed, dir = %self.temp_dir.display(), "cleaned up expired temp media");
        }
        removed
    }
}

#[async_trait]
impl FetchMedia for MediaFetcher {
    async fn fetch(&self, url: &str) -> Result<PathBuf, MediaError> {
        // Local references pass through untouched when they exist.
        if !url.contains("://") {
            let path = PathBuf::from(url);
            if path.is_file() {
                return Ok(path);
            }
            return Err(MediaError::NotFound { path });
        }

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| MediaError::Download {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(MediaError::Download {
                url: url.to_string(),
                reason: format!("status {}", response.status()),
            });
        }

        let disposition = response
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let filename = derive_filename(url, disposition.as_deref());
        let path = self.temp_dir.join(filename);

        let bytes = response.bytes().await.map_err(|e| MediaError::Download {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|source| MediaError::Read {
                path: path.clone(),
                source,
            })?;

        tracing::info!(url = %url, path = %path.display(), size = bytes.len(), "downloaded media");
        Ok(path)
    }

    fn mime_type(&self, path: &Path) -> Option<String> {
        if !path.is_file() {
            return None;
        }

        mime_guess::from_path(path)
            .first()
            .map(|m| m.essence_str().to_string())
            .or_else(|| fallback_mime(path))
    }

    async fn to_base64(&self, path: &Path) -> Result<String, MediaError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| MediaError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
    }
}

/// MIME fallbacks for extensions `mime_guess` occasionally misses.
fn fallback_mime(path: &Path) -> Option<String> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        _ => return None,
    };
    Some(mime.to_string())
}

/// Build a unique, filesystem-safe name for a download.
///
/// Preference order for the original name: `Content-Disposition`
/// filename, then the URL path basename, then a generic stem. The stem
/// is sanitized to `[A-Za-z0-9_-]` and suffixed with a millisecond
/// timestamp; a missing extension falls back to `.tmp`.
fn derive_filename(url: &str, content_disposition: Option<&str>) -> String {
    let original = content_disposition
        .and_then(disposition_filename)
        .or_else(|| url_basename(url))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "media_file".to_string());

    let (stem, extension) = match original.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() && !extension.is_empty() => {
            (stem.to_string(), format!(".{extension}"))
        }
        _ => (original, ".tmp".to_string()),
    };

    let safe_stem: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let timestamp = chrono::Utc::now().timestamp_millis();
    format!("media_{safe_stem}_{timestamp}{extension}")
}

/// Parse a filename out of a `Content-Disposition` header value.
/// The RFC 5987 `filename*=utf-8''...` form takes precedence.
fn disposition_filename(value: &str) -> Option<String> {
    for part in value.split(';') {
        let part = part.trim();
        if let Some(rest) = part.strip_prefix("filename*=") {
            let rest = rest.trim_matches('"');
            let rest = rest
                .strip_prefix("UTF-8''")
                .or_else(|| rest.strip_prefix("utf-8''"))
                .unwrap_or(rest);
            if let Ok(decoded) = urlencoding::decode(rest) {
                return Some(decoded.into_owned());
            }
        }
    }

    for part in value.split(';') {
        let part = part.trim();
        if let Some(rest) = part.strip_prefix("filename=") {
            return Some(rest.trim_matches('"').to_string());
        }
    }

    None
}

/// Basename of a URL's path component, ignoring query and fragment.
fn url_basename(url: &str) -> Option<String> {
    let without_suffix = url.split(['?', '#']).next().unwrap_or(url);
    let after_scheme = without_suffix
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(without_suffix);
    let basename = after_scheme.rsplit('/').next().unwrap_or("");

    // A bare host with no path yields the host itself; reject that.
    if basename.is_empty() || basename == after_scheme {
        return None;
    }
    urlencoding::decode(basename)
        .map(|decoded| decoded.into_owned())
        .ok()
}
