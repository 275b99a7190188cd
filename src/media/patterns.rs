//! URL/path grammars and extension-based media classification.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

/// Media kind derived from a candidate's file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Document,
    /// Not a recognized media reference.
    None,
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi"];
const AUDIO_EXTENSIONS: &[&str] = &["wav"];
const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "txt"];

/// Characters that terminate a candidate: whitespace plus closing
/// brackets/quotes, so `(see https://x/a.png)` stops at the paren.
const TERMINATORS: &str = r#"[^\s<>"'`\)\]\}]"#;

/// URL grammar: `scheme://...` or protocol-relative `//...`.
pub(crate) static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?:[A-Za-z][A-Za-z0-9+.\-]*:)?//{TERMINATORS}+"
    ))
    .expect("hardcoded url regex")
});

/// Filesystem-path grammar: POSIX absolute or Windows drive-letter paths.
pub(crate) static PATH_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?:[A-Za-z]:[\\/]|/){TERMINATORS}+")).expect("hardcoded path regex")
});

/// Bare relative filenames carrying a known media extension
/// (`pic.jpg` in running text). Existence-gated like any local path.
pub(crate) static BARE_FILE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)[A-Za-z0-9_\-.]+\.(?:jpe?g|png|gif|mp4|mov|avi|wav|pdf|docx|doc|txt)\b",
    )
    .expect("hardcoded bare filename regex")
});

/// Normalize a matched substring into a corrected path: protocol-relative
/// matches get an explicit secure scheme, everything else passes through.
pub fn correct_path(raw: &str) -> String {
    if raw.starts_with("//") {
        format!("https:{raw}")
    } else {
        raw.to_string()
    }
}

/// True when a corrected path refers to the local filesystem.
pub fn is_local(corrected: &str) -> bool {
    !corrected.contains("://")
}

/// Classify a corrected path's media kind.
///
/// Local paths must exist on disk to classify as media; a nonexistent
/// local path is always `None`. URLs classify by extension alone.
pub fn classify(corrected: &str) -> MediaKind {
    if is_local(corrected) && !Path::new(corrected).exists() {
        return MediaKind::None;
    }

    kind_for_extension(extension_of(corrected))
}

/// Extract the lowercase extension from a corrected path, ignoring any
/// URL query string or fragment.
fn extension_of(corrected: &str) -> Option<String> {
    let without_suffix = corrected
        .split(['?', '#'])
        .next()
        .unwrap_or(corrected);
    let last_segment = without_suffix
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(without_suffix);

    let (stem, extension) = last_segment.rsplit_once('.')?;
    if stem.is_empty() || extension.is_empty() {
        return None;
    }
    Some(extension.to_ascii_lowercase())
}

fn kind_for_extension(extension: Option<String>) -> MediaKind {
    let Some(extension) = extension else {
        return MediaKind::None;
    };
    let extension = extension.as_str();

    if IMAGE_EXTENSIONS.contains(&extension) {
        MediaKind::Image
    } else if VIDEO_EXTENSIONS.contains(&extension) {
        MediaKind::Video
    } else if AUDIO_EXTENSIONS.contains(&extension) {
        MediaKind::Audio
    } else if DOCUMENT_EXTENSIONS.contains(&extension) {
        MediaKind::Document
    } else {
        MediaKind::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_urls_by_extension_alone() {
        assert_eq!(classify("https://host/a.png"), MediaKind::Image);
        assert_eq!(classify("https://host/clip.mp4?token=x"), MediaKind::Video);
        assert_eq!(classify("https://host/voice.wav"), MediaKind::Audio);
        assert_eq!(classify("https://host/doc.pdf#page=2"), MediaKind::Document);
        assert_eq!(classify("https://host/page.html"), MediaKind::None);
        assert_eq!(classify("https://host/"), MediaKind::None);
    }

    #[test]
    fn nonexistent_local_path_is_never_media() {
        assert_eq!(classify("/definitely/not/here/a.jpg"), MediaKind::None);
    }

    #[test]
    fn existing_local_path_classifies_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.png");
        std::fs::write(&path, b"fake").unwrap();

        assert_eq!(classify(path.to_str().unwrap()), MediaKind::Image);
    }

    #[test]
    fn corrects_protocol_relative_urls() {
        assert_eq!(correct_path("//host/a.png"), "https://host/a.png");
        assert_eq!(correct_path("https://host/a.png"), "https://host/a.png");
        assert_eq!(correct_path("/tmp/a.png"), "/tmp/a.png");
    }

    #[test]
    fn url_grammar_stops_at_terminators() {
        let m = URL_REGEX.find("(see https://host/a.png) now").unwrap();
        assert_eq!(m.as_str(), "https://host/a.png");

        let m = URL_REGEX.find("quoted \"https://host/b.gif\" here").unwrap();
        assert_eq!(m.as_str(), "https://host/b.gif");
    }

    #[test]
    fn path_grammar_matches_posix_and_windows() {
        let m = PATH_REGEX.find("open /tmp/pics/a.jpg please").unwrap();
        assert_eq!(m.as_str(), "/tmp/pics/a.jpg");

        let m = PATH_REGEX.find(r"open C:\pics\a.jpg please").unwrap();
        assert_eq!(m.as_str(), r"C:\pics\a.jpg");
    }
}
