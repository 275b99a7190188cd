//! Media reference extraction and response segmentation.

use super::patterns::{self, MediaKind};
use std::collections::HashSet;
use std::ops::Range;

/// Sentinel stored in a response's slot after its content has been
/// delivered as segments, so the original text is not sent again.
pub const DELIVERED_SENTINEL: &str = " ";

/// A classified media reference found inside a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaMatch {
    /// Byte span of the raw match within the scanned text.
    pub span: Range<usize>,
    /// The matched substring, verbatim.
    pub raw_text: String,
    /// Normalized reference: protocol-relative matches get an explicit
    /// `https:` scheme.
    pub corrected_path: String,
    pub kind: MediaKind,
}

/// One piece of a segmented response, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseSegment {
    /// Surrounding text, verbatim. Senders trim before delivery and skip
    /// whitespace-only chunks.
    Text(String),
    Media(MediaMatch),
}

/// Result of scanning a response for media references.
///
/// `Segmented` replaces the original response entirely: the caller sends
/// each segment in order and clears the response's storage slot to
/// [`DELIVERED_SENTINEL`]. `Passthrough` means the response is ordinary
/// text and is delivered unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Passthrough,
    Segmented(Vec<ResponseSegment>),
}

/// Find all media references in `text`, ordered by start offset.
///
/// Deterministic and idempotent: identical input yields identical output.
pub fn extract(text: &str) -> Vec<MediaMatch> {
    let mut raw: Vec<Range<usize>> = Vec::new();
    for regex in [
        &*patterns::URL_REGEX,
        &*patterns::PATH_REGEX,
        &*patterns::BARE_FILE_REGEX,
    ] {
        for m in regex.find_iter(text) {
            raw.push(m.range());
        }
    }

    // Overlap de-dup: the URL and path grammars routinely claim the same
    // token (a protocol-relative URL is also an absolute path). Longest
    // match wins; ties go to the earliest start.
    raw.sort_by_key(|r| (r.start, usize::MAX - r.len()));
    raw.dedup();
    let kept: Vec<Range<usize>> = raw
        .iter()
        .filter(|candidate| {
            !raw.iter().any(|other| {
                *candidate != other && overlaps(candidate, other) && wins(other, candidate)
            })
        })
        .cloned()
        .collect();

    let mut seen_corrected: HashSet<String> = HashSet::new();
    let mut matches: Vec<MediaMatch> = Vec::new();
    for span in kept {
        let raw_text = &text[span.clone()];
        let corrected_path = patterns::correct_path(raw_text);

        let kind = patterns::classify(&corrected_path);
        if kind == MediaKind::None {
            continue;
        }
        // Distinct raw spans can normalize to the same corrected path;
        // the earliest occurrence wins.
        if !seen_corrected.insert(corrected_path.clone()) {
            continue;
        }

        matches.push(MediaMatch {
            span,
            raw_text: raw_text.to_string(),
            corrected_path,
            kind,
        });
    }

    matches.sort_by_key(|m| m.span.start);
    matches
}

/// Scan a response and split it into an ordered sequence of text and
/// media segments. Returns [`Outcome::Passthrough`] when no media
/// reference survives classification.
pub fn segment_response(text: &str) -> Outcome {
    let matches = extract(text);
    if matches.is_empty() {
        return Outcome::Passthrough;
    }

    let mut segments = Vec::with_capacity(matches.len() * 2 + 1);
    let mut cursor = 0;
    for m in matches {
        let before = &text[cursor..m.span.start];
        if !before.is_empty() {
            segments.push(ResponseSegment::Text(before.to_string()));
        }
        cursor = m.span.end;
        segments.push(ResponseSegment::Media(m));
    }
    let trailing = &text[cursor..];
    if !trailing.is_empty() {
        segments.push(ResponseSegment::Text(trailing.to_string()));
    }

    Outcome::Segmented(segments)
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

/// True when `a` beats `b` in the overlap de-dup: longer wins, then the
/// earlier start.
fn wins(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.len() > b.len() || (a.len() == b.len() && a.start < b.start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn finds_matches_in_left_to_right_order() {
        let text = indoc! {"
            Here is the chart: https://charts.example/today.png
            and the raw export //files.example/export.pdf for reference.
        "};
        let matches = extract(text);

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].kind, MediaKind::Image);
        assert_eq!(matches[0].corrected_path, "https://charts.example/today.png");
        assert_eq!(matches[1].kind, MediaKind::Document);
        assert_eq!(matches[1].corrected_path, "https://files.example/export.pdf");
        assert!(matches[0].span.start < matches[1].span.start);
    }

    #[test]
    fn non_media_references_are_dropped() {
        let matches = extract("read https://example.com/post.html and https://example.com/");
        assert!(matches.is_empty());
        assert_eq!(
            segment_response("read https://example.com/post.html"),
            Outcome::Passthrough
        );
    }

    #[test]
    fn dedups_protocol_relative_and_explicit_forms() {
        let text = "first //host/a.png then https://host/a.png again";
        let matches = extract(text);

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].corrected_path, "https://host/a.png");
        // The earlier occurrence is the protocol-relative one.
        assert_eq!(matches[0].raw_text, "//host/a.png");
        assert_eq!(matches[0].span.start, "first ".len());
    }

    #[test]
    fn extraction_is_idempotent() {
        let text = "pics at https://h/a.jpg and //h/b.gif, done";
        assert_eq!(extract(text), extract(text));
    }

    #[test]
    fn segments_reconcatenate_to_surrounding_text() {
        let text = "intro https://h/a.jpg middle https://h/b.png outro";
        let Outcome::Segmented(segments) = segment_response(text) else {
            panic!("expected segmentation");
        };

        let mut rebuilt = String::new();
        let mut media_seen = 0;
        for segment in &segments {
            match segment {
                ResponseSegment::Text(chunk) => rebuilt.push_str(chunk),
                ResponseSegment::Media(_) => media_seen += 1,
            }
        }
        assert_eq!(media_seen, 2);
        assert_eq!(rebuilt, "intro  middle  outro");
    }

    #[test]
    fn adjacent_references_produce_no_empty_text_segments() {
        let Outcome::Segmented(segments) = segment_response("https://h/a.jpg https://h/b.png")
        else {
            panic!("expected segmentation");
        };

        assert_eq!(segments.len(), 3);
        assert!(matches!(segments[0], ResponseSegment::Media(_)));
        assert_eq!(segments[1], ResponseSegment::Text(" ".to_string()));
        assert!(matches!(segments[2], ResponseSegment::Media(_)));
    }

    #[test]
    fn existing_bare_filename_matches_as_image() {
        let dir = tempfile::tempdir().unwrap();
        let previous = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        std::fs::write("pic.jpg", b"fake").unwrap();

        let matches = extract("see pic.jpg now");
        std::env::set_current_dir(previous).unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].kind, MediaKind::Image);
        assert_eq!(matches[0].corrected_path, "pic.jpg");
    }

    #[test]
    fn missing_bare_filename_stays_plain_text() {
        assert_eq!(
            segment_response("see definitely-absent-file.jpg now"),
            Outcome::Passthrough
        );
    }
}
