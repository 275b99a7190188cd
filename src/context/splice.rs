//! Splices quoted-message parts into a conversation's message list.

use super::parts::ContentPart;
use super::{ChatRole, ContextEntry, ConversationContext, EntryContent};

/// Result of a splice: the rebuilt context, and whether the quoted entry
/// (and so the caller's prompt) was actually absorbed. When false, the
/// context is unchanged and the caller delivers its prompt normally.
#[derive(Debug, Clone, PartialEq)]
pub struct SpliceResult {
    pub context: ConversationContext,
    pub prompt_consumed: bool,
}

/// Merge quoted-message parts into `context` as a trailing `user` entry.
///
/// Ordering invariants: a leading `system` entry never moves from index
/// 0; history order is preserved; the quoted entry lands after history;
/// the caller's prompt, when non-empty and not already the last entry,
/// follows it.
pub fn splice(
    mut context: ConversationContext,
    parts: Vec<ContentPart>,
    sender_name: &str,
    original_sender_name: &str,
    prompt: &str,
    multimodal_enabled: bool,
) -> SpliceResult {
    let system = match context.first() {
        Some(entry) if entry.role == ChatRole::System => Some(context.remove(0)),
        _ => None,
    };

    let multimodal = multimodal_enabled
        && parts
            .iter()
            .any(|part| matches!(part, ContentPart::ImageInline { .. }));

    let prefix = format!("user {sender_name} quoted {original_sender_name}'s message:\n\"\"\"\n");
    let suffix = "\n\"\"\"";

    let quoted = if multimodal {
        let merged = merge_text_runs(parts);
        if merged.is_empty() {
            None
        } else {
            let mut content = Vec::with_capacity(merged.len() + 2);
            content.push(ContentPart::Text { text: prefix });
            content.extend(merged);
            content.push(ContentPart::Text {
                text: suffix.to_string(),
            });
            Some(ContextEntry::parts(ChatRole::User, content))
        }
    } else {
        let flattened = flatten_parts(&parts);
        if flattened.is_empty() {
            None
        } else {
            Some(ContextEntry::text(
                ChatRole::User,
                format!("{prefix}{flattened}{suffix}"),
            ))
        }
    };

    let Some(entry) = quoted else {
        // Nothing usable: restore the system entry and leave the caller's
        // prompt alone.
        if let Some(system) = system {
            context.insert(0, system);
        }
        return SpliceResult {
            context,
            prompt_consumed: false,
        };
    };

    let mut rebuilt = Vec::with_capacity(context.len() + 3);
    if let Some(system) = system {
        rebuilt.push(system);
    }
    rebuilt.append(&mut context);

    // The transport may already have logged the prompt as the newest
    // history entry; appending it again would double-send it.
    let prompt = prompt.trim();
    let prompt_already_last = !prompt.is_empty() && last_entry_is_text(&rebuilt, prompt);

    rebuilt.push(entry);
    if !prompt.is_empty() && !prompt_already_last {
        rebuilt.push(ContextEntry::text(ChatRole::User, prompt));
    }

    SpliceResult {
        context: rebuilt,
        prompt_consumed: true,
    }
}

/// Collapse runs of consecutive textual parts into single `Text` parts,
/// so a word-per-part quoted message does not balloon the request.
fn merge_text_runs(parts: Vec<ContentPart>) -> Vec<ContentPart> {
    let mut merged: Vec<ContentPart> = Vec::with_capacity(parts.len());
    let mut pending = String::new();

    for part in parts {
        match part {
            ContentPart::Text { text } | ContentPart::Placeholder { text } => {
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                if !pending.is_empty() {
                    pending.push(' ');
                }
                pending.push_str(text);
            }
            other => {
                if !pending.is_empty() {
                    merged.push(ContentPart::Text {
                        text: std::mem::take(&mut pending),
                    });
                }
                merged.push(other);
            }
        }
    }
    if !pending.is_empty() {
        merged.push(ContentPart::Text { text: pending });
    }

    merged
}

/// Render every part as plain text, joined by single spaces.
fn flatten_parts(parts: &[ContentPart]) -> String {
    let rendered: Vec<String> = parts
        .iter()
        .filter_map(|part| {
            let text = match part {
                ContentPart::Text { text } | ContentPart::Placeholder { text } => {
                    text.trim().to_string()
                }
                ContentPart::ImageInline { url, .. } | ContentPart::ImageRef { url } => {
                    format!("[quoted image URL: {url}]")
                }
            };
            (!text.is_empty()).then_some(text)
        })
        .collect();

    rendered.join(" ")
}

fn last_entry_is_text(context: &ConversationContext, text: &str) -> bool {
    matches!(
        context.last(),
        Some(ContextEntry {
            content: EntryContent::Text(existing),
            ..
        }) if existing == text
    )
}
