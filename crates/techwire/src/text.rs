//! Small text helpers shared by the collectors.

/// Truncate to at most `max_chars` characters, appending an ellipsis when
/// anything was cut. Counts characters, not bytes, so multibyte text is
/// never split mid-character.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// Collapse every run of whitespace (including newlines) into a single
/// space and trim the ends.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
