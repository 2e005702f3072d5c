//! Changelog-file excerpt extraction for release bodies.
//!
//! Finds the heading for a released tag (ATX or setext, with or without
//! the leading `v`) and captures everything up to the next version-shaped
//! heading.

use std::sync::LazyLock;

use regex::Regex;

#[allow(clippy::unwrap_used)] // static pattern
static ATX_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#{1,6}\s").unwrap()
});

#[allow(clippy::unwrap_used)] // static pattern
static SETEXT_UNDERLINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:=+|-+)\s*$").unwrap()
});

#[allow(clippy::unwrap_used)] // static pattern
static VERSION_SHAPED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+\.\d+").unwrap()
});

/// Locate the section for `tag` in a changelog document. Returns the
/// section body (heading excluded) or `None` when no heading matches.
/// The caller applies the excerpt character cap.
#[must_use]
pub fn extract_release_notes(content: &str, tag: &str) -> Option<String> {
    let bare = tag.trim().trim_start_matches(['v', 'V']);
    let mut candidates: Vec<String> = Vec::new();
    for cand in [tag.trim().to_string(), bare.to_string(), format!("v{bare}")] {
        if !cand.is_empty() && !candidates.contains(&cand) {
            candidates.push(cand);
        }
    }

    let lines: Vec<&str> = content.lines().collect();
    let start = (0..lines.len()).find(|&i| {
        is_heading(&lines, i) && candidates.iter().any(|c| contains_version_token(lines[i], c))
    })?;

    // Skip the heading itself, and a setext underline when present.
    let mut body_start = start + 1;
    if body_start < lines.len()
        && !ATX_HEADING.is_match(lines[start])
        && SETEXT_UNDERLINE.is_match(lines[body_start])
    {
        body_start += 1;
    }

    let end = (body_start..lines.len())
        .find(|&i| is_heading(&lines, i) && VERSION_SHAPED.is_match(lines[i]))
        .unwrap_or(lines.len());

    let section = lines[body_start..end].join("\n").trim().to_string();
    if section.is_empty() {
        None
    } else {
        Some(section)
    }
}

fn is_heading(lines: &[&str], i: usize) -> bool {
    if ATX_HEADING.is_match(lines[i]) {
        return true;
    }
    // Setext: a non-empty, non-underline line followed by === or ---.
    !lines[i].trim().is_empty()
        && !SETEXT_UNDERLINE.is_match(lines[i])
        && lines
            .get(i + 1)
            .is_some_and(|next| SETEXT_UNDERLINE.is_match(next))
}

/// `line` contains `candidate` bounded by non-version characters, so
/// looking for `1.2.0` does not match inside `1.2.0-rc.1` or `11.2.0`.
fn contains_version_token(line: &str, candidate: &str) -> bool {
    let mut search_from = 0;
    while let Some(offset) = line[search_from..].find(candidate) {
        let start = search_from + offset;
        let end = start + candidate.len();
        let before_ok = line[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric() && c != '.');
        let after_ok = line[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric() && c != '.' && c != '-');
        if before_ok && after_ok {
            return true;
        }
        search_from = end;
    }
    false
}
