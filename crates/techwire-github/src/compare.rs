//! Plain-text compare blocks for PRs and release ranges.
//!
//! Output is stable and fabricates nothing: missing numbers render as
//! zero, missing URLs are omitted. File lists are filtered per section
//! with a fall-back to the unfiltered list so a filter can never hide
//! every file.

use regex::RegexBuilder;
use tracing::warn;

use crate::api::{CompareInfo, PrFile, PrMeta};

/// Most files listed in one block.
const FILE_LIST_LIMIT: usize = 20;

/// Compile section filters case-insensitively; invalid patterns are
/// dropped with a warning instead of failing the run.
#[must_use]
pub fn compile_filters(patterns: &[String]) -> Vec<regex::Regex> {
    patterns
        .iter()
        .filter_map(|p| match RegexBuilder::new(p).case_insensitive(true).build() {
            Ok(re) => Some(re),
            Err(e) => {
                warn!(pattern = p.as_str(), error = %e, "invalid compare file filter, skipping");
                None
            }
        })
        .collect()
}

/// Keep files matching at least one filter; fall back to the whole list
/// when the filters match nothing.
#[must_use]
pub fn filter_files<'a>(files: &'a [PrFile], filters: &[regex::Regex]) -> Vec<&'a PrFile> {
    if filters.is_empty() {
        return files.iter().collect();
    }
    let kept: Vec<&PrFile> = files
        .iter()
        .filter(|f| filters.iter().any(|re| re.is_match(&f.filename)))
        .collect();
    if kept.is_empty() {
        files.iter().collect()
    } else {
        kept
    }
}

/// One PR rendered as a compare block.
#[must_use]
pub fn format_pr_block(
    pr: &PrMeta,
    files: &[PrFile],
    section: &str,
    filters: &[regex::Regex],
) -> String {
    let mut out = format!("PR #{}: {}\n", pr.number, pr.title);
    out.push_str(&format!(
        "State: {} | Base: {} | Head: {}\n",
        pr.state, pr.base.name, pr.head.name
    ));
    out.push_str(&format!(
        "Stats: files={}, commits={}, +{}/-{}\n",
        pr.changed_files.unwrap_or(0),
        pr.commits.unwrap_or(0),
        pr.additions.unwrap_or(0),
        pr.deletions.unwrap_or(0)
    ));
    if let Some(url) = &pr.html_url {
        out.push_str(&format!("Compare: {url}\n"));
    }
    out.push_str(&format_file_list(files, section, filters));
    out
}

/// A release range rendered from the compare endpoint.
#[must_use]
pub fn format_compare_summary(
    prev_tag: &str,
    current_tag: &str,
    compare: &CompareInfo,
    section: &str,
    filters: &[regex::Regex],
) -> String {
    let mut out = format!("Compare: {prev_tag}...{current_tag}\n");
    out.push_str(&format!("Commits: {}\n", compare.total_commits));
    if let Some(url) = &compare.html_url {
        out.push_str(&format!("{url}\n"));
    }
    if let Some(files) = &compare.files {
        out.push_str(&format_file_list(files, section, filters));
    }
    out
}

fn format_file_list(files: &[PrFile], section: &str, filters: &[regex::Regex]) -> String {
    let kept = filter_files(files, filters);
    if kept.is_empty() {
        return String::new();
    }
    let mut out = format!("Files ({section}):\n");
    for file in kept.iter().take(FILE_LIST_LIMIT) {
        out.push_str(&format!(
            "- {} (+{}/-{})\n",
            file.filename, file.additions, file.deletions
        ));
    }
    if kept.len() > FILE_LIST_LIMIT {
        out.push_str(&format!("... and {} more files\n", kept.len() - FILE_LIST_LIMIT));
    }
    out
}
