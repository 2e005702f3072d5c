//! Redmine-style issue enrichment: `/issues/N.json?include=journals`.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use techwire::text::collapse_whitespace;

/// `https?://<host>/issues/N`, capturing the instance base and the id.
#[allow(clippy::unwrap_used)] // static pattern
static REDMINE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https?://[^/\s]+)/issues/(\d+)/?$").unwrap()
});

/// Split a Redmine-looking entry URL into `(instance_base, issue_id)`.
#[must_use]
pub fn match_issue_url(url: &str) -> Option<(String, u64)> {
    let caps = REDMINE_URL.captures(url)?;
    let base = caps.get(1)?.as_str().to_string();
    let id = caps.get(2)?.as_str().parse().ok()?;
    Some((base, id))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedmineEnvelope {
    pub issue: RedmineIssue,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedmineIssue {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub journals: Vec<RedmineJournal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedmineJournal {
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub user: Option<RedmineUser>,
    #[serde(default)]
    pub created_on: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedmineUser {
    pub name: String,
}

/// Description plus the non-empty journals with author and timestamp.
#[must_use]
pub fn format_issue(issue: &RedmineIssue) -> String {
    let mut parts = Vec::new();
    if let Some(description) = &issue.description {
        if !description.trim().is_empty() {
            parts.push(description.trim().to_string());
        }
    }

    let mut journal_lines = Vec::new();
    for journal in &issue.journals {
        let Some(notes) = journal.notes.as_deref() else {
            continue;
        };
        if notes.trim().is_empty() {
            continue;
        }
        let author = journal.user.as_ref().map_or("unknown", |u| u.name.as_str());
        let stamp = journal
            .created_on
            .as_deref()
            .map(|t| format!(" ({t})"))
            .unwrap_or_default();
        journal_lines.push(format!("- {author}{stamp}: {}", collapse_whitespace(notes)));
    }
    if !journal_lines.is_empty() {
        parts.push(format!("Journals:\n{}", journal_lines.join("\n")));
    }

    parts.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_issue_urls() {
        let (base, id) = match_issue_url("https://tracker.example.com/issues/4821").unwrap();
        assert_eq!(base, "https://tracker.example.com");
        assert_eq!(id, 4821);

        assert!(match_issue_url("https://tracker.example.com/issues/4821/edit").is_none());
        assert!(match_issue_url("https://example.com/blog/issues-we-had").is_none());
    }

    #[test]
    fn formats_description_and_nonempty_journals() {
        let issue = RedmineIssue {
            subject: Some("Crash on save".into()),
            description: Some("Saving a project crashes the app.".into()),
            journals: vec![
                RedmineJournal {
                    notes: Some("Reproduced on 5.1".into()),
                    user: Some(RedmineUser { name: "mika".into() }),
                    created_on: Some("2026-02-09T10:00:00Z".into()),
                },
                RedmineJournal {
                    notes: Some("".into()),
                    user: Some(RedmineUser { name: "bot".into() }),
                    created_on: None,
                },
                RedmineJournal {
                    notes: Some("Fix queued".into()),
                    user: None,
                    created_on: None,
                },
            ],
        };
        let body = format_issue(&issue);
        assert!(body.starts_with("Saving a project crashes the app."));
        assert!(body.contains("Journals:"));
        assert!(body.contains("- mika (2026-02-09T10:00:00Z): Reproduced on 5.1"));
        assert!(body.contains("- unknown: Fix queued"));
        assert!(!body.contains("bot"));
    }

    #[test]
    fn empty_issue_formats_to_empty_string() {
        assert_eq!(format_issue(&RedmineIssue::default()), "");
    }
}
