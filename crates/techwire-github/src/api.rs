//! Typed views over the API payloads the collectors consume.
//!
//! Deserialization is lenient: only the consumed fields are declared, and
//! nothing here fails on extra keys. Everything derives `Serialize` too so
//! values round-trip through the run cache.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub prerelease: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub commit: CommitRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRef {
    pub sha: String,
}

/// Commit detail endpoint; only the dates matter here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitInfo {
    pub commit: CommitDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitDetail {
    #[serde(default)]
    pub committer: Option<GitActor>,
    #[serde(default)]
    pub author: Option<GitActor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitActor {
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

impl CommitInfo {
    /// Committer date, falling back to author date.
    #[must_use]
    pub fn commit_date(&self) -> Option<DateTime<Utc>> {
        self.commit
            .committer
            .as_ref()
            .and_then(|a| a.date)
            .or_else(|| self.commit.author.as_ref().and_then(|a| a.date))
    }
}

/// An issue or pull request from the issues listing / meta endpoint. The
/// `pull_request` marker distinguishes the two.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueMeta {
    pub number: u64,
    pub title: String,
    pub state: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub comments: u64,
    pub updated_at: DateTime<Utc>,
    pub html_url: String,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub reactions: Option<Reactions>,
    #[serde(default)]
    pub pull_request: Option<PullRequestMarker>,
}

impl IssueMeta {
    #[must_use]
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    /// `comments + total reactions`, the notability score.
    #[must_use]
    pub fn engagement(&self) -> u64 {
        self.comments + self.reactions.as_ref().map_or(0, |r| r.total_count)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestMarker {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reactions {
    #[serde(default)]
    pub total_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Comment {
    #[must_use]
    pub fn author(&self) -> &str {
        self.user.as_ref().map_or("unknown", |u| u.login.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub login: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrMeta {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub base: BranchRef,
    pub head: BranchRef,
    #[serde(default)]
    pub changed_files: Option<u64>,
    #[serde(default)]
    pub commits: Option<u64>,
    #[serde(default)]
    pub additions: Option<u64>,
    #[serde(default)]
    pub deletions: Option<u64>,
    #[serde(default)]
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchRef {
    #[serde(rename = "ref")]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrFile {
    pub filename: String,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
}

/// Compare endpoint (`<prev>...<cur>`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareInfo {
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub total_commits: u64,
    #[serde(default)]
    pub files: Option<Vec<PrFile>>,
}

/// Repo text file contents; `content` is base64 with embedded newlines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileContent {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
}

impl FileContent {
    /// Decode the base64 payload into UTF-8 text. Returns `None` for
    /// non-base64 encodings or undecodable payloads.
    #[must_use]
    pub fn decoded(&self) -> Option<String> {
        let content = self.content.as_ref()?;
        if let Some(encoding) = &self.encoding {
            if encoding != "base64" {
                return None;
            }
        }
        let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = BASE64.decode(compact).ok()?;
        Some(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// A global advisory-database entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Advisory {
    pub ghsa_id: String,
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cvss: Option<Cvss>,
    #[serde(default)]
    pub vulnerabilities: Vec<AdvisoryVulnerability>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cvss {
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisoryVulnerability {
    #[serde(default)]
    pub package: Option<AdvisoryPackage>,
    #[serde(default)]
    pub vulnerable_version_range: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisoryPackage {
    #[serde(default)]
    pub ecosystem: Option<String>,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn issue_meta_distinguishes_pull_requests() {
        let issue: IssueMeta = serde_json::from_value(json!({
            "number": 7,
            "title": "broken",
            "state": "open",
            "comments": 2,
            "updated_at": "2026-02-10T08:00:00Z",
            "html_url": "https://github.com/o/r/issues/7",
            "reactions": {"total_count": 4}
        }))
        .unwrap();
        assert!(!issue.is_pull_request());
        assert_eq!(issue.engagement(), 6);

        let pr: IssueMeta = serde_json::from_value(json!({
            "number": 8,
            "title": "fix",
            "state": "closed",
            "updated_at": "2026-02-10T08:00:00Z",
            "html_url": "https://github.com/o/r/pull/8",
            "pull_request": {"url": "https://api.github.com/repos/o/r/pulls/8"}
        }))
        .unwrap();
        assert!(pr.is_pull_request());
        assert_eq!(pr.engagement(), 0);
    }

    #[test]
    fn file_content_decodes_wrapped_base64() {
        let file = FileContent {
            // "# Changelog\n" split across lines the way the API wraps it.
            content: Some("IyBDaGFuZ2Vsb2cK\n".to_string()),
            encoding: Some("base64".to_string()),
        };
        assert_eq!(file.decoded().as_deref(), Some("# Changelog\n"));
    }

    #[test]
    fn file_content_rejects_other_encodings() {
        let file = FileContent {
            content: Some("plain".to_string()),
            encoding: Some("utf-8".to_string()),
        };
        assert_eq!(file.decoded(), None);
    }

    #[test]
    fn commit_date_falls_back_to_author() {
        let info: CommitInfo = serde_json::from_value(json!({
            "commit": {"author": {"date": "2026-01-20T00:00:00Z"}}
        }))
        .unwrap();
        assert!(info.commit_date().is_some());
    }
}
