//! Issue/PR collection: recently-updated items per repo, retained when
//! notable by engagement or labels, enriched with the full discussion and
//! a PR-context block.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::warn;

use techwire::concurrent::map_bounded;
use techwire::constants::{ENGAGEMENT_THRESHOLD, ITEM_BODY_MAX_CHARS};
use techwire::text::{collapse_whitespace, truncate_chars};
use techwire::{Collector, Item, RepoRef, Result, SourceKind};

use crate::api::IssueMeta;
use crate::client::GithubError;
use crate::context::ReferenceResolver;

pub const SOURCE_LABEL: &str = "GitHub Issues";

/// Issues listed per repo when no token is configured.
const UNAUTH_ISSUE_PAGE: usize = 30;

/// Label fragments that make an item notable regardless of engagement.
pub const NOTABLE_LABEL_KEYWORDS: [&str; 7] = [
    "security",
    "breaking-change",
    "bug",
    "critical",
    "important",
    "release",
    "announcement",
];

/// Characters kept per rendered comment line.
const COMMENT_LINE_MAX_CHARS: usize = 400;

pub struct IssueCollector {
    resolver: Arc<ReferenceResolver>,
    repos: Vec<RepoRef>,
    cutoff: DateTime<Utc>,
    section: String,
    filters: Vec<regex::Regex>,
    max_repo_threads: usize,
}

impl IssueCollector {
    #[must_use]
    pub fn new(
        resolver: Arc<ReferenceResolver>,
        repos: Vec<RepoRef>,
        cutoff: DateTime<Utc>,
        section: impl Into<String>,
        filters: Vec<regex::Regex>,
        max_repo_threads: usize,
    ) -> Self {
        Self {
            resolver,
            repos,
            cutoff,
            section: section.into(),
            filters,
            max_repo_threads,
        }
    }

    async fn collect_repo(&self, repo: RepoRef) -> Result<Vec<Item>> {
        let rows = self.recent_issues(&repo).await?;
        let mut items = Vec::new();
        for row in rows {
            let meta: IssueMeta = match serde_json::from_value(row) {
                Ok(meta) => meta,
                Err(e) => {
                    warn!(repo = %repo.full_name(), error = %e, "unparseable issue row skipped");
                    continue;
                }
            };
            if meta.updated_at < self.cutoff || !is_notable(&meta) {
                continue;
            }
            match build_issue_item(
                &self.resolver,
                &repo.owner,
                &repo.name,
                meta,
                &self.section,
                &self.filters,
            )
            .await
            {
                Ok(item) => items.push(item),
                Err(e) => {
                    warn!(repo = %repo.full_name(), error = %e, "issue enrichment failed, item skipped");
                }
            }
        }
        Ok(items)
    }

    async fn recent_issues(&self, repo: &RepoRef) -> Result<Vec<Value>> {
        let client = self.resolver.client();
        let path = format!("/repos/{}/issues", repo.full_name());
        let query: Vec<(&str, String)> = vec![
            ("since", self.cutoff.to_rfc3339()),
            ("state", "all".to_string()),
            ("sort", "updated".to_string()),
            ("direction", "desc".to_string()),
        ];
        let rows: Option<Vec<Value>> = self
            .resolver
            .cache()
            .fetch("issues_list", &repo.full_name(), || async {
                let fetched = if client.token_present() {
                    client.get_paginated(&path, &query).await
                } else {
                    client.get_capped(&path, &query, UNAUTH_ISSUE_PAGE).await
                };
                match fetched {
                    Ok(rows) => Ok(Some(rows)),
                    Err(GithubError::NotFound { .. }) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await?;
        Ok(rows.unwrap_or_default())
    }
}

#[async_trait]
impl Collector for IssueCollector {
    fn name(&self) -> &str {
        "github-issues"
    }

    async fn collect(&self) -> Result<Vec<Item>> {
        let per_repo = map_bounded(self.repos.clone(), self.max_repo_threads, |repo| {
            self.collect_repo(repo)
        })
        .await;

        let mut items = Vec::new();
        for (repo, outcome) in self.repos.iter().zip(per_repo) {
            match outcome {
                Ok(mut repo_items) => items.append(&mut repo_items),
                Err(e) => warn!(
                    repo = %repo.full_name(),
                    error = %e,
                    "issue collection failed for repo"
                ),
            }
        }
        Ok(items)
    }
}

/// Notable when the engagement score clears the threshold or a label name
/// contains one of the watched fragments.
#[must_use]
pub fn is_notable(meta: &IssueMeta) -> bool {
    if meta.engagement() >= ENGAGEMENT_THRESHOLD {
        return true;
    }
    meta.labels.iter().any(|label| {
        let name = label.name.to_ascii_lowercase();
        NOTABLE_LABEL_KEYWORDS.iter().any(|k| name.contains(k))
    })
}

/// Build the enriched item for one issue/PR. Shared with the feed
/// enrichment path, which lands on the same body shape.
pub async fn build_issue_item(
    resolver: &ReferenceResolver,
    owner: &str,
    repo: &str,
    meta: IssueMeta,
    section: &str,
    filters: &[regex::Regex],
) -> Result<Item> {
    let body = build_issue_body(resolver, owner, repo, &meta, section, filters).await?;
    let marker = if meta.is_pull_request() { "PR" } else { "Issue" };
    Ok(Item {
        title: format!("[{marker}] {}", meta.title),
        url: meta.html_url.clone(),
        published_at: meta.updated_at,
        body,
        source_label: SOURCE_LABEL.to_string(),
        kind: SourceKind::Issue,
    })
}

/// Header line, description, full comment sequence, and the PR-context
/// block, truncated to the item body cap.
pub async fn build_issue_body(
    resolver: &ReferenceResolver,
    owner: &str,
    repo: &str,
    meta: &IssueMeta,
    section: &str,
    filters: &[regex::Regex],
) -> Result<String> {
    let comments = resolver.issue_comments(owner, repo, meta.number).await?;

    let reactions = meta.engagement().saturating_sub(meta.comments);
    let mut parts = vec![format!(
        "State: {} | Comments: {} | Reactions: {} | Updated: {}",
        meta.state,
        meta.comments,
        reactions,
        meta.updated_at.format("%Y-%m-%d")
    )];

    parts.push(format!(
        "Description:\n{}",
        meta.body.as_deref().map(str::trim).filter(|b| !b.is_empty()).unwrap_or("(no description)")
    ));

    if !comments.is_empty() {
        let mut section_text = format!("Comments ({}):", comments.len());
        for comment in &comments {
            let text = comment.body.as_deref().unwrap_or_default();
            if text.trim().is_empty() {
                continue;
            }
            let stamp = comment
                .created_at
                .map(|t| format!(" ({})", t.format("%Y-%m-%d")))
                .unwrap_or_default();
            section_text.push_str(&format!(
                "\n- {}{stamp}: {}",
                comment.author(),
                truncate_chars(&collapse_whitespace(text), COMMENT_LINE_MAX_CHARS)
            ));
        }
        parts.push(section_text);
    }

    let mut ref_text = meta.body.clone().unwrap_or_default();
    for comment in &comments {
        if let Some(text) = &comment.body {
            ref_text.push('\n');
            ref_text.push_str(text);
        }
    }
    let context = resolver
        .build_item_context(
            owner,
            repo,
            meta.number,
            meta.is_pull_request(),
            &ref_text,
            section,
            filters,
        )
        .await?;
    if !context.is_empty() {
        parts.push(context);
    }

    Ok(truncate_chars(&parts.join("\n\n"), ITEM_BODY_MAX_CHARS))
}
