//! Release collection: exactly one item per repo, the most recent release
//! within the cutoff ranked by semantic version, paired with its adjacent
//! lower candidate for the compare summary.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use techwire::concurrent::map_bounded;
use techwire::constants::{CHANGELOG_EXCERPT_MAX_CHARS, RELEASE_BODY_MAX_CHARS, TAG_LOOKUP_LIMIT};
use techwire::text::truncate_chars;
use techwire::{Collector, Error, Item, ReleaseStrategy, RepoRef, Result, SourceKind};

use crate::api::{CommitInfo, Release, Tag};
use crate::changelog::extract_release_notes;
use crate::client::GithubError;
use crate::context::ReferenceResolver;

pub const SOURCE_LABEL: &str = "GitHub Releases";

/// Releases fetched per repo, by token presence.
const RELEASES_WITH_TOKEN: usize = 30;
const RELEASES_WITHOUT_TOKEN: usize = 10;

/// One release or tag considered for selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseCandidate {
    pub tag: String,
    pub published_at: DateTime<Utc>,
    pub body: Option<String>,
    pub url: String,
}

/// Sort key: tags parse leniently (`v` prefix tolerated, two-part
/// versions padded); unparsable tags sort below every valid version.
#[must_use]
pub fn version_sort_key(tag: &str) -> Option<semver::Version> {
    let trimmed = tag.trim().trim_start_matches(['v', 'V']);
    semver::Version::parse(trimmed)
        .ok()
        .or_else(|| semver::Version::parse(&format!("{trimmed}.0")).ok())
}

/// Pick `(current, previous)`: `current` is the maximum by
/// `(version, published_at)` among candidates inside the cutoff window;
/// `previous` is the adjacent lower candidate in the full version order,
/// whether or not it falls inside the window.
#[must_use]
pub fn select_release_pair(
    mut candidates: Vec<ReleaseCandidate>,
    cutoff: DateTime<Utc>,
) -> Option<(ReleaseCandidate, Option<ReleaseCandidate>)> {
    candidates.sort_by(|a, b| {
        version_sort_key(&a.tag)
            .cmp(&version_sort_key(&b.tag))
            .then_with(|| a.published_at.cmp(&b.published_at))
    });
    let current_idx = candidates.iter().rposition(|c| c.published_at >= cutoff)?;
    let previous = current_idx
        .checked_sub(1)
        .map(|i| candidates[i].clone());
    Some((candidates[current_idx].clone(), previous))
}

pub struct ReleaseCollector {
    resolver: Arc<ReferenceResolver>,
    repos: Vec<RepoRef>,
    cutoff: DateTime<Utc>,
    section: String,
    filters: Vec<regex::Regex>,
    max_repo_threads: usize,
}

impl ReleaseCollector {
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

    async fn collect_repo(&self, repo: RepoRef) -> Result<Option<Item>> {
        let candidates = self.gather_candidates(&repo).await?;
        let Some((current, previous)) = select_release_pair(candidates, self.cutoff) else {
            return Ok(None);
        };

        let body = self
            .build_release_context(&repo, &current, previous.as_ref())
            .await?;
        Ok(Some(Item {
            title: format!("{} {} released", repo.display_name(), current.tag),
            url: current.url.clone(),
            published_at: current.published_at,
            body,
            source_label: SOURCE_LABEL.to_string(),
            kind: SourceKind::Release,
        }))
    }

    async fn gather_candidates(&self, repo: &RepoRef) -> Result<Vec<ReleaseCandidate>> {
        let mut candidates = Vec::new();
        if repo.release_strategy != ReleaseStrategy::TagsOnly {
            candidates = self.release_candidates(repo).await?;
        }
        if repo.release_strategy == ReleaseStrategy::TagsOnly
            || (repo.release_strategy == ReleaseStrategy::Auto && candidates.is_empty())
        {
            candidates = self.tag_candidates(repo).await?;
        }
        Ok(candidates)
    }

    async fn release_candidates(&self, repo: &RepoRef) -> Result<Vec<ReleaseCandidate>> {
        let client = self.resolver.client();
        let path = format!("/repos/{}/releases", repo.full_name());
        let per_page = if client.token_present() {
            RELEASES_WITH_TOKEN
        } else {
            RELEASES_WITHOUT_TOKEN
        };
        let rows: Option<Vec<Value>> = self
            .resolver
            .cache()
            .fetch("releases", &repo.full_name(), || async {
                match client.get_capped(&path, &[], per_page).await {
                    Ok(rows) => Ok(Some(rows)),
                    Err(GithubError::NotFound { .. }) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await?;

        Ok(rows
            .unwrap_or_default()
            .into_iter()
            .filter_map(|row| serde_json::from_value::<Release>(row).ok())
            .filter(|release| !release.draft)
            .filter_map(|release| {
                release.published_at.map(|published_at| ReleaseCandidate {
                    tag: release.tag_name,
                    published_at,
                    body: release.body,
                    url: release.html_url,
                })
            })
            .collect())
    }

    /// Tags capped at twenty, each dated through the cached commit
    /// endpoint. Tag entries link to the tree view.
    async fn tag_candidates(&self, repo: &RepoRef) -> Result<Vec<ReleaseCandidate>> {
        let client = self.resolver.client();
        let path = format!("/repos/{}/tags", repo.full_name());
        let rows: Option<Vec<Value>> = self
            .resolver
            .cache()
            .fetch("tags", &repo.full_name(), || async {
                match client.get_capped(&path, &[], TAG_LOOKUP_LIMIT).await {
                    Ok(rows) => Ok(Some(rows)),
                    Err(GithubError::NotFound { .. }) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await?;

        let tags: Vec<Tag> = rows
            .unwrap_or_default()
            .into_iter()
            .filter_map(|row| serde_json::from_value(row).ok())
            .collect();

        let mut candidates = Vec::with_capacity(tags.len());
        for tag in tags {
            let Some(date) = self.commit_date(repo, &tag.commit.sha).await? else {
                continue;
            };
            candidates.push(ReleaseCandidate {
                url: format!(
                    "{}/{}/tree/{}",
                    client.web_base(),
                    repo.full_name(),
                    tag.name
                ),
                tag: tag.name,
                published_at: date,
                body: None,
            });
        }
        Ok(candidates)
    }

    async fn commit_date(&self, repo: &RepoRef, sha: &str) -> Result<Option<DateTime<Utc>>> {
        let client = self.resolver.client();
        let path = format!("/repos/{}/commits/{sha}", repo.full_name());
        let info: Option<CommitInfo> = self
            .resolver
            .cache()
            .fetch("commit_date", &format!("{}@{sha}", repo.full_name()), || async {
                match client.get_json(&path, &[]).await {
                    Ok(value) => serde_json::from_value(value)
                        .map(Some)
                        .map_err(|e| Error::parse(format!("{path}: {e}"))),
                    Err(GithubError::NotFound { .. }) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await?;
        Ok(info.and_then(|i| i.commit_date()))
    }

    /// `build_release_context`: release body, compare summary, deep-crawl
    /// reference blocks, and an optional changelog excerpt, capped at the
    /// release body limit.
    async fn build_release_context(
        &self,
        repo: &RepoRef,
        current: &ReleaseCandidate,
        previous: Option<&ReleaseCandidate>,
    ) -> Result<String> {
        let mut parts: Vec<String> = Vec::new();
        if let Some(body) = &current.body {
            if !body.trim().is_empty() {
                parts.push(body.trim().to_string());
            }
        }

        if let Some(previous) = previous {
            if let Some(summary) = self
                .resolver
                .fetch_compare_summary(
                    &repo.owner,
                    &repo.name,
                    &previous.tag,
                    &current.tag,
                    &self.section,
                    &self.filters,
                )
                .await?
            {
                parts.push(summary);
            }
        }

        let ref_text = parts.join("\n");
        let linked = self
            .resolver
            .linked_reference_blocks(&repo.owner, &repo.name, &ref_text, &self.section, &self.filters)
            .await?;
        if !linked.is_empty() {
            parts.push(linked);
        }

        if let Some(excerpt) = self.changelog_excerpt(repo, &current.tag).await? {
            parts.push(excerpt);
        }

        Ok(truncate_chars(&parts.join("\n\n"), RELEASE_BODY_MAX_CHARS))
    }

    async fn changelog_excerpt(&self, repo: &RepoRef, tag: &str) -> Result<Option<String>> {
        for path in repo.changelog_candidates() {
            let Some(content) = self
                .resolver
                .file_content(&repo.owner, &repo.name, &path)
                .await?
            else {
                continue;
            };
            if let Some(section) = extract_release_notes(&content, tag) {
                return Ok(Some(format!(
                    "Changelog excerpt ({path}):\n{}",
                    truncate_chars(&section, CHANGELOG_EXCERPT_MAX_CHARS)
                )));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl Collector for ReleaseCollector {
    fn name(&self) -> &str {
        "github-releases"
    }

    async fn collect(&self) -> Result<Vec<Item>> {
        let per_repo = map_bounded(self.repos.clone(), self.max_repo_threads, |repo| {
            self.collect_repo(repo)
        })
        .await;

        let mut items = Vec::new();
        for (repo, outcome) in self.repos.iter().zip(per_repo) {
            match outcome {
                Ok(Some(item)) => items.push(item),
                Ok(None) => {}
                Err(e) => warn!(
                    repo = %repo.full_name(),
                    error = %e,
                    "release collection failed for repo"
                ),
            }
        }
        Ok(items)
    }
}
