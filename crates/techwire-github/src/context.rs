//! Reference resolution: the one capability behind every "resolve a
//! reference, fetch meta, fetch compare, format" path.
//!
//! Collectors, enrichers, and the release deep-crawl all share one
//! resolver, so the fan-in of overlapping call paths lands on the same
//! cache entries. Missing resources are memoized as negatives; the caller
//! treats them as skipped.

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use techwire::constants::{
    LINKED_COMMENTS_WITHOUT_TOKEN, LINKED_COMMENTS_WITH_TOKEN, UNAUTH_REF_LIMIT,
};
use techwire::text::{collapse_whitespace, truncate_chars};
use techwire::{Error, Result, RunCache};

use crate::api::{Comment, CompareInfo, FileContent, IssueMeta, PrFile, PrMeta};
use crate::client::{GithubClient, GithubError};
use crate::compare::{format_compare_summary, format_pr_block};
use crate::refs::ReferenceExtractor;

/// Comment page size used when no token is configured.
const UNAUTH_COMMENT_PAGE: usize = 30;

/// Characters kept per comment when rendering linked-issue blocks.
const LINKED_COMMENT_MAX_CHARS: usize = 200;

pub struct ReferenceResolver {
    client: Arc<GithubClient>,
    cache: Arc<RunCache>,
    deep_pr_crawl: bool,
}

impl ReferenceResolver {
    #[must_use]
    pub fn new(client: Arc<GithubClient>, cache: Arc<RunCache>, deep_pr_crawl: bool) -> Self {
        Self {
            client,
            cache,
            deep_pr_crawl,
        }
    }

    #[must_use]
    pub fn client(&self) -> &Arc<GithubClient> {
        &self.client
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<RunCache> {
        &self.cache
    }

    #[must_use]
    pub fn deep_pr_crawl(&self) -> bool {
        self.deep_pr_crawl
    }

    /// Reference cap protecting the rate budget on token-less runs.
    #[must_use]
    pub fn ref_limit(&self) -> Option<usize> {
        if self.client.token_present() {
            None
        } else {
            Some(UNAUTH_REF_LIMIT)
        }
    }

    fn comment_cap(&self) -> usize {
        if self.client.token_present() {
            LINKED_COMMENTS_WITH_TOKEN
        } else {
            LINKED_COMMENTS_WITHOUT_TOKEN
        }
    }

    /// Issue (or PR) meta; 404 becomes a memoized negative.
    pub async fn issue_meta(&self, owner: &str, repo: &str, number: u64) -> Result<Option<IssueMeta>> {
        let path = format!("/repos/{owner}/{repo}/issues/{number}");
        self.cache
            .fetch("issue_meta", &format!("{owner}/{repo}#{number}"), || async {
                fetch_optional(&self.client, &path, &[]).await
            })
            .await
    }

    /// Full comment sequence: paginated with a token, first page capped
    /// without one.
    pub async fn issue_comments(&self, owner: &str, repo: &str, number: u64) -> Result<Vec<Comment>> {
        let path = format!("/repos/{owner}/{repo}/issues/{number}/comments");
        let rows: Option<Vec<Value>> = self
            .cache
            .fetch("issue_comments", &format!("{owner}/{repo}#{number}"), || async {
                let fetched = if self.client.token_present() {
                    self.client.get_paginated(&path, &[]).await
                } else {
                    self.client.get_capped(&path, &[], UNAUTH_COMMENT_PAGE).await
                };
                match fetched {
                    Ok(rows) => Ok(Some(rows)),
                    Err(GithubError::NotFound { .. }) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await?;
        Ok(rows
            .unwrap_or_default()
            .into_iter()
            .filter_map(|row| serde_json::from_value(row).ok())
            .collect())
    }

    pub async fn pr_meta(&self, owner: &str, repo: &str, number: u64) -> Result<Option<PrMeta>> {
        let path = format!("/repos/{owner}/{repo}/pulls/{number}");
        self.cache
            .fetch("pr_meta", &format!("{owner}/{repo}#{number}"), || async {
                fetch_optional(&self.client, &path, &[]).await
            })
            .await
    }

    pub async fn pr_files(&self, owner: &str, repo: &str, number: u64) -> Result<Vec<PrFile>> {
        let path = format!("/repos/{owner}/{repo}/pulls/{number}/files");
        let rows: Option<Vec<Value>> = self
            .cache
            .fetch("pr_files", &format!("{owner}/{repo}#{number}"), || async {
                let fetched = if self.client.token_present() {
                    self.client.get_paginated(&path, &[]).await
                } else {
                    self.client.get_capped(&path, &[], crate::client::PAGE_SIZE).await
                };
                match fetched {
                    Ok(rows) => Ok(Some(rows)),
                    Err(GithubError::NotFound { .. }) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await?;
        Ok(rows
            .unwrap_or_default()
            .into_iter()
            .filter_map(|row| serde_json::from_value(row).ok())
            .collect())
    }

    /// `base...head` comparison; missing ranges memoize as negatives.
    pub async fn compare(
        &self,
        owner: &str,
        repo: &str,
        base: &str,
        head: &str,
    ) -> Result<Option<CompareInfo>> {
        let path = format!("/repos/{owner}/{repo}/compare/{base}...{head}");
        self.cache
            .fetch("compare", &format!("{owner}/{repo}:{base}...{head}"), || async {
                fetch_optional(&self.client, &path, &[]).await
            })
            .await
    }

    /// Decoded text contents of a repo file, or a memoized negative when
    /// the path does not exist.
    pub async fn file_content(&self, owner: &str, repo: &str, path: &str) -> Result<Option<String>> {
        let api_path = format!("/repos/{owner}/{repo}/contents/{path}");
        let file: Option<FileContent> = self
            .cache
            .fetch("file_content", &format!("{owner}/{repo}:{path}"), || async {
                fetch_optional(&self.client, &api_path, &[]).await
            })
            .await?;
        Ok(file.and_then(|f| f.decoded()))
    }

    /// `fetch_compare_summary`: the formatted compare block for a release
    /// range, or `None` when the range cannot be compared.
    pub async fn fetch_compare_summary(
        &self,
        owner: &str,
        repo: &str,
        prev_tag: &str,
        current_tag: &str,
        section: &str,
        filters: &[regex::Regex],
    ) -> Result<Option<String>> {
        let Some(compare) = self.compare(owner, repo, prev_tag, current_tag).await? else {
            return Ok(None);
        };
        Ok(Some(format_compare_summary(
            prev_tag,
            current_tag,
            &compare,
            section,
            filters,
        )))
    }

    /// The compare block for one PR, or `None` when the PR is missing.
    pub async fn pr_compare_block(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        section: &str,
        filters: &[regex::Regex],
    ) -> Result<Option<String>> {
        let Some(meta) = self.pr_meta(owner, repo, number).await? else {
            return Ok(None);
        };
        let files = self.pr_files(owner, repo, number).await?;
        Ok(Some(format_pr_block(&meta, &files, section, filters)))
    }

    /// Per-item PR context: the item's own compare block when it is a PR,
    /// otherwise compare blocks for every referenced PR found in the
    /// item's body and comments. Disabled entirely by the deep-crawl
    /// toggle.
    pub async fn build_item_context(
        &self,
        owner: &str,
        repo: &str,
        item_number: u64,
        item_is_pr: bool,
        ref_text: &str,
        section: &str,
        filters: &[regex::Regex],
    ) -> Result<String> {
        if !self.deep_pr_crawl {
            return Ok(String::new());
        }

        let mut blocks = Vec::new();
        if item_is_pr {
            if let Some(block) = self
                .pr_compare_block(owner, repo, item_number, section, filters)
                .await?
            {
                blocks.push(format!("PR Compare:\n{block}"));
            }
        } else {
            let refs = ReferenceExtractor::new(owner, repo).extract(ref_text, self.ref_limit());
            for number in refs {
                if number == item_number {
                    continue;
                }
                let Some(meta) = self.issue_meta(owner, repo, number).await? else {
                    continue;
                };
                if !meta.is_pull_request() {
                    continue;
                }
                if let Some(block) = self
                    .pr_compare_block(owner, repo, number, section, filters)
                    .await?
                {
                    blocks.push(format!("Linked PR #{number}:\n{block}"));
                }
            }
        }
        Ok(blocks.join("\n"))
    }

    /// Release deep-crawl: resolve every reference in `ref_text` into a
    /// full block. PRs get a labeled compare block; issues get their meta
    /// line plus the first few comments.
    pub async fn linked_reference_blocks(
        &self,
        owner: &str,
        repo: &str,
        ref_text: &str,
        section: &str,
        filters: &[regex::Regex],
    ) -> Result<String> {
        if !self.deep_pr_crawl {
            return Ok(String::new());
        }

        let refs = ReferenceExtractor::new(owner, repo).extract(ref_text, self.ref_limit());
        let mut blocks = Vec::new();
        for number in refs {
            let Some(meta) = self.issue_meta(owner, repo, number).await? else {
                continue;
            };
            if meta.is_pull_request() {
                if let Some(block) = self
                    .pr_compare_block(owner, repo, number, section, filters)
                    .await?
                {
                    blocks.push(format!("Linked PR #{number}:\n{block}"));
                }
            } else {
                blocks.push(self.linked_issue_block(owner, repo, &meta).await);
            }
        }

        if blocks.is_empty() {
            Ok(String::new())
        } else {
            Ok(format!("Linked PR/Issue references:\n{}", blocks.join("\n")))
        }
    }

    async fn linked_issue_block(&self, owner: &str, repo: &str, meta: &IssueMeta) -> String {
        let mut block = format!(
            "Linked Issue #{}: {} [{}]\n",
            meta.number, meta.title, meta.state
        );
        match self.issue_comments(owner, repo, meta.number).await {
            Ok(comments) => {
                for comment in comments.iter().take(self.comment_cap()) {
                    let text = comment.body.as_deref().unwrap_or_default();
                    if text.trim().is_empty() {
                        continue;
                    }
                    block.push_str(&format!(
                        "- {}: {}\n",
                        comment.author(),
                        truncate_chars(&collapse_whitespace(text), LINKED_COMMENT_MAX_CHARS)
                    ));
                }
            }
            Err(e) => {
                warn!(
                    repo = %format!("{owner}/{repo}"),
                    number = meta.number,
                    error = %e,
                    "linked issue comments unavailable"
                );
            }
        }
        block
    }
}

/// GET one JSON document, mapping 404 to `None` so the cache memoizes the
/// negative.
async fn fetch_optional<T: serde::de::DeserializeOwned>(
    client: &GithubClient,
    path: &str,
    query: &[(&str, String)],
) -> Result<Option<T>> {
    match client.get_json(path, query).await {
        Ok(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| Error::parse(format!("{path}: {e}"))),
        Err(GithubError::NotFound { .. }) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
