//! Feed collection: fetch, parse, cutoff-filter, enrich.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::warn;

use techwire::concurrent::map_bounded;
use techwire::constants::{
    DEFAULT_HTTP_CONNECT_TIMEOUT, DEFAULT_HTTP_REQUEST_TIMEOUT, FEED_MAX_REDIRECTS,
    ITEM_BODY_MAX_CHARS,
};
use techwire::text::truncate_chars;
use techwire::{Collector, Error, FeedRef, Item, Result, SourceKind};
use techwire_github::context::ReferenceResolver;
use techwire_github::issues::build_issue_body;

use crate::html::strip_tags;
use crate::parser::{parse_feed, FeedEntry};
use crate::redmine;

/// Owner/repo/number path of a hosting-platform issue or PR URL.
#[allow(clippy::unwrap_used)] // static pattern
static PLATFORM_ITEM_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/([^/\s]+)/([^/\s]+)/(issues|pull)/(\d+)/?$").unwrap()
});

pub struct FeedCollector {
    http: reqwest::Client,
    resolver: Arc<ReferenceResolver>,
    feeds: Vec<FeedRef>,
    cutoff: DateTime<Utc>,
    section: String,
    filters: Vec<Regex>,
    max_feed_threads: usize,
}

impl FeedCollector {
    pub fn new(
        resolver: Arc<ReferenceResolver>,
        feeds: Vec<FeedRef>,
        cutoff: DateTime<Utc>,
        section: impl Into<String>,
        filters: Vec<Regex>,
        max_feed_threads: usize,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_REQUEST_TIMEOUT)
            .connect_timeout(DEFAULT_HTTP_CONNECT_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(FEED_MAX_REDIRECTS))
            .build()
            .map_err(|e| Error::transport(format!("feed client: {e}")))?;
        Ok(Self {
            http,
            resolver,
            feeds,
            cutoff,
            section: section.into(),
            filters,
            max_feed_threads,
        })
    }

    async fn collect_feed(&self, feed: FeedRef) -> Result<Vec<Item>> {
        let response = self
            .http
            .get(&feed.url)
            .send()
            .await
            .map_err(|e| Error::transport(format!("{}: {e}", feed.url)))?;
        if !response.status().is_success() {
            return Err(Error::collect(format!(
                "{}: status {}",
                feed.url,
                response.status()
            )));
        }
        let xml = response
            .text()
            .await
            .map_err(|e| Error::transport(format!("{}: {e}", feed.url)))?;

        let mut items = Vec::new();
        for entry in parse_feed(&xml)? {
            let Some(published) = entry.published else {
                continue;
            };
            if published < self.cutoff {
                continue;
            }
            let body = self.enrich_entry(&entry).await;
            items.push(Item {
                title: entry.title,
                url: entry.url,
                published_at: published,
                body: truncate_chars(&body, ITEM_BODY_MAX_CHARS),
                source_label: feed.display_name.clone(),
                kind: SourceKind::Feed,
            });
        }
        Ok(items)
    }

    /// Enrichment ladder: Redmine issue API, then the hosting platform's
    /// issue path, then the stripped entry summary. Enrichment failures
    /// degrade to the summary instead of dropping the entry.
    async fn enrich_entry(&self, entry: &FeedEntry) -> String {
        if let Some((base, id)) = redmine::match_issue_url(&entry.url) {
            match self.fetch_redmine_issue(&base, id).await {
                Ok(body) if !body.is_empty() => return body,
                Ok(_) => {}
                Err(e) => {
                    warn!(url = entry.url.as_str(), error = %e, "redmine enrichment failed");
                }
            }
        }

        if let Some((owner, repo, number)) = self.platform_reference(&entry.url) {
            match self.fetch_platform_issue(&owner, &repo, number).await {
                Ok(Some(body)) => return body,
                Ok(None) => {}
                Err(e) => {
                    warn!(url = entry.url.as_str(), error = %e, "platform enrichment failed");
                }
            }
        }

        strip_tags(entry.summary.as_deref().unwrap_or_default())
    }

    async fn fetch_redmine_issue(&self, base: &str, id: u64) -> Result<String> {
        let url = format!("{base}/issues/{id}.json");
        let response = self
            .http
            .get(&url)
            .query(&[("include", "journals")])
            .send()
            .await
            .map_err(|e| Error::transport(format!("{url}: {e}")))?;
        if !response.status().is_success() {
            return Err(Error::collect(format!("{url}: status {}", response.status())));
        }
        let envelope: redmine::RedmineEnvelope = response
            .json()
            .await
            .map_err(|e| Error::parse(format!("{url}: {e}")))?;
        Ok(redmine::format_issue(&envelope.issue))
    }

    fn platform_reference(&self, url: &str) -> Option<(String, String, u64)> {
        let rest = url.strip_prefix(self.resolver.client().web_base())?;
        let caps = PLATFORM_ITEM_PATH.captures(rest)?;
        let number = caps.get(4)?.as_str().parse().ok()?;
        Some((
            caps.get(1)?.as_str().to_string(),
            caps.get(2)?.as_str().to_string(),
            number,
        ))
    }

    async fn fetch_platform_issue(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Option<String>> {
        let Some(meta) = self.resolver.issue_meta(owner, repo, number).await? else {
            return Ok(None);
        };
        let body = build_issue_body(
            &self.resolver,
            owner,
            repo,
            &meta,
            &self.section,
            &self.filters,
        )
        .await?;
        Ok(Some(body))
    }
}

#[async_trait]
impl Collector for FeedCollector {
    fn name(&self) -> &str {
        "feeds"
    }

    async fn collect(&self) -> Result<Vec<Item>> {
        let per_feed = map_bounded(self.feeds.clone(), self.max_feed_threads, |feed| {
            self.collect_feed(feed)
        })
        .await;

        let mut items = Vec::new();
        for (feed, outcome) in self.feeds.iter().zip(per_feed) {
            match outcome {
                Ok(mut feed_items) => items.append(&mut feed_items),
                Err(e) => warn!(
                    feed = feed.display_name.as_str(),
                    error = %e,
                    "feed collection failed"
                ),
            }
        }
        Ok(items)
    }
}
