//! Advisory-database collection: recent advisories per configured
//! ecosystem.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::warn;

use techwire::constants::ITEM_BODY_MAX_CHARS;
use techwire::text::truncate_chars;
use techwire::{Collector, Item, Result, RunCache, SourceKind};

use crate::api::Advisory;
use crate::client::{GithubClient, GithubError};

pub const SOURCE_LABEL: &str = "GitHub Advisories";

/// Advisories listed per ecosystem, by token presence.
const ADVISORIES_WITH_TOKEN: usize = 50;
const ADVISORIES_WITHOUT_TOKEN: usize = 20;

pub struct AdvisoryCollector {
    client: Arc<GithubClient>,
    cache: Arc<RunCache>,
    ecosystems: Vec<String>,
    cutoff: DateTime<Utc>,
}

impl AdvisoryCollector {
    #[must_use]
    pub fn new(
        client: Arc<GithubClient>,
        cache: Arc<RunCache>,
        ecosystems: Vec<String>,
        cutoff: DateTime<Utc>,
    ) -> Self {
        Self {
            client,
            cache,
            ecosystems,
            cutoff,
        }
    }

    async fn collect_ecosystem(&self, ecosystem: &str) -> Result<Vec<Item>> {
        let per_page = if self.client.token_present() {
            ADVISORIES_WITH_TOKEN
        } else {
            ADVISORIES_WITHOUT_TOKEN
        };
        let query: Vec<(&str, String)> = vec![("ecosystem", ecosystem.to_string())];
        let rows: Option<Vec<Value>> = self
            .cache
            .fetch("advisories", ecosystem, || async {
                match self.client.get_capped("/advisories", &query, per_page).await {
                    Ok(rows) => Ok(Some(rows)),
                    Err(GithubError::NotFound { .. }) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await?;

        let mut items = Vec::new();
        for row in rows.unwrap_or_default() {
            let advisory: Advisory = match serde_json::from_value(row) {
                Ok(advisory) => advisory,
                Err(e) => {
                    warn!(ecosystem, error = %e, "unparseable advisory skipped");
                    continue;
                }
            };
            let Some(published_at) = advisory.published_at else {
                continue;
            };
            if published_at < self.cutoff {
                continue;
            }
            items.push(advisory_item(&advisory, ecosystem, published_at));
        }
        Ok(items)
    }
}

fn advisory_item(advisory: &Advisory, ecosystem: &str, published_at: DateTime<Utc>) -> Item {
    let severity = advisory
        .severity
        .as_deref()
        .unwrap_or("unknown")
        .to_ascii_uppercase();

    let mut body = format!("Advisory {} ({ecosystem})", advisory.ghsa_id);
    for vuln in &advisory.vulnerabilities {
        if let Some(package) = &vuln.package {
            body.push_str(&format!("\nPackage: {}", package.name));
            if let Some(range) = &vuln.vulnerable_version_range {
                body.push_str(&format!(" ({range})"));
            }
        }
    }
    if let Some(score) = advisory.cvss.as_ref().and_then(|c| c.score) {
        body.push_str(&format!("\nCVSS: {score}"));
    }
    if let Some(description) = &advisory.description {
        if !description.trim().is_empty() {
            body.push_str("\n\n");
            body.push_str(description.trim());
        }
    }

    Item {
        title: format!("[{severity}] {}", advisory.summary),
        url: advisory.html_url.clone(),
        published_at,
        body: truncate_chars(&body, ITEM_BODY_MAX_CHARS),
        source_label: SOURCE_LABEL.to_string(),
        kind: SourceKind::Advisory,
    }
}

#[async_trait]
impl Collector for AdvisoryCollector {
    fn name(&self) -> &str {
        "github-advisories"
    }

    async fn collect(&self) -> Result<Vec<Item>> {
        let mut items = Vec::new();
        for ecosystem in &self.ecosystems {
            match self.collect_ecosystem(ecosystem).await {
                Ok(mut ecosystem_items) => items.append(&mut ecosystem_items),
                Err(e) => warn!(
                    ecosystem = ecosystem.as_str(),
                    error = %e,
                    "advisory collection failed for ecosystem"
                ),
            }
        }
        Ok(items)
    }
}
