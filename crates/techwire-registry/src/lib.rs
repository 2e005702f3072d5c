//! # Package-registry collection for techwire
//!
//! Looks up the latest published version of each watched package on npm
//! and RubyGems and emits a release item when the publish time falls
//! inside the cutoff window. Titles use the same `<name> v<version>
//! released` shape as hosting-platform release items so the orchestrator's
//! release deduplication can collapse the pair.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use techwire::concurrent::map_bounded;
use techwire::constants::{DEFAULT_HTTP_CONNECT_TIMEOUT, DEFAULT_HTTP_REQUEST_TIMEOUT};
use techwire::{Collector, Error, Item, RegistryKind, RegistryRef, Result, SourceKind};

pub const NPM_SOURCE_LABEL: &str = "npm";
pub const RUBYGEMS_SOURCE_LABEL: &str = "RubyGems";

pub const DEFAULT_NPM_BASE: &str = "https://registry.npmjs.org";
pub const DEFAULT_RUBYGEMS_BASE: &str = "https://rubygems.org";

const NPM_WEB_BASE: &str = "https://www.npmjs.com/package";

/// npm registry document; only the latest tag and publish times matter.
#[derive(Debug, Deserialize)]
struct NpmPackage {
    #[serde(rename = "dist-tags", default)]
    dist_tags: HashMap<String, String>,
    #[serde(default)]
    time: HashMap<String, DateTime<Utc>>,
    #[serde(default)]
    description: Option<String>,
}

/// One row of the RubyGems versions listing, newest first.
#[derive(Debug, Deserialize)]
struct GemVersion {
    number: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    summary: Option<String>,
}

pub struct RegistryCollector {
    http: reqwest::Client,
    entries: Vec<RegistryRef>,
    cutoff: DateTime<Utc>,
    npm_base: String,
    rubygems_base: String,
    max_threads: usize,
}

impl RegistryCollector {
    pub fn new(entries: Vec<RegistryRef>, cutoff: DateTime<Utc>, max_threads: usize) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_REQUEST_TIMEOUT)
            .connect_timeout(DEFAULT_HTTP_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| Error::transport(format!("registry client: {e}")))?;
        Ok(Self {
            http,
            entries,
            cutoff,
            npm_base: DEFAULT_NPM_BASE.to_string(),
            rubygems_base: DEFAULT_RUBYGEMS_BASE.to_string(),
            max_threads,
        })
    }

    /// Point both registries somewhere else (tests point them at a mock
    /// server).
    #[must_use]
    pub fn with_bases(mut self, npm_base: impl Into<String>, rubygems_base: impl Into<String>) -> Self {
        self.npm_base = npm_base.into().trim_end_matches('/').to_string();
        self.rubygems_base = rubygems_base.into().trim_end_matches('/').to_string();
        self
    }

    async fn collect_entry(&self, entry: RegistryRef) -> Result<Option<Item>> {
        let item = match entry.kind {
            RegistryKind::Npm => self.latest_npm(&entry.name).await?,
            RegistryKind::Rubygems => self.latest_gem(&entry.name).await?,
        };
        Ok(item.filter(|item| item.published_at >= self.cutoff))
    }

    async fn latest_npm(&self, name: &str) -> Result<Option<Item>> {
        let url = format!("{}/{name}", self.npm_base);
        let Some(package) = self.fetch_json::<NpmPackage>(&url).await? else {
            return Ok(None);
        };
        let Some(version) = package.dist_tags.get("latest") else {
            return Ok(None);
        };
        let Some(&published_at) = package.time.get(version) else {
            return Ok(None);
        };
        let mut body = format!("{name} {version} published on npm.");
        if let Some(description) = package.description.as_deref().filter(|d| !d.trim().is_empty()) {
            body.push_str(&format!("\n{}", description.trim()));
        }
        Ok(Some(Item {
            title: format!("{name} v{version} released"),
            url: format!("{NPM_WEB_BASE}/{name}"),
            published_at,
            body,
            source_label: NPM_SOURCE_LABEL.to_string(),
            kind: SourceKind::Registry,
        }))
    }

    async fn latest_gem(&self, name: &str) -> Result<Option<Item>> {
        let url = format!("{}/api/v1/versions/{name}.json", self.rubygems_base);
        let Some(versions) = self.fetch_json::<Vec<GemVersion>>(&url).await? else {
            return Ok(None);
        };
        let Some(latest) = versions.first() else {
            return Ok(None);
        };
        let mut body = format!("{name} {} published on RubyGems.", latest.number);
        if let Some(summary) = latest.summary.as_deref().filter(|s| !s.trim().is_empty()) {
            body.push_str(&format!("\n{}", summary.trim()));
        }
        Ok(Some(Item {
            title: format!("{name} v{} released", latest.number),
            url: format!(
                "https://rubygems.org/gems/{name}/versions/{}",
                latest.number
            ),
            published_at: latest.created_at,
            body,
            source_label: RUBYGEMS_SOURCE_LABEL.to_string(),
            kind: SourceKind::Registry,
        }))
    }

    /// GET and decode; 404 means the package is unknown and yields no
    /// item.
    async fn fetch_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::transport(format!("{url}: {e}")))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Error::collect(format!("{url}: status {}", response.status())));
        }
        response
            .json::<T>()
            .await
            .map(Some)
            .map_err(|e| Error::parse(format!("{url}: {e}")))
    }
}

#[async_trait]
impl Collector for RegistryCollector {
    fn name(&self) -> &str {
        "registries"
    }

    async fn collect(&self) -> Result<Vec<Item>> {
        let per_entry = map_bounded(self.entries.clone(), self.max_threads, |entry| {
            self.collect_entry(entry)
        })
        .await;

        let mut items = Vec::new();
        for (entry, outcome) in self.entries.iter().zip(per_entry) {
            match outcome {
                Ok(Some(item)) => items.push(item),
                Ok(None) => {}
                Err(e) => warn!(
                    package = entry.name.as_str(),
                    error = %e,
                    "registry lookup failed"
                ),
            }
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn npm_document_decodes_latest_and_time() {
        let package: NpmPackage = serde_json::from_value(serde_json::json!({
            "dist-tags": {"latest": "19.0.0"},
            "time": {
                "created": "2020-01-01T00:00:00Z",
                "19.0.0": "2026-02-12T00:00:00Z"
            },
            "description": "UI library"
        }))
        .unwrap();
        assert_eq!(package.dist_tags.get("latest").unwrap(), "19.0.0");
        assert!(package.time.contains_key("19.0.0"));
    }

    #[test]
    fn gem_versions_decode_in_listing_order() {
        let versions: Vec<GemVersion> = serde_json::from_value(serde_json::json!([
            {"number": "7.2.0", "created_at": "2026-02-10T00:00:00Z", "summary": "web framework"},
            {"number": "7.1.0", "created_at": "2025-10-01T00:00:00Z"}
        ]))
        .unwrap();
        assert_eq!(versions[0].number, "7.2.0");
    }
}
