//! Configuration model: the YAML source document grouping repos, feeds,
//! registries, and advisory ecosystems by category, plus the runtime
//! toggles read from the environment.
//!
//! Per-repo options are an explicit record; unknown keys are rejected at
//! load time instead of being carried around as open-ended string maps.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{Error, Result};

/// Top-level grouping of sources. Categories run independently and keep a
/// stable output ordering.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Frontend,
    Backend,
    Devops,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Frontend, Category::Backend, Category::Devops];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Frontend => "frontend",
            Category::Backend => "backend",
            Category::Devops => "devops",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the release collector picks candidates for a repo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseStrategy {
    /// Releases first, fall back to tags when the repo publishes none.
    #[default]
    Auto,
    ReleasesOnly,
    TagsOnly,
}

/// A watched repository on the hosting platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub release_strategy: ReleaseStrategy,
    /// Changelog files probed for a release excerpt; empty means the
    /// default candidate set.
    #[serde(default)]
    pub release_notes_files: Vec<String>,
}

impl RepoRef {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// Changelog candidates for this repo.
    #[must_use]
    pub fn changelog_candidates(&self) -> Vec<String> {
        if self.release_notes_files.is_empty() {
            constants::DEFAULT_CHANGELOG_FILES
                .iter()
                .map(|s| (*s).to_string())
                .collect()
        } else {
            self.release_notes_files.clone()
        }
    }
}

/// A syndication feed to poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedRef {
    pub url: String,
    pub display_name: String,
}

/// Which package registry a [`RegistryRef`] points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryKind {
    Npm,
    Rubygems,
}

/// A package watched on a registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryRef {
    pub kind: RegistryKind,
    pub name: String,
}

/// Sources configured for one category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CategorySources {
    pub repos: Vec<RepoRef>,
    pub feeds: Vec<FeedRef>,
    pub registries: Vec<RegistryRef>,
    /// Advisory-database ecosystems (e.g. `npm`, `rubygems`, `go`).
    pub advisories: Vec<String>,
    /// Regexes applied to compare-block file lists for this category;
    /// case-insensitive, with fall-back to the unfiltered list.
    pub compare_file_filters: Vec<String>,
}

/// The full source configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub categories: BTreeMap<Category, CategorySources>,
}

impl SourceConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yml::from_str(yaml).map_err(|e| Error::config(format!("source config: {e}")))
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("read {}: {e}", path.display())))?;
        Self::from_yaml_str(&raw)
    }

    #[must_use]
    pub fn sources_for(&self, category: Category) -> CategorySources {
        self.categories.get(&category).cloned().unwrap_or_default()
    }
}

/// Post-summarization importance floor. Parsed here, applied by the
/// summarization collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    Low,
    Medium,
    High,
    Critical,
}

impl std::str::FromStr for Importance {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Importance::Low),
            "medium" => Ok(Importance::Medium),
            "high" => Ok(Importance::High),
            "critical" => Ok(Importance::Critical),
            other => Err(Error::config(format!(
                "DIGEST_MIN_IMPORTANCE must be one of critical/high/medium/low, got {other:?}"
            ))),
        }
    }
}

/// Runtime toggles, resolved from the environment with token-aware
/// defaults for the two worker-pool caps.
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    pub lookback_days: i64,
    pub min_importance: Importance,
    pub deep_pr_crawl: bool,
    pub collect_parallel: bool,
    pub max_collect_threads: usize,
    pub max_repo_threads: usize,
    pub dry_run: bool,
}

impl RuntimeOptions {
    /// Read every toggle from the environment. `token_present` selects the
    /// worker-pool defaults when the caps are not set explicitly.
    pub fn from_env(token_present: bool) -> Result<Self> {
        let (collect_default, repo_default) = if token_present {
            (
                constants::MAX_COLLECT_THREADS_WITH_TOKEN,
                constants::MAX_REPO_THREADS_WITH_TOKEN,
            )
        } else {
            (
                constants::MAX_COLLECT_THREADS_WITHOUT_TOKEN,
                constants::MAX_REPO_THREADS_WITHOUT_TOKEN,
            )
        };

        Ok(Self {
            lookback_days: env_i64("LOOKBACK_DAYS")?.unwrap_or(7),
            min_importance: match std::env::var("DIGEST_MIN_IMPORTANCE") {
                Ok(raw) => raw.parse()?,
                Err(_) => Importance::Low,
            },
            deep_pr_crawl: env_bool("DEEP_PR_CRAWL")?.unwrap_or(true),
            collect_parallel: env_bool("COLLECT_PARALLEL")?.unwrap_or(true),
            max_collect_threads: env_usize("MAX_COLLECT_THREADS")?.unwrap_or(collect_default),
            max_repo_threads: env_usize("MAX_REPO_THREADS")?.unwrap_or(repo_default),
            dry_run: env_bool("DRY_RUN")?.unwrap_or(false),
        })
    }

    /// The instant before which items are discarded: `LOOKBACK_DAYS` full
    /// days before today's midnight in the digest timezone (UTC+8).
    #[must_use]
    pub fn cutoff_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        cutoff_from(now, self.lookback_days)
    }
}

/// Compute the cutoff against a full-day boundary in UTC+8.
#[must_use]
pub fn cutoff_from(now: DateTime<Utc>, lookback_days: i64) -> DateTime<Utc> {
    let tz = digest_tz();
    let local_midnight = now
        .with_timezone(&tz)
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|naive| naive.and_local_timezone(tz).single());
    match local_midnight {
        Some(midnight) => (midnight - Duration::days(lookback_days)).with_timezone(&Utc),
        // Fixed offsets have no DST gaps; midnight always resolves.
        None => now - Duration::days(lookback_days),
    }
}

#[allow(clippy::unwrap_used)] // 8 hours east is always a valid offset
fn digest_tz() -> FixedOffset {
    FixedOffset::east_opt(8 * 3600).unwrap()
}

fn env_bool(name: &str) -> Result<Option<bool>> {
    match std::env::var(name) {
        Ok(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            other => Err(Error::config(format!("{name} must be a boolean, got {other:?}"))),
        },
        Err(_) => Ok(None),
    }
}

fn env_i64(name: &str) -> Result<Option<i64>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<i64>()
            .map(Some)
            .map_err(|_| Error::config(format!("{name} must be an integer, got {raw:?}"))),
        Err(_) => Ok(None),
    }
}

fn env_usize(name: &str) -> Result<Option<usize>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<usize>()
            .map(Some)
            .map_err(|_| Error::config(format!("{name} must be a positive integer, got {raw:?}"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn cutoff_uses_utc_plus_eight_day_boundary() {
        // 2026-02-20 18:30 UTC is 2026-02-21 02:30 in UTC+8, so "today"
        // there is already the 21st; its midnight is 2026-02-20 16:00 UTC.
        let now = Utc.with_ymd_and_hms(2026, 2, 20, 18, 30, 0).unwrap();
        let cutoff = cutoff_from(now, 7);
        assert_eq!(cutoff, Utc.with_ymd_and_hms(2026, 2, 13, 16, 0, 0).unwrap());
    }

    #[test]
    fn cutoff_zero_days_is_todays_local_midnight() {
        let now = Utc.with_ymd_and_hms(2026, 2, 20, 1, 0, 0).unwrap();
        // 09:00 in UTC+8; local midnight is 2026-02-19 16:00 UTC.
        assert_eq!(
            cutoff_from(now, 0),
            Utc.with_ymd_and_hms(2026, 2, 19, 16, 0, 0).unwrap()
        );
    }

    #[test]
    fn config_parses_full_document() {
        let yaml = r#"
categories:
  frontend:
    repos:
      - owner: facebook
        name: react
        display_name: React
        release_strategy: releases_only
    feeds:
      - url: https://example.com/feed.xml
        display_name: Example Blog
    registries:
      - kind: npm
        name: react
    advisories: [npm]
    compare_file_filters: ["\\.tsx?$"]
  backend:
    repos:
      - owner: rails
        name: rails
"#;
        let config = SourceConfig::from_yaml_str(yaml).unwrap();
        let frontend = config.sources_for(Category::Frontend);
        assert_eq!(frontend.repos.len(), 1);
        assert_eq!(frontend.repos[0].display_name(), "React");
        assert_eq!(
            frontend.repos[0].release_strategy,
            ReleaseStrategy::ReleasesOnly
        );
        assert_eq!(frontend.registries[0].kind, RegistryKind::Npm);
        assert_eq!(frontend.advisories, vec!["npm"]);

        let backend = config.sources_for(Category::Backend);
        assert_eq!(backend.repos[0].release_strategy, ReleaseStrategy::Auto);
        assert_eq!(backend.repos[0].display_name(), "rails");

        // Unconfigured category resolves to empty sources, not an error.
        assert!(config.sources_for(Category::Devops).repos.is_empty());
    }

    #[test]
    fn unknown_repo_keys_are_rejected() {
        let yaml = r#"
categories:
  frontend:
    repos:
      - owner: facebook
        name: react
        releaze_strategy: tags_only
"#;
        let err = SourceConfig::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn default_changelog_candidates_apply_when_unset() {
        let repo = RepoRef {
            owner: "o".into(),
            name: "r".into(),
            display_name: None,
            release_strategy: ReleaseStrategy::Auto,
            release_notes_files: vec![],
        };
        assert_eq!(repo.changelog_candidates()[0], "CHANGELOG.md");
        assert_eq!(repo.changelog_candidates().len(), 5);
    }

    #[test]
    fn importance_parses_case_insensitively() {
        assert_eq!("HIGH".parse::<Importance>().unwrap(), Importance::High);
        assert!("urgent".parse::<Importance>().is_err());
        assert!(Importance::Critical > Importance::Low);
    }
}
