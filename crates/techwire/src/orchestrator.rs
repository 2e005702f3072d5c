// Copyright 2026 Dropbox (created by Andrew Yates <ayates@dropbox.com>)

//! Runs the configured source jobs for each category under bounded
//! concurrency, then applies release deduplication and the deterministic
//! output ordering.
//!
//! Failure policy: a job that errors is logged and contributes an empty
//! list; sibling jobs continue. The pools preserve input ordering, and the
//! final stable sort makes the emitted sequence a pure function of the
//! inputs regardless of scheduling jitter.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{info, warn};

use crate::collector::Collector;
use crate::concurrent::map_bounded;
use crate::config::Category;
use crate::item::{sort_items, Item};

/// Orchestrator knobs, resolved from [`crate::config::RuntimeOptions`].
#[derive(Debug, Clone)]
pub struct CollectOptions {
    pub parallel: bool,
    pub max_collect_threads: usize,
}

/// Drives collection for the three categories.
pub struct CategoryOrchestrator {
    options: CollectOptions,
    shutdown: Arc<AtomicBool>,
}

impl CategoryOrchestrator {
    #[must_use]
    pub fn new(options: CollectOptions) -> Self {
        Self {
            options,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Cooperative cancellation: once flipped, no new job starts. In-flight
    /// requests finish or fail by timeout.
    #[must_use]
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Run one category's jobs and emit its deduplicated, sorted items.
    pub async fn collect_category(
        &self,
        category: Category,
        jobs: Vec<Box<dyn Collector>>,
    ) -> Vec<Item> {
        let limit = if self.options.parallel && jobs.len() > 1 {
            self.options.max_collect_threads
        } else {
            1
        };

        let shutdown = Arc::clone(&self.shutdown);
        let per_job = map_bounded(jobs, limit, |job| {
            let shutdown = Arc::clone(&shutdown);
            async move {
                if shutdown.load(Ordering::SeqCst) {
                    warn!(category = %category, job = job.name(), "shutdown requested, job skipped");
                    return Vec::new();
                }
                match job.collect().await {
                    Ok(items) => items,
                    Err(e) => {
                        warn!(category = %category, job = job.name(), error = %e, "source job failed, continuing with empty result");
                        Vec::new()
                    }
                }
            }
        })
        .await;

        let mut items: Vec<Item> = per_job.into_iter().flatten().collect();
        items = deduplicate_release_versions(items);
        sort_items(&mut items);

        if items.is_empty() {
            info!(category = %category, "no data");
        } else {
            info!(category = %category, count = items.len(), "category collected");
        }
        items
    }

    /// Run every category sequentially (categories are independent; the
    /// summarization collaborator paces them anyway).
    pub async fn collect_all(
        &self,
        jobs_by_category: Vec<(Category, Vec<Box<dyn Collector>>)>,
    ) -> BTreeMap<Category, Vec<Item>> {
        let mut out = BTreeMap::new();
        for (category, jobs) in jobs_by_category {
            let items = self.collect_category(category, jobs).await;
            out.insert(category, items);
        }
        out
    }
}

#[allow(clippy::unwrap_used)] // static pattern
static RELEASE_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>.+?) v?(?P<version>\d+\.\d+(?:\.\d+)?(?:[0-9A-Za-z.+-]*)) released$")
        .unwrap()
});

/// Collapse duplicate release announcements for the same `(package,
/// version)` observed through different sources. The survivor maximizes
/// `(source rank, body length, published_at)`; hosting-platform releases
/// outrank registry entries, which outrank everything else. Items whose
/// titles do not parse as release announcements pass through untouched.
#[must_use]
pub fn deduplicate_release_versions(items: Vec<Item>) -> Vec<Item> {
    let mut out: Vec<Item> = Vec::with_capacity(items.len());
    let mut buckets: HashMap<(String, String), usize> = HashMap::new();

    for item in items {
        let key = RELEASE_TITLE.captures(&item.title).map(|caps| {
            (
                caps["name"].to_ascii_lowercase(),
                caps["version"].to_string(),
            )
        });
        let Some(key) = key else {
            out.push(item);
            continue;
        };

        match buckets.get(&key) {
            Some(&idx) => {
                if priority(&item) > priority(&out[idx]) {
                    out[idx] = item;
                }
            }
            None => {
                buckets.insert(key, out.len());
                out.push(item);
            }
        }
    }
    out
}

fn priority(item: &Item) -> (u8, usize, chrono::DateTime<chrono::Utc>) {
    (
        item.kind.release_rank(),
        item.body.chars().count(),
        item.published_at,
    )
}
