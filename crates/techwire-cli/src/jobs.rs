//! Source-job construction: turn one category's configuration into the
//! collectors the orchestrator runs.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};

use techwire::{Category, Collector, RuntimeOptions, SourceConfig};
use techwire_feeds::FeedCollector;
use techwire_github::compare::compile_filters;
use techwire_github::context::ReferenceResolver;
use techwire_github::{AdvisoryCollector, IssueCollector, ReleaseCollector};
use techwire_registry::RegistryCollector;

pub fn build_jobs(
    category: Category,
    config: &SourceConfig,
    resolver: &Arc<ReferenceResolver>,
    options: &RuntimeOptions,
    cutoff: DateTime<Utc>,
) -> Result<Vec<Box<dyn Collector>>> {
    let sources = config.sources_for(category);
    let section = category.as_str();
    let filters = compile_filters(&sources.compare_file_filters);
    let repo_threads = if options.collect_parallel {
        options.max_repo_threads
    } else {
        1
    };

    let mut jobs: Vec<Box<dyn Collector>> = Vec::new();
    if !sources.repos.is_empty() {
        jobs.push(Box::new(ReleaseCollector::new(
            Arc::clone(resolver),
            sources.repos.clone(),
            cutoff,
            section,
            filters.clone(),
            repo_threads,
        )));
        jobs.push(Box::new(IssueCollector::new(
            Arc::clone(resolver),
            sources.repos.clone(),
            cutoff,
            section,
            filters.clone(),
            repo_threads,
        )));
    }
    if !sources.advisories.is_empty() {
        jobs.push(Box::new(AdvisoryCollector::new(
            Arc::clone(resolver.client()),
            Arc::clone(resolver.cache()),
            sources.advisories.clone(),
            cutoff,
        )));
    }
    if !sources.feeds.is_empty() {
        jobs.push(Box::new(FeedCollector::new(
            Arc::clone(resolver),
            sources.feeds.clone(),
            cutoff,
            section,
            filters.clone(),
            repo_threads,
        )?));
    }
    if !sources.registries.is_empty() {
        jobs.push(Box::new(RegistryCollector::new(
            sources.registries.clone(),
            cutoff,
            repo_threads,
        )?));
    }
    Ok(jobs)
}
