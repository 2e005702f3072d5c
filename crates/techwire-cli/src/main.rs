// Copyright 2026 Dropbox (created by Andrew Yates <ayates@dropbox.com>)
// Allow clippy warnings for CLI application
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use chrono::Utc;
use clap::Parser;
use tracing::{info, info_span, Instrument};

use techwire::orchestrator::CollectOptions;
use techwire::{Category, CategoryOrchestrator, RunCache, RunId, RuntimeOptions, SourceConfig};
use techwire_github::{GithubClient, ReferenceResolver};

mod jobs;
mod notify;
mod render;
mod summarize;

use notify::{FileNotifier, LogNotifier, Notifier, DRY_RUN_OUTPUT};
use render::Section;
use summarize::{
    OpenAiSummarizer, PassthroughSummarizer, Summarizer, DEFAULT_OPENAI_BASE, DEFAULT_OPENAI_MODEL,
};

/// Pacing gap between category summarizations, protecting the provider's
/// rate budget.
const CATEGORY_PACING: Duration = Duration::from_secs(5);

/// techwire - weekly technology digest
///
/// Collects recent activity from GitHub (releases, issues, advisories),
/// package registries, and syndication feeds per category, summarizes it,
/// and emits a single HTML digest. A scheduler (cron) invokes this binary;
/// runtime toggles come from the environment (LOOKBACK_DAYS,
/// DIGEST_MIN_IMPORTANCE, DEEP_PR_CRAWL, COLLECT_PARALLEL,
/// MAX_COLLECT_THREADS, MAX_REPO_THREADS, DRY_RUN) plus GITHUB_TOKEN and
/// OPENAI_API_KEY.
#[derive(Parser)]
#[command(name = "techwire")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Collect, enrich, and summarize a weekly technology digest", long_about = None)]
struct Cli {
    /// Source configuration document (YAML).
    #[arg(long, default_value = "sources.yml")]
    config: PathBuf,

    /// Write the digest to digest.html instead of delivering it.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let run_id = RunId::generate();
    run(cli, &run_id)
        .instrument(info_span!("digest_run", run_id = %run_id))
        .await
}

async fn run(cli: Cli, run_id: &RunId) -> Result<()> {
    let token = std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.trim().is_empty());
    let mut options = RuntimeOptions::from_env(token.is_some())?;
    if cli.dry_run {
        options.dry_run = true;
    }

    let config = SourceConfig::from_yaml_file(&cli.config)
        .with_context(|| format!("load {}", cli.config.display()))?;

    let now = Utc::now();
    let cutoff = options.cutoff_at(now);
    info!(
        cutoff = %cutoff,
        lookback_days = options.lookback_days,
        parallel = options.collect_parallel,
        token = token.is_some(),
        "starting collection"
    );

    let client = Arc::new(GithubClient::builder().token(token).build()?);
    let cache = Arc::new(RunCache::new());
    let resolver = Arc::new(ReferenceResolver::new(
        Arc::clone(&client),
        Arc::clone(&cache),
        options.deep_pr_crawl,
    ));

    let orchestrator = CategoryOrchestrator::new(CollectOptions {
        parallel: options.collect_parallel,
        max_collect_threads: options.max_collect_threads,
    });

    let mut jobs_by_category = Vec::new();
    for category in Category::ALL {
        let jobs = jobs::build_jobs(category, &config, &resolver, &options, cutoff)?;
        jobs_by_category.push((category, jobs));
    }
    let collected = orchestrator.collect_all(jobs_by_category).await;
    info!(cached_entries = cache.len(), "collection finished");

    let summarizer = build_summarizer(&options)?;
    let mut sections = Vec::new();
    for (index, category) in Category::ALL.iter().enumerate() {
        if index > 0 {
            tokio::time::sleep(CATEGORY_PACING).await;
        }
        let items = collected.get(category).cloned().unwrap_or_default();
        let html = summarizer.summarize(*category, &items).await?;
        sections.push(Section {
            title: category.as_str().to_string(),
            html,
        });
    }

    let html = render::render_digest(run_id.as_str(), now, cutoff, &sections)?;
    let subject = format!("Weekly Tech Digest {}", now.format("%Y-%m-%d"));
    let notifier: Box<dyn Notifier> = if options.dry_run {
        Box::new(FileNotifier::new(DRY_RUN_OUTPUT))
    } else {
        Box::new(LogNotifier)
    };
    notifier.deliver(&subject, &html).await?;

    info!("digest run complete");
    Ok(())
}

fn build_summarizer(options: &RuntimeOptions) -> Result<Box<dyn Summarizer>> {
    let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty());
    match api_key {
        Some(api_key) => {
            let api_base =
                std::env::var("OPENAI_API_BASE").unwrap_or_else(|_| DEFAULT_OPENAI_BASE.to_string());
            let model =
                std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_OPENAI_MODEL.to_string());
            Ok(Box::new(OpenAiSummarizer::new(
                api_key,
                api_base,
                model,
                options.min_importance,
            )?))
        }
        None => {
            info!("no summarization credentials, using passthrough summarizer");
            Ok(Box::new(PassthroughSummarizer))
        }
    }
}
