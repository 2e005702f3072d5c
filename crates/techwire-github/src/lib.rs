//! # GitHub collection for techwire
//!
//! Everything that talks to the hosting platform: the rate-limit-aware
//! [`GithubClient`], the typed API payloads, the [`refs::ReferenceExtractor`]
//! that turns free text into issue/PR numbers, the compare-block formatter,
//! the [`context::ReferenceResolver`] that stitches issues, referenced pull
//! requests, and compare diffs into one enriched context blob, and the
//! release/issue/advisory collectors built on top.
//!
//! The resolver and every collector share one [`techwire::RunCache`] and one
//! client, so call paths that naturally overlap (issue enrichment, PR
//! context assembly, release deep-crawl) never issue duplicate requests
//! within a run.

pub mod advisories;
pub mod api;
pub mod changelog;
pub mod client;
pub mod compare;
pub mod context;
pub mod issues;
pub mod refs;
pub mod releases;

pub use advisories::AdvisoryCollector;
pub use client::{GithubClient, GithubClientBuilder, GithubError};
pub use context::ReferenceResolver;
pub use issues::IssueCollector;
pub use refs::ReferenceExtractor;
pub use releases::ReleaseCollector;
