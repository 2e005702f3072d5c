//! The single capability every source kind exposes.

use async_trait::async_trait;

use crate::error::Result;
use crate::item::Item;

/// A source job: releases, issues, advisories, feeds, or a package
/// registry. The orchestrator only ever calls `collect`.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Stable name used in logs and failure reports.
    fn name(&self) -> &str;

    /// Gather every item this source produced within the run's cutoff
    /// window. Items older than the cutoff must not be returned.
    async fn collect(&self) -> Result<Vec<Item>>;
}
