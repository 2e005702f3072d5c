//! The canonical digest item emitted by every collector.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which source kind produced an item. Consumed by release deduplication,
/// which prefers hosting-platform releases over registry entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Release,
    Issue,
    Advisory,
    Feed,
    Registry,
}

impl SourceKind {
    /// Priority used when deduplicating release announcements.
    #[must_use]
    pub fn release_rank(self) -> u8 {
        match self {
            SourceKind::Release => 2,
            SourceKind::Registry => 1,
            SourceKind::Issue | SourceKind::Advisory | SourceKind::Feed => 0,
        }
    }
}

/// One digest entry. Immutable once emitted by a collector; flows unchanged
/// to summarization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub title: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    pub body: String,
    pub source_label: String,
    pub kind: SourceKind,
}

/// Deterministic output ordering: newest first, then title, source label,
/// and URL. Applied after deduplication regardless of collection scheduling.
pub fn sort_items(items: &mut [Item]) {
    items.sort_by(|a, b| {
        b.published_at
            .cmp(&a.published_at)
            .then_with(|| a.title.cmp(&b.title))
            .then_with(|| a.source_label.cmp(&b.source_label))
            .then_with(|| a.url.cmp(&b.url))
    });
}
