//! # techwire core
//!
//! The collection engine behind the weekly technology digest: canonical
//! [`Item`]s, the per-run [`cache::RunCache`], the [`Collector`] capability
//! implemented by every source kind, and the [`orchestrator`] that runs the
//! configured sources for each category under bounded concurrency and emits a
//! deterministically ordered item list.
//!
//! ## Features
//!
//! - One `Item` type flowing unchanged from collectors to summarization
//! - Process-scoped memoization shared by every collector and enricher
//! - Ordered bounded-concurrency mapping (results keep input order)
//! - Release deduplication across hosting-platform and registry sources
//!
//! Source-specific collectors live in the sibling crates
//! (`techwire-github`, `techwire-feeds`, `techwire-registry`).

pub mod cache;
pub mod collector;
pub mod concurrent;
pub mod config;
pub mod constants;
pub mod error;
pub mod item;
pub mod orchestrator;
pub mod text;

pub use cache::RunCache;
pub use collector::Collector;
pub use config::{
    Category, FeedRef, RegistryKind, RegistryRef, ReleaseStrategy, RepoRef, RuntimeOptions,
    SourceConfig,
};
pub use error::{Error, Result};
pub use item::{Item, SourceKind};
pub use orchestrator::CategoryOrchestrator;

/// Short opaque identifier stamped at invocation and carried through log
/// spans for correlation. Discarded at run end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunId(String);

impl RunId {
    /// Generate a fresh 8-hex-char run id.
    #[must_use]
    pub fn generate() -> Self {
        let hex = uuid::Uuid::new_v4().simple().to_string();
        Self(hex[..8].to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_is_eight_hex_chars() {
        let id = RunId::generate();
        assert_eq!(id.as_str().len(), 8);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn run_ids_are_unique_enough() {
        let a = RunId::generate();
        let b = RunId::generate();
        assert_ne!(a, b);
    }
}
