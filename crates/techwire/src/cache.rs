//! Per-run memoization shared by collectors and enrichers.
//!
//! The cache is keyed by `(namespace, key)` and holds raw JSON values so the
//! same entry can be decoded by every call path that overlaps on a fetch
//! (issue enrichment, PR context assembly, release deep-crawl). Negative
//! results are memoized exactly like successes: the first `None` computed for
//! a key is what every later caller sees for the remainder of the run.
//!
//! Entries live for one invocation and are dropped with the cache.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::error::{Error, Result};

type CacheKey = (String, String);
type CacheCell = Arc<OnceCell<Option<Value>>>;

/// Thread-safe, process-scoped memoization store.
///
/// `fetch` runs its compute at most once per `(namespace, key)`, even under
/// concurrent access from the orchestrator's worker pools: each key owns a
/// `OnceCell`, so racing callers wait on the first compute instead of
/// duplicating it. Compute errors are not memoized; the next caller retries.
#[derive(Debug, Default)]
pub struct RunCache {
    entries: DashMap<CacheKey, CacheCell>,
}

impl RunCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the memoized value for `(namespace, key)`, computing and
    /// storing it on first access. `None` results are stored too.
    pub async fn fetch<T, F, Fut>(&self, namespace: &str, key: &str, compute: F) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        let cell = self
            .entries
            .entry((namespace.to_string(), key.to_string()))
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .value()
            .clone();

        if let Some(cached) = cell.get() {
            debug!(
                namespace,
                key,
                value = %summarize(cached),
                "run cache hit"
            );
            return decode(cached);
        }

        let value = cell
            .get_or_try_init(|| async {
                match compute().await? {
                    Some(v) => serde_json::to_value(v)
                        .map(Some)
                        .map_err(|e| Error::parse(format!("cache encode {namespace}/{key}: {e}"))),
                    None => Ok(None),
                }
            })
            .await?;
        decode(value)
    }

    /// Number of memoized entries, for diagnostics and tests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn decode<T: DeserializeOwned>(value: &Option<Value>) -> Result<Option<T>> {
    value
        .as_ref()
        .map(|v| {
            serde_json::from_value(v.clone())
                .map_err(|e| Error::parse(format!("cache decode: {e}")))
        })
        .transpose()
}

/// Short value summary for hit logging. Never dumps the full value.
fn summarize(value: &Option<Value>) -> String {
    match value {
        None => "nil".to_string(),
        Some(Value::Null) => "null".to_string(),
        Some(Value::Bool(b)) => format!("bool({b})"),
        Some(Value::Number(_)) => "number".to_string(),
        Some(Value::String(s)) => format!("string({} chars)", s.chars().count()),
        Some(Value::Array(a)) => format!("array[{}]", a.len()),
        Some(Value::Object(m)) => {
            let keys: Vec<_> = m.keys().take(3).map(String::as_str).collect();
            format!("object{{{}}}", keys.join(", "))
        }
    }
}
