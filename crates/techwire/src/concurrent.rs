//! Ordered bounded-concurrency mapping.
//!
//! Collection fans out at two levels (sources within a category, repos
//! within a source). Both pools need the same guarantee: results come back
//! in input order no matter how the individual futures interleave, so the
//! flattened item list is a pure function of the inputs.

use std::future::Future;

use futures::stream::{self, StreamExt};

/// Map `f` over `items` with at most `limit` futures in flight.
///
/// Output order always matches input order. With `limit <= 1` (parallelism
/// disabled) or a single item, execution degrades to a plain sequential
/// loop.
pub async fn map_bounded<T, U, F, Fut>(items: Vec<T>, limit: usize, f: F) -> Vec<U>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = U>,
{
    if limit <= 1 || items.len() <= 1 {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            out.push(f(item).await);
        }
        return out;
    }

    stream::iter(items.into_iter().map(f))
        .buffered(limit)
        .collect()
        .await
}
