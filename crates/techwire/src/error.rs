//! Error taxonomy shared across the collection engine.
//!
//! Kinds map onto the recovery policy each deserves: rate limits and
//! transient transport failures are retried close to the wire, not-found
//! becomes a negative cache entry, parse failures demote a single fetch to
//! an empty result, auth failures skip the endpoint for the rest of the run,
//! and invariant violations surface immediately.

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The upstream resource does not exist; cached as a negative result.
    #[error("not found: {0}")]
    NotFound(String),

    /// The retry budget for a rate-limited endpoint is exhausted.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Transient transport failure that survived the middleware retries.
    #[error("transport error: {0}")]
    Transport(String),

    /// Upstream payload could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),

    /// Credentials rejected; the endpoint is skipped for the run.
    #[error("auth failure: {0}")]
    Auth(String),

    /// Invalid configuration document or environment toggle.
    #[error("config error: {0}")]
    Config(String),

    /// A source job failed in a way none of the other kinds cover.
    #[error("collect error: {0}")]
    Collect(String),

    /// Programming error; never expected at runtime.
    #[error("invariant violation: {0}")]
    Invariant(String),

    /// Cooperative shutdown was requested.
    #[error("cancelled")]
    Cancelled,
}

impl Error {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn collect(msg: impl Into<String>) -> Self {
        Self::Collect(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }

    /// Whether the error represents a missing upstream resource, i.e. the
    /// caller should record a negative cache entry and move on.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
