//! Shared tuning constants for the collection engine.

use std::time::Duration;

/// Connect timeout applied to every outbound HTTP client.
pub const DEFAULT_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Overall request timeout applied to every outbound HTTP client.
pub const DEFAULT_HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Character cap for an assembled release body.
pub const RELEASE_BODY_MAX_CHARS: usize = 6_000;

/// Character cap for issue, advisory, and feed item bodies.
pub const ITEM_BODY_MAX_CHARS: usize = 4_000;

/// Character cap for a changelog-file excerpt merged into a release body.
pub const CHANGELOG_EXCERPT_MAX_CHARS: usize = 2_500;

/// Reference-extraction cap applied when no platform token is configured.
/// One constant for every call path that needs it.
pub const UNAUTH_REF_LIMIT: usize = 5;

/// Comments included per linked reference: with a token / without.
pub const LINKED_COMMENTS_WITH_TOKEN: usize = 10;
pub const LINKED_COMMENTS_WITHOUT_TOKEN: usize = 3;

/// Engagement score (`comments + total reactions`) at which an issue or
/// pull request becomes notable.
pub const ENGAGEMENT_THRESHOLD: u64 = 3;

/// Source-level / repo-level worker pool defaults, token-aware.
pub const MAX_COLLECT_THREADS_WITH_TOKEN: usize = 4;
pub const MAX_REPO_THREADS_WITH_TOKEN: usize = 3;
pub const MAX_COLLECT_THREADS_WITHOUT_TOKEN: usize = 2;
pub const MAX_REPO_THREADS_WITHOUT_TOKEN: usize = 2;

/// Maximum redirects followed when fetching syndication feeds.
pub const FEED_MAX_REDIRECTS: usize = 5;

/// Tag-list cap for the tags-only / auto-fallback release path.
pub const TAG_LOOKUP_LIMIT: usize = 20;

/// Candidate changelog files probed when a repo does not configure its own.
pub const DEFAULT_CHANGELOG_FILES: [&str; 5] = [
    "CHANGELOG.md",
    "CHANGES.md",
    "Changes.md",
    "HISTORY.md",
    "RELEASE_NOTES.md",
];
