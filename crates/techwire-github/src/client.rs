//! Rate-limit-aware JSON client for the hosting platform's API.
//!
//! Two independent retry budgets: rate-limit responses (429, or 403 whose
//! body carries the platform's throttling phrases) back off with
//! `Retry-After` when the server provides it and bounded exponential
//! backoff otherwise; transient transport failures retry on a shorter,
//! separate budget. Any other 4xx propagates immediately so callers can
//! translate 404 into a negative cache entry and skip auth-failed
//! endpoints for the rest of the run.

use std::time::Duration;

use reqwest::header::{HeaderMap, ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::warn;

use techwire::constants::{DEFAULT_HTTP_CONNECT_TIMEOUT, DEFAULT_HTTP_REQUEST_TIMEOUT};
use techwire::Error;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_WEB_BASE: &str = "https://github.com";

/// Page size used whenever the client paginates.
pub const PAGE_SIZE: usize = 100;

const MAX_RATE_LIMIT_RETRIES: u32 = 4;
const RATE_LIMIT_BASE_WAIT_SECS: u64 = 2;
const RATE_LIMIT_MAX_WAIT_SECS: u64 = 30;
const MAX_TRANSPORT_RETRIES: u32 = 3;
const TRANSPORT_BASE_WAIT_SECS: u64 = 2;

const CLIENT_USER_AGENT: &str = concat!("techwire/", env!("CARGO_PKG_VERSION"));

/// 403 bodies that mean "throttled", not "forbidden".
const RATE_LIMIT_PHRASES: [&str; 3] = [
    "secondary rate",
    "rate limit exceeded",
    "abuse detection",
];

#[derive(Debug, thiserror::Error)]
pub enum GithubError {
    #[error("not found: {path}")]
    NotFound { path: String },

    #[error("rate limited after {retries} retries: {path}")]
    RateLimited { path: String, retries: u32 },

    #[error("transport failure for {path}: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("auth failure ({status}) for {path}")]
    Auth { status: u16, path: String },

    #[error("unexpected status {status} for {path}")]
    Status { status: u16, path: String },

    #[error("parse failure for {path}: {message}")]
    Parse { path: String, message: String },
}

impl From<GithubError> for Error {
    fn from(err: GithubError) -> Self {
        match err {
            GithubError::NotFound { .. } => Error::not_found(err.to_string()),
            GithubError::RateLimited { .. } => Error::rate_limited(err.to_string()),
            GithubError::Transport { .. } => Error::transport(err.to_string()),
            GithubError::Auth { .. } => Error::auth(err.to_string()),
            GithubError::Status { .. } => Error::collect(err.to_string()),
            GithubError::Parse { .. } => Error::parse(err.to_string()),
        }
    }
}

/// Rate-limit telemetry lifted off response headers and attached to the
/// client's warnings so throttling is diagnosable from logs alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct RateLimitInfo {
    pub remaining: Option<u64>,
    pub limit: Option<u64>,
    pub reset_at: Option<u64>,
    pub retry_after: Option<u64>,
}

impl RateLimitInfo {
    fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            remaining: header_u64(headers, "x-ratelimit-remaining"),
            limit: header_u64(headers, "x-ratelimit-limit"),
            reset_at: header_u64(headers, "x-ratelimit-reset"),
            retry_after: header_u64(headers, "retry-after").filter(|&v| v > 0),
        }
    }
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Authenticated JSON GETs with retry, backoff, and pagination. Immutable
/// after construction; safe to share across the worker pools.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_base: String,
    web_base: String,
    token: Option<String>,
}

impl GithubClient {
    #[must_use]
    pub fn builder() -> GithubClientBuilder {
        GithubClientBuilder::default()
    }

    /// Whether a platform token is configured. Several policies change on
    /// this: page sizes, pagination enablement, and reference-limit caps.
    #[must_use]
    pub fn token_present(&self) -> bool {
        self.token.is_some()
    }

    #[must_use]
    pub fn web_base(&self) -> &str {
        &self.web_base
    }

    /// GET a single JSON document. `path` is rooted at the API base.
    pub async fn get_json(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value, GithubError> {
        let url = format!("{}{}", self.api_base, path);
        let mut rate_retries = 0u32;
        let mut transport_retries = 0u32;

        loop {
            let mut request = self
                .http
                .get(&url)
                .query(query)
                .header(ACCEPT, "application/vnd.github+json")
                .header(USER_AGENT, CLIENT_USER_AGENT);
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) if is_transient(&e) && transport_retries < MAX_TRANSPORT_RETRIES => {
                    transport_retries += 1;
                    let wait =
                        Duration::from_secs(TRANSPORT_BASE_WAIT_SECS << (transport_retries - 1));
                    warn!(
                        path,
                        attempt = transport_retries,
                        wait_secs = wait.as_secs(),
                        error = %e,
                        "transient transport error, retrying"
                    );
                    tokio::time::sleep(wait).await;
                    continue;
                }
                Err(e) => {
                    return Err(GithubError::Transport {
                        path: path.to_string(),
                        source: e,
                    })
                }
            };

            let status = response.status();
            let telemetry = RateLimitInfo::from_headers(response.headers());

            if status.is_success() {
                return response.json::<Value>().await.map_err(|e| GithubError::Parse {
                    path: path.to_string(),
                    message: e.to_string(),
                });
            }
            if status == StatusCode::NOT_FOUND {
                return Err(GithubError::NotFound {
                    path: path.to_string(),
                });
            }

            let body = response.text().await.unwrap_or_default();
            if is_rate_limited(status, &body) {
                if rate_retries >= MAX_RATE_LIMIT_RETRIES {
                    return Err(GithubError::RateLimited {
                        path: path.to_string(),
                        retries: rate_retries,
                    });
                }
                rate_retries += 1;
                let wait = telemetry
                    .retry_after
                    .map(Duration::from_secs)
                    .unwrap_or_else(|| backoff_wait(rate_retries));
                warn!(
                    path,
                    attempt = rate_retries,
                    wait_secs = wait.as_secs(),
                    remaining = ?telemetry.remaining,
                    limit = ?telemetry.limit,
                    reset_at = ?telemetry.reset_at,
                    retry_after = ?telemetry.retry_after,
                    "rate limited, backing off"
                );
                tokio::time::sleep(wait).await;
                continue;
            }
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                return Err(GithubError::Auth {
                    status: status.as_u16(),
                    path: path.to_string(),
                });
            }
            return Err(GithubError::Status {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }
    }

    /// GET every page of an array endpoint: `per_page=100`, advancing until
    /// a page comes back short or empty.
    pub async fn get_paginated(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<Value>, GithubError> {
        let mut rows = Vec::new();
        let mut page = 1usize;
        loop {
            let mut q: Vec<(&str, String)> = query.to_vec();
            q.push(("per_page", PAGE_SIZE.to_string()));
            q.push(("page", page.to_string()));
            let batch = expect_array(self.get_json(path, &q).await?, path)?;
            let batch_len = batch.len();
            rows.extend(batch);
            if batch_len < PAGE_SIZE {
                break;
            }
            page += 1;
        }
        Ok(rows)
    }

    /// Non-paginating shortcut: one request with an explicit page size.
    /// Used by token-less callers to protect the rate budget.
    pub async fn get_capped(
        &self,
        path: &str,
        query: &[(&str, String)],
        per_page: usize,
    ) -> Result<Vec<Value>, GithubError> {
        let mut q: Vec<(&str, String)> = query.to_vec();
        q.push(("per_page", per_page.to_string()));
        expect_array(self.get_json(path, &q).await?, path)
    }
}

fn expect_array(value: Value, path: &str) -> Result<Vec<Value>, GithubError> {
    match value {
        Value::Array(rows) => Ok(rows),
        other => Err(GithubError::Parse {
            path: path.to_string(),
            message: format!("expected array, got {}", type_name(&other)),
        }),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_transient(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect()
}

fn is_rate_limited(status: StatusCode, body: &str) -> bool {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return true;
    }
    if status != StatusCode::FORBIDDEN {
        return false;
    }
    let lowered = body.to_ascii_lowercase();
    RATE_LIMIT_PHRASES.iter().any(|p| lowered.contains(p))
}

fn backoff_wait(retry: u32) -> Duration {
    let secs = (RATE_LIMIT_BASE_WAIT_SECS << (retry.saturating_sub(1))).min(RATE_LIMIT_MAX_WAIT_SECS);
    Duration::from_secs(secs)
}

#[derive(Debug, Default)]
pub struct GithubClientBuilder {
    api_base: Option<String>,
    web_base: Option<String>,
    token: Option<String>,
    request_timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
}

impl GithubClientBuilder {
    /// Point the client at a different API base (tests point it at a local
    /// mock server).
    #[must_use]
    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }

    #[must_use]
    pub fn web_base(mut self, base: impl Into<String>) -> Self {
        self.web_base = Some(base.into());
        self
    }

    #[must_use]
    pub fn token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<GithubClient, Error> {
        let http = reqwest::Client::builder()
            .timeout(self.request_timeout.unwrap_or(DEFAULT_HTTP_REQUEST_TIMEOUT))
            .connect_timeout(self.connect_timeout.unwrap_or(DEFAULT_HTTP_CONNECT_TIMEOUT))
            .build()
            .map_err(|e| Error::transport(format!("http client: {e}")))?;
        Ok(GithubClient {
            http,
            api_base: self
                .api_base
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            web_base: self
                .web_base
                .unwrap_or_else(|| DEFAULT_WEB_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            token: self.token,
        })
    }
}
