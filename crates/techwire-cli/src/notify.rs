//! Delivery boundary. The outbound mail transport lives outside this
//! repo; the shipped implementations log the hand-off or, for dry runs,
//! write the document to a well-known file.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use tracing::info;

/// Where a dry run leaves the rendered digest.
pub const DRY_RUN_OUTPUT: &str = "digest.html";

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, subject: &str, html: &str) -> Result<()>;
}

/// Hands the document off to the (external) mail step by logging it.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, subject: &str, html: &str) -> Result<()> {
        info!(subject, bytes = html.len(), "digest ready for delivery");
        Ok(())
    }
}

/// Dry-run sink: writes the HTML document to disk.
pub struct FileNotifier {
    path: PathBuf,
}

impl FileNotifier {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Notifier for FileNotifier {
    async fn deliver(&self, subject: &str, html: &str) -> Result<()> {
        tokio::fs::write(&self.path, html)
            .await
            .with_context(|| format!("write {}", self.path.display()))?;
        info!(subject, path = %self.path.display(), "dry run: digest written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_notifier_writes_the_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("digest.html");
        FileNotifier::new(&path)
            .deliver("Weekly Tech Digest", "<html>ok</html>")
            .await
            .unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "<html>ok</html>");
    }

    #[tokio::test]
    async fn log_notifier_always_succeeds() {
        LogNotifier.deliver("s", "<html/>").await.unwrap();
    }
}
