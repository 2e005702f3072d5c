//! Summarization boundary.
//!
//! The engine hands each category's ordered item list to a `Summarizer`
//! and gets back an HTML fragment. With credentials configured that goes
//! through an OpenAI-compatible chat-completions endpoint; without them
//! (and in tests) the passthrough implementation renders the items
//! directly so a run always produces a digest.

use anyhow::{anyhow, Context as _, Result};
use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use techwire::config::Importance;
use techwire::text::truncate_chars;
use techwire::{Category, Item};

/// Characters of item body forwarded to the model per item.
const SUMMARY_INPUT_ITEM_CHARS: usize = 1_500;

/// Characters of item body shown by the passthrough renderer.
const PASSTHROUGH_BODY_CHARS: usize = 400;

pub const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Produce the HTML fragment for one category.
    async fn summarize(&self, category: Category, items: &[Item]) -> Result<String>;
}

/// No-credentials fallback: a plain HTML listing of the collected items.
pub struct PassthroughSummarizer;

#[async_trait]
impl Summarizer for PassthroughSummarizer {
    async fn summarize(&self, category: Category, items: &[Item]) -> Result<String> {
        if items.is_empty() {
            return Ok(format!("<p>No data for {category}.</p>"));
        }
        let mut out = String::from("<ul>\n");
        for item in items {
            out.push_str(&format!(
                "<li><a href=\"{}\">{}</a> <em>({})</em><br/>{}</li>\n",
                escape_html(&item.url),
                escape_html(&item.title),
                escape_html(&item.source_label),
                escape_html(&truncate_chars(&item.body, PASSTHROUGH_BODY_CHARS))
            ));
        }
        out.push_str("</ul>");
        Ok(out)
    }
}

/// OpenAI-compatible chat-completions summarizer.
pub struct OpenAiSummarizer {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    min_importance: Importance,
}

impl OpenAiSummarizer {
    pub fn new(
        api_key: impl Into<String>,
        api_base: impl Into<String>,
        model: impl Into<String>,
        min_importance: Importance,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("summarizer http client")?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            min_importance,
        })
    }

    fn system_prompt(&self) -> String {
        format!(
            "You are compiling a weekly technology digest. Summarize the \
             supplied items as a compact HTML fragment (headings, lists, \
             links). Rate each item's importance as critical, high, medium, \
             or low, and drop anything below {:?} importance. Do not invent \
             items.",
            self.min_importance
        )
    }

    fn items_prompt(category: Category, items: &[Item]) -> String {
        let mut out = format!("Category: {category}\n\n");
        for item in items {
            out.push_str(&format!(
                "## {}\nURL: {}\nSource: {}\nPublished: {}\n{}\n\n",
                item.title,
                item.url,
                item.source_label,
                item.published_at.to_rfc3339(),
                truncate_chars(&item.body, SUMMARY_INPUT_ITEM_CHARS)
            ));
        }
        out
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, category: Category, items: &[Item]) -> Result<String> {
        if items.is_empty() {
            return Ok(format!("<p>No data for {category}.</p>"));
        }

        let url = format!("{}/chat/completions", self.api_base);
        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": self.system_prompt()},
                {"role": "user", "content": Self::items_prompt(category, items)}
            ],
            "temperature": 0.2
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("summarization request for {category}"))?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("summarization for {category} failed: status {status}"));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .with_context(|| format!("summarization response for {category}"))?;
        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow!("summarization response for {category} has no content"))?;
        info!(category = %category, chars = content.len(), "category summarized");
        Ok(content.to_string())
    }
}

pub fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
