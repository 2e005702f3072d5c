//! Digest rendering: one HTML document per run from a tera template.

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tera::{Context, Tera};

const TEMPLATE: &str = include_str!("templates/digest.html");

/// One rendered category block. `html` is already a trusted fragment from
/// the summarizer.
#[derive(Debug, Serialize)]
pub struct Section {
    pub title: String,
    pub html: String,
}

pub fn render_digest(
    run_id: &str,
    generated_at: DateTime<Utc>,
    cutoff: DateTime<Utc>,
    sections: &[Section],
) -> Result<String> {
    let mut tera = Tera::default();
    tera.add_raw_template("digest", TEMPLATE)
        .context("digest template")?;

    let mut context = Context::new();
    context.insert("run_id", run_id);
    context.insert("generated_on", &generated_at.format("%Y-%m-%d").to_string());
    context.insert("cutoff", &cutoff.format("%Y-%m-%d").to_string());
    context.insert("sections", sections);
    tera.render("digest", &context).context("digest render")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn renders_sections_in_order_with_raw_html() {
        let sections = vec![
            Section { title: "frontend".into(), html: "<ul><li>one</li></ul>".into() },
            Section { title: "backend".into(), html: "<p>two</p>".into() },
        ];
        let html = render_digest(
            "ab12cd34",
            Utc.with_ymd_and_hms(2026, 2, 20, 1, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 2, 13, 16, 0, 0).unwrap(),
            &sections,
        )
        .unwrap();

        assert!(html.contains("Weekly Tech Digest"));
        assert!(html.contains("Covering activity since 2026-02-13."));
        assert!(html.contains("<ul><li>one</li></ul>"));
        let frontend_at = html.find("frontend").unwrap();
        let backend_at = html.find("backend").unwrap();
        assert!(frontend_at < backend_at);
        assert!(html.contains("run ab12cd34"));
    }

    #[test]
    fn empty_sections_still_render_a_document() {
        let html = render_digest(
            "ab12cd34",
            Utc.with_ymd_and_hms(2026, 2, 20, 1, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 2, 13, 16, 0, 0).unwrap(),
            &[],
        )
        .unwrap();
        assert!(html.contains("<h1>Weekly Tech Digest</h1>"));
    }
}
