//! RSS 2.0 / Atom 1.0 parsing.

use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;

use techwire::{Error, Result};

/// One syndication entry, format differences already smoothed over.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub title: String,
    pub url: String,
    pub published: Option<DateTime<Utc>>,
    pub summary: Option<String>,
}

#[derive(Debug, Default)]
struct PartialEntry {
    title: String,
    url: String,
    published: Option<DateTime<Utc>>,
    summary: Option<String>,
}

impl PartialEntry {
    fn finish(self) -> Option<FeedEntry> {
        if self.title.trim().is_empty() || self.url.trim().is_empty() {
            return None;
        }
        Some(FeedEntry {
            title: self.title.trim().to_string(),
            url: self.url.trim().to_string(),
            published: self.published,
            summary: self.summary.filter(|s| !s.trim().is_empty()),
        })
    }
}

/// Parse either feed dialect. Entries missing a title or link are dropped
/// rather than failing the whole document.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<PartialEntry> = None;
    let mut text_buffer = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match name.as_str() {
                    "item" | "entry" => {
                        current = Some(PartialEntry::default());
                    }
                    // Atom carries the link in an attribute; prefer the
                    // alternate relation and fall back to the first link.
                    "link" => {
                        if let Some(entry) = current.as_mut() {
                            let mut href = String::new();
                            let mut rel: Option<String> = None;
                            for attr in e.attributes().flatten() {
                                let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
                                let value = String::from_utf8_lossy(&attr.value).to_string();
                                match key.as_str() {
                                    "href" => href = value,
                                    "rel" => rel = Some(value),
                                    _ => {}
                                }
                            }
                            let alternate = rel.as_deref().map_or(true, |r| r == "alternate");
                            if !href.is_empty() && (alternate || entry.url.is_empty()) {
                                entry.url = href;
                            }
                        }
                    }
                    _ => {}
                }
                text_buffer.clear();
            }
            Ok(Event::Text(e)) => {
                text_buffer = e.unescape().unwrap_or_default().to_string();
            }
            Ok(Event::CData(e)) => {
                text_buffer = String::from_utf8_lossy(&e.into_inner()).to_string();
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match name.as_str() {
                    "item" | "entry" => {
                        if let Some(entry) = current.take().and_then(PartialEntry::finish) {
                            entries.push(entry);
                        }
                    }
                    _ => {
                        if let Some(entry) = current.as_mut() {
                            match name.as_str() {
                                "title" => entry.title = text_buffer.clone(),
                                // RSS link is element text.
                                "link" if entry.url.is_empty() => {
                                    entry.url = text_buffer.clone();
                                }
                                "pubDate" | "published" | "updated" => {
                                    if entry.published.is_none() || name == "published" {
                                        entry.published = parse_date(&text_buffer);
                                    }
                                }
                                "description" | "summary" => {
                                    entry.summary = Some(text_buffer.clone());
                                }
                                // Atom full content wins over the summary.
                                "content" | "content:encoded" => {
                                    if !text_buffer.trim().is_empty() {
                                        entry.summary = Some(text_buffer.clone());
                                    }
                                }
                                _ => {}
                            }
                        }
                    }
                }
                text_buffer.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::parse(format!("feed XML: {e}"))),
            _ => {}
        }
    }

    Ok(entries)
}

/// RSS uses RFC 2822 dates, Atom RFC 3339. Try both.
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Widget Weekly</title>
    <item>
      <title>Widgets 2.0 shipped</title>
      <link>https://blog.example.com/widgets-2</link>
      <pubDate>Tue, 10 Feb 2026 08:00:00 GMT</pubDate>
      <description><![CDATA[<p>Now with <b>batching</b></p>]]></description>
    </item>
    <item>
      <title>Untitled entry has no link</title>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Release notes</title>
  <entry>
    <title>v3 announcement</title>
    <link rel="alternate" href="https://example.org/v3"/>
    <link rel="enclosure" href="https://example.org/v3.tar.gz"/>
    <published>2026-02-11T10:00:00Z</published>
    <summary>Short summary</summary>
    <content type="html">&lt;p&gt;Long body&lt;/p&gt;</content>
  </entry>
</feed>"#;

    #[test]
    fn parses_rss_items() {
        let entries = parse_feed(RSS).unwrap();
        assert_eq!(entries.len(), 1, "entry without a link is dropped");
        let entry = &entries[0];
        assert_eq!(entry.title, "Widgets 2.0 shipped");
        assert_eq!(entry.url, "https://blog.example.com/widgets-2");
        assert_eq!(
            entry.published,
            Some("2026-02-10T08:00:00Z".parse().unwrap())
        );
        assert_eq!(entry.summary.as_deref(), Some("<p>Now with <b>batching</b></p>"));
    }

    #[test]
    fn parses_atom_entries_and_prefers_alternate_link() {
        let entries = parse_feed(ATOM).unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.title, "v3 announcement");
        assert_eq!(entry.url, "https://example.org/v3");
        assert_eq!(
            entry.published,
            Some("2026-02-11T10:00:00Z".parse().unwrap())
        );
        // Full content wins over the summary.
        assert_eq!(entry.summary.as_deref(), Some("<p>Long body</p>"));
    }

    #[test]
    fn atom_updated_serves_as_fallback_date() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <title>t</title>
    <link href="https://example.org/p"/>
    <updated>2026-02-12T00:00:00Z</updated>
  </entry>
</feed>"#;
        let entries = parse_feed(xml).unwrap();
        assert_eq!(
            entries[0].published,
            Some("2026-02-12T00:00:00Z".parse().unwrap())
        );
    }

    #[test]
    fn unparseable_dates_become_none() {
        let xml = r#"<rss><channel><item>
            <title>t</title>
            <link>https://example.org/p</link>
            <pubDate>yesterday-ish</pubDate>
        </item></channel></rss>"#;
        let entries = parse_feed(xml).unwrap();
        assert_eq!(entries[0].published, None);
    }

    #[test]
    fn mismatched_tags_are_a_parse_error() {
        assert!(parse_feed("<rss><channel></chunnel></rss>").is_err());
    }

    #[test]
    fn empty_feed_yields_no_entries() {
        let entries = parse_feed(r#"<rss version="2.0"><channel></channel></rss>"#).unwrap();
        assert!(entries.is_empty());
    }
}
