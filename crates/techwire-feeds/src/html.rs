//! HTML tag stripping for plain feed summaries.

use scraper::Html;

use techwire::text::collapse_whitespace;

/// Drop markup from an HTML fragment and collapse the remaining
/// whitespace into single spaces.
#[must_use]
pub fn strip_tags(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text: Vec<&str> = fragment.root_element().text().collect();
    collapse_whitespace(&text.join(" "))
}
