//! # Syndication feed collection for techwire
//!
//! Parses RSS 2.0 and Atom 1.0 feeds and upgrades entries that point at
//! known platforms: Redmine-style issue URLs get their description and
//! journals from the JSON API, hosting-platform issue/PR URLs go through
//! the same enrichment path the issue collector uses, and everything else
//! falls back to the entry summary with HTML tags stripped.

pub mod collector;
pub mod html;
pub mod parser;
pub mod redmine;

pub use collector::FeedCollector;
pub use parser::{parse_feed, FeedEntry};
