use crate::rss_utils::feed::extract_text_from_html;
use crate::types::{ArticleCandidate, CuratorError, ParsedEntry, ParsedFeed, Result};
use chrono::Utc;
use feed_rs::parser;
use tracing::{debug, info, warn};

#[derive(Default)]
pub struct FeedParser;

impl FeedParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse an RSS or Atom document. Entries without a link are dropped.
    pub fn parse_feed(&self, content: &str) -> Result<ParsedFeed> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let feed = parser::parse(content.as_bytes())
            .map_err(|e| CuratorError::Parse(format!("Failed to parse feed: {}", e)))?;

        let title = feed.title.map(|t| t.content);
        let total = feed.entries.len();
        let entries: Vec<ParsedEntry> = feed
            .entries
            .into_iter()
            .filter_map(|entry| self.parse_entry(entry))
            .collect();

        let dropped_without_link = total - entries.len();
        info!("Parsed feed with {} entries", entries.len());

        Ok(ParsedFeed {
            title,
            entries,
            dropped_without_link,
        })
    }

    fn parse_entry(&self, entry: feed_rs::model::Entry) -> Option<ParsedEntry> {
        let url = entry
            .links
            .first()
            .map(|link| link.href.trim().to_string())
            .filter(|href| !href.is_empty())?;

        let title = entry
            .title
            .map(|t| t.content.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| url.clone());

        Some(ParsedEntry {
            title,
            summary: entry.summary.map(|s| s.content),
            content: entry.content.and_then(|c| c.body),
            published_at: entry.published.map(|dt| dt.with_timezone(&Utc)),
            url,
        })
    }

    /// Turn parsed entries into candidates tagged with `source_tag`.
    pub fn to_candidates(&self, parsed: ParsedFeed, source_tag: &str) -> Vec<ArticleCandidate> {
        parsed
            .entries
            .into_iter()
            .map(|entry| {
                let summary_html = entry.summary.or(entry.content).unwrap_or_default();
                let summary = extract_text_from_html(&summary_html);
                if summary.chars().count() < 50 {
                    debug!(
                        "Summary for {} is very short ({} chars); filtering may be less accurate",
                        entry.url,
                        summary.chars().count()
                    );
                }
                ArticleCandidate {
                    url: entry.url,
                    title: entry.title,
                    summary,
                    published_at: entry.published_at,
                    source_tag: source_tag.to_string(),
                }
            })
            .collect()
    }
}

/// Warn when a feed contained entries without links.
pub fn report_dropped(parsed: &ParsedFeed, feed_url: &str) {
    if parsed.dropped_without_link > 0 {
        warn!(
            "Excluded {} entries without links from {}",
            parsed.dropped_without_link, feed_url
        );
    }
}
