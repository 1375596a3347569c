use crate::config::FetchSettings;
use crate::parser::{report_dropped, FeedParser};
use crate::rss_utils::url::{is_valid_feed_url, source_tag_from_feed_url};
use crate::traits::FeedSource;
use crate::types::{ArticleCandidate, CuratorError, Result};
use crate::Fetcher;
use async_trait::async_trait;
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

/// Pulls every configured RSS/Atom feed and merges the entries.
pub struct RssFeedSource {
    feed_urls: Vec<String>,
    fetcher: Fetcher,
    parser: FeedParser,
}

impl RssFeedSource {
    pub fn new(feed_urls: Vec<String>, settings: &FetchSettings) -> Result<Self> {
        Ok(Self {
            feed_urls,
            fetcher: Fetcher::new(settings)?,
            parser: FeedParser::new(),
        })
    }

    pub fn feed_urls(&self) -> &[String] {
        &self.feed_urls
    }

    /// Download and parse one feed, tagging entries with its source tag.
    pub async fn pull_feed(&self, url: &str) -> Result<Vec<ArticleCandidate>> {
        if !is_valid_feed_url(url) {
            return Err(CuratorError::Feed(format!("not an http(s) feed URL: {}", url)));
        }
        let source_tag = source_tag_from_feed_url(url);
        debug!("Fetching feed {} (source tag: {})", url, source_tag);

        let fetch_result = self.fetcher.fetch_feed(url).await;
        if !fetch_result.success {
            let error_msg = fetch_result.error.unwrap_or_else(|| "Fetch failed".to_string());
            return Err(CuratorError::Feed(format!(
                "{}: {} (after {} ms)",
                url, error_msg, fetch_result.response_time_ms
            )));
        }
        debug!("Feed {} answered in {} ms", url, fetch_result.response_time_ms);
        let Some(content) = fetch_result.content else {
            warn!("No content returned for feed {}", url);
            return Ok(Vec::new());
        };

        let parsed = self.parser.parse_feed(&content)?;
        report_dropped(&parsed, url);
        if parsed.entries.is_empty() {
            warn!("No entries found in feed: {}", url);
        }
        let candidates = self.parser.to_candidates(parsed, &source_tag);
        info!("Fetched {} valid entries from {}", candidates.len(), url);
        Ok(candidates)
    }
}

/// Keep the first occurrence of every URL, preserving order.
pub fn dedup_by_url(candidates: Vec<ArticleCandidate>) -> Vec<ArticleCandidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| {
            let fresh = seen.insert(c.url.clone());
            if !fresh {
                debug!("Skipping duplicate entry from a different feed: {}", c.url);
            }
            fresh
        })
        .collect()
}

#[async_trait]
impl FeedSource for RssFeedSource {
    fn source_name(&self) -> String {
        format!("RSS feeds ({})", self.feed_urls.len())
    }

    async fn pull(&self) -> Result<Vec<ArticleCandidate>> {
        if self.feed_urls.is_empty() {
            warn!("No feed URLs configured.");
            return Ok(Vec::new());
        }

        info!("Fetching {} feeds...", self.feed_urls.len());
        let mut all = Vec::new();
        let mut failures = 0;
        for url in &self.feed_urls {
            match self.pull_feed(url).await {
                Ok(candidates) => all.extend(candidates),
                Err(e) => {
                    error!("Failed to fetch or parse feed {}: {}", url, e);
                    failures += 1;
                }
            }
        }

        if failures == self.feed_urls.len() {
            return Err(CuratorError::Feed(format!(
                "all {} configured feeds failed",
                failures
            )));
        }

        let unique = dedup_by_url(all);
        info!("Extracted {} unique articles", unique.len());
        Ok(unique)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(url: &str, tag: &str) -> ArticleCandidate {
        ArticleCandidate {
            url: url.to_string(),
            title: url.to_string(),
            summary: String::new(),
            published_at: None,
            source_tag: tag.to_string(),
        }
    }

    #[test]
    fn first_occurrence_wins() {
        let out = dedup_by_url(vec![
            candidate("https://a", "one"),
            candidate("https://b", "one"),
            candidate("https://a", "two"),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].source_tag, "one");
        assert_eq!(out[1].url, "https://b");
    }
}
