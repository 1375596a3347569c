use crate::output::{DispatchOutcome, OutputMethod};
use crate::types::{ArticleCandidate, Result};
use async_trait::async_trait;

/// Trait for pulling article candidates from configured feeds
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Human-readable name for this source
    fn source_name(&self) -> String;

    /// Fetch candidates, deduplicated by URL in first-seen order.
    /// An error here is fatal for the run.
    async fn pull(&self) -> Result<Vec<ArticleCandidate>>;
}

/// Trait for retrieving the main content of an article page
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Main-content HTML (or text) for `url`, `None` on any failure
    async fn fetch_content(&self, url: &str) -> Option<String>;
}

/// Delivery strategy for transformed articles
#[async_trait]
pub trait Dispatcher: Send + Sync {
    fn method(&self) -> OutputMethod;

    async fn dispatch(&self, candidate: &ArticleCandidate, markdown: &str) -> DispatchOutcome;
}
