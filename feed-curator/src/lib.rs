pub mod config;
pub mod cookies;
pub mod extract;
pub mod fetcher;
pub mod filter;
pub mod llm_adapter;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod rss_utils;
pub mod sources;
pub mod state;
pub mod summary;
pub mod traits;
pub mod transform;
pub mod types;

pub use config::Settings;
pub use fetcher::{ContentFetcher, Fetcher};
pub use llm_adapter::{LlmAdapter, MockLlmAdapter, OpenAiAdapter};
pub use parser::FeedParser;
pub use pipeline::{Pipeline, PipelineBuilder};
pub use state::SqliteStateStore;
pub use summary::RunSummary;
pub use types::*;
