use crate::config::{AiSettings, Settings};
use crate::fetcher::ContentFetcher;
use crate::filter::ArticleFilter;
use crate::llm_adapter::{LlmAdapter, OpenAiAdapter};
use crate::output::{ApiPusher, LocalWriter, OutputMethod};
use crate::sources::RssFeedSource;
use crate::state::SqliteStateStore;
use crate::summary::RunSummary;
use crate::traits::{ContentSource, Dispatcher, FeedSource};
use crate::transform::{is_failure_output, MarkdownTransformer};
use crate::types::{
    ArticleCandidate, CuratorError, FilterTrail, FilterVerdict, ProcessingStatus, QualityType,
    Relevance, Result,
};
use std::sync::Arc;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

/// Single-run batch orchestrator.
///
/// Every candidate moves strictly through summary filter, fetch, content
/// filter, transform and dispatch, recording a status after each step. The
/// first non-accepting step ends that candidate's run.
pub struct Pipeline {
    feed_source: Box<dyn FeedSource>,
    content_source: Box<dyn ContentSource>,
    filter: ArticleFilter,
    transformer: MarkdownTransformer,
    dispatcher: Box<dyn Dispatcher>,
    state: SqliteStateStore,
    accepted_relevance: Vec<Relevance>,
    accepted_quality: Vec<QualityType>,
    accepted_content_quality: Vec<QualityType>,
}

impl Pipeline {
    /// Wire the production collaborators from configuration.
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let state = SqliteStateStore::connect(&settings.state.db_file).await?;
        let llm: Arc<dyn LlmAdapter> = Arc::new(OpenAiAdapter::from_settings(&settings.ai_filter));

        let method = settings.output.method();
        info!("Configured output method: {}", method);
        let dispatcher: Box<dyn Dispatcher> = match method {
            OutputMethod::Api => Box::new(ApiPusher::new(settings.target_api.clone())),
            OutputMethod::Local => {
                info!("Local save directory: {}", settings.output.local_dir.display());
                Box::new(LocalWriter::new(settings.output.local_dir.clone()))
            }
        };

        PipelineBuilder::new()
            .feed_source(Box::new(RssFeedSource::new(settings.feeds.clone(), &settings.fetch)?))
            .content_source(Box::new(ContentFetcher::new(&settings.fetch)?))
            .llm(llm, &settings.ai_filter)
            .dispatcher(dispatcher)
            .state(state)
            .build()
    }

    pub fn state(&self) -> &SqliteStateStore {
        &self.state
    }

    /// Execute one batch run. Only feed acquisition can fail the run.
    pub async fn run(&self) -> Result<RunSummary> {
        let run_id = Uuid::new_v4();
        self.run_inner()
            .instrument(info_span!("run", run_id = %run_id))
            .await
    }

    async fn run_inner(&self) -> Result<RunSummary> {
        info!("--- Starting feed curation run ---");
        let mut summary = RunSummary::default();

        let candidates = self.feed_source.pull().await.map_err(|e| {
            error!("Failed to fetch or parse feeds from {}: {}", self.feed_source.source_name(), e);
            e
        })?;

        if candidates.is_empty() {
            info!("No articles found in the configured feeds.");
            summary.log(self.dispatcher.method());
            return Ok(summary);
        }

        summary.total_fetched = candidates.len();
        info!("Found {} unique articles", summary.total_fetched);

        for (index, candidate) in candidates.iter().enumerate() {
            info!(
                "[{}/{}] Processing article: '{}' ({})",
                index + 1,
                summary.total_fetched,
                candidate.title,
                candidate.url
            );
            self.process_article(candidate, &mut summary).await;
        }

        summary.log(self.dispatcher.method());
        Ok(summary)
    }

    /// Drive one candidate through the stages. Never fails; every outcome
    /// ends up as a status in the ledger and a counter in `summary`.
    pub async fn process_article(&self, candidate: &ArticleCandidate, summary: &mut RunSummary) {
        let url = candidate.url.as_str();

        if self.state.is_processed(url).await {
            info!("Skipping already processed article: {}", url);
            summary.skipped_processed += 1;
            return;
        }

        let mut trail = FilterTrail::default();

        // Stage 1: title + summary
        let Some(verdict) = self.filter.filter_summary(candidate).await else {
            error!("Summary filtering failed for {}", url);
            self.mark(candidate, ProcessingStatus::FailedFilterStage1, &trail, summary).await;
            return;
        };
        trail.stage1 = Some(verdict);
        if !verdict.is_accepted(&self.accepted_relevance, &self.accepted_quality) {
            info!("Rejected by summary filter: {} ({})", url, describe(&verdict));
            self.mark(candidate, ProcessingStatus::FilteredOutStage1, &trail, summary).await;
            return;
        }
        info!("Passed summary filter: {} ({})", url, describe(&verdict));
        self.mark(candidate, ProcessingStatus::PassedFilterStage1, &trail, summary).await;

        // Full content
        let Some(content) = self.content_source.fetch_content(url).await else {
            error!("Failed to fetch or extract content for {}", url);
            self.mark(candidate, ProcessingStatus::FailedFetch, &trail, summary).await;
            return;
        };

        // Stage 2: full content
        let Some(verdict) = self.filter.filter_content(url, &content).await else {
            error!("Content filtering failed for {}", url);
            self.mark(candidate, ProcessingStatus::FailedFilterStage2, &trail, summary).await;
            return;
        };
        trail.stage2 = Some(verdict);
        if !verdict.is_accepted(&self.accepted_relevance, &self.accepted_content_quality) {
            info!("Rejected by content filter: {} ({})", url, describe(&verdict));
            self.mark(candidate, ProcessingStatus::FilteredOutStage2, &trail, summary).await;
            return;
        }
        info!("Passed content filter: {} ({})", url, describe(&verdict));
        self.mark(candidate, ProcessingStatus::PassedFilterStage2, &trail, summary).await;

        // Transform
        let markdown = self.transformer.transform(url, &content).await;
        if is_failure_output(&markdown) {
            error!("AI content processing failed for {}: {}", url, markdown);
            self.mark(candidate, ProcessingStatus::FailedAiProcessing, &trail, summary).await;
            return;
        }
        self.mark(candidate, ProcessingStatus::Processed, &trail, summary).await;

        // Dispatch
        let outcome = self.dispatcher.dispatch(candidate, &markdown).await;
        let status = match (self.dispatcher.method(), outcome.success) {
            (OutputMethod::Api, true) => ProcessingStatus::Pushed,
            (OutputMethod::Api, false) => ProcessingStatus::FailedPush,
            (OutputMethod::Local, true) => ProcessingStatus::SavedLocal,
            (OutputMethod::Local, false) => ProcessingStatus::FailedSaveLocal,
        };
        if outcome.success {
            info!("Delivered {} to {}", url, outcome.destination);
        } else {
            error!("Failed to deliver {} to {}", url, outcome.destination);
        }
        self.mark(candidate, status, &trail, summary).await;
    }

    async fn mark(
        &self,
        candidate: &ArticleCandidate,
        status: ProcessingStatus,
        trail: &FilterTrail,
        summary: &mut RunSummary,
    ) {
        debug!("{} -> {}", candidate.url, status);
        self.state
            .mark_status(
                &candidate.url,
                status,
                Some(&candidate.title),
                trail.to_json().as_deref(),
            )
            .await;
        summary.record(status);
    }
}

fn describe(verdict: &FilterVerdict) -> String {
    format!("relevance: {}, quality: {}", verdict.relevance, verdict.quality_type)
}

/// Explicit wiring of pipeline collaborators.
#[derive(Default)]
pub struct PipelineBuilder {
    feed_source: Option<Box<dyn FeedSource>>,
    content_source: Option<Box<dyn ContentSource>>,
    llm: Option<(Arc<dyn LlmAdapter>, AiSettings)>,
    dispatcher: Option<Box<dyn Dispatcher>>,
    state: Option<SqliteStateStore>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed_source(mut self, source: Box<dyn FeedSource>) -> Self {
        info!("Adding feed source to pipeline: {}", source.source_name());
        self.feed_source = Some(source);
        self
    }

    pub fn content_source(mut self, source: Box<dyn ContentSource>) -> Self {
        self.content_source = Some(source);
        self
    }

    /// Classifier used by both filters and the transform, plus the
    /// model names, prompt inputs and acceptance sets.
    pub fn llm(mut self, llm: Arc<dyn LlmAdapter>, settings: &AiSettings) -> Self {
        info!("Using LLM adapter: {}", llm.adapter_name());
        self.llm = Some((llm, settings.clone()));
        self
    }

    pub fn dispatcher(mut self, dispatcher: Box<dyn Dispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn state(mut self, state: SqliteStateStore) -> Self {
        self.state = Some(state);
        self
    }

    pub fn build(self) -> Result<Pipeline> {
        let missing = |what: &str| CuratorError::Config(format!("pipeline is missing a {}", what));

        let (llm, ai) = self.llm.ok_or_else(|| missing("LLM adapter"))?;
        Ok(Pipeline {
            feed_source: self.feed_source.ok_or_else(|| missing("feed source"))?,
            content_source: self.content_source.ok_or_else(|| missing("content source"))?,
            filter: ArticleFilter::new(Arc::clone(&llm), &ai),
            transformer: MarkdownTransformer::new(llm, &ai),
            dispatcher: self.dispatcher.ok_or_else(|| missing("dispatcher"))?,
            state: self.state.ok_or_else(|| missing("state store"))?,
            accepted_relevance: ai.accepted_relevance.clone(),
            accepted_quality: ai.accepted_quality.clone(),
            accepted_content_quality: ai.accepted_content_quality().to_vec(),
        })
    }
}
