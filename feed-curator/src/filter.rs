use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, warn};

use crate::config::AiSettings;
use crate::llm_adapter::{CompletionRequest, LlmAdapter, LlmError};
use crate::rss_utils::text::truncate_chars;
use crate::types::{ArticleCandidate, FilterVerdict};

pub const SUMMARY_CHAR_LIMIT: usize = 1500;
pub const CONTENT_CHAR_LIMIT: usize = 16000;
pub const MIN_CONTENT_CHARS: usize = 50;
pub const TRUNCATION_MARKER: &str = "... (content truncated)";
const FILTER_TEMPERATURE: f32 = 0.2;

const QUALITY_SCALE: &str = "(Answer: In-depth / Opinion / Overview / Shallow / Promotional / Low-Quality)";

/// Two-pass relevance/quality classifier.
///
/// Both passes return `None` on any failure: adapter error, non-JSON
/// response, or a response missing either field.
pub struct ArticleFilter {
    llm: Arc<dyn LlmAdapter>,
    interests: Vec<String>,
    dislikes: Vec<String>,
    summary_model: String,
    content_model: String,
}

impl ArticleFilter {
    pub fn new(llm: Arc<dyn LlmAdapter>, settings: &AiSettings) -> Self {
        Self {
            llm,
            interests: settings.interests.clone(),
            dislikes: settings.dislikes.clone(),
            summary_model: settings.filtering_model.clone(),
            content_model: settings.content_filtering_model().to_string(),
        }
    }

    pub fn summary_prompt(&self, candidate: &ArticleCandidate) -> String {
        let (summary, _) = truncate_chars(&candidate.summary, SUMMARY_CHAR_LIMIT);
        format!(
            r#"Analyze the following article based ONLY on its title and summary. Assess its relevance to my interests and rigorously evaluate its likely quality and depth.

My interests are: {interests}
Filter out articles primarily about: {dislikes}, as well as articles that look superficial, promotional, clickbait, or lacking substance.

Title: "{title}"
Summary: "{summary}"

Evaluate:
1. Relevance: how relevant is the topic to my interests? (Answer: High / Medium / Low / None)
2. Quality/Type: the likely depth and quality judging from title and summary alone.
   - In-depth: deep analysis, original research, or rigorous technical detail.
   - Opinion: a well-reasoned, potentially insightful opinion piece.
   - Overview: a general summary, possibly lacking depth.
   - Shallow: superficial, a listicle without substance, or generic advice.
   - Promotional: marketing or product promotion.
   - Low-Quality: clickbait, poorly written, or lacking credibility.
   {scale}

Be critical. If it looks shallow or promotional, classify it as such.

Output strictly a JSON object with keys "relevance" and "quality_type".
Example: {{"relevance": "High", "quality_type": "In-depth"}}"#,
            interests = self.interests.join(", "),
            dislikes = self.dislikes.join(", "),
            title = candidate.title,
            summary = summary,
            scale = QUALITY_SCALE,
        )
    }

    pub fn content_prompt(&self, url: &str, content: &str) -> String {
        let (body, truncated) = truncate_chars(content, CONTENT_CHAR_LIMIT);
        let marker = if truncated { TRUNCATION_MARKER } else { "" };
        format!(
            r#"Critically analyze the following article based on its full HTML content. Focus on the main substance and ignore boilerplate.
My interests are: {interests}
Filter out articles primarily about: {dislikes}, AND articles lacking depth, originality, or rigorous analysis, even when related to my interests.

Article HTML content (from {url}):
```html
{body}
```
{marker}

Evaluate the actual substance, depth and originality of the content:
1. Relevance: is the core topic relevant to my interests? (Answer: High / Medium / Low / None)
2. Quality/Type:
   - In-depth: significant depth, rigorous analysis, original insight, or substantial technical detail.
   - Opinion: a well-reasoned, substantiated opinion.
   - Overview: a general survey without significant depth.
   - Shallow: generic advice, platitudes, or superficial analysis.
   - Promotional: mainly marketing or selling.
   - Low-Quality: poorly written, unoriginal, or lacking credibility.
   {scale}

Be very strict. Only use 'In-depth' or 'Opinion' when the article genuinely shows those qualities.

Output strictly a JSON object with keys "relevance" and "quality_type".
Example: {{"relevance": "Medium", "quality_type": "Opinion"}}"#,
            interests = self.interests.join(", "),
            dislikes = self.dislikes.join(", "),
            url = url,
            body = body,
            marker = marker,
            scale = QUALITY_SCALE,
        )
    }

    /// Stage 1: judge an entry from its title and summary.
    pub async fn filter_summary(&self, candidate: &ArticleCandidate) -> Option<FilterVerdict> {
        if self.interests.is_empty() {
            warn!("No interests configured. Filtering may be ineffective.");
        }
        let request = CompletionRequest {
            model: self.summary_model.clone(),
            prompt: self.summary_prompt(candidate),
            temperature: FILTER_TEMPERATURE,
            json_response: true,
        };
        debug!("Sending summary filter request for {}", candidate.url);
        self.classify(request, &candidate.url).await
    }

    /// Stage 2: judge the fetched article body.
    pub async fn filter_content(&self, url: &str, content: &str) -> Option<FilterVerdict> {
        if self.interests.is_empty() {
            warn!("No interests configured. Content filtering may be ineffective.");
        }
        if content.chars().count() < MIN_CONTENT_CHARS {
            warn!("Content for {} is too short or empty for content filtering", url);
            return None;
        }
        let request = CompletionRequest {
            model: self.content_model.clone(),
            prompt: self.content_prompt(url, content),
            temperature: FILTER_TEMPERATURE,
            json_response: true,
        };
        debug!("Sending content filter request for {}", url);
        self.classify(request, url).await
    }

    async fn classify(&self, request: CompletionRequest, url: &str) -> Option<FilterVerdict> {
        let model = request.model.clone();
        match self.llm.complete(request).await {
            Ok(raw) => {
                debug!("Classifier response for {}: {}", url, raw);
                let verdict = parse_verdict(&raw);
                if verdict.is_none() {
                    error!("Classifier returned an unexpected format for {}: {}", url, raw);
                }
                verdict
            }
            Err(LlmError::ContextLengthExceeded { .. }) => {
                error!("Filtering failed for {}: context length exceeded ({})", url, model);
                None
            }
            Err(e) => {
                error!("Filtering request failed for {}: {}", url, e);
                None
            }
        }
    }
}

/// Valid iff `raw` is a JSON object carrying both fields with known values.
pub fn parse_verdict(raw: &str) -> Option<FilterVerdict> {
    let value: Value = serde_json::from_str(raw.trim()).ok()?;
    if !value.is_object() {
        return None;
    }
    serde_json::from_value(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{QualityType, Relevance};

    #[test]
    fn verdict_requires_both_known_fields() {
        assert_eq!(
            parse_verdict(r#"{"relevance":"High","quality_type":"In-depth","note":"x"}"#),
            Some(FilterVerdict::new(Relevance::High, QualityType::InDepth))
        );
        assert_eq!(parse_verdict(r#"{"relevance":"High"}"#), None);
        assert_eq!(parse_verdict(r#"{"relevance":"Huge","quality_type":"Opinion"}"#), None);
        assert_eq!(parse_verdict(r#"["High","Opinion"]"#), None);
        assert_eq!(parse_verdict("not json"), None);
    }
}
