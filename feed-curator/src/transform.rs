use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::AiSettings;
use crate::llm_adapter::{CompletionRequest, LlmAdapter, LlmError};

/// Prefix reserved for failed transform output.
pub const ERROR_MARKER: &str = "[Error:";
pub const MIN_TRANSFORM_CHARS: usize = 100;
const TRANSFORM_TEMPERATURE: f32 = 0.3;

/// True when the transform produced no usable Markdown.
pub fn is_failure_output(output: &str) -> bool {
    output.is_empty() || output.starts_with(ERROR_MARKER)
}

/// HTML-to-Markdown conversion with optional inline vocabulary glosses.
pub struct MarkdownTransformer {
    llm: Arc<dyn LlmAdapter>,
    model: String,
    english_level: String,
    annotation_language: Option<String>,
}

impl MarkdownTransformer {
    pub fn new(llm: Arc<dyn LlmAdapter>, settings: &AiSettings) -> Self {
        let annotation_language = if settings.enable_vocabulary_annotation {
            settings
                .annotation_language
                .clone()
                .filter(|lang| !lang.trim().is_empty())
        } else {
            None
        };
        if settings.enable_vocabulary_annotation && annotation_language.is_none() {
            warn!("Vocabulary annotation enabled but no annotation_language set; converting only");
        }
        Self {
            llm,
            model: settings.processing_model.clone(),
            english_level: settings.english_level.clone(),
            annotation_language,
        }
    }

    pub fn prompt(&self, url: &str, content: &str) -> String {
        let output_rule = match &self.annotation_language {
            Some(lang) => format!(
                "4. Output ONLY the processed Markdown text, including inline {} annotations as described below.",
                lang
            ),
            None => "4. Output ONLY the processed Markdown text.".to_string(),
        };

        let mut prompt = format!(
            r#"You are an expert text processor converting HTML to Markdown.
Convert the following English article HTML into well-structured Markdown.

Instructions:
1. Use Markdown syntax for headings (from <h1>-<h6>), lists (<ul>, <ol>, <li>), blockquotes (<blockquote>), paragraphs (<p>) and code blocks (<pre>, <code>). Separate paragraphs with a blank line.
2. Convert <img> tags to `![alt](src)` using the alt attribute; when alt is missing or empty use 'image'.
3. Preserve the original meaning and structure. Do not summarize or add information.
{output_rule}
"#
        );

        if let Some(lang) = &self.annotation_language {
            let level = &self.english_level;
            prompt.push_str(&format!(
                r#"
Additional task: vocabulary annotation for a reader at English level {level}.
A. Identify words or short technical phrases (1-4 words) in the text content that may be hard for a {level} reader.
B. Right after each such term add its concise {lang} translation in parentheses, e.g. "concurrency control (translation)".
C. Do NOT annotate common words; focus on domain terms, advanced vocabulary and idioms.
D. Annotate text content only, never inside image tags, code blocks or other Markdown syntax.
E. The result must remain valid Markdown.
"#
            ));
        }

        prompt.push_str(&format!("\nArticle HTML (from {url}):\n---\n{content}\n---\n"));
        prompt
    }

    /// Convert fetched content. Short input comes back verbatim; failures
    /// come back as a string starting with [`ERROR_MARKER`].
    pub async fn transform(&self, url: &str, content: &str) -> String {
        if content.chars().count() < MIN_TRANSFORM_CHARS {
            warn!("Content for {} is too short; skipping AI processing", url);
            return content.to_string();
        }

        match &self.annotation_language {
            Some(lang) => info!("AI processing for {}: Markdown conversion and {} annotations", url, lang),
            None => info!("AI processing for {}: Markdown conversion only", url),
        }

        let request = CompletionRequest {
            model: self.model.clone(),
            prompt: self.prompt(url, content),
            temperature: TRANSFORM_TEMPERATURE,
            json_response: false,
        };
        debug!("Sending transform request for {}", url);

        match self.llm.complete(request).await {
            Ok(markdown) if markdown.trim().is_empty() => {
                error!("AI processing returned an empty response for {}", url);
                format!("{} empty response for {}]", ERROR_MARKER, url)
            }
            Ok(markdown) => {
                info!("AI content processing successful for {}", url);
                markdown
            }
            Err(LlmError::ContextLengthExceeded { model }) => {
                error!("AI processing failed for {}: article too long for model {}", url, model);
                format!("{} Article too long for model '{}'.]", ERROR_MARKER, model)
            }
            Err(e) => {
                error!("AI processing failed for {}: {}", url, e);
                format!("{} AI processing failed for {}. See logs.]", ERROR_MARKER, url)
            }
        }
    }
}
