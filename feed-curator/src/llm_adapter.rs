use async_trait::async_trait;
use reqwest::{header, Client, Proxy};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::AiSettings;

pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";

/// One classifier call: a single user prompt sent to `model`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub temperature: f32,
    /// Ask the service for a JSON object response.
    pub json_response: bool,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    #[error("LLM client not configured (missing API key)")]
    NotConfigured,

    #[error("context length exceeded for model '{model}'")]
    ContextLengthExceeded { model: String },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Text-completion service used by the filter and transform stages.
#[async_trait]
pub trait LlmAdapter: Send + Sync {
    /// Get the name of this LLM adapter
    fn adapter_name(&self) -> String;

    /// Send one prompt and return the raw text of the first choice
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    code: Option<String>,
}

/// OpenAI-compatible Chat Completions adapter.
pub struct OpenAiAdapter {
    http_client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl OpenAiAdapter {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>, http_client: Client) -> Self {
        Self {
            http_client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build from settings. A missing key yields an adapter that always
    /// answers `NotConfigured`; a bad proxy is logged and ignored.
    pub fn from_settings(settings: &AiSettings) -> Self {
        let base_url = settings
            .api_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        let mut builder = Client::builder().timeout(Duration::from_secs(settings.timeout_secs));
        if let Some(proxy_url) = &settings.proxy {
            match Proxy::all(proxy_url) {
                Ok(proxy) => {
                    info!("Configuring LLM client with proxy: {}", proxy_url);
                    builder = builder.proxy(proxy);
                }
                Err(e) => error!(
                    "Failed to configure proxy '{}': {}. Proceeding without proxy.",
                    proxy_url, e
                ),
            }
        }
        let http_client = builder.build().unwrap_or_else(|e| {
            error!("Failed to build LLM HTTP client ({}), using defaults", e);
            Client::new()
        });

        if settings.api_key.is_none() {
            warn!("OpenAI API key not found. AI processing features will be disabled.");
        } else {
            info!("LLM client initialized (base URL: {})", base_url);
        }

        Self::new(settings.api_key.clone(), base_url, http_client)
    }

    fn map_api_error(status: u16, body: &str, model: &str) -> LlmError {
        match serde_json::from_str::<ApiErrorEnvelope>(body) {
            Ok(envelope) if envelope.error.code.as_deref() == Some("context_length_exceeded") => {
                LlmError::ContextLengthExceeded { model: model.to_string() }
            }
            Ok(envelope) => LlmError::Api { status, message: envelope.error.message },
            Err(_) => LlmError::Api { status, message: body.chars().take(500).collect() },
        }
    }
}

#[async_trait]
impl LlmAdapter for OpenAiAdapter {
    fn adapter_name(&self) -> String {
        format!("OpenAI-compatible ({})", self.base_url)
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::NotConfigured)?;

        let body = ChatRequest {
            model: &request.model,
            messages: vec![ChatMessage { role: "user", content: &request.prompt }],
            temperature: request.temperature,
            response_format: request
                .json_response
                .then_some(ResponseFormat { kind: "json_object" }),
        };

        debug!("Sending completion request to model {}", request.model);
        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header(header::AUTHORIZATION, format!("Bearer {}", api_key))
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(Self::map_api_error(status.as_u16(), &text, &request.model));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::MalformedResponse("response has no message content".to_string()))
    }
}

type Responder = dyn Fn(&CompletionRequest) -> Result<String, LlmError> + Send + Sync;

/// Mock LLM adapter for development and testing. Answers through a closure
/// and records every request it receives.
pub struct MockLlmAdapter {
    name: String,
    responder: Box<Responder>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockLlmAdapter {
    pub fn new<F>(name: impl Into<String>, responder: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Result<String, LlmError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            responder: Box::new(responder),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Always answers with the same text.
    pub fn fixed(name: impl Into<String>, response: impl Into<String>) -> Self {
        let response = response.into();
        Self::new(name, move |_| Ok(response.clone()))
    }

    /// Shared handle to the request log; stays valid after the adapter is boxed.
    pub fn request_log(&self) -> Arc<Mutex<Vec<CompletionRequest>>> {
        Arc::clone(&self.requests)
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LlmAdapter for MockLlmAdapter {
    fn adapter_name(&self) -> String {
        format!("Mock LLM Adapter ({})", self.name)
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let answer = (self.responder)(&request);
        if let Ok(mut log) = self.requests.lock() {
            log.push(request);
        }
        answer
    }
}
