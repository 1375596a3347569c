use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde_json::{Map, Value};
use tracing::{debug, error, info};

use super::template::{placeholders, render_value};
use super::{json_path, DispatchOutcome, OutputMethod};
use crate::config::{AuthKind, SuccessCheckKind, SuccessCheckSettings, TargetApiSettings};
use crate::traits::Dispatcher;
use crate::types::ArticleCandidate;

pub const API_DESTINATION: &str = "API";

/// Pushes transformed articles to a configurable HTTP endpoint.
pub struct ApiPusher {
    client: Client,
    settings: TargetApiSettings,
}

impl ApiPusher {
    pub fn new(settings: TargetApiSettings) -> Self {
        // The target API is always reached directly
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .no_proxy()
            .build()
            .unwrap_or_else(|e| {
                error!("Failed to build API push client ({}), using defaults", e);
                Client::new()
            });
        Self { client, settings }
    }

    /// Headers and optional JSON body for one article, or `None` when the
    /// configuration cannot authenticate or produce a valid request.
    fn build_request_parts(
        &self,
        candidate: &ArticleCandidate,
        markdown: &str,
    ) -> Option<(HeaderMap, Option<Value>)> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        for (name, value) in &self.settings.headers {
            insert_header(&mut headers, name, value)?;
        }

        let auth = &self.settings.authentication;
        let api_key = self.settings.api_key.as_deref();
        if auth.kind != AuthKind::None && api_key.is_none() {
            error!("Authentication type {:?} requires TARGET_API_KEY, which is not set", auth.kind);
            return None;
        }

        match (&auth.kind, api_key) {
            (AuthKind::Bearer, Some(key)) => {
                let name = auth.header_name.as_deref().unwrap_or("Authorization");
                insert_header(&mut headers, name, &format!("Bearer {}", key))?;
                debug!("Using Bearer authentication in header '{}'", name);
            }
            (AuthKind::HeaderKey, Some(key)) => {
                let Some(name) = auth.header_name.as_deref() else {
                    error!("Authentication type 'header_key' requires 'header_name'");
                    return None;
                };
                insert_header(&mut headers, name, key)?;
                debug!("Using API key authentication in header '{}'", name);
            }
            (AuthKind::Unknown, _) => {
                error!("Invalid authentication type. Valid types: none, bearer, header_key, body_key");
                return None;
            }
            _ => {}
        }

        if self.settings.payload_mapping.is_empty() {
            return Some((headers, None));
        }

        let values = placeholders(candidate, markdown);
        let mut payload: Map<String, Value> = self
            .settings
            .payload_mapping
            .iter()
            .map(|(key, template)| (key.clone(), render_value(template, &values)))
            .collect();

        if let (AuthKind::BodyKey, Some(key)) = (&auth.kind, api_key) {
            let Some(field) = auth.body_key_name.as_deref() else {
                error!("Authentication type 'body_key' requires 'body_key_name'");
                return None;
            };
            payload.insert(field.to_string(), Value::String(key.to_string()));
        }

        Some((headers, Some(Value::Object(payload))))
    }

    async fn push(&self, candidate: &ArticleCandidate, markdown: &str) -> bool {
        let Some(endpoint) = self.settings.usable_endpoint() else {
            error!("Target API endpoint is not configured or is a placeholder");
            return false;
        };

        let method = match Method::from_bytes(self.settings.method.trim().to_uppercase().as_bytes()) {
            Ok(method) => method,
            Err(_) => {
                error!("Invalid HTTP method '{}' for target API", self.settings.method);
                return false;
            }
        };

        let Some((headers, payload)) = self.build_request_parts(candidate, markdown) else {
            return false;
        };

        debug!("Sending {} request to {} for '{}'", method, endpoint, candidate.title);
        let sends_body = !matches!(method, Method::GET | Method::HEAD | Method::DELETE);
        let mut request = self.client.request(method, endpoint).headers(headers);
        if let (true, Some(body)) = (sends_body, payload.as_ref()) {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                error!("Timeout pushing article '{}' to {}", candidate.title, endpoint);
                return false;
            }
            Err(e) => {
                error!("Network error pushing article '{}' to {}: {}", candidate.title, endpoint, e);
                return false;
            }
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            error!(
                "HTTP error pushing article '{}' to {}: status {}, body: {}",
                candidate.title,
                endpoint,
                status,
                body.chars().take(1000).collect::<String>()
            );
            return false;
        }

        let ok = check_success(&self.settings.success_check, status, &body);
        if ok {
            info!("API push successful for '{}' (status {})", candidate.title, status);
        } else {
            error!(
                "API push failed success check for '{}'. Response body: {}",
                candidate.title,
                body.chars().take(1000).collect::<String>()
            );
        }
        ok
    }
}

fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) -> Option<()> {
    match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
        (Ok(name), Ok(value)) => {
            headers.insert(name, value);
            Some(())
        }
        _ => {
            error!("Invalid header '{}' in target API configuration", name);
            None
        }
    }
}

/// Apply the configured success criterion to a 2xx response.
pub fn check_success(check: &SuccessCheckSettings, status: StatusCode, body: &str) -> bool {
    match check.kind {
        SuccessCheckKind::StatusCode => {
            let ok = check.expected_status_codes.contains(&status.as_u16());
            if !ok {
                error!(
                    "Unexpected status code {} (expected {:?})",
                    status, check.expected_status_codes
                );
            }
            ok
        }
        SuccessCheckKind::JsonField => {
            let Some(field) = check.json_field_name.as_deref() else {
                error!("Success check 'json_field' requires 'json_field_name'");
                return false;
            };
            let parsed: Value = match serde_json::from_str(body) {
                Ok(value) => value,
                Err(e) => {
                    error!("Could not decode JSON response to check field '{}': {}", field, e);
                    return false;
                }
            };
            let actual = json_path::lookup(&parsed, field).filter(|v| !v.is_null());
            match (&check.expected_json_value, actual) {
                (Some(expected), Some(actual)) if expected == actual => true,
                (None, None) => true,
                (expected, actual) => {
                    error!(
                        "JSON field '{}' has value {:?}, expected {:?}",
                        field, actual, expected
                    );
                    false
                }
            }
        }
        SuccessCheckKind::Unknown => {
            error!("Invalid success_check type configured. Defaulting to failure.");
            false
        }
    }
}

#[async_trait]
impl Dispatcher for ApiPusher {
    fn method(&self) -> OutputMethod {
        OutputMethod::Api
    }

    async fn dispatch(&self, candidate: &ArticleCandidate, markdown: &str) -> DispatchOutcome {
        if self.push(candidate, markdown).await {
            DispatchOutcome::ok(API_DESTINATION)
        } else {
            DispatchOutcome::failed(API_DESTINATION)
        }
    }
}
