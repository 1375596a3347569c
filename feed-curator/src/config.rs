use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::output::OutputMethod;
use crate::types::{CuratorError, QualityType, Relevance, Result};

pub const CONFIG_ENV: &str = "FEED_CURATOR_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Complete run configuration, built once at startup and passed by reference.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub feeds: Vec<String>,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub ai_filter: AiSettings,
    #[serde(default)]
    pub fetch: FetchSettings,
    #[serde(default)]
    pub output: OutputSettings,
    #[serde(default)]
    pub target_api: TargetApiSettings,
    #[serde(default)]
    pub state: StateSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiSettings {
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub dislikes: Vec<String>,
    #[serde(default = "default_filtering_model")]
    pub filtering_model: String,
    pub content_filtering_model: Option<String>,
    #[serde(default = "default_processing_model")]
    pub processing_model: String,
    #[serde(default = "default_accepted_relevance")]
    pub accepted_relevance: Vec<Relevance>,
    #[serde(default = "default_accepted_quality")]
    pub accepted_quality: Vec<QualityType>,
    pub accepted_content_quality: Option<Vec<QualityType>>,
    #[serde(default = "default_english_level")]
    pub english_level: String,
    #[serde(default)]
    pub enable_vocabulary_annotation: bool,
    pub annotation_language: Option<String>,
    pub api_base_url: Option<String>,
    pub proxy: Option<String>,
    #[serde(default = "default_ai_timeout")]
    pub timeout_secs: u64,
    /// Filled from `OPENAI_API_KEY`, never read from the file.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            interests: Vec::new(),
            dislikes: Vec::new(),
            filtering_model: default_filtering_model(),
            content_filtering_model: None,
            processing_model: default_processing_model(),
            accepted_relevance: default_accepted_relevance(),
            accepted_quality: default_accepted_quality(),
            accepted_content_quality: None,
            english_level: default_english_level(),
            enable_vocabulary_annotation: false,
            annotation_language: None,
            api_base_url: None,
            proxy: None,
            timeout_secs: default_ai_timeout(),
            api_key: None,
        }
    }
}

impl AiSettings {
    pub fn content_filtering_model(&self) -> &str {
        self.content_filtering_model
            .as_deref()
            .unwrap_or(&self.filtering_model)
    }

    pub fn accepted_content_quality(&self) -> &[QualityType] {
        self.accepted_content_quality
            .as_deref()
            .unwrap_or(&self.accepted_quality)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchSettings {
    pub cookie_file: Option<PathBuf>,
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
    pub proxy: Option<String>,
    pub user_agent: Option<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            cookie_file: None,
            timeout_secs: default_http_timeout(),
            proxy: None,
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputSettings {
    #[serde(default = "default_output_method")]
    pub method: String,
    #[serde(default = "default_local_dir")]
    pub local_dir: PathBuf,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            method: default_output_method(),
            local_dir: default_local_dir(),
        }
    }
}

impl OutputSettings {
    /// Unrecognized values fall back to `api` with a warning.
    pub fn method(&self) -> OutputMethod {
        OutputMethod::parse_or_default(&self.method)
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthKind {
    #[default]
    None,
    Bearer,
    HeaderKey,
    BodyKey,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthSettings {
    #[serde(rename = "type", default)]
    pub kind: AuthKind,
    pub header_name: Option<String>,
    pub body_key_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SuccessCheckKind {
    #[default]
    StatusCode,
    JsonField,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuccessCheckSettings {
    #[serde(rename = "type", default)]
    pub kind: SuccessCheckKind,
    #[serde(default = "default_expected_status_codes")]
    pub expected_status_codes: Vec<u16>,
    pub json_field_name: Option<String>,
    pub expected_json_value: Option<Value>,
}

impl Default for SuccessCheckSettings {
    fn default() -> Self {
        Self {
            kind: SuccessCheckKind::StatusCode,
            expected_status_codes: default_expected_status_codes(),
            json_field_name: None,
            expected_json_value: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetApiSettings {
    pub endpoint: Option<String>,
    #[serde(default = "default_http_method")]
    pub method: String,
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub payload_mapping: Map<String, Value>,
    #[serde(default)]
    pub authentication: AuthSettings,
    #[serde(default)]
    pub success_check: SuccessCheckSettings,
    /// Filled from `TARGET_API_KEY`.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for TargetApiSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            method: default_http_method(),
            timeout_secs: default_http_timeout(),
            headers: BTreeMap::new(),
            payload_mapping: Map::new(),
            authentication: AuthSettings::default(),
            success_check: SuccessCheckSettings::default(),
            api_key: None,
        }
    }
}

impl TargetApiSettings {
    /// Endpoint, unless missing or still a `YOUR_...` placeholder.
    pub fn usable_endpoint(&self) -> Option<&str> {
        self.endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty() && !e.starts_with("YOUR_"))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StateSettings {
    #[serde(default = "default_db_file")]
    pub db_file: PathBuf,
}

impl Default for StateSettings {
    fn default() -> Self {
        Self { db_file: default_db_file() }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_filtering_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_processing_model() -> String {
    "gpt-4-turbo".to_string()
}

fn default_accepted_relevance() -> Vec<Relevance> {
    vec![Relevance::High, Relevance::Medium]
}

fn default_accepted_quality() -> Vec<QualityType> {
    vec![QualityType::InDepth, QualityType::Opinion, QualityType::Overview]
}

fn default_english_level() -> String {
    "CEFR C1".to_string()
}

fn default_ai_timeout() -> u64 {
    120
}

fn default_http_timeout() -> u64 {
    30
}

fn default_output_method() -> String {
    "api".to_string()
}

fn default_local_dir() -> PathBuf {
    PathBuf::from("output_markdown")
}

fn default_http_method() -> String {
    "POST".to_string()
}

fn default_expected_status_codes() -> Vec<u16> {
    vec![200, 201]
}

fn default_db_file() -> PathBuf {
    PathBuf::from("processed_articles.db")
}

impl Settings {
    /// Read, resolve secrets from the process environment, and validate.
    pub fn load(path: &Path) -> Result<Self> {
        let mut settings = Self::read(path)?;
        settings.resolve(|key| std::env::var(key).ok())?;
        info!("Configuration loaded from {}", path.display());
        Ok(settings)
    }

    /// Parse only. Lets the caller set up logging from `[logging]` before
    /// `resolve` emits anything.
    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CuratorError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| CuratorError::Config(format!("invalid TOML: {}", e)))
    }

    pub fn resolve<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.apply_env(lookup);
        self.validate()
    }

    /// Fill secrets and proxy fallbacks from an environment lookup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        self.ai_filter.api_key = lookup("OPENAI_API_KEY");
        self.target_api.api_key = lookup("TARGET_API_KEY");
        if let Some(base_url) = lookup("OPENAI_API_BASE_URL") {
            self.ai_filter.api_base_url = Some(base_url);
        }

        let env_proxy = lookup("HTTPS_PROXY")
            .or_else(|| lookup("https_proxy"))
            .or_else(|| lookup("HTTP_PROXY"))
            .or_else(|| lookup("http_proxy"));

        if self.ai_filter.proxy.is_none() {
            self.ai_filter.proxy = env_proxy.clone();
        }
        if self.fetch.proxy.is_none() {
            self.fetch.proxy = env_proxy;
        }
        if let Some(proxy) = &self.ai_filter.proxy {
            info!("Using AI proxy: {}", proxy);
        }
        if let Some(proxy) = &self.fetch.proxy {
            info!("Using content fetching proxy: {}", proxy);
        }
    }

    /// Fatal checks return `CuratorError::Config`; `warnings` are logged.
    pub fn validate(&self) -> Result<()> {
        if self.fetch.cookie_file.is_none() {
            return Err(CuratorError::Config(
                "missing 'cookie_file' in [fetch]".to_string(),
            ));
        }

        if self.output.method() == OutputMethod::Api && self.target_api.usable_endpoint().is_none() {
            return Err(CuratorError::Config(
                "target_api.endpoint is missing or a placeholder while output method is 'api'"
                    .to_string(),
            ));
        }

        for (section, secs) in [
            ("ai_filter", self.ai_filter.timeout_secs),
            ("fetch", self.fetch.timeout_secs),
            ("target_api", self.target_api.timeout_secs),
        ] {
            if secs == 0 {
                return Err(CuratorError::Config(format!(
                    "[{}] timeout_secs must be greater than 0",
                    section
                )));
            }
        }

        for warning in self.warnings() {
            warn!("{}", warning);
        }

        Ok(())
    }

    /// Non-fatal problems that leave some stage unable to work.
    pub fn warnings(&self) -> Vec<&'static str> {
        let mut warnings = Vec::new();
        if self.feeds.is_empty() {
            warnings.push("Feed list is empty. No feeds to process.");
        }
        if self.ai_filter.api_key.is_none() {
            warnings.push("OPENAI_API_KEY not found in environment. AI features will fail.");
        }
        if self.target_api.usable_endpoint().is_some()
            && self.target_api.api_key.is_none()
            && self.target_api.authentication.kind != AuthKind::None
        {
            warnings.push(
                "TARGET_API_KEY not set but target_api authentication requires a key. API push will fail.",
            );
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const MINIMAL: &str = r#"
        feeds = ["https://medium.com/feed/tag/rust"]

        [fetch]
        cookie_file = "cookies.txt"

        [output]
        method = "local"
    "#;

    #[test]
    fn defaults_fill_missing_sections() {
        let settings = Settings::from_toml_str(MINIMAL).unwrap();
        assert_eq!(settings.ai_filter.filtering_model, "gpt-3.5-turbo");
        assert_eq!(settings.ai_filter.content_filtering_model(), "gpt-3.5-turbo");
        assert_eq!(
            settings.ai_filter.accepted_content_quality(),
            settings.ai_filter.accepted_quality.as_slice()
        );
        assert_eq!(settings.target_api.success_check.expected_status_codes, vec![200, 201]);
        assert_eq!(settings.state.db_file, PathBuf::from("processed_articles.db"));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn unknown_quality_name_is_rejected() {
        let bad = format!("{}\n[ai_filter]\naccepted_quality = [\"Superb\"]\n", MINIMAL);
        assert!(matches!(Settings::from_toml_str(&bad), Err(CuratorError::Config(_))));
    }

    #[test]
    fn placeholder_endpoint_is_fatal_for_api_output() {
        let toml = r#"
            [fetch]
            cookie_file = "cookies.txt"

            [target_api]
            endpoint = "YOUR_API_ENDPOINT"
        "#;
        let settings = Settings::from_toml_str(toml).unwrap();
        assert!(matches!(settings.validate(), Err(CuratorError::Config(_))));
    }

    #[test]
    fn proxies_fall_back_to_environment_independently() {
        let toml = format!("{}\n[ai_filter]\nproxy = \"http://ai-proxy:8080\"\n", MINIMAL);
        let mut settings = Settings::from_toml_str(&toml).unwrap();
        let env: HashMap<&str, &str> = [
            ("http_proxy", "http://env-proxy:3128"),
            ("OPENAI_API_KEY", "sk-test"),
        ]
        .into_iter()
        .collect();
        settings.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(settings.ai_filter.proxy.as_deref(), Some("http://ai-proxy:8080"));
        assert_eq!(settings.fetch.proxy.as_deref(), Some("http://env-proxy:3128"));
        assert_eq!(settings.ai_filter.api_key.as_deref(), Some("sk-test"));
        assert!(settings.target_api.api_key.is_none());
    }

    #[test]
    fn missing_secrets_and_feeds_are_reported() {
        let toml = r#"
            [fetch]
            cookie_file = "cookies.txt"

            [output]
            method = "local"

            [target_api]
            endpoint = "https://notes.example.com/api"

            [target_api.authentication]
            type = "bearer"
        "#;
        let mut settings = Settings::from_toml_str(toml).unwrap();
        settings.resolve(|_| None).unwrap();

        let warnings = settings.warnings();
        assert_eq!(warnings.len(), 3);
        assert!(warnings[0].starts_with("Feed list is empty"));
        assert!(warnings[1].starts_with("OPENAI_API_KEY"));
        assert!(warnings[2].starts_with("TARGET_API_KEY"));

        settings.resolve(|key| Some(format!("{}-value", key))).unwrap();
        assert_eq!(settings.warnings(), vec!["Feed list is empty. No feeds to process."]);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let base = Settings::from_toml_str(MINIMAL).unwrap();
        for section in ["ai_filter", "fetch", "target_api"] {
            let mut settings = base.clone();
            match section {
                "ai_filter" => settings.ai_filter.timeout_secs = 0,
                "fetch" => settings.fetch.timeout_secs = 0,
                _ => settings.target_api.timeout_secs = 0,
            }
            match settings.validate() {
                Err(CuratorError::Config(msg)) => assert!(msg.contains(section), "{}", msg),
                other => panic!("expected config error for [{}], got {:?}", section, other),
            }
        }
    }
}
