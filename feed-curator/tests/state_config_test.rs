mod common;

use common::init_tracing;
use feed_curator::config::{AuthKind, Settings, SuccessCheckKind};
use feed_curator::output::OutputMethod;
use feed_curator::types::*;
use feed_curator::SqliteStateStore;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

const FULL_CONFIG: &str = r#"
feeds = [
    "https://medium.com/feed/tag/rust",
    "https://medium.com/feed/@alice",
]

[logging]
level = "debug"

[ai_filter]
interests = ["Rust", "distributed systems"]
dislikes = ["crypto"]
filtering_model = "gpt-4o-mini"
content_filtering_model = "gpt-4o"
accepted_relevance = ["High"]
accepted_quality = ["In-depth", "Opinion"]
accepted_content_quality = ["In-depth"]
enable_vocabulary_annotation = true
annotation_language = "German"

[fetch]
cookie_file = "cookies.txt"
timeout_secs = 15

[output]
method = "api"

[target_api]
endpoint = "https://notes.example.com/api/articles"
method = "PUT"

[target_api.headers]
X-Client = "curator"

[target_api.payload_mapping]
title = "{title}"
body = "{content_markdown}"
pinned = false

[target_api.authentication]
type = "header_key"
header_name = "X-Api-Key"

[target_api.success_check]
type = "json_field"
json_field_name = "data.saved"
expected_json_value = true

[state]
db_file = "data/ledger.db"
"#;

#[test]
fn test_load_full_config_from_file() -> Result<()> {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.toml");
    std::fs::write(&path, FULL_CONFIG)?;

    let settings = Settings::load(&path)?;
    info!("Loaded settings: {:?}", settings.feeds);

    assert_eq!(settings.feeds.len(), 2);
    assert_eq!(settings.logging.level, "debug");
    assert_eq!(settings.ai_filter.content_filtering_model(), "gpt-4o");
    assert_eq!(settings.ai_filter.accepted_relevance, vec![Relevance::High]);
    assert_eq!(settings.ai_filter.accepted_content_quality(), &[QualityType::InDepth]);
    assert_eq!(settings.fetch.timeout_secs, 15);
    assert_eq!(settings.output.method(), OutputMethod::Api);

    let api = &settings.target_api;
    assert_eq!(api.usable_endpoint(), Some("https://notes.example.com/api/articles"));
    assert_eq!(api.method, "PUT");
    assert_eq!(api.headers.get("X-Client").map(String::as_str), Some("curator"));
    assert_eq!(api.payload_mapping.get("pinned"), Some(&json!(false)));
    assert_eq!(api.authentication.kind, AuthKind::HeaderKey);
    assert_eq!(api.success_check.kind, SuccessCheckKind::JsonField);
    assert_eq!(api.success_check.expected_json_value, Some(json!(true)));
    assert_eq!(settings.state.db_file, PathBuf::from("data/ledger.db"));
    Ok(())
}

#[test]
fn test_missing_config_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = Settings::load(&dir.path().join("absent.toml"));
    assert!(matches!(result, Err(CuratorError::Config(_))));
}

#[test]
fn test_missing_cookie_file_setting_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "feeds = []\n[output]\nmethod = \"local\"\n").unwrap();
    assert!(matches!(Settings::load(&path), Err(CuratorError::Config(_))));
}

#[tokio::test]
async fn test_on_disk_ledger_survives_reopen() -> Result<()> {
    init_tracing();
    info!("Testing on-disk processing ledger");

    let dir = tempfile::tempdir()?;
    let db_file = dir.path().join("nested").join("processed_articles.db");
    let url = "https://medium.com/@a/lifetimes-1";
    let trail = FilterTrail {
        stage1: Some(FilterVerdict::new(Relevance::High, QualityType::InDepth)),
        stage2: None,
    };

    let store = SqliteStateStore::connect(&db_file).await?;
    assert!(!store.is_processed(url).await);
    store
        .mark_status(url, ProcessingStatus::PassedFilterStage1, Some("Lifetimes"), trail.to_json().as_deref())
        .await;
    store
        .mark_status(url, ProcessingStatus::FailedFetch, Some("Lifetimes"), trail.to_json().as_deref())
        .await;
    store
        .mark_status("https://medium.com/@b/other", ProcessingStatus::FilteredOutStage1, None, None)
        .await;
    store.close().await;

    let reopened = SqliteStateStore::connect(&db_file).await?;
    assert!(reopened.is_processed(url).await);
    assert_eq!(reopened.count().await?, 2);

    let record = reopened.record(url).await?.unwrap();
    assert_eq!(record.status, ProcessingStatus::FailedFetch);
    assert_eq!(record.title.as_deref(), Some("Lifetimes"));
    let stored: FilterTrail = serde_json::from_str(record.filter_result.as_deref().unwrap())?;
    assert_eq!(stored, trail);
    assert!(chrono::DateTime::parse_from_rfc3339(&record.processed_at).is_ok());

    let mut counts = reopened.status_counts().await?;
    counts.sort();
    assert_eq!(
        counts,
        vec![
            ("failed_fetch".to_string(), 1),
            ("filtered_out_stage1".to_string(), 1),
        ]
    );
    reopened.close().await;
    Ok(())
}
