mod common;

use common::{init_tracing, serve_once};
use feed_curator::llm_adapter::{CompletionRequest, LlmError};
use feed_curator::{LlmAdapter, OpenAiAdapter};
use reqwest::Client;
use tracing::info;

fn local_client() -> Client {
    Client::builder().no_proxy().build().unwrap()
}

fn request(json_response: bool) -> CompletionRequest {
    CompletionRequest {
        model: "gpt-3.5-turbo".to_string(),
        prompt: "Classify this article".to_string(),
        temperature: 0.2,
        json_response,
    }
}

#[tokio::test]
async fn test_chat_completion_round_trip() {
    init_tracing();
    info!("Testing OpenAI-compatible adapter against a local responder");

    let reply = r#"{"choices":[{"message":{"role":"assistant","content":"{\"relevance\":\"High\",\"quality_type\":\"Opinion\"}"}}]}"#;
    let (base, server) = serve_once("200 OK", "application/json", reply.to_string()).await;
    let adapter = OpenAiAdapter::new(Some("sk-local".to_string()), format!("{}/v1/", base), local_client());

    let answer = adapter.complete(request(true)).await.unwrap();
    assert_eq!(answer, r#"{"relevance":"High","quality_type":"Opinion"}"#);

    let captured = server.await.unwrap();
    assert!(captured.request_line.starts_with("POST /v1/chat/completions"));
    assert_eq!(captured.header("authorization"), Some("Bearer sk-local"));

    let body = captured.json();
    assert_eq!(body["model"], "gpt-3.5-turbo");
    assert_eq!(body["messages"][0]["role"], "user");
    assert_eq!(body["messages"][0]["content"], "Classify this article");
    assert_eq!(body["response_format"]["type"], "json_object");
}

#[tokio::test]
async fn test_plain_text_request_has_no_response_format() {
    init_tracing();

    let reply = r##"{"choices":[{"message":{"content":"# Title"}}]}"##;
    let (base, server) = serve_once("200 OK", "application/json", reply.to_string()).await;
    let adapter = OpenAiAdapter::new(Some("sk-local".to_string()), base, local_client());

    assert_eq!(adapter.complete(request(false)).await.unwrap(), "# Title");
    let body = server.await.unwrap().json();
    assert!(body.get("response_format").is_none());
}

#[tokio::test]
async fn test_context_length_error_is_classified() {
    init_tracing();

    let reply = r#"{"error":{"message":"This model's maximum context length is 16385 tokens","type":"invalid_request_error","code":"context_length_exceeded"}}"#;
    let (base, server) = serve_once("400 Bad Request", "application/json", reply.to_string()).await;
    let adapter = OpenAiAdapter::new(Some("sk-local".to_string()), base, local_client());

    match adapter.complete(request(true)).await {
        Err(LlmError::ContextLengthExceeded { model }) => assert_eq!(model, "gpt-3.5-turbo"),
        other => panic!("unexpected result: {:?}", other),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn test_empty_choices_is_malformed() {
    init_tracing();

    let (base, server) = serve_once("200 OK", "application/json", r#"{"choices":[]}"#.to_string()).await;
    let adapter = OpenAiAdapter::new(Some("sk-local".to_string()), base, local_client());

    assert!(matches!(
        adapter.complete(request(true)).await,
        Err(LlmError::MalformedResponse(_))
    ));
    server.await.unwrap();
}
