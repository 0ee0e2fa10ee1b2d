// ABOUTME: HTTP-level tests for the Gemini gateway against a wiremock server
// ABOUTME: Verifies request shape, raw envelope passthrough, status mapping, and timeout fallback
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

// Test files don't require documentation - this is a rustc lint (not clippy)
#![allow(missing_docs)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{dispatcher_with, fenced_envelope, init_test_logging, memory_store, sample_activity};
use fitness_recommender::config::{AiCallPolicy, GeminiConfig};
use fitness_recommender::errors::{ErrorCode, PipelineErrorKind, TransportError};
use fitness_recommender::llm::{AiGateway, GeminiGateway};
use fitness_recommender::models::RecommendationSource;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL: &str = "gemini-2.5-flash";
const GENERATE_PATH: &str = "/models/gemini-2.5-flash:generateContent";

fn gateway_for(server: &MockServer) -> GeminiGateway {
    GeminiGateway::new("test-key", server.uri(), MODEL)
}

#[tokio::test]
async fn test_invoke_posts_prompt_and_returns_raw_envelope() {
    init_test_logging();
    let server = MockServer::start().await;
    let envelope = fenced_envelope(&json!({"safety": ["Stretch"]}));

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(query_param("key", "test-key"))
        .and(body_json(json!({
            "contents": [{"parts": [{"text": "Analyze this"}]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(envelope.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let body = gateway_for(&server).invoke("Analyze this").await.unwrap();
    assert_eq!(body, envelope);
}

#[tokio::test]
async fn test_non_success_status_is_transport_error() {
    init_test_logging();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let error = gateway_for(&server).invoke("prompt").await.unwrap_err();
    assert_eq!(
        error,
        TransportError::Status {
            service: "gemini",
            status: 503,
            body: "overloaded".to_owned(),
        }
    );
    assert!(error.is_retryable());
}

#[tokio::test]
async fn test_client_error_status_is_not_retryable() {
    init_test_logging();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .mount(&server)
        .await;

    let error = gateway_for(&server).invoke("prompt").await.unwrap_err();
    assert!(matches!(error, TransportError::Status { status: 400, .. }));
    assert!(!error.is_retryable());
}

#[tokio::test]
async fn test_unreachable_host_is_request_error() {
    init_test_logging();
    let gateway = GeminiGateway::new("test-key", "http://127.0.0.1:9", MODEL);

    let error = gateway.invoke("prompt").await.unwrap_err();
    assert!(matches!(error, TransportError::Request { service: "gemini", .. }));
}

#[tokio::test]
async fn test_slow_gateway_times_out_into_fallback() {
    init_test_logging();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(fenced_envelope(&json!({"safety": ["late"]})))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let store = memory_store();
    let dispatcher = dispatcher_with(
        Arc::new(gateway_for(&server)),
        store.clone(),
        AiCallPolicy::fail_fast(Duration::from_millis(100)),
    );

    let outcome = dispatcher
        .dispatch(&sample_activity("slow-1", "user-1"), &CancellationToken::new())
        .await;

    assert_eq!(outcome.source, RecommendationSource::Fallback);
    assert_eq!(
        outcome.degradation.as_ref().map(|e| e.kind()),
        Some(PipelineErrorKind::Transport)
    );
    assert!(outcome.is_stored());
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_end_to_end_generated_recommendation() {
    init_test_logging();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(fenced_envelope(&json!({
            "analysis": {"overall": "Nice"},
            "improvements": [{"area": "Pacing", "recommendation": "Start slower"}]
        }))))
        .expect(1)
        .mount(&server)
        .await;

    let store = memory_store();
    let dispatcher = dispatcher_with(
        Arc::new(gateway_for(&server)),
        store.clone(),
        AiCallPolicy::default(),
    );

    let outcome = dispatcher
        .dispatch(&sample_activity("act-7", "user-7"), &CancellationToken::new())
        .await;

    assert_eq!(outcome.source, RecommendationSource::Generated);
    let stored = store.all();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].recommendation.analysis(), "OverallNice\n\n");
    assert_eq!(stored[0].recommendation.improvements(), ["Pacing: Start slower"]);
    assert_eq!(
        stored[0].recommendation.suggestions(),
        ["No Specific suggestions provided"]
    );
}

#[test]
fn test_from_config_requires_api_key() {
    let error = GeminiGateway::from_config(&GeminiConfig::default()).unwrap_err();
    assert_eq!(error.code, ErrorCode::ConfigMissing);

    let config = GeminiConfig {
        api_key: Some("secret-key".to_owned()),
        ..GeminiConfig::default()
    };
    let gateway = GeminiGateway::from_config(&config).unwrap();
    assert_eq!(gateway.model(), MODEL);
    assert_eq!(gateway.name(), "gemini");
}

#[test]
fn test_debug_output_redacts_api_key() {
    let gateway = GeminiGateway::new("super-secret", "http://localhost", MODEL);
    let debug = format!("{gateway:?}");
    assert!(!debug.contains("super-secret"));
    assert!(debug.contains("[REDACTED]"));
}
