// ABOUTME: Tests for per-message dispatch through prompt, gateway, parser, assembler, and store
// ABOUTME: Covers fallback routing, store failures, retries, cancellation, attribution, and redelivery
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

// Test files don't require documentation - this is a rustc lint (not clippy)
#![allow(missing_docs)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{
    dispatcher_with, fast_policy, fenced_envelope, init_test_logging, memory_store,
    sample_activity, well_formed_answer, EchoGateway, FailingStore, IdPromptBuilder,
    ScriptedGateway,
};
use fitness_recommender::config::AiCallPolicy;
use fitness_recommender::database::RecommendationStore;
use fitness_recommender::errors::{PipelineError, PipelineErrorKind, StoreError, TransportError};
use fitness_recommender::models::{Activity, RecommendationSource};
use fitness_recommender::pipeline::{DispatchOutcome, PipelineDispatcher, PipelineStage};
use tokio_util::sync::CancellationToken;

fn unavailable() -> TransportError {
    TransportError::Status {
        service: "scripted",
        status: 503,
        body: "try later".to_owned(),
    }
}

// ============================================================================
// Happy Path And Fallback Routing
// ============================================================================

#[tokio::test]
async fn test_generated_recommendation_is_stored_once() {
    init_test_logging();
    let gateway = Arc::new(ScriptedGateway::always(fenced_envelope(&well_formed_answer())));
    let store = memory_store();
    let dispatcher = dispatcher_with(gateway.clone(), store.clone(), fast_policy());

    let outcome = dispatcher
        .dispatch(&sample_activity("act-1", "user-1"), &CancellationToken::new())
        .await;

    assert_eq!(outcome.source, RecommendationSource::Generated);
    assert!(outcome.degradation.is_none());
    assert_eq!(outcome.stage, PipelineStage::Stored);
    assert_eq!(gateway.calls(), 1);

    let stored = store.find_by_activity("act-1").await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(outcome.record_id(), Some(stored[0].id));
    assert_eq!(stored[0].recommendation.user_id(), "user-1");
    assert_eq!(stored[0].recommendation.improvements(), ["Cadence: Aim for 170 spm"]);
}

#[tokio::test]
async fn test_transport_error_stores_fallback() {
    init_test_logging();
    let store = memory_store();
    let dispatcher = dispatcher_with(
        Arc::new(ScriptedGateway::failing(unavailable())),
        store.clone(),
        fast_policy(),
    );

    let outcome = dispatcher
        .dispatch(&sample_activity("act-2", "user-2"), &CancellationToken::new())
        .await;

    assert_eq!(outcome.source, RecommendationSource::Fallback);
    assert_eq!(outcome.degradation, Some(PipelineError::Transport(unavailable())));
    assert!(outcome.is_stored());

    let stored = store.all();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].recommendation.sections().is_fallback());
    assert_eq!(stored[0].recommendation.activity_id(), "act-2");
}

#[tokio::test]
async fn test_malformed_answer_stores_fallback_with_parse_kind() {
    init_test_logging();
    let store = memory_store();
    let dispatcher = dispatcher_with(
        Arc::new(ScriptedGateway::always("<html>502 Bad Gateway</html>")),
        store.clone(),
        fast_policy(),
    );

    let outcome = dispatcher
        .dispatch(&sample_activity("act-3", "user-3"), &CancellationToken::new())
        .await;

    assert_eq!(outcome.source, RecommendationSource::Fallback);
    assert_eq!(
        outcome.degradation.as_ref().map(PipelineError::kind),
        Some(PipelineErrorKind::EnvelopeParse)
    );
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_timeout_stores_fallback() {
    init_test_logging();
    let store = memory_store();
    let gateway = ScriptedGateway::always(fenced_envelope(&well_formed_answer()))
        .with_delay(Duration::from_secs(5));
    let dispatcher = dispatcher_with(
        Arc::new(gateway),
        store.clone(),
        AiCallPolicy::fail_fast(Duration::from_millis(50)),
    );

    let outcome = dispatcher
        .dispatch(&sample_activity("act-4", "user-4"), &CancellationToken::new())
        .await;

    assert!(matches!(
        outcome.degradation,
        Some(PipelineError::Transport(TransportError::Timeout { .. }))
    ));
    assert_eq!(store.len(), 1);
}

// ============================================================================
// Store Failures
// ============================================================================

#[tokio::test]
async fn test_store_failure_is_reported_not_raised() {
    init_test_logging();
    let store = Arc::new(FailingStore::default());
    let dispatcher = dispatcher_with(
        Arc::new(ScriptedGateway::always(fenced_envelope(&well_formed_answer()))),
        store.clone(),
        fast_policy(),
    );

    let outcome = dispatcher
        .dispatch(&sample_activity("act-5", "user-5"), &CancellationToken::new())
        .await;

    assert!(!outcome.is_stored());
    assert_eq!(outcome.record_id(), None);
    assert!(matches!(outcome.store_error(), Some(StoreError::Query { .. })));
    assert_eq!(outcome.stage, PipelineStage::Parsed);
    assert_eq!(outcome.source, RecommendationSource::Generated);
    assert_eq!(store.attempts(), 1);
}

#[tokio::test]
async fn test_store_attempted_once_even_after_ai_failure() {
    init_test_logging();
    let store = Arc::new(FailingStore::default());
    let dispatcher = dispatcher_with(
        Arc::new(ScriptedGateway::failing(unavailable())),
        store.clone(),
        fast_policy(),
    );

    dispatcher
        .dispatch(&sample_activity("act-6", "user-6"), &CancellationToken::new())
        .await;

    assert_eq!(store.attempts(), 1);
}

// ============================================================================
// Retry Policy
// ============================================================================

#[tokio::test]
async fn test_default_policy_does_not_retry() {
    init_test_logging();
    let gateway = Arc::new(ScriptedGateway::failing(unavailable()));
    let dispatcher = dispatcher_with(gateway.clone(), memory_store(), AiCallPolicy::default());

    dispatcher
        .dispatch(&sample_activity("act-7", "user-7"), &CancellationToken::new())
        .await;

    assert_eq!(gateway.calls(), 1);
}

#[tokio::test]
async fn test_retryable_error_is_retried_until_success() {
    init_test_logging();
    let gateway = Arc::new(ScriptedGateway::with_script(
        vec![Err(unavailable()), Err(unavailable())],
        Ok(fenced_envelope(&well_formed_answer())),
    ));
    let policy = AiCallPolicy {
        timeout: Duration::from_millis(500),
        max_retries: 2,
        initial_backoff: Duration::from_millis(1),
    };
    let dispatcher = dispatcher_with(gateway.clone(), memory_store(), policy);

    let outcome = dispatcher
        .dispatch(&sample_activity("act-8", "user-8"), &CancellationToken::new())
        .await;

    assert_eq!(gateway.calls(), 3);
    assert_eq!(outcome.source, RecommendationSource::Generated);
}

#[tokio::test]
async fn test_non_retryable_error_is_not_retried() {
    init_test_logging();
    let gateway = Arc::new(ScriptedGateway::failing(TransportError::Status {
        service: "scripted",
        status: 401,
        body: "invalid key".to_owned(),
    }));
    let policy = AiCallPolicy {
        timeout: Duration::from_millis(500),
        max_retries: 3,
        initial_backoff: Duration::from_millis(1),
    };
    let dispatcher = dispatcher_with(gateway.clone(), memory_store(), policy);

    let outcome = dispatcher
        .dispatch(&sample_activity("act-9", "user-9"), &CancellationToken::new())
        .await;

    assert_eq!(gateway.calls(), 1);
    assert_eq!(outcome.source, RecommendationSource::Fallback);
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn test_cancellation_during_call_still_stores_fallback() {
    init_test_logging();
    let store = memory_store();
    let gateway = ScriptedGateway::always(fenced_envelope(&well_formed_answer()))
        .with_delay(Duration::from_secs(10));
    let dispatcher = dispatcher_with(
        Arc::new(gateway),
        store.clone(),
        AiCallPolicy::fail_fast(Duration::from_secs(30)),
    );
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let outcome = dispatcher
        .dispatch(&sample_activity("act-10", "user-10"), &cancel)
        .await;

    assert_eq!(
        outcome.degradation,
        Some(PipelineError::Transport(TransportError::Cancelled {
            service: "scripted"
        }))
    );
    assert!(outcome.is_stored());
    assert!(store.all()[0].recommendation.sections().is_fallback());
}

#[tokio::test]
async fn test_cancellation_stops_retry_backoff() {
    init_test_logging();
    let gateway = Arc::new(ScriptedGateway::failing(unavailable()));
    let policy = AiCallPolicy {
        timeout: Duration::from_millis(500),
        max_retries: 5,
        initial_backoff: Duration::from_secs(10),
    };
    let dispatcher = dispatcher_with(gateway.clone(), memory_store(), policy);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let outcome = tokio::time::timeout(
        Duration::from_secs(2),
        dispatcher.dispatch(&sample_activity("act-11", "user-11"), &cancel),
    )
    .await
    .unwrap();

    assert_eq!(gateway.calls(), 1);
    assert!(matches!(
        outcome.degradation,
        Some(PipelineError::Transport(TransportError::Cancelled { .. }))
    ));
}

// ============================================================================
// Attribution And Redelivery
// ============================================================================

#[tokio::test]
async fn test_concurrent_dispatches_stay_attributed() {
    init_test_logging();
    let store = memory_store();
    let dispatcher = PipelineDispatcher::new(
        Arc::new(IdPromptBuilder),
        Arc::new(EchoGateway),
        store.clone(),
        fast_policy(),
    );
    let cancel = CancellationToken::new();

    let activities: Vec<_> = (0..16)
        .map(|i| sample_activity(&format!("act-{i}"), &format!("user-{}", i % 4)))
        .collect();
    let outcomes = dispatch_all(&dispatcher, &activities, &cancel).await;

    for (activity, outcome) in activities.iter().zip(&outcomes) {
        assert_eq!(outcome.activity_id, activity.id());
        assert_eq!(outcome.user_id, activity.user_id());
        assert_eq!(outcome.source, RecommendationSource::Generated);
    }

    for activity in &activities {
        let stored = store.find_by_activity(activity.id()).await.unwrap();
        assert_eq!(stored.len(), 1);
        let record = &stored[0].recommendation;
        assert_eq!(record.user_id(), activity.user_id());
        assert_eq!(record.analysis(), format!("Overall{}\n\n", activity.id()));
        assert_eq!(record.safety(), [format!("checked {}", activity.id())]);
    }
}

async fn dispatch_all(
    dispatcher: &PipelineDispatcher,
    activities: &[Activity],
    cancel: &CancellationToken,
) -> Vec<DispatchOutcome> {
    let mut tasks = tokio::task::JoinSet::new();
    for (index, activity) in activities.iter().cloned().enumerate() {
        let dispatcher = dispatcher.clone();
        let cancel = cancel.clone();
        tasks.spawn(async move { (index, dispatcher.dispatch(&activity, &cancel).await) });
    }

    let mut outcomes = Vec::with_capacity(activities.len());
    while let Some(joined) = tasks.join_next().await {
        outcomes.push(joined.unwrap());
    }
    outcomes.sort_by_key(|(index, _)| *index);
    outcomes.into_iter().map(|(_, outcome)| outcome).collect()
}

#[tokio::test]
async fn test_redelivered_event_is_stored_twice() {
    init_test_logging();
    let store = memory_store();
    let dispatcher = dispatcher_with(
        Arc::new(ScriptedGateway::always(fenced_envelope(&well_formed_answer()))),
        store.clone(),
        fast_policy(),
    );
    let activity = sample_activity("act-dup", "user-dup");
    let cancel = CancellationToken::new();

    let first = dispatcher.dispatch(&activity, &cancel).await;
    let second = dispatcher.dispatch(&activity, &cancel).await;

    let stored = store.find_by_activity("act-dup").await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_ne!(first.record_id(), second.record_id());
    assert_eq!(stored[0].recommendation, stored[1].recommendation);
}
