// ABOUTME: Shared test utilities for recommendation pipeline integration tests
// ABOUTME: Provides quiet logging, fixture activities, envelope builders, and fake capabilities
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used
)]
//! Shared test utilities for `fitness_recommender`

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use fitness_recommender::config::AiCallPolicy;
use fitness_recommender::database::{InMemoryRecommendationStore, RecommendationStore};
use fitness_recommender::errors::{StoreError, TransportError};
use fitness_recommender::llm::{ActivityPromptBuilder, AiGateway, PromptBuilder};
use fitness_recommender::models::{Activity, ActivityBuilder, Recommendation, StoredRecommendation};
use fitness_recommender::pipeline::PipelineDispatcher;
use serde_json::{json, Value};

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        // Check for TEST_LOG environment variable to control test logging level
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN, // Default to WARN for quiet tests
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

// ============================================================================
// Fixtures
// ============================================================================

/// A running activity with a couple of metrics
pub fn sample_activity(id: &str, user_id: &str) -> Activity {
    ActivityBuilder::new(id, user_id, "RUNNING")
        .duration_minutes(42)
        .calories_burned(512)
        .metric("averageHeartRate", json!(151))
        .metric("distanceKm", json!(8.4))
        .build()
}

/// JSON event as emitted by the activity intake service
pub fn activity_event(id: &str, user_id: &str) -> String {
    json!({
        "id": id,
        "userId": user_id,
        "type": "RUNNING",
        "duration": 42,
        "caloriesBurned": 512,
        "startTime": "2025-03-01T07:30:00",
        "additionalMetrics": {"distanceKm": 8.4}
    })
    .to_string()
}

/// A complete answer in the schema the prompt asks for
pub fn well_formed_answer() -> Value {
    json!({
        "analysis": {
            "overall": "Solid aerobic session",
            "pace": "Even splits",
            "heartRate": "Mostly zone 2",
            "caloriesBurned": "In line with duration"
        },
        "improvements": [
            {"area": "Cadence", "recommendation": "Aim for 170 spm"}
        ],
        "suggestions": [
            {"workout": "Tempo run", "description": "20 minutes at threshold"}
        ],
        "safety": ["Warm up for 10 minutes", "Hydrate"]
    })
}

/// Wrap model text in the Gemini `generateContent` response envelope
pub fn gemini_envelope(text: &str) -> String {
    json!({
        "candidates": [
            {"content": {"parts": [{"text": text}], "role": "model"}, "finishReason": "STOP"}
        ]
    })
    .to_string()
}

/// Model text as Gemini usually returns it: a fenced JSON block
pub fn fenced(answer: &Value) -> String {
    format!("```json\n{}\n```", serde_json::to_string_pretty(answer).unwrap())
}

/// Envelope carrying a fenced answer
pub fn fenced_envelope(answer: &Value) -> String {
    gemini_envelope(&fenced(answer))
}

/// Policy with a short timeout and no retries
pub fn fast_policy() -> AiCallPolicy {
    AiCallPolicy::fail_fast(Duration::from_millis(500))
}

/// Dispatcher using the real prompt builder
pub fn dispatcher_with(
    gateway: Arc<dyn AiGateway>,
    store: Arc<dyn RecommendationStore>,
    policy: AiCallPolicy,
) -> PipelineDispatcher {
    PipelineDispatcher::new(Arc::new(ActivityPromptBuilder::new()), gateway, store, policy)
}

// ============================================================================
// Fake Gateways
// ============================================================================

/// Gateway that replays scripted results, then repeats a default
pub struct ScriptedGateway {
    script: Mutex<VecDeque<Result<String, TransportError>>>,
    default: Result<String, TransportError>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedGateway {
    /// Always answer with `envelope`
    pub fn always(envelope: impl Into<String>) -> Self {
        Self::with_script(Vec::new(), Ok(envelope.into()))
    }

    /// Always fail with `error`
    pub fn failing(error: TransportError) -> Self {
        Self::with_script(Vec::new(), Err(error))
    }

    /// Replay `script`, then answer with `default`
    pub fn with_script(
        script: Vec<Result<String, TransportError>>,
        default: Result<String, TransportError>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into()),
            default,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sleep this long before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of `invoke` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AiGateway for ScriptedGateway {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn invoke(&self, _prompt: &str) -> Result<String, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.default.clone())
    }
}

/// Prompt builder that sends only the activity id
pub struct IdPromptBuilder;

impl PromptBuilder for IdPromptBuilder {
    fn build_prompt(&self, activity: &Activity) -> String {
        activity.id().to_owned()
    }
}

/// Gateway that answers with the prompt as the overall analysis, after a
/// prompt-dependent delay so concurrent calls finish out of order
pub struct EchoGateway;

#[async_trait]
impl AiGateway for EchoGateway {
    fn name(&self) -> &'static str {
        "echo"
    }

    async fn invoke(&self, prompt: &str) -> Result<String, TransportError> {
        let jitter = prompt.bytes().map(u64::from).sum::<u64>() % 40;
        tokio::time::sleep(Duration::from_millis(5 + jitter)).await;
        Ok(fenced_envelope(&json!({
            "analysis": {"overall": prompt},
            "safety": [format!("checked {prompt}")]
        })))
    }
}

// ============================================================================
// Fake Stores
// ============================================================================

/// Store that rejects every write
#[derive(Default)]
pub struct FailingStore {
    attempts: AtomicUsize,
}

impl FailingStore {
    /// Number of `save` calls so far
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecommendationStore for FailingStore {
    async fn save(&self, _recommendation: Recommendation) -> Result<StoredRecommendation, StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Query {
            context: "disk full".to_owned(),
        })
    }

    async fn find_by_user(&self, _user_id: &str) -> Result<Vec<StoredRecommendation>, StoreError> {
        Ok(Vec::new())
    }

    async fn find_by_activity(
        &self,
        _activity_id: &str,
    ) -> Result<Vec<StoredRecommendation>, StoreError> {
        Ok(Vec::new())
    }
}

/// Fresh in-memory store
pub fn memory_store() -> Arc<InMemoryRecommendationStore> {
    Arc::new(InMemoryRecommendationStore::new())
}
