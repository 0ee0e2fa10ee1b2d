// ABOUTME: Per-message orchestration of prompt, AI call, parsing, assembly, and persistence
// ABOUTME: Absorbs every AI-side failure into the fallback and always attempts exactly one save
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Pipeline Dispatcher
//!
//! One activity goes through `Received -> PromptBuilt -> Invoked -> Parsed ->
//! Stored`. Transport and parse failures are collapsed into the fallback
//! sections; a store failure is logged and reported on the outcome. `dispatch`
//! has no error return, so one bad message can never stop the consumer.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::config::AiCallPolicy;
use crate::database::RecommendationStore;
use crate::errors::{PipelineError, PipelineErrorKind, StoreError, TransportError};
use crate::intelligence::{RecommendationAssembler, ResponseParser};
use crate::llm::{AiGateway, PromptBuilder};
use crate::models::{Activity, RecommendationSections, RecommendationSource, StoredRecommendation};

/// Progress of one message through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineStage {
    /// Activity decoded from the inbound message
    Received,
    /// Prompt rendered
    PromptBuilt,
    /// Gateway call finished (successfully or not)
    Invoked,
    /// Sections parsed or replaced by the fallback
    Parsed,
    /// Store accepted the record
    Stored,
    /// Message acknowledged to the consumer
    Acknowledged,
}

impl PipelineStage {
    /// Stable name for logs
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::PromptBuilt => "prompt_built",
            Self::Invoked => "invoked",
            Self::Parsed => "parsed",
            Self::Stored => "stored",
            Self::Acknowledged => "acknowledged",
        }
    }
}

impl Display for PipelineStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one dispatched activity
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    /// Source activity identifier
    pub activity_id: String,
    /// Owning user identifier
    pub user_id: String,
    /// Whether the stored content came from the model or the fallback
    pub source: RecommendationSource,
    /// AI-side failure that was absorbed into the fallback
    pub degradation: Option<PipelineError>,
    /// Result of the single save attempt
    pub persisted: Result<StoredRecommendation, StoreError>,
    /// Last stage reached
    pub stage: PipelineStage,
}

impl DispatchOutcome {
    /// Whether the store accepted the record
    #[must_use]
    pub const fn is_stored(&self) -> bool {
        self.persisted.is_ok()
    }

    /// Generated record id, if stored
    #[must_use]
    pub fn record_id(&self) -> Option<Uuid> {
        self.persisted.as_ref().ok().map(|record| record.id)
    }

    /// Store failure, if the save was rejected
    #[must_use]
    pub fn store_error(&self) -> Option<&StoreError> {
        self.persisted.as_ref().err()
    }
}

/// Processes one activity at a time; share it across workers with `Clone`
#[derive(Clone)]
pub struct PipelineDispatcher {
    prompt_builder: Arc<dyn PromptBuilder>,
    gateway: Arc<dyn AiGateway>,
    store: Arc<dyn RecommendationStore>,
    parser: ResponseParser,
    policy: AiCallPolicy,
}

impl PipelineDispatcher {
    /// Wire the dispatcher with its capabilities
    #[must_use]
    pub fn new(
        prompt_builder: Arc<dyn PromptBuilder>,
        gateway: Arc<dyn AiGateway>,
        store: Arc<dyn RecommendationStore>,
        policy: AiCallPolicy,
    ) -> Self {
        Self {
            prompt_builder,
            gateway,
            store,
            parser: ResponseParser::new(),
            policy,
        }
    }

    /// Run the full pipeline for one activity
    ///
    /// Cancellation turns the AI call into a fallback; the save still happens.
    #[instrument(skip_all, fields(activity.id = %activity.id(), user.id = %activity.user_id()))]
    pub async fn dispatch(&self, activity: &Activity, cancel: &CancellationToken) -> DispatchOutcome {
        debug!(pipeline.stage = %PipelineStage::Received, "Dispatching activity");

        let prompt = self.prompt_builder.build_prompt(activity);
        debug!(pipeline.stage = %PipelineStage::PromptBuilt, prompt.len = prompt.len(), "Prompt built");

        let invoked = self.invoke_with_policy(&prompt, cancel).await;
        debug!(pipeline.stage = %PipelineStage::Invoked, ok = invoked.is_ok(), "Gateway call finished");

        let parsed = invoked
            .map_err(PipelineError::from)
            .and_then(|envelope| self.parser.try_parse(&envelope).map_err(PipelineError::from));

        let (sections, degradation) = match parsed {
            Ok(sections) => (sections, None),
            Err(failure) => {
                warn!(
                    error.kind = %failure.kind(),
                    error = %failure,
                    "AI recommendation unavailable, using fallback"
                );
                (RecommendationSections::fallback(), Some(failure))
            }
        };
        let source = if degradation.is_some() {
            RecommendationSource::Fallback
        } else {
            RecommendationSource::Generated
        };
        debug!(pipeline.stage = %PipelineStage::Parsed, pipeline.source = source.as_str(), "Sections ready");

        let recommendation = RecommendationAssembler::assemble(activity, sections);
        let persisted = self.store.save(recommendation).await;

        let stage = match &persisted {
            Ok(record) => {
                info!(
                    pipeline.stage = %PipelineStage::Stored,
                    pipeline.source = source.as_str(),
                    record.id = %record.id,
                    "Recommendation stored"
                );
                PipelineStage::Stored
            }
            Err(e) => {
                error!(
                    error.kind = %PipelineErrorKind::Store,
                    error = %e,
                    pipeline.source = source.as_str(),
                    "Failed to store recommendation"
                );
                PipelineStage::Parsed
            }
        };

        DispatchOutcome {
            activity_id: activity.id().to_owned(),
            user_id: activity.user_id().to_owned(),
            source,
            degradation,
            persisted,
            stage,
        }
    }

    /// Call the gateway with per-attempt timeout, retries on retryable errors,
    /// and doubling backoff. Cancellation wins over both the call and the backoff.
    async fn invoke_with_policy(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String, TransportError> {
        let service = self.gateway.name();
        let mut retries = 0_u32;

        loop {
            let attempt = tokio::select! {
                biased;
                () = cancel.cancelled() => Err(TransportError::Cancelled { service }),
                outcome = timeout(self.policy.timeout, self.gateway.invoke(prompt)) => {
                    outcome.unwrap_or(Err(TransportError::Timeout {
                        service,
                        timeout: self.policy.timeout,
                    }))
                }
            };

            match attempt {
                Ok(envelope) => return Ok(envelope),
                Err(e) if retries < self.policy.max_retries && e.is_retryable() => {
                    retries += 1;
                    let delay = self.policy.backoff_for(retries);
                    warn!(retry = retries, delay_ms = delay.as_millis(), error = %e, "AI call failed, retrying");
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => return Err(TransportError::Cancelled { service }),
                        () = sleep(delay) => {}
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}
