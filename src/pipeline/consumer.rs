// ABOUTME: Consumer runtime feeding inbound activity messages to the dispatcher concurrently
// ABOUTME: Bounded worker pool, poison-message handling, per-message acks, and clean shutdown
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Consumer Runtime
//!
//! Messages arrive on a `tokio::sync::mpsc` channel as raw JSON payloads with
//! an offset. Each one is decoded into an `Activity` and dispatched on its own
//! task, at most `worker_concurrency` at a time. Every message is acknowledged
//! exactly once, including poison messages and messages whose save failed.
//!
//! Delivery is at-least-once and there is no deduplication: a redelivered
//! payload is dispatched and stored again.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::dispatcher::{DispatchOutcome, PipelineDispatcher, PipelineStage};
use crate::config::ConsumerConfig;
use crate::models::{Activity, RecommendationSource};

/// Final state reported back to the producer for one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckStatus {
    /// A recommendation was stored
    Stored {
        /// Generated record id
        record_id: Uuid,
        /// Model answer or fallback
        source: RecommendationSource,
    },
    /// The save failed; the message is still considered processed
    StoreFailed,
    /// The payload was not an activity and was skipped
    Poison,
}

/// Acknowledgment for one inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acknowledgement {
    /// Offset of the acknowledged message
    pub offset: u64,
    /// How processing ended
    pub status: AckStatus,
}

/// One delivery from the activity topic
#[derive(Debug)]
pub struct InboundMessage {
    offset: u64,
    payload: String,
    ack: Option<oneshot::Sender<Acknowledgement>>,
}

impl InboundMessage {
    /// Message without an acknowledgment channel
    #[must_use]
    pub fn new(offset: u64, payload: impl Into<String>) -> Self {
        Self {
            offset,
            payload: payload.into(),
            ack: None,
        }
    }

    /// Message plus the receiver its acknowledgment will be sent on
    #[must_use]
    pub fn with_ack(
        offset: u64,
        payload: impl Into<String>,
    ) -> (Self, oneshot::Receiver<Acknowledgement>) {
        let (tx, rx) = oneshot::channel();
        let message = Self {
            offset,
            payload: payload.into(),
            ack: Some(tx),
        };
        (message, rx)
    }

    /// Delivery offset
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Raw JSON payload
    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    fn acknowledge(self, status: AckStatus) {
        if let Some(ack) = self.ack {
            if ack
                .send(Acknowledgement {
                    offset: self.offset,
                    status,
                })
                .is_err()
            {
                debug!(offset = self.offset, "Acknowledgment receiver dropped");
            }
        }
    }
}

impl From<&DispatchOutcome> for AckStatus {
    fn from(outcome: &DispatchOutcome) -> Self {
        match &outcome.persisted {
            Ok(record) => Self::Stored {
                record_id: record.id,
                source: outcome.source,
            },
            Err(_) => Self::StoreFailed,
        }
    }
}

/// Counters for one consumer run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConsumerSummary {
    /// Messages taken off the channel
    pub received: u64,
    /// Messages that went through the dispatcher
    pub dispatched: u64,
    /// Dispatches that stored the fallback recommendation
    pub fallbacks: u64,
    /// Dispatches whose save failed
    pub store_failures: u64,
    /// Payloads that were not activities
    pub poison: u64,
}

impl ConsumerSummary {
    fn record(&mut self, outcome: &DispatchOutcome) {
        self.dispatched += 1;
        if outcome.source == RecommendationSource::Fallback {
            self.fallbacks += 1;
        }
        if !outcome.is_stored() {
            self.store_failures += 1;
        }
    }

    fn record_joined(&mut self, joined: Result<DispatchOutcome, JoinError>) {
        match joined {
            Ok(outcome) => self.record(&outcome),
            Err(e) => error!(error = %e, "Dispatch task failed"),
        }
    }
}

/// Pulls messages off a channel and dispatches them on a bounded worker pool
#[derive(Clone)]
pub struct ConsumerRuntime {
    dispatcher: PipelineDispatcher,
    worker_concurrency: usize,
}

impl ConsumerRuntime {
    /// Create a runtime; a concurrency of zero is raised to one
    #[must_use]
    pub fn new(dispatcher: PipelineDispatcher, config: ConsumerConfig) -> Self {
        Self {
            dispatcher,
            worker_concurrency: config.worker_concurrency.max(1),
        }
    }

    /// Consume until the channel closes or `cancel` fires
    ///
    /// On cancellation no further messages are taken; dispatches already
    /// running finish (their AI calls resolve to the fallback) and are
    /// acknowledged before this returns.
    pub async fn run(
        &self,
        mut inbox: mpsc::Receiver<InboundMessage>,
        cancel: CancellationToken,
    ) -> ConsumerSummary {
        let permits = Arc::new(Semaphore::new(self.worker_concurrency));
        let mut workers = JoinSet::new();
        let mut summary = ConsumerSummary::default();

        info!(workers = self.worker_concurrency, "Consumer started");

        loop {
            while let Some(joined) = workers.try_join_next() {
                summary.record_joined(joined);
            }

            let permit = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                permit = Arc::clone(&permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let message = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                message = inbox.recv() => match message {
                    Some(message) => message,
                    None => break,
                },
            };
            summary.received += 1;

            let activity = match serde_json::from_str::<Activity>(message.payload()) {
                Ok(activity) => activity,
                Err(e) => {
                    warn!(offset = message.offset(), error = %e, "Skipping undecodable activity message");
                    summary.poison += 1;
                    message.acknowledge(AckStatus::Poison);
                    continue;
                }
            };

            let dispatcher = self.dispatcher.clone();
            let token = cancel.clone();
            workers.spawn(async move {
                let _permit = permit;
                let mut outcome = dispatcher.dispatch(&activity, &token).await;
                let offset = message.offset();
                message.acknowledge(AckStatus::from(&outcome));
                outcome.stage = PipelineStage::Acknowledged;
                debug!(
                    offset,
                    activity.id = %outcome.activity_id,
                    pipeline.stage = %outcome.stage,
                    "Message acknowledged"
                );
                outcome
            });
        }

        if cancel.is_cancelled() {
            info!(in_flight = workers.len(), "Cancellation requested, draining in-flight dispatches");
        }
        while let Some(joined) = workers.join_next().await {
            summary.record_joined(joined);
        }

        info!(
            received = summary.received,
            dispatched = summary.dispatched,
            fallbacks = summary.fallbacks,
            store_failures = summary.store_failures,
            poison = summary.poison,
            "Consumer stopped"
        );
        summary
    }
}
