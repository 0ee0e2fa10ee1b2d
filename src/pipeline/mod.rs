// ABOUTME: Asynchronous recommendation pipeline for recorded activities
// ABOUTME: Single-message dispatcher plus the concurrent consumer runtime that drives it
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Bounded-concurrency message consumer
pub mod consumer;

/// Per-message orchestration
pub mod dispatcher;

pub use consumer::{AckStatus, Acknowledgement, ConsumerRuntime, ConsumerSummary, InboundMessage};
pub use dispatcher::{DispatchOutcome, PipelineDispatcher, PipelineStage};
