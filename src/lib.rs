// ABOUTME: Main library entry point for the fitness recommendation pipeline
// ABOUTME: Wires prompt building, the Gemini gateway, defensive parsing, and persistence
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Fitness Recommender
//!
//! Consumes recorded fitness activities and turns each one into a stored
//! AI-generated recommendation. The external model's output is never trusted:
//! every parsing layer has its own failure boundary that collapses into one
//! canonical fallback recommendation, so a dispatch always ends with exactly one
//! store attempt.
//!
//! ## Architecture
//!
//! - **llm**: `PromptBuilder` and the `AiGateway` capability (Gemini implementation)
//! - **intelligence**: `ResponseParser` and `RecommendationAssembler`
//! - **pipeline**: `PipelineDispatcher` (one message) and `ConsumerRuntime` (many)
//! - **database**: `RecommendationStore` with SQLite and in-memory backends
//! - **config** / **logging**: environment configuration and tracing setup
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fitness_recommender::config::environment::ServiceConfig;
//! use fitness_recommender::database::SqliteRecommendationStore;
//! use fitness_recommender::llm::{ActivityPromptBuilder, GeminiGateway};
//! use fitness_recommender::pipeline::PipelineDispatcher;
//! use fitness_recommender::errors::AppResult;
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let config = ServiceConfig::from_env()?;
//!     let store = SqliteRecommendationStore::connect(&config.database.url).await?;
//!     let dispatcher = PipelineDispatcher::new(
//!         Arc::new(ActivityPromptBuilder::new()),
//!         Arc::new(GeminiGateway::from_config(&config.gemini)?),
//!         Arc::new(store),
//!         config.ai_call.clone(),
//!     );
//!     # let _ = dispatcher;
//!     Ok(())
//! }
//! ```

// Re-export core modules so the service can keep `crate::errors::*` paths
pub use fitness_recommender_core::constants;
pub use fitness_recommender_core::errors;
pub use fitness_recommender_core::models;

/// Environment-based configuration
pub mod config;

/// Recommendation persistence
pub mod database;

/// Response parsing and recommendation assembly
pub mod intelligence;

/// Prompt construction and the external text-generation gateway
pub mod llm;

/// Structured logging setup
pub mod logging;

/// Per-message dispatch and the concurrent consumer runtime
pub mod pipeline;
