// ABOUTME: Prompt construction and external text-generation gateway abstractions
// ABOUTME: Defines the PromptBuilder and AiGateway capabilities injected into the dispatcher
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # AI Gateway Interface
//!
//! The dispatcher depends on two capabilities defined here:
//!
//! - **`PromptBuilder`**: pure `Activity -> String`, no I/O, no failure mode
//! - **`AiGateway`**: one call to a text-generation service returning the raw
//!   provider envelope as an opaque string
//!
//! Both are trait objects so tests can substitute fakes.
//!
//! ## Example: Calling a Gateway
//!
//! ```rust,no_run
//! use fitness_recommender::llm::{ActivityPromptBuilder, AiGateway, PromptBuilder};
//! use fitness_recommender::models::Activity;
//!
//! async fn example(gateway: &dyn AiGateway, activity: &Activity) {
//!     let prompt = ActivityPromptBuilder::new().build_prompt(activity);
//!     match gateway.invoke(&prompt).await {
//!         Ok(envelope) => println!("{} bytes", envelope.len()),
//!         Err(e) => eprintln!("{e}"),
//!     }
//! }
//! ```

mod gemini;
pub mod prompts;

pub use gemini::GeminiGateway;
pub use prompts::ActivityPromptBuilder;

use async_trait::async_trait;

use crate::errors::TransportError;
use crate::models::Activity;

/// Turns an activity into the prompt sent to the model
pub trait PromptBuilder: Send + Sync {
    /// Render the prompt. Deterministic and total.
    fn build_prompt(&self, activity: &Activity) -> String;
}

/// External text-generation service
///
/// One call is one attempt; timeouts, retries and cancellation are applied by
/// the caller around `invoke`.
#[async_trait]
pub trait AiGateway: Send + Sync {
    /// Identifier used in logs and transport errors (e.g., "gemini")
    fn name(&self) -> &'static str;

    /// Send the prompt and return the raw response body (the provider envelope)
    ///
    /// # Errors
    ///
    /// Returns `TransportError` when the request cannot be sent, the body cannot
    /// be read, or the service answers with a non-success status.
    async fn invoke(&self, prompt: &str) -> Result<String, TransportError>;
}
