// ABOUTME: Core types and constants for the fitness recommendation pipeline
// ABOUTME: Foundation crate with error handling, activity and recommendation models, and constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Fitness Recommender Core
//!
//! Foundation crate providing shared types and constants for the recommendation
//! pipeline. It has no I/O and changes infrequently, so the service crate and its
//! tests can depend on it without pulling in the HTTP or database stacks.
//!
//! ## Modules
//!
//! - **errors**: `AppError`/`ErrorCode` plus the pipeline error taxonomy
//! - **constants**: fallback advice, sentinel strings, configuration defaults
//! - **models**: `Activity` (inbound event) and `Recommendation` (output record)

/// Unified error handling and the pipeline error taxonomy
pub mod errors;

/// Application constants organized by domain
pub mod constants;

/// Core data models (Activity, Recommendation)
pub mod models;
