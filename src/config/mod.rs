// ABOUTME: Configuration management module for the recommendation worker
// ABOUTME: Environment-only configuration for the AI gateway, call policy, store, and consumer
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Configuration module
//!
//! All settings come from environment variables (optionally seeded from a
//! `.env` file). See [`environment::ServiceConfig::from_env`].

/// Environment and service configuration
pub mod environment;

pub use environment::{
    AiCallPolicy, ConsumerConfig, DatabaseConfig, Environment, GeminiConfig, ServiceConfig,
};
