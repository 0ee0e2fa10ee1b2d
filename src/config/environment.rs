// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Handles environment variables, .env loading, validation, and a redacted summary
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Environment-based configuration management

use std::env;
use std::fmt::{self, Debug, Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constants::{defaults, env_keys};
use crate::errors::{AppError, AppResult};

/// Environment type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development
    #[default]
    Development,
    /// Production deployment
    Production,
    /// Automated tests
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub const fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl Display for Environment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Gemini gateway settings
#[derive(Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key; only required by commands that call the model
    pub api_key: Option<String>,
    /// Base URL of the Generative Language API
    pub base_url: String,
    /// Model used for activity analysis
    pub model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: defaults::GEMINI_API_BASE_URL.to_owned(),
            model: defaults::GEMINI_MODEL.to_owned(),
        }
    }
}

impl Debug for GeminiConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

/// How the dispatcher calls the AI gateway
///
/// With `max_retries = 0` a failed call goes straight to the fallback
/// recommendation. The timeout applies to each attempt separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiCallPolicy {
    /// Upper bound on one attempt
    pub timeout: Duration,
    /// Attempts after the first one
    pub max_retries: u32,
    /// Delay before the first retry, doubled for each further retry
    pub initial_backoff: Duration,
}

impl Default for AiCallPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(defaults::AI_REQUEST_TIMEOUT_SECS),
            max_retries: defaults::AI_MAX_RETRIES,
            initial_backoff: Duration::from_millis(defaults::AI_RETRY_BACKOFF_MS),
        }
    }
}

impl AiCallPolicy {
    /// Single attempt with the given timeout and no retries
    #[must_use]
    pub const fn fail_fast(timeout: Duration) -> Self {
        Self {
            timeout,
            max_retries: 0,
            initial_backoff: Duration::ZERO,
        }
    }

    /// Backoff before retry number `retry` (1-based)
    #[must_use]
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor = 2_u32.saturating_pow(retry.saturating_sub(1));
        self.initial_backoff.saturating_mul(factor)
    }
}

/// Recommendation store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `sqlite:<path>` or `sqlite::memory:`
    pub url: String,
}

/// Consumer runtime settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConsumerConfig {
    /// Maximum concurrent dispatches
    pub worker_concurrency: usize,
    /// Buffered inbound messages
    pub channel_capacity: usize,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            worker_concurrency: defaults::WORKER_CONCURRENCY,
            channel_capacity: defaults::CONSUMER_CHANNEL_CAPACITY,
        }
    }
}

/// Complete worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Deployment environment
    pub environment: Environment,
    /// Gemini gateway settings
    pub gemini: GeminiConfig,
    /// AI call timeout and retry policy
    pub ai_call: AiCallPolicy,
    /// Store settings
    pub database: DatabaseConfig,
    /// Consumer settings
    pub consumer: ConsumerConfig,
}

impl ServiceConfig {
    /// Load configuration from environment variables
    ///
    /// A `.env` file in the working directory is loaded first when present.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a numeric value does not parse or is out of range.
    pub fn from_env() -> AppResult<Self> {
        info!("Loading configuration from environment variables");

        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file loaded: {e}");
        }

        Self::from_source(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a numeric value does not parse or is out of range.
    pub fn from_source<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout_secs = parse_or(
            &lookup,
            env_keys::AI_REQUEST_TIMEOUT_SECS,
            defaults::AI_REQUEST_TIMEOUT_SECS,
        )?;
        let config = Self {
            environment: lookup(env_keys::ENVIRONMENT)
                .map(|value| Environment::from_str_or_default(&value))
                .unwrap_or_default(),
            gemini: GeminiConfig {
                api_key: lookup(env_keys::GEMINI_API_KEY).filter(|key| !key.trim().is_empty()),
                base_url: lookup(env_keys::GEMINI_API_URL)
                    .unwrap_or_else(|| defaults::GEMINI_API_BASE_URL.to_owned()),
                model: lookup(env_keys::GEMINI_MODEL)
                    .unwrap_or_else(|| defaults::GEMINI_MODEL.to_owned()),
            },
            ai_call: AiCallPolicy {
                timeout: Duration::from_secs(timeout_secs),
                max_retries: parse_or(&lookup, env_keys::AI_MAX_RETRIES, defaults::AI_MAX_RETRIES)?,
                initial_backoff: Duration::from_millis(parse_or(
                    &lookup,
                    env_keys::AI_RETRY_BACKOFF_MS,
                    defaults::AI_RETRY_BACKOFF_MS,
                )?),
            },
            database: DatabaseConfig {
                url: lookup(env_keys::DATABASE_URL)
                    .unwrap_or_else(|| defaults::DATABASE_URL.to_owned()),
            },
            consumer: ConsumerConfig {
                worker_concurrency: parse_or(
                    &lookup,
                    env_keys::WORKER_CONCURRENCY,
                    defaults::WORKER_CONCURRENCY,
                )?,
                channel_capacity: parse_or(
                    &lookup,
                    env_keys::CONSUMER_CHANNEL_CAPACITY,
                    defaults::CONSUMER_CHANNEL_CAPACITY,
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values the runtime cannot work with
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the offending key.
    pub fn validate(&self) -> AppResult<()> {
        if self.ai_call.timeout.is_zero() {
            return Err(AppError::config_invalid(
                env_keys::AI_REQUEST_TIMEOUT_SECS,
                "0",
                "timeout must be at least one second",
            ));
        }
        if self.consumer.worker_concurrency == 0 {
            return Err(AppError::config_invalid(
                env_keys::WORKER_CONCURRENCY,
                "0",
                "at least one worker is required",
            ));
        }
        if self.consumer.channel_capacity == 0 {
            return Err(AppError::config_invalid(
                env_keys::CONSUMER_CHANNEL_CAPACITY,
                "0",
                "channel capacity must be positive",
            ));
        }
        if !self.database.url.starts_with("sqlite:") {
            return Err(AppError::config_invalid(
                env_keys::DATABASE_URL,
                &self.database.url,
                "only sqlite: URLs are supported",
            ));
        }
        Ok(())
    }

    /// One-line description safe for logs (no secrets)
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "environment={} model={} api_key={} ai_timeout={:?} ai_max_retries={} database={} workers={}",
            self.environment,
            self.gemini.model,
            if self.gemini.api_key.is_some() {
                "set"
            } else {
                "missing"
            },
            self.ai_call.timeout,
            self.ai_call.max_retries,
            self.database.url,
            self.consumer.worker_concurrency,
        )
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> AppResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    lookup(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .map_err(|e| AppError::config_invalid(key, &raw, e))
    })
}
