// ABOUTME: Unified error handling with AppError, ErrorCode, and the pipeline error taxonomy
// ABOUTME: AppError covers startup/config failures; pipeline errors are absorbed or logged
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Unified Error Handling System
//!
//! Two layers:
//!
//! - `AppError` with a stable `ErrorCode`, used for configuration, startup and
//!   CLI failures that should stop the process.
//! - The pipeline taxonomy in [`pipeline`] (`TransportError`, `ParseFailure`,
//!   `StoreError`, `PipelineError`). These never escape a dispatch; they are
//!   either collapsed into the fallback recommendation or logged.

/// Pipeline error taxonomy
pub mod pipeline;

pub use pipeline::{ParseFailure, PipelineError, PipelineErrorKind, StoreError, TransportError};

use std::error::Error;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Standard error codes used throughout the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Configuration (6000-6999)
    /// Required configuration is missing
    ConfigMissing = 6001,
    /// Configuration value is invalid
    ConfigInvalid = 6002,

    // Internal Errors (9000-9999)
    /// Database operation failed
    DatabaseError = 9001,
}

impl ErrorCode {
    /// Get a user-friendly description of this error
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::ConfigMissing => "Required configuration is missing",
            Self::ConfigInvalid => "Configuration is invalid",
            Self::DatabaseError => "Database operation failed",
        }
    }
}

/// Unified error type for the application
#[derive(Debug)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Source error for error chaining
    pub source: Option<Box<dyn Error + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Add a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Required configuration value is missing
    #[must_use]
    pub fn config_missing(key: &str) -> Self {
        Self::new(
            ErrorCode::ConfigMissing,
            format!("{key} environment variable not set"),
        )
    }

    /// Configuration value could not be parsed
    #[must_use]
    pub fn config_invalid(key: &str, value: &str, reason: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::ConfigInvalid,
            format!("Invalid value '{value}' for {key}: {reason}"),
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn Error + 'static))
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> Self {
        Self::new(ErrorCode::DatabaseError, error.to_string()).with_source(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorCode::ConfigMissing).unwrap();
        assert_eq!(json, "\"CONFIG_MISSING\"");
    }

    #[test]
    fn test_app_error_display_includes_description() {
        let error = AppError::config_missing("GEMINI_API_KEY");
        assert_eq!(error.code, ErrorCode::ConfigMissing);
        assert_eq!(
            error.to_string(),
            "Required configuration is missing: GEMINI_API_KEY environment variable not set"
        );
    }

    #[test]
    fn test_store_error_maps_to_database_code_with_source() {
        let error = AppError::from(StoreError::Query {
            context: "insert failed".to_owned(),
        });
        assert_eq!(error.code, ErrorCode::DatabaseError);
        assert!(error.source().is_some());
    }
}
