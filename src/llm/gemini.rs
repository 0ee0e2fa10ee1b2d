// ABOUTME: Google Gemini gateway returning the raw generateContent response envelope
// ABOUTME: Single attempt per call; HTTP and status failures surface as TransportError
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Gemini Gateway
//!
//! Implementation of the `AiGateway` trait for Google's Gemini models.
//!
//! ## Configuration
//!
//! Set the `GEMINI_API_KEY` environment variable with your API key from
//! Google AI Studio. `GEMINI_API_URL` and `GEMINI_MODEL` override the endpoint
//! and model.
//!
//! The gateway deliberately does not decode the response: the body is handed
//! to the `ResponseParser`, which owns every assumption about its shape.

use std::fmt::{Debug, Formatter, Result as FmtResult};

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, error, instrument};

use super::AiGateway;
use crate::config::GeminiConfig;
use crate::constants::{env_keys, service_names};
use crate::errors::{AppError, AppResult, TransportError};

/// Longest response body kept in a `TransportError::Status`
const MAX_ERROR_BODY_CHARS: usize = 512;

// ============================================================================
// API Request Types
// ============================================================================

/// Gemini API request structure
#[derive(Debug, Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
}

/// Content structure for Gemini API
#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    parts: Vec<ContentPart<'a>>,
}

/// Text part of a content block
#[derive(Debug, Serialize)]
struct ContentPart<'a> {
    text: &'a str,
}

impl<'a> GeminiRequest<'a> {
    fn from_prompt(prompt: &'a str) -> Self {
        Self {
            contents: vec![GeminiContent {
                parts: vec![ContentPart { text: prompt }],
            }],
        }
    }
}

// ============================================================================
// Gateway Implementation
// ============================================================================

/// Google Gemini text-generation gateway
pub struct GeminiGateway {
    api_key: String,
    client: Client,
    base_url: String,
    model: String,
}

impl GeminiGateway {
    /// Create a gateway for the given key, endpoint and model
    #[must_use]
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            client: Client::new(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    /// Create a gateway from configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no API key is configured.
    pub fn from_config(config: &GeminiConfig) -> AppResult<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::config_missing(env_keys::GEMINI_API_KEY))?;
        Ok(Self::new(api_key, &config.base_url, &config.model))
    }

    /// Model this gateway calls
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the generateContent URL for the configured model
    fn build_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url.trim_end_matches('/'),
            self.model,
            self.api_key
        )
    }

    fn truncate_body(body: &str) -> String {
        body.chars().take(MAX_ERROR_BODY_CHARS).collect()
    }
}

#[async_trait]
impl AiGateway for GeminiGateway {
    fn name(&self) -> &'static str {
        service_names::GEMINI
    }

    #[instrument(skip(self, prompt), fields(model = %self.model, prompt.len = prompt.len()))]
    async fn invoke(&self, prompt: &str) -> Result<String, TransportError> {
        debug!("Sending request to Gemini API");

        let response = self
            .client
            .post(self.build_url())
            .json(&GeminiRequest::from_prompt(prompt))
            .send()
            .await
            .map_err(|e| TransportError::Request {
                service: service_names::GEMINI,
                reason: e.without_url().to_string(),
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Request {
                service: service_names::GEMINI,
                reason: format!("Failed to read response: {}", e.without_url()),
            })?;

        if !status.is_success() {
            error!(status = %status, "Gemini API error");
            return Err(TransportError::Status {
                service: service_names::GEMINI,
                status: status.as_u16(),
                body: Self::truncate_body(&body),
            });
        }

        debug!(response.len = body.len(), "Received Gemini response");
        Ok(body)
    }
}

impl Debug for GeminiGateway {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("GeminiGateway")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            // Omit `client` field as HTTP clients are not useful to debug
            .finish_non_exhaustive()
    }
}
