// ABOUTME: Error taxonomy for the recommendation pipeline (transport, parse, store)
// ABOUTME: Each kind carries enough context to be logged at the dispatcher boundary
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::time::Duration;

/// Failure of a single call to the external text-generation service
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The request could not be sent or the body could not be read
    #[error("{service} request failed: {reason}")]
    Request {
        /// Gateway that failed
        service: &'static str,
        /// Underlying client error
        reason: String,
    },

    /// The service answered with a non-success HTTP status
    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        /// Gateway that failed
        service: &'static str,
        /// HTTP status code
        status: u16,
        /// Response body (possibly truncated)
        body: String,
    },

    /// The call exceeded the configured timeout
    #[error("{service} call timed out after {timeout:?}")]
    Timeout {
        /// Gateway that timed out
        service: &'static str,
        /// Timeout that expired
        timeout: Duration,
    },

    /// The call was cancelled by the enclosing consumer runtime
    #[error("{service} call cancelled")]
    Cancelled {
        /// Gateway whose call was cancelled
        service: &'static str,
    },
}

impl TransportError {
    /// Whether retrying the same call may succeed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Request { .. } | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Cancelled { .. } => false,
        }
    }
}

/// A stage of response parsing rejected its input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseFailure {
    /// The provider envelope was not valid JSON or lacked the text path
    #[error("envelope parse failed: {reason}")]
    Envelope {
        /// What was wrong with the envelope
        reason: String,
    },

    /// The model's inner answer was not a JSON object
    #[error("inner schema invalid: {reason}")]
    InnerSchema {
        /// What was wrong with the inner answer
        reason: String,
    },
}

impl ParseFailure {
    /// Envelope-level failure
    #[must_use]
    pub fn envelope(reason: impl Into<String>) -> Self {
        Self::Envelope {
            reason: reason.into(),
        }
    }

    /// Inner-schema failure
    #[must_use]
    pub fn inner_schema(reason: impl Into<String>) -> Self {
        Self::InnerSchema {
            reason: reason.into(),
        }
    }
}

/// Persistence failure reported by a recommendation store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Could not open or migrate the store
    #[error("Store connection failed: {context}")]
    Connection {
        /// Details about the failure
        context: String,
    },

    /// A query failed
    #[error("Store query failed: {context}")]
    Query {
        /// Details about the failure
        context: String,
    },

    /// A stored row could not be decoded back into a recommendation
    #[error("Stored recommendation is corrupt: {context}")]
    Corrupt {
        /// Details about the failure
        context: String,
    },
}

/// Any error the pipeline can observe while processing one message
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    /// The AI call failed
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The AI answer could not be parsed
    #[error(transparent)]
    Parse(#[from] ParseFailure),

    /// The recommendation could not be persisted
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Flat error kind used as a structured log field
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineErrorKind {
    /// `TransportError`
    Transport,
    /// `ParseFailure::Envelope`
    EnvelopeParse,
    /// `ParseFailure::InnerSchema`
    InnerSchema,
    /// `StoreError`
    Store,
}

impl PipelineErrorKind {
    /// Stable name for logs
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::EnvelopeParse => "envelope_parse",
            Self::InnerSchema => "inner_schema",
            Self::Store => "store",
        }
    }
}

impl std::fmt::Display for PipelineErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PipelineError {
    /// Kind of this error for structured logging
    #[must_use]
    pub const fn kind(&self) -> PipelineErrorKind {
        match self {
            Self::Transport(_) => PipelineErrorKind::Transport,
            Self::Parse(ParseFailure::Envelope { .. }) => PipelineErrorKind::EnvelopeParse,
            Self::Parse(ParseFailure::InnerSchema { .. }) => PipelineErrorKind::InnerSchema,
            Self::Store(_) => PipelineErrorKind::Store,
        }
    }
}
