// ABOUTME: Constants for the recommendation pipeline: fallback advice, sentinels, and defaults
// ABOUTME: Values here are part of the stored-record contract and must stay stable
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Constants Module
//!
//! Fixed strings that end up in stored recommendations, plus the defaults used
//! by environment configuration.

/// Version of the JSON answer schema shared by the prompt template and the parser.
/// Bump both together.
pub const RECOMMENDATION_SCHEMA_VERSION: u32 = 1;

/// Service identity used in structured logs
pub mod service_names {
    /// Name of the recommendation worker service
    pub const RECOMMENDATION_WORKER: &str = "fitness-recommendation-worker";
    /// Name reported for the Gemini gateway in errors and spans
    pub const GEMINI: &str = "gemini";
}

/// The canonical recommendation used when any parsing stage fails
pub mod fallback {
    /// Analysis body of the fallback recommendation
    pub const ANALYSIS: &str = "Unable to generate detailed analysis";

    /// Improvements of the fallback recommendation
    pub const IMPROVEMENTS: &[&str] = &["Continue with your current routine"];

    /// Safety guidelines of the fallback recommendation
    pub const SAFETY: &[&str] = &[
        "Always warm up before exercise",
        "Stay hydrated",
        "Listen to your body",
    ];

    /// Workout suggestions of the fallback recommendation
    pub const SUGGESTIONS: &[&str] = &["Consider consulting a fitness consultant"];
}

/// One-element placeholders substituted when a list section yields no items
pub mod sentinels {
    /// Placeholder for an empty improvements list
    pub const IMPROVEMENTS: &str = "No Specific improvements provided";
    /// Placeholder for an empty suggestions list
    pub const SUGGESTIONS: &str = "No Specific suggestions provided";
    /// Placeholder for an empty safety list
    pub const SAFETY: &str = "No Specific safety provided";
}

/// Analysis keys of the answer schema paired with their human-readable labels.
/// The order is the order sections appear in the analysis body.
pub const ANALYSIS_SECTIONS: [(&str, &str); 4] = [
    ("overall", "Overall"),
    ("pace", "Pace"),
    ("heartRate", "Heart Rate"),
    ("caloriesBurned", "Calories Burned"),
];

/// Configuration defaults applied when an environment variable is absent
pub mod defaults {
    /// Gemini Generative Language API base URL
    pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
    /// Gemini model used for activity analysis
    pub const GEMINI_MODEL: &str = "gemini-2.5-flash";
    /// Upper bound on a single AI call
    pub const AI_REQUEST_TIMEOUT_SECS: u64 = 30;
    /// Retries after the first failed AI call (0 = fall back immediately)
    pub const AI_MAX_RETRIES: u32 = 0;
    /// Backoff before the first retry, doubled per attempt
    pub const AI_RETRY_BACKOFF_MS: u64 = 500;
    /// Recommendation store location
    pub const DATABASE_URL: &str = "sqlite:./data/recommendations.db";
    /// Concurrent dispatches per consumer
    pub const WORKER_CONCURRENCY: usize = 4;
    /// Buffered inbound messages between the reader and the consumer
    pub const CONSUMER_CHANNEL_CAPACITY: usize = 64;
}

/// Environment variable names read by the service configuration
pub mod env_keys {
    /// Gemini API key
    pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";
    /// Gemini API base URL override
    pub const GEMINI_API_URL: &str = "GEMINI_API_URL";
    /// Gemini model override
    pub const GEMINI_MODEL: &str = "GEMINI_MODEL";
    /// AI call timeout in seconds
    pub const AI_REQUEST_TIMEOUT_SECS: &str = "AI_REQUEST_TIMEOUT_SECS";
    /// AI call retry count
    pub const AI_MAX_RETRIES: &str = "AI_MAX_RETRIES";
    /// AI call initial backoff in milliseconds
    pub const AI_RETRY_BACKOFF_MS: &str = "AI_RETRY_BACKOFF_MS";
    /// Recommendation store URL
    pub const DATABASE_URL: &str = "DATABASE_URL";
    /// Consumer worker concurrency
    pub const WORKER_CONCURRENCY: &str = "WORKER_CONCURRENCY";
    /// Consumer channel capacity
    pub const CONSUMER_CHANNEL_CAPACITY: &str = "CONSUMER_CHANNEL_CAPACITY";
    /// Deployment environment name
    pub const ENVIRONMENT: &str = "ENVIRONMENT";
}
