// ABOUTME: Core data models for the recommendation pipeline
// ABOUTME: Activity is the inbound event, Recommendation is the record handed to the store
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

mod activity;
mod recommendation;

pub use activity::{Activity, ActivityBuilder};
pub use recommendation::{
    Recommendation, RecommendationSections, RecommendationSource, StoredRecommendation,
};
