// ABOUTME: Attaches activity identity to parsed or fallback recommendation sections
// ABOUTME: Pure and total; the only place a Recommendation is built from an Activity
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::models::{Activity, Recommendation, RecommendationSections};

/// Builds the final recommendation record for an activity
#[derive(Debug, Clone, Copy, Default)]
pub struct RecommendationAssembler;

impl RecommendationAssembler {
    /// Combine `sections` with the user, activity id and type of `activity`
    #[must_use]
    pub fn assemble(activity: &Activity, sections: RecommendationSections) -> Recommendation {
        Recommendation::new(
            activity.user_id(),
            activity.id(),
            activity.activity_type(),
            sections,
        )
    }
}
