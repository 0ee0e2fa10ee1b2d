// ABOUTME: Recommendation record produced once per dispatched activity
// ABOUTME: Sections enforce the non-empty list invariant with fixed sentinel strings
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{fallback, sentinels};

/// Content of a recommendation, independent of which activity it belongs to
///
/// Every list is guaranteed non-empty: `new` substitutes the one-element
/// sentinel list for any section that came back empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationSections {
    analysis: String,
    improvements: Vec<String>,
    suggestions: Vec<String>,
    safety: Vec<String>,
}

impl RecommendationSections {
    /// Builds sections, replacing empty lists with their sentinel
    #[must_use]
    pub fn new(
        analysis: String,
        improvements: Vec<String>,
        suggestions: Vec<String>,
        safety: Vec<String>,
    ) -> Self {
        Self {
            analysis,
            improvements: or_sentinel(improvements, sentinels::IMPROVEMENTS),
            suggestions: or_sentinel(suggestions, sentinels::SUGGESTIONS),
            safety: or_sentinel(safety, sentinels::SAFETY),
        }
    }

    /// The fixed, input-independent fallback content
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            analysis: fallback::ANALYSIS.to_owned(),
            improvements: to_owned_list(fallback::IMPROVEMENTS),
            suggestions: to_owned_list(fallback::SUGGESTIONS),
            safety: to_owned_list(fallback::SAFETY),
        }
    }

    /// Whether these sections equal the fallback content
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        *self == Self::fallback()
    }

    /// Free-text analysis body
    #[must_use]
    pub fn analysis(&self) -> &str {
        &self.analysis
    }

    /// Improvement items, never empty
    #[must_use]
    pub fn improvements(&self) -> &[String] {
        &self.improvements
    }

    /// Workout suggestions, never empty
    #[must_use]
    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    /// Safety guidelines, never empty
    #[must_use]
    pub fn safety(&self) -> &[String] {
        &self.safety
    }
}

fn or_sentinel(items: Vec<String>, sentinel: &str) -> Vec<String> {
    if items.is_empty() {
        vec![sentinel.to_owned()]
    } else {
        items
    }
}

fn to_owned_list(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_owned()).collect()
}

/// Whether a recommendation came from the model or from the fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationSource {
    /// Parsed from the model's answer
    Generated,
    /// Fixed default content after an AI-side failure
    Fallback,
}

impl RecommendationSource {
    /// Stable name for logs
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Generated => "generated",
            Self::Fallback => "fallback",
        }
    }
}

/// Recommendation for one activity
///
/// Created fresh per pipeline invocation and never mutated afterwards. The
/// analysis body is serialized as `recommendation`, the field name consumers of
/// stored records already read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    user_id: String,
    activity_id: String,
    activity_type: String,
    #[serde(rename = "recommendation")]
    analysis: String,
    improvements: Vec<String>,
    suggestions: Vec<String>,
    safety: Vec<String>,
}

impl Recommendation {
    /// Attaches activity identity to recommendation content
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        activity_id: impl Into<String>,
        activity_type: impl Into<String>,
        sections: RecommendationSections,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            activity_id: activity_id.into(),
            activity_type: activity_type.into(),
            analysis: sections.analysis,
            improvements: sections.improvements,
            suggestions: sections.suggestions,
            safety: sections.safety,
        }
    }

    /// Owning user identifier
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Source activity identifier
    #[must_use]
    pub fn activity_id(&self) -> &str {
        &self.activity_id
    }

    /// Source activity category
    #[must_use]
    pub fn activity_type(&self) -> &str {
        &self.activity_type
    }

    /// Free-text analysis body
    #[must_use]
    pub fn analysis(&self) -> &str {
        &self.analysis
    }

    /// Improvement items
    #[must_use]
    pub fn improvements(&self) -> &[String] {
        &self.improvements
    }

    /// Workout suggestions
    #[must_use]
    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    /// Safety guidelines
    #[must_use]
    pub fn safety(&self) -> &[String] {
        &self.safety
    }

    /// Content without the activity identity
    #[must_use]
    pub fn sections(&self) -> RecommendationSections {
        RecommendationSections::new(
            self.analysis.clone(),
            self.improvements.clone(),
            self.suggestions.clone(),
            self.safety.clone(),
        )
    }
}

/// A recommendation after the store accepted it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecommendation {
    /// Record identifier generated by the store
    pub id: Uuid,
    /// When the store accepted the record
    pub created_at: DateTime<Utc>,
    /// The persisted recommendation
    #[serde(flatten)]
    pub recommendation: Recommendation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_lists_become_sentinels() {
        let sections = RecommendationSections::new(String::new(), vec![], vec![], vec![]);
        assert_eq!(sections.improvements(), ["No Specific improvements provided"]);
        assert_eq!(sections.suggestions(), ["No Specific suggestions provided"]);
        assert_eq!(sections.safety(), ["No Specific safety provided"]);
        assert!(!sections.is_fallback());
    }

    #[test]
    fn test_serialized_record_uses_recommendation_field() {
        let record = Recommendation::new("u1", "a1", "RUNNING", RecommendationSections::fallback());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["recommendation"], "Unable to generate detailed analysis");
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["safety"].as_array().map(Vec::len), Some(3));
    }
}
