// ABOUTME: Activity analysis prompt loaded at compile time and rendered per activity
// ABOUTME: The template fixes the JSON answer schema the response parser expects
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Prompts
//!
//! The activity analysis template lives in a markdown file next to this module
//! and is embedded at compile time. Placeholders use `{{name}}` so the JSON
//! braces of the schema need no escaping.

use crate::constants::RECOMMENDATION_SCHEMA_VERSION;
use crate::models::Activity;

use super::PromptBuilder;

/// Activity analysis template (answer schema version
/// [`RECOMMENDATION_SCHEMA_VERSION`])
pub const ACTIVITY_ANALYSIS_TEMPLATE: &str = include_str!("activity_analysis.md");

/// Builds the activity analysis prompt from the embedded template
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivityPromptBuilder;

impl ActivityPromptBuilder {
    /// Create a prompt builder
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Answer schema version the rendered prompt asks for
    #[must_use]
    pub const fn schema_version(&self) -> u32 {
        RECOMMENDATION_SCHEMA_VERSION
    }
}

impl PromptBuilder for ActivityPromptBuilder {
    fn build_prompt(&self, activity: &Activity) -> String {
        // BTreeMap keys serialize in order, so the same activity always yields the same prompt
        let metrics = serde_json::to_string(activity.additional_metrics())
            .unwrap_or_else(|_| "{}".to_owned());
        let duration = activity.duration_minutes().to_string();
        let calories = activity.calories_burned().to_string();

        render(
            ACTIVITY_ANALYSIS_TEMPLATE,
            &[
                ("activity_type", activity.activity_type()),
                ("duration", &duration),
                ("calories_burned", &calories),
                ("additional_metrics", &metrics),
            ],
        )
    }
}

/// Single-pass placeholder substitution. Substituted values are never rescanned,
/// so activity fields containing `{{...}}` cannot inject other placeholders.
fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len() + 128);
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        let resolved = tail.find("}}").and_then(|end| {
            let name = &tail[..end];
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, end))
        });

        match resolved {
            Some((value, end)) => {
                out.push_str(value);
                rest = &tail[end + 2..];
            }
            None => {
                out.push_str("{{");
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    out
}
