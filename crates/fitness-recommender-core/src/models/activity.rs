// ABOUTME: Recorded fitness activity as delivered by the activity intake service
// ABOUTME: Immutable inside the pipeline; decoded leniently from camelCase JSON events
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A single recorded fitness activity
///
/// Produced by the external intake service and read-only here. Fields are
/// private so the pipeline cannot mutate an event it is processing; use the
/// accessors to read and `ActivityBuilder` to construct instances in code.
///
/// # Examples
///
/// ```rust
/// use fitness_recommender_core::models::ActivityBuilder;
/// use serde_json::json;
///
/// let activity = ActivityBuilder::new("act-1", "user-7", "RUNNING")
///     .duration_minutes(45)
///     .calories_burned(420)
///     .metric("averageHeartRate", json!(148))
///     .build();
///
/// assert_eq!(activity.id(), "act-1");
/// assert_eq!(activity.additional_metrics().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Activity identifier assigned by the intake service
    id: String,
    /// Owning user identifier
    user_id: String,
    /// Free-text category (RUNNING, CYCLING, ...)
    #[serde(alias = "type")]
    activity_type: String,
    /// Duration in minutes
    #[serde(default, deserialize_with = "null_as_default")]
    duration: u32,
    /// Calories burned
    #[serde(default, deserialize_with = "null_as_default")]
    calories_burned: u32,
    /// Open-schema metric name to value mapping, kept sorted for stable prompts
    #[serde(default, deserialize_with = "null_as_default")]
    additional_metrics: BTreeMap<String, Value>,
    /// When the activity started
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    start_time: Option<DateTime<Utc>>,
}

impl Activity {
    /// Activity identifier
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Owning user identifier
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Activity category
    #[must_use]
    pub fn activity_type(&self) -> &str {
        &self.activity_type
    }

    /// Duration in minutes
    #[must_use]
    pub const fn duration_minutes(&self) -> u32 {
        self.duration
    }

    /// Calories burned
    #[must_use]
    pub const fn calories_burned(&self) -> u32 {
        self.calories_burned
    }

    /// Additional metrics keyed by name
    #[must_use]
    pub const fn additional_metrics(&self) -> &BTreeMap<String, Value> {
        &self.additional_metrics
    }

    /// Start time, when the intake service supplied one
    #[must_use]
    pub const fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }
}

/// Builder for `Activity`
#[derive(Debug, Clone)]
pub struct ActivityBuilder {
    activity: Activity,
}

impl ActivityBuilder {
    /// Creates a builder with the identity fields
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        activity_type: impl Into<String>,
    ) -> Self {
        Self {
            activity: Activity {
                id: id.into(),
                user_id: user_id.into(),
                activity_type: activity_type.into(),
                duration: 0,
                calories_burned: 0,
                additional_metrics: BTreeMap::new(),
                start_time: None,
            },
        }
    }

    /// Sets the duration in minutes
    #[must_use]
    pub const fn duration_minutes(mut self, minutes: u32) -> Self {
        self.activity.duration = minutes;
        self
    }

    /// Sets the calories burned
    #[must_use]
    pub const fn calories_burned(mut self, calories: u32) -> Self {
        self.activity.calories_burned = calories;
        self
    }

    /// Adds one additional metric
    #[must_use]
    pub fn metric(mut self, name: impl Into<String>, value: Value) -> Self {
        self.activity.additional_metrics.insert(name.into(), value);
        self
    }

    /// Sets the start time
    #[must_use]
    pub const fn start_time(mut self, start_time: DateTime<Utc>) -> Self {
        self.activity.start_time = Some(start_time);
        self
    }

    /// Builds the activity
    #[must_use]
    pub fn build(self) -> Activity {
        self.activity
    }
}

/// Explicit `null` decodes the same as an absent field; the intake service
/// publishes unset request fields as `null`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Accepts RFC 3339 timestamps and zone-less local timestamps (read as UTC),
/// since the intake service emits the latter.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|value| parse_timestamp(&value).map_err(serde::de::Error::custom))
        .transpose()
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").map(|naive| naive.and_utc())
        })
}
