// ABOUTME: Defensive multi-stage parser turning a raw Gemini envelope into recommendation sections
// ABOUTME: Envelope unwrap, fence strip, and inner decode each fail independently into the fallback
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Response Parser
//!
//! The model answer arrives wrapped twice: a provider envelope (JSON) whose
//! `candidates[0].content.parts[0].text` holds a markdown-fenced JSON blob.
//! Parsing runs as a chain of stages returning `Result<_, ParseFailure>`:
//!
//! 1. **Envelope unwrap**: decode the envelope and pull out the model text
//! 2. **Fence strip**: drop the ```` ```json ```` marker, newlines and the closing fence
//! 3. **Inner decode**: read the first JSON value, require an object, and
//!    extract the four sections with lenient field decoding
//!
//! [`ResponseParser::parse`] collapses any failure into the canonical fallback,
//! so it is total. [`ResponseParser::try_parse`] keeps the failure visible.

use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::recommendation_assembler::RecommendationAssembler;
use crate::constants::ANALYSIS_SECTIONS;
use crate::errors::ParseFailure;
use crate::models::{Activity, Recommendation, RecommendationSections};

const JSON_FENCE_OPEN: &str = "```json";
const FENCE_CLOSE: &str = "```";

// ============================================================================
// Provider Envelope
// ============================================================================

/// `{ "candidates": [ { "content": { "parts": [ { "text": ... } ] } } ] }`
#[derive(Debug, Deserialize)]
struct GeminiEnvelope {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    text: Option<String>,
}

// ============================================================================
// Model Answer Schema
// ============================================================================

/// The answer schema requested by the prompt, decoded leniently
///
/// Wrong-typed sections never fail the decode: a non-object analysis has no
/// keys, a non-array list has no items.
#[derive(Debug, Default, Deserialize)]
struct RawAiAnswer {
    #[serde(default, deserialize_with = "object_or_empty")]
    analysis: Map<String, Value>,
    #[serde(default, deserialize_with = "items_or_empty")]
    improvements: Vec<RawImprovement>,
    #[serde(default, deserialize_with = "items_or_empty")]
    suggestions: Vec<RawSuggestion>,
    #[serde(default, deserialize_with = "items_or_empty")]
    safety: Vec<TextValue>,
}

#[derive(Debug, Default, Deserialize)]
struct RawImprovement {
    #[serde(default)]
    area: TextValue,
    #[serde(default)]
    recommendation: TextValue,
}

#[derive(Debug, Default, Deserialize)]
struct RawSuggestion {
    #[serde(default)]
    workout: TextValue,
    #[serde(default)]
    description: TextValue,
}

/// Any JSON value read as display text
///
/// Strings are taken as-is, other scalars use their JSON text (`null` becomes
/// `"null"`), arrays and objects become the empty string.
#[derive(Debug, Default)]
struct TextValue(String);

impl<'de> Deserialize<'de> for TextValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(|value| Self(value_as_text(&value)))
    }
}

fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "null".to_owned(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::Array(_) | Value::Object(_) => String::new(),
    }
}

fn object_or_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Object(map) => map,
        _ => Map::new(),
    })
}

fn items_or_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(match Value::deserialize(deserializer)? {
        // Elements of the wrong shape contribute an item with empty fields
        Value::Array(elements) => elements
            .into_iter()
            .map(|element| serde_json::from_value(element).unwrap_or_default())
            .collect(),
        _ => Vec::new(),
    })
}

impl RawAiAnswer {
    fn into_sections(self) -> RecommendationSections {
        let analysis = ANALYSIS_SECTIONS
            .iter()
            .filter_map(|(key, label)| {
                self.analysis
                    .get(*key)
                    .map(|value| format!("{label}{}\n\n", value_as_text(value)))
            })
            .collect::<String>();

        let improvements = self
            .improvements
            .into_iter()
            .map(|item| format!("{}: {}", item.area.0, item.recommendation.0))
            .collect();
        let suggestions = self
            .suggestions
            .into_iter()
            .map(|item| format!("{}: {}", item.workout.0, item.description.0))
            .collect();
        let safety = self.safety.into_iter().map(|item| item.0).collect();

        RecommendationSections::new(analysis, improvements, suggestions, safety)
    }
}

// ============================================================================
// Parser
// ============================================================================

/// Extracts recommendation sections from raw Gemini responses
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseParser;

impl ResponseParser {
    /// Create a parser
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Parse a raw envelope into a recommendation for `activity`
    ///
    /// Never fails: any stage failure yields the fallback sections.
    #[must_use]
    pub fn parse(&self, activity: &Activity, raw_envelope: &str) -> Recommendation {
        let sections = self.try_parse(raw_envelope).unwrap_or_fallback();
        RecommendationAssembler::assemble(activity, sections)
    }

    /// Run every stage and report the first one that failed
    ///
    /// # Errors
    ///
    /// Returns `ParseFailure::Envelope` if the envelope is not valid JSON or has
    /// no model text, and `ParseFailure::InnerSchema` if the model text is not a
    /// JSON object.
    pub fn try_parse(&self, raw_envelope: &str) -> Result<RecommendationSections, ParseFailure> {
        let text = Self::unwrap_envelope(raw_envelope)?;
        let cleaned = Self::strip_fences(&text);
        Self::extract_sections(&cleaned)
    }

    /// Stage 1: return `candidates[0].content.parts[0].text`
    ///
    /// # Errors
    ///
    /// Returns `ParseFailure::Envelope` when the JSON is invalid or the path is missing.
    pub fn unwrap_envelope(raw_envelope: &str) -> Result<String, ParseFailure> {
        let envelope: GeminiEnvelope = serde_json::from_str(raw_envelope)
            .map_err(|e| ParseFailure::envelope(format!("invalid envelope JSON: {e}")))?;

        envelope
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ParseFailure::envelope("no candidates"))?
            .content
            .ok_or_else(|| ParseFailure::envelope("candidate has no content"))?
            .parts
            .into_iter()
            .next()
            .ok_or_else(|| ParseFailure::envelope("content has no parts"))?
            .text
            .ok_or_else(|| ParseFailure::envelope("first part has no text"))
    }

    /// Stage 2: remove the markdown fence around the model's JSON
    #[must_use]
    pub fn strip_fences(text: &str) -> String {
        let without_newlines: String = text
            .replace(JSON_FENCE_OPEN, "")
            .chars()
            .filter(|c| *c != '\n' && *c != '\r')
            .collect();
        let trimmed = without_newlines.trim();
        trimmed
            .strip_suffix(FENCE_CLOSE)
            .unwrap_or(trimmed)
            .trim()
            .to_owned()
    }

    /// Stage 3: decode the cleaned model text into sections
    ///
    /// Only the first JSON value is read; anything after it is ignored.
    ///
    /// # Errors
    ///
    /// Returns `ParseFailure::InnerSchema` if the text does not start with a JSON object.
    pub fn extract_sections(cleaned: &str) -> Result<RecommendationSections, ParseFailure> {
        let root = serde_json::Deserializer::from_str(cleaned)
            .into_iter::<Value>()
            .next()
            .ok_or_else(|| ParseFailure::inner_schema("empty answer"))?
            .map_err(|e| ParseFailure::inner_schema(format!("invalid answer JSON: {e}")))?;

        if !root.is_object() {
            return Err(ParseFailure::inner_schema(format!(
                "answer must be a JSON object, found {}",
                json_kind(&root)
            )));
        }

        let answer: RawAiAnswer = serde_json::from_value(root)
            .map_err(|e| ParseFailure::inner_schema(e.to_string()))?;
        debug!(
            improvements = answer.improvements.len(),
            suggestions = answer.suggestions.len(),
            safety = answer.safety.len(),
            "Decoded model answer"
        );
        Ok(answer.into_sections())
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// Fallback Combinator
// ============================================================================

/// Collapses a parse result into sections, substituting the fallback on failure
pub trait SectionsOrFallback {
    /// Parsed sections, or the fallback when parsing failed
    fn unwrap_or_fallback(self) -> RecommendationSections;
}

impl SectionsOrFallback for Result<RecommendationSections, ParseFailure> {
    fn unwrap_or_fallback(self) -> RecommendationSections {
        self.unwrap_or_else(|failure| {
            warn!(error = %failure, "Model answer unusable, using fallback recommendation");
            RecommendationSections::fallback()
        })
    }
}
