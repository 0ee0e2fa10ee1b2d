// ABOUTME: Turns raw model output into recommendation records
// ABOUTME: Response parsing with fallback plus assembly with activity identity
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Recommendation Intelligence
//!
//! - [`ResponseParser`]: staged, total parsing of the Gemini envelope
//! - [`RecommendationAssembler`]: attaches activity identity to the sections

/// Activity identity attachment
pub mod recommendation_assembler;

/// Staged envelope and answer parsing
pub mod response_parser;

pub use recommendation_assembler::RecommendationAssembler;
pub use response_parser::{ResponseParser, SectionsOrFallback};
