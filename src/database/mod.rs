// ABOUTME: Recommendation persistence abstraction with SQLite and in-memory backends
// ABOUTME: The store assigns record ids and timestamps; the dispatcher calls save once per message
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Recommendation Store
//!
//! The dispatcher only depends on [`RecommendationStore`]. Two backends exist:
//!
//! - [`SqliteRecommendationStore`]: sqlx-backed, used by the worker binary
//! - [`InMemoryRecommendationStore`]: `DashMap`-backed, used by tests
//!
//! There is no deduplication key. Delivering the same activity twice stores
//! two records.

mod memory;
mod sqlite;

pub use memory::InMemoryRecommendationStore;
pub use sqlite::SqliteRecommendationStore;

use async_trait::async_trait;

use crate::errors::StoreError;
use crate::models::{Recommendation, StoredRecommendation};

/// Durable persistence for recommendations
#[async_trait]
pub trait RecommendationStore: Send + Sync {
    /// Persist a recommendation under a freshly generated record id
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the record could not be written.
    async fn save(&self, recommendation: Recommendation) -> Result<StoredRecommendation, StoreError>;

    /// All records for a user, oldest first
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the query fails or a row cannot be decoded.
    async fn find_by_user(&self, user_id: &str) -> Result<Vec<StoredRecommendation>, StoreError>;

    /// All records for an activity, oldest first
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the query fails or a row cannot be decoded.
    async fn find_by_activity(
        &self,
        activity_id: &str,
    ) -> Result<Vec<StoredRecommendation>, StoreError>;
}
