// ABOUTME: In-memory recommendation store for tests and local runs
// ABOUTME: Sharded DashMap keyed by insertion sequence so reads come back oldest first
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use super::RecommendationStore;
use crate::errors::StoreError;
use crate::models::{Recommendation, StoredRecommendation};

/// Recommendation store that keeps every record in process memory
#[derive(Debug, Default)]
pub struct InMemoryRecommendationStore {
    records: DashMap<u64, StoredRecommendation>,
    next_sequence: AtomicU64,
}

impl InMemoryRecommendationStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has been stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every stored record, oldest first
    #[must_use]
    pub fn all(&self) -> Vec<StoredRecommendation> {
        self.matching(|_| true)
    }

    fn matching<F>(&self, predicate: F) -> Vec<StoredRecommendation>
    where
        F: Fn(&Recommendation) -> bool,
    {
        let mut found: Vec<(u64, StoredRecommendation)> = self
            .records
            .iter()
            .filter(|entry| predicate(&entry.value().recommendation))
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        found.sort_by_key(|(sequence, _)| *sequence);
        found.into_iter().map(|(_, record)| record).collect()
    }
}

#[async_trait]
impl RecommendationStore for InMemoryRecommendationStore {
    async fn save(&self, recommendation: Recommendation) -> Result<StoredRecommendation, StoreError> {
        let stored = StoredRecommendation {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            recommendation,
        };
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        self.records.insert(sequence, stored.clone());
        Ok(stored)
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<StoredRecommendation>, StoreError> {
        Ok(self.matching(|record| record.user_id() == user_id))
    }

    async fn find_by_activity(
        &self,
        activity_id: &str,
    ) -> Result<Vec<StoredRecommendation>, StoreError> {
        Ok(self.matching(|record| record.activity_id() == activity_id))
    }
}
