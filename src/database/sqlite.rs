// ABOUTME: SQLite recommendation store built on a sqlx connection pool
// ABOUTME: List sections are stored as JSON text, timestamps as RFC 3339 strings
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::RecommendationStore;
use crate::errors::StoreError;
use crate::models::{Recommendation, RecommendationSections, StoredRecommendation};

const SELECT_COLUMNS: &str = "SELECT id, user_id, activity_id, activity_type, recommendation, \
     improvements, suggestions, safety, created_at FROM recommendations";

/// Recommendation store backed by SQLite
#[derive(Debug, Clone)]
pub struct SqliteRecommendationStore {
    pool: Pool<Sqlite>,
}

impl SqliteRecommendationStore {
    /// Open (creating if needed) the database at `database_url` and run migrations
    ///
    /// Accepts `sqlite:<path>` and `sqlite::memory:`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Connection` if the database cannot be opened or migrated.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let in_memory = database_url.contains(":memory:");

        let connection_options = if in_memory || database_url.contains('?') {
            database_url.to_owned()
        } else {
            ensure_parent_dir(database_url).await?;
            // Ensure SQLite creates the database file if it doesn't exist
            format!("{database_url}?mode=rwc")
        };

        // Every connection to `:memory:` is its own database, so keep exactly one alive
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new()
        };

        let pool = pool_options
            .connect(&connection_options)
            .await
            .map_err(|e| StoreError::Connection {
                context: format!("Failed to open {database_url}: {e}"),
            })?;

        let store = Self { pool };
        store.migrate().await?;
        info!(database = %database_url, "Recommendation store ready");
        Ok(store)
    }

    /// Create the recommendations table
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Connection` if a DDL statement fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS recommendations (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                activity_id TEXT NOT NULL,
                activity_type TEXT NOT NULL,
                recommendation TEXT NOT NULL,
                improvements TEXT NOT NULL,
                suggestions TEXT NOT NULL,
                safety TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Connection {
            context: format!("Failed to create recommendations table: {e}"),
        })?;

        for (index, column) in [
            ("idx_recommendations_user_id", "user_id"),
            ("idx_recommendations_activity_id", "activity_id"),
        ] {
            sqlx::query(&format!(
                "CREATE INDEX IF NOT EXISTS {index} ON recommendations({column})"
            ))
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Connection {
                context: format!("Failed to create index {index}: {e}"),
            })?;
        }

        Ok(())
    }

    async fn fetch_where(
        &self,
        column: &str,
        value: &str,
    ) -> Result<Vec<StoredRecommendation>, StoreError> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE {column} = $1 ORDER BY created_at ASC, rowid ASC"
        ))
        .bind(value)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Query {
            context: format!("Failed to list recommendations by {column}: {e}"),
        })?;

        rows.iter().map(row_to_stored).collect()
    }
}

#[async_trait]
impl RecommendationStore for SqliteRecommendationStore {
    #[instrument(skip(self, recommendation), fields(activity.id = %recommendation.activity_id()))]
    async fn save(&self, recommendation: Recommendation) -> Result<StoredRecommendation, StoreError> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();

        sqlx::query(
            r"
            INSERT INTO recommendations
                (id, user_id, activity_id, activity_type, recommendation,
                 improvements, suggestions, safety, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(id.to_string())
        .bind(recommendation.user_id())
        .bind(recommendation.activity_id())
        .bind(recommendation.activity_type())
        .bind(recommendation.analysis())
        .bind(encode_list(recommendation.improvements())?)
        .bind(encode_list(recommendation.suggestions())?)
        .bind(encode_list(recommendation.safety())?)
        .bind(created_at.to_rfc3339_opts(SecondsFormat::Micros, true))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Query {
            context: format!("Failed to insert recommendation: {e}"),
        })?;

        debug!(record.id = %id, "Recommendation saved");
        Ok(StoredRecommendation {
            id,
            created_at,
            recommendation,
        })
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<StoredRecommendation>, StoreError> {
        self.fetch_where("user_id", user_id).await
    }

    async fn find_by_activity(
        &self,
        activity_id: &str,
    ) -> Result<Vec<StoredRecommendation>, StoreError> {
        self.fetch_where("activity_id", activity_id).await
    }
}

async fn ensure_parent_dir(database_url: &str) -> Result<(), StoreError> {
    let path = database_url
        .trim_start_matches("sqlite:")
        .trim_start_matches("//");
    match Path::new(path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StoreError::Connection {
                context: format!("Failed to create {}: {e}", parent.display()),
            }),
        _ => Ok(()),
    }
}

fn encode_list(items: &[String]) -> Result<String, StoreError> {
    serde_json::to_string(items).map_err(|e| StoreError::Query {
        context: format!("Failed to encode list: {e}"),
    })
}

fn column<T>(row: &SqliteRow, name: &str) -> Result<T, StoreError>
where
    T: for<'r> sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(name).map_err(|e| StoreError::Corrupt {
        context: format!("column {name}: {e}"),
    })
}

fn list_column(row: &SqliteRow, name: &str) -> Result<Vec<String>, StoreError> {
    let raw: String = column(row, name)?;
    serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt {
        context: format!("column {name} is not a JSON string list: {e}"),
    })
}

fn row_to_stored(row: &SqliteRow) -> Result<StoredRecommendation, StoreError> {
    let raw_id: String = column(row, "id")?;
    let id = Uuid::parse_str(&raw_id).map_err(|e| StoreError::Corrupt {
        context: format!("record id {raw_id}: {e}"),
    })?;
    let raw_created: String = column(row, "created_at")?;
    let created_at = DateTime::parse_from_rfc3339(&raw_created)
        .map_err(|e| StoreError::Corrupt {
            context: format!("created_at {raw_created}: {e}"),
        })?
        .with_timezone(&Utc);

    let sections = RecommendationSections::new(
        column(row, "recommendation")?,
        list_column(row, "improvements")?,
        list_column(row, "suggestions")?,
        list_column(row, "safety")?,
    );
    let user_id: String = column(row, "user_id")?;
    let activity_id: String = column(row, "activity_id")?;
    let activity_type: String = column(row, "activity_type")?;

    Ok(StoredRecommendation {
        id,
        created_at,
        recommendation: Recommendation::new(user_id, activity_id, activity_type, sections),
    })
}
