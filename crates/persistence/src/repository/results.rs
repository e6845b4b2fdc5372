//! Result log repository — append-only log of computed market-status payloads
//!
//! The "current" result is always the maximum-id row. Rows are never updated
//! or deleted.

use crate::schema::RESULT_LOG_TABLE;
use crate::DbResult;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// Timestamp format used for `created_at`
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One appended market-status result
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CachedResult {
    pub id: i64,
    pub created_at: String,
    pub payload: String,
}

/// Repository for the append-only result log
pub struct ResultLogRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ResultLogRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a new result, returning its insertion id
    pub async fn append(&self, created_at: &str, payload: &str) -> DbResult<i64> {
        let sql = format!("INSERT INTO {RESULT_LOG_TABLE} (created_at, payload) VALUES (?, ?)");
        let result = sqlx::query(&sql)
            .bind(created_at)
            .bind(payload)
            .execute(self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    /// The current result: the maximum-id row, if any
    pub async fn latest(&self) -> DbResult<Option<CachedResult>> {
        let sql = format!(
            "SELECT id, created_at, payload FROM {RESULT_LOG_TABLE} ORDER BY id DESC LIMIT 1"
        );
        let row = sqlx::query_as::<_, CachedResult>(&sql)
            .fetch_optional(self.pool)
            .await?;
        Ok(row)
    }

    /// Total number of appended results
    pub async fn count(&self) -> DbResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {RESULT_LOG_TABLE}");
        let row: (i64,) = sqlx::query_as(&sql).fetch_one(self.pool).await?;
        Ok(row.0)
    }
}
