//! Historical bar + indicator repository — the per-(ticker, date) time series
//!
//! Rows are written once, after the full indicator set is defined, and never
//! mutated. UNIQUE(ticker, date) plus INSERT OR IGNORE makes repeated
//! ingestion of the same bar idempotent (first write wins).

use crate::schema::HISTORICAL_TABLE;
use crate::DbResult;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// One persisted row: raw OHLCV plus every derived indicator field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct HistoricalRow {
    pub ticker: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: i64,
    pub ma20: f64,
    pub ma50: f64,
    pub ma100: f64,
    pub rsi: f64,
    pub macd_histogram: f64,
    pub bb_lower: f64,
    pub bb_middle: f64,
    pub bb_upper: f64,
    pub stoch_k: f64,
    pub stoch_d: f64,
    pub volume_change: f64,
    pub change: f64,
    pub tenkan_sen: f64,
    pub kijun_sen: f64,
    pub senkou_span_a: f64,
    pub senkou_span_b: f64,
}

const ROW_COLUMNS: &str = "ticker, date, open, high, low, close, adj_close, volume, \
     ma20, ma50, ma100, rsi, macd_histogram, bb_lower, bb_middle, bb_upper, \
     stoch_k, stoch_d, volume_change, change, \
     tenkan_sen, kijun_sen, senkou_span_a, senkou_span_b";

/// Repository for the historical time series
pub struct HistoryRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> HistoryRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert rows (INSERT OR IGNORE — duplicates of an existing
    /// (ticker, date) pair are skipped). Returns the number actually
    /// inserted.
    pub async fn insert_rows(&self, rows: &[HistoricalRow]) -> DbResult<u64> {
        let sql = format!(
            "INSERT OR IGNORE INTO {HISTORICAL_TABLE} ({ROW_COLUMNS}) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        );

        let mut inserted = 0;
        for row in rows {
            let result = sqlx::query(&sql)
                .bind(&row.ticker)
                .bind(row.date)
                .bind(row.open)
                .bind(row.high)
                .bind(row.low)
                .bind(row.close)
                .bind(row.adj_close)
                .bind(row.volume)
                .bind(row.ma20)
                .bind(row.ma50)
                .bind(row.ma100)
                .bind(row.rsi)
                .bind(row.macd_histogram)
                .bind(row.bb_lower)
                .bind(row.bb_middle)
                .bind(row.bb_upper)
                .bind(row.stoch_k)
                .bind(row.stoch_d)
                .bind(row.volume_change)
                .bind(row.change)
                .bind(row.tenkan_sen)
                .bind(row.kijun_sen)
                .bind(row.senkou_span_a)
                .bind(row.senkou_span_b)
                .execute(self.pool)
                .await?;
            inserted += result.rows_affected();
        }
        Ok(inserted)
    }

    /// All rows for one ticker, ascending by date
    pub async fn rows_for_ticker(&self, ticker: &str) -> DbResult<Vec<HistoricalRow>> {
        let sql = format!(
            "SELECT {ROW_COLUMNS} FROM {HISTORICAL_TABLE} WHERE ticker = ? ORDER BY date ASC"
        );
        let rows = sqlx::query_as::<_, HistoricalRow>(&sql)
            .bind(ticker)
            .fetch_all(self.pool)
            .await?;
        Ok(rows)
    }

    /// The cross-section for one date. A ticker with no row on that date is
    /// simply absent — not an error.
    pub async fn rows_for_date(&self, date: NaiveDate) -> DbResult<Vec<HistoricalRow>> {
        let sql = format!(
            "SELECT {ROW_COLUMNS} FROM {HISTORICAL_TABLE} WHERE date = ? ORDER BY ticker ASC"
        );
        let rows = sqlx::query_as::<_, HistoricalRow>(&sql)
            .bind(date)
            .fetch_all(self.pool)
            .await?;
        Ok(rows)
    }

    /// Distinct stored trading dates, ascending
    pub async fn distinct_dates(&self) -> DbResult<Vec<NaiveDate>> {
        let sql = format!("SELECT DISTINCT date FROM {HISTORICAL_TABLE} ORDER BY date ASC");
        let dates: Vec<(NaiveDate,)> = sqlx::query_as(&sql).fetch_all(self.pool).await?;
        Ok(dates.into_iter().map(|(d,)| d).collect())
    }

    /// Cross-section size per stored trading date, ascending
    pub async fn date_counts(&self) -> DbResult<Vec<(NaiveDate, i64)>> {
        let sql = format!(
            "SELECT date, COUNT(*) FROM {HISTORICAL_TABLE} GROUP BY date ORDER BY date ASC"
        );
        let counts: Vec<(NaiveDate, i64)> = sqlx::query_as(&sql).fetch_all(self.pool).await?;
        Ok(counts)
    }

    /// Most recent stored trading date
    pub async fn latest_date(&self) -> DbResult<Option<NaiveDate>> {
        let sql = format!("SELECT DISTINCT date FROM {HISTORICAL_TABLE} ORDER BY date DESC LIMIT 1");
        let date: Option<(NaiveDate,)> = sqlx::query_as(&sql).fetch_optional(self.pool).await?;
        Ok(date.map(|(d,)| d))
    }

    /// Second-most-recent stored trading date
    pub async fn previous_date(&self) -> DbResult<Option<NaiveDate>> {
        let sql = format!("SELECT DISTINCT date FROM {HISTORICAL_TABLE} ORDER BY date DESC LIMIT 2");
        let dates: Vec<(NaiveDate,)> = sqlx::query_as(&sql).fetch_all(self.pool).await?;
        if dates.len() < 2 {
            return Ok(None);
        }
        Ok(dates.last().map(|(d,)| *d))
    }

    /// Delete every row. Only used by the full-rebuild bootstrap.
    pub async fn clear(&self) -> DbResult<()> {
        let sql = format!("DELETE FROM {HISTORICAL_TABLE}");
        sqlx::query(&sql).execute(self.pool).await?;
        Ok(())
    }
}
