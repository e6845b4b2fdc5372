//! Ingestion: data-source seam and the populate pipeline
//!
//! The engine never talks to the network itself; it consumes a
//! [`DataSource`] and writes enriched rows through the history repository.
//! Fetch failures propagate to the caller — retries belong to the
//! collaborator behind the trait.

use crate::enrich::enrich_bars;
use crate::types::Bar;
use async_trait::async_trait;
use chrono::NaiveDate;
use persistence::repository::history::HistoryRepository;
use persistence::SqlitePool;
use std::collections::HashMap;
use tracing::{info, warn};

/// External price provider
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Daily bars per ticker, ascending by date, for a lookback period
    /// (e.g. "1y", "1d") and interval (e.g. "1d")
    async fn fetch_bars(
        &self,
        tickers: &[String],
        period: &str,
        interval: &str,
    ) -> anyhow::Result<HashMap<String, Vec<Bar>>>;

    /// Daily bars for the synthetic reference index over [start, end]
    async fn fetch_index_series(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<Vec<Bar>>;
}

/// How much history to (re)build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopulateMode {
    /// Clear the table and rebuild from a long lookback window
    Full,
    /// Fetch the most recent bar per ticker and append only new dates
    Update,
}

const FULL_PERIOD: &str = "1y";
const UPDATE_PERIOD: &str = "1d";
const INTERVAL: &str = "1d";

/// Populate the historical table. Returns the number of rows inserted.
pub async fn populate(
    pool: &SqlitePool,
    source: &dyn DataSource,
    tickers: &[String],
    mode: PopulateMode,
) -> anyhow::Result<u64> {
    let repo = HistoryRepository::new(pool);
    match mode {
        PopulateMode::Full => populate_full(&repo, source, tickers).await,
        PopulateMode::Update => populate_update(&repo, source, tickers).await,
    }
}

async fn populate_full(
    repo: &HistoryRepository<'_>,
    source: &dyn DataSource,
    tickers: &[String],
) -> anyhow::Result<u64> {
    let fetched = source.fetch_bars(tickers, FULL_PERIOD, INTERVAL).await?;
    repo.clear().await?;
    info!(tickers = tickers.len(), "rebuilding historical table");

    let mut inserted = 0;
    for ticker in tickers {
        let Some(bars) = fetched.get(ticker) else {
            warn!(%ticker, "no bars returned, skipping");
            continue;
        };
        let rows = enrich_bars(bars);
        inserted += repo.insert_rows(&rows).await?;
    }
    info!(inserted, "historical rebuild complete");
    Ok(inserted)
}

/// Incremental update: splice the fetched latest bars onto the stored raw
/// history, re-derive indicators over the combined series, and keep only
/// rows newer than what is already stored.
async fn populate_update(
    repo: &HistoryRepository<'_>,
    source: &dyn DataSource,
    tickers: &[String],
) -> anyhow::Result<u64> {
    let fetched = source.fetch_bars(tickers, UPDATE_PERIOD, INTERVAL).await?;

    let mut inserted = 0;
    for ticker in tickers {
        let Some(new_bars) = fetched.get(ticker) else {
            continue;
        };
        if new_bars.is_empty() {
            continue;
        }

        let stored = repo.rows_for_ticker(ticker).await?;
        let last_stored = stored.last().map(|r| r.date);

        let mut bars: Vec<Bar> = stored.iter().map(Bar::from).collect();
        bars.extend(
            new_bars
                .iter()
                .filter(|b| last_stored.map_or(true, |d| b.date > d))
                .cloned(),
        );

        let rows = enrich_bars(&bars);
        let fresh: Vec<_> = rows
            .into_iter()
            .filter(|r| last_stored.map_or(true, |d| r.date > d))
            .collect();
        if !fresh.is_empty() {
            inserted += repo.insert_rows(&fresh).await?;
        }
    }
    info!(inserted, "incremental update complete");
    Ok(inserted)
}
