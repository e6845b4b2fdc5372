//! Screener orchestrator — the session-aware request cache
//!
//! Each read request drives at most one recompute cycle:
//! an empty result log is populated once (explicit two-step, no recursion);
//! a closed market serves the cached payload only when it was computed on
//! the same calendar date; an open market always ingests the latest bars and
//! recomputes. Results are only ever appended, never edited.

use crate::breadth::{self, BreadthHistory};
use crate::enrich::enrich_bars;
use crate::ingest::{self, DataSource, PopulateMode};
use crate::session::MarketSession;
use crate::strategies;
use crate::types::{
    BreadthStrategies, GaugePayload, MarketBreadthPayload, PlottingPayload, StatusPayload,
};
use anyhow::Context;
use chrono::NaiveDateTime;
use persistence::repository::history::HistoryRepository;
use persistence::repository::results::{ResultLogRepository, CREATED_AT_FORMAT};
use persistence::Database;
use tracing::{info, warn};

pub struct Screener<S: DataSource> {
    db: Database,
    source: S,
    tickers: Vec<String>,
    breadth: BreadthHistory,
}

impl<S: DataSource> Screener<S> {
    pub fn new(db: Database, source: S, tickers: Vec<String>) -> Self {
        Self {
            db,
            source,
            tickers,
            breadth: BreadthHistory::new(),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Bootstrap: clear and rebuild the full historical table. The in-memory
    /// breadth series is dropped with the old rows.
    pub async fn rebuild_history(&mut self) -> anyhow::Result<u64> {
        let pool = self.db.pool_clone();
        let inserted =
            ingest::populate(&pool, &self.source, &self.tickers, PopulateMode::Full).await?;
        self.breadth = BreadthHistory::new();
        Ok(inserted)
    }

    /// Serve the market status for `now`, recomputing only when the session
    /// state machine requires it
    pub async fn market_status(&mut self, now: NaiveDateTime) -> anyhow::Result<StatusPayload> {
        let pool = self.db.pool_clone();
        let results = ResultLogRepository::new(&pool);

        let latest = match results.latest().await? {
            Some(cached) => cached,
            None => {
                // empty log: compute once, append, re-read
                let payload = self.compute_status().await?;
                append_result(&results, now, &payload).await?;
                results
                    .latest()
                    .await?
                    .context("result log empty after append")?
            }
        };

        match MarketSession::classify(now) {
            MarketSession::Closed => {
                let cached_at =
                    NaiveDateTime::parse_from_str(&latest.created_at, CREATED_AT_FORMAT)
                        .with_context(|| {
                            format!("unparseable created_at in result log: {}", latest.created_at)
                        })?;
                if cached_at.date() == now.date() {
                    info!(id = latest.id, "market closed, serving cached result");
                    return serde_json::from_str(&latest.payload)
                        .context("corrupt cached payload");
                }
                info!(id = latest.id, "market closed, cached result is stale");
                self.compute_and_append(now).await
            }
            MarketSession::Open => {
                // never serve from cache while the market is open
                ingest::populate(&pool, &self.source, &self.tickers, PopulateMode::Update)
                    .await?;
                self.compute_and_append(now).await
            }
        }
    }

    async fn compute_and_append(&mut self, now: NaiveDateTime) -> anyhow::Result<StatusPayload> {
        let pool = self.db.pool_clone();
        let results = ResultLogRepository::new(&pool);
        let payload = self.compute_status().await?;
        append_result(&results, now, &payload).await?;
        Ok(payload)
    }

    /// Recompute breadth, entries and plotting over the stored history
    async fn compute_status(&mut self) -> anyhow::Result<StatusPayload> {
        let pool = self.db.pool_clone();
        let history = HistoryRepository::new(&pool);

        self.breadth.extend(&history).await?;
        let (latest_date, _) = self
            .breadth
            .latest()
            .context("no historical data to screen")?;
        let dates = history.distinct_dates().await?;
        let first_date = *dates.first().context("no historical data to screen")?;

        let index_bars = self
            .source
            .fetch_index_series(first_date, latest_date)
            .await?;
        let index_rows = enrich_bars(&index_bars);
        // the index feed can lag the basket (holiday, feed skew); fall back
        // to its latest row at or before the cross-section date
        let index_row = index_rows.iter().rev().find(|r| r.date <= latest_date);
        if let Some(row) = index_row {
            if row.date < latest_date {
                warn!(index_date = %row.date, %latest_date, "index series lags the cross-section");
            }
        }

        let snapshot =
            breadth::snapshot(&self.breadth, index_row).context("no breadth history")?;

        let cross_section = history.rows_for_date(latest_date).await?;
        let entries = strategies::collect_entries(&cross_section);
        let plotting = breadth::plotting_breadth(&cross_section);
        info!(
            date = %latest_date,
            sefi = snapshot.sefi_value,
            adr = snapshot.adr_value,
            entries = entries.tickers().len(),
            "computed market status"
        );

        Ok(StatusPayload {
            market_breadth: MarketBreadthPayload {
                is_entry: snapshot.is_entry,
                sefi: GaugePayload {
                    value: snapshot.sefi_value,
                    short: snapshot.sefi_short,
                    long: snapshot.sefi_long,
                },
                adr: GaugePayload {
                    value: snapshot.adr_value,
                    short: snapshot.adr_short,
                    long: snapshot.adr_long,
                },
                strategies: BreadthStrategies {
                    good_sefi_oversold: snapshot.good_sefi_oversold,
                },
            },
            entries,
            plotting: PlottingPayload { breadth: plotting },
        })
    }
}

async fn append_result(
    results: &ResultLogRepository<'_>,
    now: NaiveDateTime,
    payload: &StatusPayload,
) -> anyhow::Result<i64> {
    let json = serde_json::to_string(payload)?;
    let id = results
        .append(&now.format(CREATED_AT_FORMAT).to_string(), &json)
        .await?;
    info!(id, "appended market status result");
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Bar, EntriesPayload, IndicatorRow};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    /// Inert source: no update bars, no index series. The tests seed the
    /// store directly so the cache layer is exercised in isolation.
    struct InertSource;

    #[async_trait]
    impl DataSource for InertSource {
        async fn fetch_bars(
            &self,
            _tickers: &[String],
            _period: &str,
            _interval: &str,
        ) -> anyhow::Result<HashMap<String, Vec<Bar>>> {
            Ok(HashMap::new())
        }

        async fn fetch_index_series(
            &self,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> anyhow::Result<Vec<Bar>> {
            Ok(Vec::new())
        }
    }

    fn make_row(ticker: &str, date: &str, close: f64, ma20: f64, change: f64) -> IndicatorRow {
        IndicatorRow {
            ticker: ticker.to_string(),
            date: date.parse().unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            adj_close: close,
            volume: 1_000,
            ma20,
            ma50: ma20 - 1.0,
            ma100: ma20 - 2.0,
            rsi: 55.0,
            macd_histogram: 0.1,
            bb_lower: close - 3.0,
            bb_middle: close,
            bb_upper: close + 3.0,
            stoch_k: 50.0,
            stoch_d: 50.0,
            volume_change: 0.01,
            change,
            tenkan_sen: close,
            kijun_sen: close,
            senkou_span_a: close,
            senkou_span_b: close,
        }
    }

    async fn seeded_screener() -> Screener<InertSource> {
        let db = Database::in_memory().await.unwrap();
        {
            let repo = HistoryRepository::new(db.pool());
            repo.insert_rows(&[
                make_row("AAPL", "2024-01-04", 100.0, 99.0, 0.4),
                make_row("MSFT", "2024-01-04", 380.0, 382.0, -0.2),
                make_row("AAPL", "2024-01-05", 101.0, 99.2, 1.0),
                make_row("MSFT", "2024-01-05", 379.0, 381.5, -0.26),
            ])
            .await
            .unwrap();
        }
        Screener::new(db, InertSource, vec!["AAPL".into(), "MSFT".into()])
    }

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[tokio::test]
    async fn test_first_closed_read_populates_once_then_serves_cache() {
        let mut screener = seeded_screener().await;
        // Saturday: market closed
        let saturday = at("2024-01-06 12:00:00");

        let first = screener.market_status(saturday).await.unwrap();
        let pool = screener.database().pool_clone();
        let results = ResultLogRepository::new(&pool);
        assert_eq!(results.count().await.unwrap(), 1);
        let stored_payload = results.latest().await.unwrap().unwrap().payload;

        // second read on the same calendar date: served unchanged, nothing
        // appended
        let second = screener.market_status(saturday).await.unwrap();
        assert_eq!(results.count().await.unwrap(), 1);
        assert_eq!(first, second);
        assert_eq!(
            results.latest().await.unwrap().unwrap().payload,
            stored_payload
        );

        // one advancer, one decliner over two tickers
        assert_eq!(first.market_breadth.sefi.value, 50.0);
        assert_eq!(first.market_breadth.adr.value, 1.0);
        assert!(!first.market_breadth.is_entry);
        assert_eq!(first.entries, EntriesPayload::none());
    }

    #[tokio::test]
    async fn test_closed_read_on_a_later_date_recomputes() {
        let mut screener = seeded_screener().await;

        screener.market_status(at("2024-01-06 12:00:00")).await.unwrap();
        // Monday before the open: closed, but the cached result is from
        // Saturday
        screener.market_status(at("2024-01-08 08:00:00")).await.unwrap();

        let pool = screener.database().pool_clone();
        let results = ResultLogRepository::new(&pool);
        assert_eq!(results.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_open_read_never_serves_cache() {
        let mut screener = seeded_screener().await;
        // Monday mid-session
        let open = at("2024-01-08 10:00:00");

        screener.market_status(open).await.unwrap();
        screener.market_status(open).await.unwrap();

        let pool = screener.database().pool_clone();
        let results = ResultLogRepository::new(&pool);
        // first call appends twice (cache population + open recompute),
        // second appends once more
        assert_eq!(results.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_empty_store_is_an_error() {
        let db = Database::in_memory().await.unwrap();
        let mut screener = Screener::new(db, InertSource, vec!["AAPL".into()]);
        let err = screener
            .market_status(at("2024-01-06 12:00:00"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no historical data"));
    }

    fn make_bars(ticker: &str, start: NaiveDate, closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                ticker: ticker.to_string(),
                date: start + chrono::Days::new(i as u64),
                open: close - 0.5,
                high: close + 1.0,
                low: close - 1.0,
                close,
                adj_close: close,
                volume: 1_000 + i as i64,
            })
            .collect()
    }

    /// Full fetch returns a steadily rising 130-bar series per ticker, so
    /// every enriched row closes above its 20-day average
    struct RisingSource {
        start: NaiveDate,
    }

    #[async_trait]
    impl DataSource for RisingSource {
        async fn fetch_bars(
            &self,
            tickers: &[String],
            _period: &str,
            _interval: &str,
        ) -> anyhow::Result<HashMap<String, Vec<Bar>>> {
            let closes: Vec<f64> = (0..130).map(|i| 100.0 + i as f64 * 0.5).collect();
            Ok(tickers
                .iter()
                .map(|t| (t.clone(), make_bars(t, self.start, &closes)))
                .collect())
        }

        async fn fetch_index_series(
            &self,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> anyhow::Result<Vec<Bar>> {
            Ok(Vec::new())
        }
    }

    /// No per-ticker bars; the index series rises for 115 bars then dips for
    /// five, ending well before the basket's latest date
    struct LaggingIndexSource {
        start: NaiveDate,
    }

    #[async_trait]
    impl DataSource for LaggingIndexSource {
        async fn fetch_bars(
            &self,
            _tickers: &[String],
            _period: &str,
            _interval: &str,
        ) -> anyhow::Result<HashMap<String, Vec<Bar>>> {
            Ok(HashMap::new())
        }

        async fn fetch_index_series(
            &self,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> anyhow::Result<Vec<Bar>> {
            let mut closes: Vec<f64> = (0..115).map(|i| 100.0 + i as f64 * 0.5).collect();
            let top = *closes.last().unwrap();
            closes.extend((1..=5).map(|i| top - i as f64));
            Ok(make_bars("SPX", self.start, &closes))
        }
    }

    #[tokio::test]
    async fn test_rebuild_drops_the_stale_breadth_series() {
        let db = Database::in_memory().await.unwrap();
        {
            let repo = HistoryRepository::new(db.pool());
            // both tickers below their 20-day average: SEFI = 0
            repo.insert_rows(&[
                make_row("AAPL", "2024-01-05", 100.0, 105.0, 0.4),
                make_row("MSFT", "2024-01-05", 380.0, 385.0, 0.2),
            ])
            .await
            .unwrap();
        }
        let mut screener = Screener::new(
            db,
            RisingSource {
                start: "2023-01-02".parse().unwrap(),
            },
            vec!["AAPL".into(), "MSFT".into()],
        );

        let before = screener.market_status(at("2024-01-06 12:00:00")).await.unwrap();
        assert_eq!(before.market_breadth.sefi.value, 0.0);

        // rebuild replaces the stored history with the rising series; the
        // cached per-date breadth must not survive it
        let inserted = screener.rebuild_history().await.unwrap();
        assert!(inserted > 0);

        let after = screener.market_status(at("2024-01-07 12:00:00")).await.unwrap();
        assert_eq!(after.market_breadth.sefi.value, 100.0);
    }

    #[tokio::test]
    async fn test_index_signals_fall_back_to_the_latest_index_row() {
        let db = Database::in_memory().await.unwrap();
        {
            let repo = HistoryRepository::new(db.pool());
            // two advancers, zero decliners: ADR = 2.0; both below their
            // 20-day average so SEFI stays out of the entry decision
            repo.insert_rows(&[
                make_row("AAPL", "2024-01-05", 100.0, 105.0, 0.4),
                make_row("MSFT", "2024-01-05", 380.0, 385.0, 0.2),
            ])
            .await
            .unwrap();
        }
        let mut screener = Screener::new(
            db,
            LaggingIndexSource {
                start: "2023-01-02".parse().unwrap(),
            },
            vec!["AAPL".into(), "MSFT".into()],
        );

        let payload = screener.market_status(at("2024-01-06 12:00:00")).await.unwrap();

        // the index series ends months before the basket's latest date; its
        // last row (recent dip below MA20, still above MA100) must still
        // drive the ADR signals
        assert_eq!(payload.market_breadth.adr.value, 2.0);
        assert!(payload.market_breadth.adr.long);
        assert!(!payload.market_breadth.sefi.long);
        assert!(payload.market_breadth.is_entry);
    }

    #[tokio::test]
    async fn test_entries_surface_in_payload() {
        let db = Database::in_memory().await.unwrap();
        {
            let repo = HistoryRepository::new(db.pool());
            // oversold_slow_over_fast fires: RSI < 35 with MA20 < MA50
            let mut row = make_row("AAPL", "2024-01-05", 90.0, 95.0, -2.0);
            row.rsi = 28.0;
            row.ma50 = 97.0;
            repo.insert_rows(&[row, make_row("MSFT", "2024-01-05", 380.0, 378.0, 0.1)])
                .await
                .unwrap();
        }
        let mut screener = Screener::new(db, InertSource, vec!["AAPL".into(), "MSFT".into()]);

        let payload = screener
            .market_status(at("2024-01-06 12:00:00"))
            .await
            .unwrap();
        assert_eq!(payload.entries.tickers(), vec!["AAPL"]);
        // plotting carries the latest cross-section's change pairs
        assert_eq!(payload.plotting.breadth.sefi.values.len(), 2);
    }
}
