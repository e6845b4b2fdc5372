//! Cross-sectional market breadth: SEFI and advance/decline ratio
//!
//! Per-date aggregates are computed across every instrument's indicator row
//! for that date. `BreadthHistory` keeps the per-date values in memory and
//! skips dates whose stored cross-section is unchanged, so incremental
//! ingestion does not replay the full history. A date is recomputed when
//! its cross-section grows (a lagging ticker's row arriving late).

use crate::strategies::good_sefi_oversold;
use crate::types::{BreadthPlot, IndicatorRow, SeriesValues};
use chrono::NaiveDate;
use persistence::repository::history::HistoryRepository;
use std::collections::BTreeMap;
use tracing::debug;

pub const SEFI_LONG_THRESHOLD: f64 = 75.0;
pub const SEFI_SHORT_THRESHOLD: f64 = 25.0;
pub const ADR_LONG_THRESHOLD: f64 = 2.0;
pub const ADR_SHORT_THRESHOLD: f64 = 0.5;

/// SEFI: percentage of instruments whose close is strictly above their
/// 20-day average. An empty cross-section reads as 0.
pub fn sefi_percentage(rows: &[IndicatorRow]) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    let above = rows.iter().filter(|r| r.close > r.ma20).count();
    100.0 * above as f64 / rows.len() as f64
}

/// Advance/decline ratio: advancing (change > 0) over declining
/// (change ≤ 0). With zero decliners the denominator is clamped to one,
/// so the ratio degrades to the advancing count — finite and
/// JSON-representable.
pub fn advance_decline_ratio(rows: &[IndicatorRow]) -> f64 {
    let advancing = rows.iter().filter(|r| r.change > 0.0).count();
    let declining = rows.len() - advancing;
    advancing as f64 / declining.max(1) as f64
}

pub fn sefi_signal_long(sefi: f64) -> bool {
    sefi >= SEFI_LONG_THRESHOLD
}

pub fn sefi_signal_short(sefi: f64) -> bool {
    sefi <= SEFI_SHORT_THRESHOLD
}

/// ADR long: broad advance while the index holds above its 100-day average
/// but below its 20-day (evaluated on the synthetic index row)
pub fn adr_signal_long(adr: f64, close: f64, ma100: f64, ma20: f64) -> bool {
    adr >= ADR_LONG_THRESHOLD && close > ma100 && close < ma20
}

/// ADR short: broad decline with the index below its 100-day average but
/// above its 20-day
pub fn adr_signal_short(adr: f64, close: f64, ma100: f64, ma20: f64) -> bool {
    adr <= ADR_SHORT_THRESHOLD && close < ma100 && close > ma20
}

/// Per-date breadth values, tagged with the cross-section size they were
/// computed over
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayBreadth {
    pub sefi_pct: f64,
    pub adr: f64,
    pub rows: i64,
}

/// In-memory per-date breadth series, extended incrementally
#[derive(Debug, Default)]
pub struct BreadthHistory {
    days: BTreeMap<NaiveDate, DayBreadth>,
}

impl BreadthHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn days(&self) -> &BTreeMap<NaiveDate, DayBreadth> {
        &self.days
    }

    pub fn latest(&self) -> Option<(NaiveDate, DayBreadth)> {
        self.days.last_key_value().map(|(d, b)| (*d, *b))
    }

    /// Compute breadth for every stored date that is new or whose
    /// cross-section has grown since it was cached. Returns the number of
    /// (re)computed dates.
    pub async fn extend(&mut self, repo: &HistoryRepository<'_>) -> anyhow::Result<usize> {
        let mut computed = 0;
        for (date, count) in repo.date_counts().await? {
            if self.days.get(&date).is_some_and(|day| day.rows == count) {
                continue;
            }
            let rows = repo.rows_for_date(date).await?;
            let day = DayBreadth {
                sefi_pct: sefi_percentage(&rows),
                adr: advance_decline_ratio(&rows),
                rows: rows.len() as i64,
            };
            debug!(%date, sefi = day.sefi_pct, adr = day.adr, "computed breadth");
            self.days.insert(date, day);
            computed += 1;
        }
        Ok(computed)
    }
}

/// Market breadth at the latest stored date
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreadthSnapshot {
    pub date: NaiveDate,
    pub sefi_value: f64,
    pub sefi_long: bool,
    pub sefi_short: bool,
    pub adr_value: f64,
    pub adr_long: bool,
    pub adr_short: bool,
    pub good_sefi_oversold: bool,
    pub is_entry: bool,
}

/// Assemble the snapshot for the latest date. ADR signals and the composite
/// strategy need the synthetic index row for that date; without one they
/// read false.
pub fn snapshot(history: &BreadthHistory, index_row: Option<&IndicatorRow>) -> Option<BreadthSnapshot> {
    let (date, day) = history.latest()?;
    let sefi_long = sefi_signal_long(day.sefi_pct);
    let sefi_short = sefi_signal_short(day.sefi_pct);

    let (adr_long, adr_short, good) = match index_row {
        Some(ix) => (
            adr_signal_long(day.adr, ix.close, ix.ma100, ix.ma20),
            adr_signal_short(day.adr, ix.close, ix.ma100, ix.ma20),
            good_sefi_oversold(day.sefi_pct, ix.rsi, ix.bb_lower, ix.close),
        ),
        None => (false, false, false),
    };

    Some(BreadthSnapshot {
        date,
        sefi_value: day.sefi_pct,
        sefi_long,
        sefi_short,
        adr_value: day.adr,
        adr_long,
        adr_short,
        good_sefi_oversold: good,
        is_entry: sefi_long || adr_long,
    })
}

/// Charting series for the latest cross-section: per-ticker change and
/// volume-change pairs
pub fn plotting_breadth(rows: &[IndicatorRow]) -> BreadthPlot {
    BreadthPlot {
        sefi: SeriesValues {
            values: rows.iter().map(|r| (r.ticker.clone(), r.change)).collect(),
        },
        adr: SeriesValues {
            values: rows
                .iter()
                .map(|r| (r.ticker.clone(), r.volume_change))
                .collect(),
        },
    }
}
