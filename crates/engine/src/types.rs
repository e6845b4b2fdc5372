//! Types for the screener engine

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use persistence::repository::history::HistoricalRow as IndicatorRow;

/// One instrument's raw OHLCV record for one trading date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub ticker: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: i64,
}

impl From<&IndicatorRow> for Bar {
    fn from(row: &IndicatorRow) -> Self {
        Self {
            ticker: row.ticker.clone(),
            date: row.date,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            adj_close: row.adj_close,
            volume: row.volume,
        }
    }
}

// ---------------------------------------------------------------------------
// Caller-facing payload
// ---------------------------------------------------------------------------

/// Full market-status payload, as serialized into the result log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusPayload {
    pub market_breadth: MarketBreadthPayload,
    pub entries: EntriesPayload,
    pub plotting: PlottingPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketBreadthPayload {
    pub is_entry: bool,
    #[serde(rename = "SEFI")]
    pub sefi: GaugePayload,
    #[serde(rename = "ADR")]
    pub adr: GaugePayload,
    pub strategies: BreadthStrategies,
}

/// A breadth gauge: its value plus long/short signal flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaugePayload {
    pub value: f64,
    pub short: bool,
    pub long: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreadthStrategies {
    #[serde(rename = "good_SEFI_oversold")]
    pub good_sefi_oversold: bool,
}

/// Per-ticker entry reports, or `false` when no instrument triggered any
/// strategy on the latest date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntriesPayload {
    Triggered(BTreeMap<String, TickerEntries>),
    None(bool),
}

impl EntriesPayload {
    pub fn none() -> Self {
        EntriesPayload::None(false)
    }

    pub fn tickers(&self) -> Vec<&str> {
        match self {
            EntriesPayload::Triggered(map) => map.keys().map(String::as_str).collect(),
            EntriesPayload::None(_) => Vec::new(),
        }
    }
}

/// All four strategy reports for one entered ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerEntries {
    #[serde(rename = "Ichimoku")]
    pub ichimoku: StrategyReport,
    pub oversold_slow_over_fast: StrategyReport,
    pub oversold_stochastic: StrategyReport,
    #[serde(rename = "oversold_MACD")]
    pub oversold_macd: StrategyReport,
}

/// One strategy's status plus the raw values that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyReport {
    pub status: bool,
    pub values: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlottingPayload {
    pub breadth: BreadthPlot,
}

/// Latest-date per-ticker change/volume-change pairs for charting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreadthPlot {
    #[serde(rename = "SEFI")]
    pub sefi: SeriesValues,
    #[serde(rename = "ADR")]
    pub adr: SeriesValues,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesValues {
    pub values: Vec<(String, f64)>,
}
