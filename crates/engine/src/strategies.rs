//! Per-row entry strategies and the entries payload
//!
//! Four boolean strategies are evaluated on each indicator row; a row is an
//! "entry" when any of them fires. The latest-date cross-section of entries,
//! with the raw values behind every sub-strategy, becomes the caller-facing
//! `entries` payload.

use crate::types::{EntriesPayload, IndicatorRow, StrategyReport, TickerEntries};
use std::collections::BTreeMap;

/// Ichimoku entry: wide bearish cloud plus oversold RSI
pub fn ichimoku_entry(senkou_span_a: f64, senkou_span_b: f64, rsi: f64) -> bool {
    (senkou_span_b - senkou_span_a) / senkou_span_b > 0.15 && rsi < 35.0
}

/// Oversold RSI while the 20-day average sits below the 50-day
pub fn oversold_slow_over_fast(rsi: f64, ma20: f64, ma50: f64) -> bool {
    rsi < 35.0 && ma20 < ma50
}

/// Close below both the 50-day average and the lower Bollinger band,
/// with oversold RSI
pub fn ma_bollinger_rsi(close: f64, ma50: f64, bollinger_lower: f64, rsi: f64) -> bool {
    rsi <= 35.0 && close < ma50 && close < bollinger_lower
}

/// Oversold RSI with a deeply negative MACD histogram and low %D
pub fn rsi_stoch_macd(rsi: f64, stoch_d: f64, macd_histogram: f64) -> bool {
    rsi <= 35.0 && macd_histogram <= -1.0 && stoch_d <= 15.0
}

/// Market-wide composite: strong breadth participation while the index
/// itself is oversold below its lower band
pub fn good_sefi_oversold(sefi: f64, rsi: f64, bollinger_lower: f64, close: f64) -> bool {
    sefi > 65.0 && rsi < 35.0 && close < bollinger_lower
}

/// Evaluation of all four strategies on one row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSignals {
    pub ichimoku: bool,
    pub oversold_slow_over_fast: bool,
    pub oversold_stochastic: bool,
    pub oversold_macd: bool,
}

impl RowSignals {
    pub fn evaluate(row: &IndicatorRow) -> Self {
        Self {
            ichimoku: ichimoku_entry(row.senkou_span_a, row.senkou_span_b, row.rsi),
            oversold_slow_over_fast: oversold_slow_over_fast(row.rsi, row.ma20, row.ma50),
            oversold_stochastic: ma_bollinger_rsi(row.close, row.ma50, row.bb_lower, row.rsi),
            oversold_macd: rsi_stoch_macd(row.rsi, row.stoch_d, row.macd_histogram),
        }
    }

    /// Entry = logical OR of all four strategies
    pub fn is_entry(&self) -> bool {
        self.ichimoku || self.oversold_slow_over_fast || self.oversold_stochastic || self.oversold_macd
    }
}

fn values(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

/// Build the per-ticker report: each strategy's status plus the raw values
/// that produced it
pub fn entry_report(row: &IndicatorRow, signals: RowSignals) -> TickerEntries {
    TickerEntries {
        ichimoku: StrategyReport {
            status: signals.ichimoku,
            values: values(&[
                ("senkou_span_a", row.senkou_span_a),
                ("senkou_span_b", row.senkou_span_b),
                ("rsi", row.rsi),
            ]),
        },
        oversold_slow_over_fast: StrategyReport {
            status: signals.oversold_slow_over_fast,
            values: values(&[("rsi", row.rsi), ("ma20", row.ma20), ("ma50", row.ma50)]),
        },
        oversold_stochastic: StrategyReport {
            status: signals.oversold_stochastic,
            values: values(&[
                ("close", row.close),
                ("ma50", row.ma50),
                ("bollinger_lower", row.bb_lower),
                ("rsi", row.rsi),
            ]),
        },
        oversold_macd: StrategyReport {
            status: signals.oversold_macd,
            values: values(&[
                ("rsi", row.rsi),
                ("stochastic_d", row.stoch_d),
                ("macd", row.macd_histogram),
            ]),
        },
    }
}

/// Collect the entries payload from a single date's cross-section.
/// Returns `false` (the payload variant) when no instrument triggers any
/// strategy.
pub fn collect_entries(rows: &[IndicatorRow]) -> EntriesPayload {
    let mut entries = BTreeMap::new();
    for row in rows {
        let signals = RowSignals::evaluate(row);
        if signals.is_entry() {
            entries.insert(row.ticker.clone(), entry_report(row, signals));
        }
    }
    if entries.is_empty() {
        EntriesPayload::none()
    } else {
        EntriesPayload::Triggered(entries)
    }
}
