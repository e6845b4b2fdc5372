//! Bar enrichment: raw OHLCV series → fully-defined indicator rows
//!
//! Runs the whole indicator battery over one ticker's ascending bars and
//! keeps only the rows where every derived field is defined. Warm-up rows
//! are dropped here, never null-filled, so downstream consumers only ever
//! see complete rows.

use crate::indicators::{
    bollinger, ichimoku, macd, moving_average, pct_change, rsi, stochastic, BOLLINGER_K,
    BOLLINGER_PERIOD, RSI_PERIOD, STOCH_D_PERIOD, STOCH_K_PERIOD,
};
use crate::types::{Bar, IndicatorRow};

/// Enrich one ticker's bars (ascending by date) into indicator rows.
/// Rows whose rolling windows lack history are omitted from the output.
pub fn enrich_bars(bars: &[Bar]) -> Vec<IndicatorRow> {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let adj_closes: Vec<f64> = bars.iter().map(|b| b.adj_close).collect();
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume as f64).collect();

    let ma20 = moving_average(&closes, 20);
    let ma50 = moving_average(&closes, 50);
    let ma100 = moving_average(&closes, 100);
    let rsi_values = rsi(&closes, RSI_PERIOD);
    let (_, _, macd_histogram) = macd(&adj_closes);
    let (bb_lower, bb_middle, bb_upper) =
        bollinger(&closes, &lows, &highs, BOLLINGER_PERIOD, BOLLINGER_K);
    let (stoch_k, stoch_d) = stochastic(&closes, &highs, &lows, STOCH_K_PERIOD, STOCH_D_PERIOD);
    let cloud = ichimoku(&highs, &lows);

    // close change is a percentage; volume change stays fractional
    let change: Vec<Option<f64>> = pct_change(&closes)
        .into_iter()
        .map(|c| c.map(|v| v * 100.0))
        .collect();
    let volume_change = pct_change(&volumes);

    let mut rows = Vec::new();
    for (i, bar) in bars.iter().enumerate() {
        let complete = (|| {
            Some(IndicatorRow {
                ticker: bar.ticker.clone(),
                date: bar.date,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                adj_close: bar.adj_close,
                volume: bar.volume,
                ma20: ma20[i]?,
                ma50: ma50[i]?,
                ma100: ma100[i]?,
                rsi: rsi_values[i]?,
                macd_histogram: macd_histogram[i],
                bb_lower: bb_lower[i]?,
                bb_middle: bb_middle[i]?,
                bb_upper: bb_upper[i]?,
                stoch_k: stoch_k[i]?,
                stoch_d: stoch_d[i]?,
                volume_change: volume_change[i]?,
                change: change[i]?,
                tenkan_sen: cloud.tenkan_sen[i]?,
                kijun_sen: cloud.kijun_sen[i]?,
                senkou_span_a: cloud.senkou_span_a[i]?,
                senkou_span_b: cloud.senkou_span_b[i]?,
            })
        })();
        if let Some(row) = complete {
            rows.push(row);
        }
    }
    rows
}
