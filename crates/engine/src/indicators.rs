//! Technical indicators over daily bar series
//!
//! Every function is a pure whole-series transform: an ordered input
//! sequence (ascending by date, single ticker) maps to an aligned output of
//! the same length, with `None` wherever the rolling window lacks history.
//! The same signatures serve full-history rebuilds and incremental windows.

// ============================================================================
// Rolling-window primitives
// ============================================================================

/// Simple rolling mean over `window` values
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window == 0 {
        return out;
    }
    for i in (window - 1)..values.len() {
        let slice = &values[i + 1 - window..=i];
        out[i] = Some(slice.iter().sum::<f64>() / window as f64);
    }
    out
}

/// Rolling mean over an already-gapped series: defined only where the full
/// window is defined
pub fn rolling_mean_opt(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window == 0 {
        return out;
    }
    for i in (window - 1)..values.len() {
        let slice = &values[i + 1 - window..=i];
        if slice.iter().all(Option::is_some) {
            let sum: f64 = slice.iter().map(|v| v.unwrap_or(0.0)).sum();
            out[i] = Some(sum / window as f64);
        }
    }
    out
}

/// Rolling population standard deviation (no sample correction)
pub fn rolling_std(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window == 0 {
        return out;
    }
    for i in (window - 1)..values.len() {
        let slice = &values[i + 1 - window..=i];
        let mean = slice.iter().sum::<f64>() / window as f64;
        let var = slice.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / window as f64;
        out[i] = Some(var.sqrt());
    }
    out
}

/// Rolling maximum
pub fn rolling_max(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window == 0 {
        return out;
    }
    for i in (window - 1)..values.len() {
        let slice = &values[i + 1 - window..=i];
        out[i] = slice.iter().copied().fold(None, |acc: Option<f64>, v| {
            Some(acc.map_or(v, |a| a.max(v)))
        });
    }
    out
}

/// Rolling minimum
pub fn rolling_min(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window == 0 {
        return out;
    }
    for i in (window - 1)..values.len() {
        let slice = &values[i + 1 - window..=i];
        out[i] = slice.iter().copied().fold(None, |acc: Option<f64>, v| {
            Some(acc.map_or(v, |a| a.min(v)))
        });
    }
    out
}

/// One-period fractional change: (x[i] − x[i−1]) / x[i−1]
pub fn pct_change(values: &[f64]) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    for i in 1..values.len() {
        if values[i - 1] != 0.0 {
            out[i] = Some((values[i] - values[i - 1]) / values[i - 1]);
        }
    }
    out
}

/// Shift a series forward by `periods`: out[i] = in[i − periods]
pub fn shift_forward(values: &[Option<f64>], periods: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    for i in periods..values.len() {
        out[i] = values[i - periods];
    }
    out
}

// ============================================================================
// Exponentially weighted means (both pandas variants)
// ============================================================================

/// Smoothing factor for a center-of-mass parameterization
pub fn alpha_from_com(com: f64) -> f64 {
    1.0 / (1.0 + com)
}

/// Smoothing factor for a span parameterization
pub fn alpha_from_span(span: f64) -> f64 {
    2.0 / (span + 1.0)
}

/// Recursive EWM (adjust = false): y[s] = x[s] at the first defined input,
/// then y[i] = (1 − α)·y[i−1] + α·x[i]. Leading undefined inputs stay
/// undefined.
pub fn ewm_mean_recursive(values: &[Option<f64>], alpha: f64) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    let mut state: Option<f64> = None;
    for (i, value) in values.iter().enumerate() {
        if let Some(x) = value {
            state = Some(match state {
                Some(prev) => (1.0 - alpha) * prev + alpha * x,
                None => *x,
            });
            out[i] = state;
        }
    }
    out
}

/// Weight-normalized EWM (adjust = true):
/// y[t] = Σ (1−α)^i · x[t−i] / Σ (1−α)^i
pub fn ewm_mean_weighted(values: &[f64], alpha: f64) -> Vec<f64> {
    let decay = 1.0 - alpha;
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    let mut out = Vec::with_capacity(values.len());
    for &x in values {
        numerator = x + decay * numerator;
        denominator = 1.0 + decay * denominator;
        out.push(numerator / denominator);
    }
    out
}

// ============================================================================
// Momentum indicators
// ============================================================================

/// RSI period
pub const RSI_PERIOD: usize = 14;

/// Relative Strength Index with Wilder-equivalent smoothing
/// (EWM with center-of-mass = period − 1, recursive).
///
/// Monotone non-decreasing closes drive the smoothed loss to zero and the
/// RSI to exactly 100. The first `period + 1` positions are forced
/// undefined regardless of numerical convergence.
pub fn rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = closes.len();
    let mut gains = vec![None; n];
    let mut losses = vec![None; n];
    for i in 1..n {
        let delta = closes[i] - closes[i - 1];
        gains[i] = Some(delta.max(0.0));
        losses[i] = Some((-delta).max(0.0));
    }

    let alpha = alpha_from_com((period.max(1) - 1) as f64);
    let smoothed_gains = ewm_mean_recursive(&gains, alpha);
    let smoothed_losses = ewm_mean_recursive(&losses, alpha);

    let mut out: Vec<Option<f64>> = smoothed_gains
        .iter()
        .zip(&smoothed_losses)
        .map(|(gain, loss)| match (gain, loss) {
            (Some(g), Some(l)) if *l > 0.0 => {
                let rs = g / l;
                Some(100.0 - 100.0 / (1.0 + rs))
            }
            // zero smoothed loss with positive gain: RS is unbounded
            (Some(g), Some(_)) if *g > 0.0 => Some(100.0),
            // flat window: 0/0, not a meaningful reading
            _ => None,
        })
        .collect();

    // warm-up guard
    for slot in out.iter_mut().take((period + 1).min(n)) {
        *slot = None;
    }
    out
}

/// MACD parameters
pub const MACD_FAST: f64 = 12.0;
pub const MACD_SLOW: f64 = 26.0;
pub const MACD_SIGNAL: f64 = 9.0;

/// MACD line, signal line and histogram over adjusted closes.
///
/// The line is slowEMA − fastEMA (inverted relative to the common
/// fast − slow convention; the sign is part of the contract). EWMs are
/// weight-normalized, so every position is defined.
pub fn macd(adj_closes: &[f64]) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let fast_ema = ewm_mean_weighted(adj_closes, alpha_from_span(MACD_FAST));
    let slow_ema = ewm_mean_weighted(adj_closes, alpha_from_span(MACD_SLOW));

    let line: Vec<f64> = slow_ema
        .iter()
        .zip(&fast_ema)
        .map(|(slow, fast)| slow - fast)
        .collect();
    let signal = ewm_mean_weighted(&line, alpha_from_span(MACD_SIGNAL));
    let histogram: Vec<f64> = line
        .iter()
        .zip(&signal)
        .map(|(m, s)| m - s)
        .collect();

    (line, signal, histogram)
}

// ============================================================================
// Volatility indicators
// ============================================================================

/// Bollinger window and band width
pub const BOLLINGER_PERIOD: usize = 20;
pub const BOLLINGER_K: f64 = 2.0;

/// Bollinger bands over the typical price (close + low + high) / 3.
/// Returns (lower, middle, upper).
pub fn bollinger(
    closes: &[f64],
    lows: &[f64],
    highs: &[f64],
    period: usize,
    k: f64,
) -> (Vec<Option<f64>>, Vec<Option<f64>>, Vec<Option<f64>>) {
    let typical: Vec<f64> = closes
        .iter()
        .zip(lows)
        .zip(highs)
        .map(|((c, l), h)| (c + l + h) / 3.0)
        .collect();

    let middle = rolling_mean(&typical, period);
    let std = rolling_std(&typical, period);

    let lower: Vec<Option<f64>> = middle
        .iter()
        .zip(&std)
        .map(|(m, s)| Some(m.as_ref()? - k * s.as_ref()?))
        .collect();
    let upper: Vec<Option<f64>> = middle
        .iter()
        .zip(&std)
        .map(|(m, s)| Some(m.as_ref()? + k * s.as_ref()?))
        .collect();

    (lower, middle, upper)
}

/// Stochastic oscillator windows
pub const STOCH_K_PERIOD: usize = 14;
pub const STOCH_D_PERIOD: usize = 3;

/// Stochastic oscillator. %K is undefined where the high/low range over the
/// window collapses to zero; %D is the rolling mean of %K.
/// Returns (%K, %D).
pub fn stochastic(
    closes: &[f64],
    highs: &[f64],
    lows: &[f64],
    k_period: usize,
    d_period: usize,
) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let highest = rolling_max(highs, k_period);
    let lowest = rolling_min(lows, k_period);

    let k: Vec<Option<f64>> = closes
        .iter()
        .zip(highest.iter().zip(&lowest))
        .map(|(close, (hh, ll))| {
            let hh = (*hh)?;
            let ll = (*ll)?;
            let range = hh - ll;
            if range == 0.0 {
                return None;
            }
            Some((close - ll) * 100.0 / range)
        })
        .collect();

    let d = rolling_mean_opt(&k, d_period);
    (k, d)
}

// ============================================================================
// Ichimoku
// ============================================================================

pub const ICHIMOKU_TENKAN: usize = 9;
pub const ICHIMOKU_KIJUN: usize = 26;
pub const ICHIMOKU_SENKOU_B: usize = 52;
pub const ICHIMOKU_SHIFT: usize = 26;

/// Ichimoku component series
#[derive(Debug, Clone)]
pub struct IchimokuSeries {
    pub tenkan_sen: Vec<Option<f64>>,
    pub kijun_sen: Vec<Option<f64>>,
    pub senkou_span_a: Vec<Option<f64>>,
    pub senkou_span_b: Vec<Option<f64>>,
}

/// High/low midpoint band over `window`
fn midpoint(highs: &[f64], lows: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling_max(highs, window)
        .iter()
        .zip(rolling_min(lows, window).iter())
        .map(|(h, l)| Some((h.as_ref()? + l.as_ref()?) / 2.0))
        .collect()
}

/// Ichimoku lines; both senkou spans are displaced forward 26 periods
pub fn ichimoku(highs: &[f64], lows: &[f64]) -> IchimokuSeries {
    let tenkan_sen = midpoint(highs, lows, ICHIMOKU_TENKAN);
    let kijun_sen = midpoint(highs, lows, ICHIMOKU_KIJUN);

    let mid: Vec<Option<f64>> = tenkan_sen
        .iter()
        .zip(&kijun_sen)
        .map(|(t, k)| Some((t.as_ref()? + k.as_ref()?) / 2.0))
        .collect();
    let senkou_span_a = shift_forward(&mid, ICHIMOKU_SHIFT);
    let senkou_span_b = shift_forward(&midpoint(highs, lows, ICHIMOKU_SENKOU_B), ICHIMOKU_SHIFT);

    IchimokuSeries {
        tenkan_sen,
        kijun_sen,
        senkou_span_a,
        senkou_span_b,
    }
}

// ============================================================================
// Moving averages
// ============================================================================

/// Simple moving average over `window` closes
pub fn moving_average(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling_mean(closes, window)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_rolling_mean_warm_up_and_values() {
        let values: Vec<f64> = (1..=5).map(|v| v as f64).collect();
        let means = rolling_mean(&values, 3);
        assert_eq!(means[0], None);
        assert_eq!(means[1], None);
        assert_close(means[2].unwrap(), 2.0);
        assert_close(means[4].unwrap(), 4.0);
    }

    #[test]
    fn test_rolling_std_is_population_style() {
        // population std of [2, 4] is 1.0 (sample-corrected would be sqrt(2))
        let std = rolling_std(&[2.0, 4.0], 2);
        assert_close(std[1].unwrap(), 1.0);
    }

    #[test]
    fn test_flat_series_ma20() {
        let closes = vec![100.0; 60];
        let ma20 = moving_average(&closes, 20);
        for slot in ma20.iter().take(19) {
            assert_eq!(*slot, None);
        }
        for slot in ma20.iter().skip(19) {
            assert_close(slot.unwrap(), 100.0);
        }
    }

    #[test]
    fn test_long_window_moving_average() {
        let closes: Vec<f64> = (1..=250).map(|v| v as f64).collect();
        let ma200 = moving_average(&closes, 200);
        assert_eq!(ma200[198], None);
        // mean of 1..=200 is 100.5
        assert_close(ma200[199].unwrap(), 100.5);
        assert_close(ma200[249].unwrap(), 150.5);
    }

    #[test]
    fn test_pct_change() {
        let changes = pct_change(&[100.0, 110.0, 99.0]);
        assert_eq!(changes[0], None);
        assert_close(changes[1].unwrap(), 0.10);
        assert_close(changes[2].unwrap(), -0.10);
    }

    #[test]
    fn test_shift_forward() {
        let shifted = shift_forward(&[Some(1.0), Some(2.0), Some(3.0)], 1);
        assert_eq!(shifted, vec![None, Some(1.0), Some(2.0)]);
    }

    #[test]
    fn test_ewm_recursive_skips_leading_undefined() {
        let values = vec![None, Some(10.0), Some(20.0)];
        let ewm = ewm_mean_recursive(&values, 0.5);
        assert_eq!(ewm[0], None);
        assert_close(ewm[1].unwrap(), 10.0);
        assert_close(ewm[2].unwrap(), 15.0);
    }

    #[test]
    fn test_ewm_weighted_matches_hand_computation() {
        // alpha = 0.5: y1 = (x1 + 0.5 x0) / 1.5
        let ewm = ewm_mean_weighted(&[10.0, 20.0], 0.5);
        assert_close(ewm[0], 10.0);
        assert_close(ewm[1], (20.0 + 5.0) / 1.5);
    }

    #[test]
    fn test_rsi_warm_up_is_forced_undefined() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let values = rsi(&closes, RSI_PERIOD);
        for slot in values.iter().take(15) {
            assert_eq!(*slot, None, "first 15 positions must be undefined");
        }
        assert!(values[15].is_some());
    }

    #[test]
    fn test_rsi_monotone_non_decreasing_closes_is_100() {
        let mut closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        closes.push(*closes.last().unwrap()); // non-decreasing, not strict
        let values = rsi(&closes, RSI_PERIOD);
        for slot in values.iter().skip(15) {
            assert_close(slot.unwrap(), 100.0);
        }
    }

    #[test]
    fn test_rsi_flat_series_is_undefined() {
        let values = rsi(&[100.0; 30], RSI_PERIOD);
        assert!(values.iter().all(Option::is_none));
    }

    #[test]
    fn test_macd_sign_convention_is_slow_minus_fast() {
        // Rising closes: fast EMA > slow EMA, so the line must be negative
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64 * 2.0).collect();
        let (line, _, _) = macd(&closes);
        assert!(line[59] < 0.0, "rising series must give a negative line");
    }

    #[test]
    fn test_macd_flat_series_has_zero_histogram() {
        let (line, signal, histogram) = macd(&[100.0; 40]);
        assert_close(line[39], 0.0);
        assert_close(signal[39], 0.0);
        assert_close(histogram[39], 0.0);
    }

    #[test]
    fn test_bollinger_band_ordering() {
        let closes: Vec<f64> = (0..50).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let lows: Vec<f64> = closes.iter().map(|c| c - 1.0).collect();
        let highs: Vec<f64> = closes.iter().map(|c| c + 1.0).collect();
        let (lower, middle, upper) = bollinger(&closes, &lows, &highs, BOLLINGER_PERIOD, BOLLINGER_K);

        for i in 0..closes.len() {
            match (lower[i], middle[i], upper[i]) {
                (Some(l), Some(m), Some(u)) => {
                    assert!(l <= m && m <= u, "band ordering violated at {i}");
                }
                (None, None, None) => assert!(i < BOLLINGER_PERIOD - 1),
                other => panic!("bands must be defined together, got {other:?} at {i}"),
            }
        }
    }

    #[test]
    fn test_stochastic_range_and_warm_up() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64 * 1.3).cos() * 8.0).collect();
        let highs: Vec<f64> = closes.iter().map(|c| c + 2.0).collect();
        let lows: Vec<f64> = closes.iter().map(|c| c - 2.0).collect();
        let (k, d) = stochastic(&closes, &highs, &lows, STOCH_K_PERIOD, STOCH_D_PERIOD);

        for slot in k.iter().take(STOCH_K_PERIOD - 1) {
            assert_eq!(*slot, None);
        }
        // %D needs two more defined %K values
        assert_eq!(d[STOCH_K_PERIOD - 1], None);
        assert!(d[STOCH_K_PERIOD + 1].is_some());
        for slot in k.iter().flatten() {
            assert!((0.0..=100.0).contains(slot));
        }
    }

    #[test]
    fn test_stochastic_zero_range_is_undefined() {
        let (k, _) = stochastic(&[5.0; 20], &[5.0; 20], &[5.0; 20], STOCH_K_PERIOD, STOCH_D_PERIOD);
        assert!(k.iter().all(Option::is_none));
    }

    #[test]
    fn test_ichimoku_spans_are_displaced() {
        let highs: Vec<f64> = (0..120).map(|i| 110.0 + i as f64).collect();
        let lows: Vec<f64> = (0..120).map(|i| 90.0 + i as f64).collect();
        let series = ichimoku(&highs, &lows);

        assert_eq!(series.tenkan_sen[7], None);
        assert!(series.tenkan_sen[8].is_some());
        assert!(series.kijun_sen[25].is_some());

        // senkou A: defined once kijun (26) plus the 26-period shift is covered
        assert_eq!(series.senkou_span_a[50], None);
        assert!(series.senkou_span_a[51].is_some());
        // senkou B: 52-period window plus the shift
        assert_eq!(series.senkou_span_b[76], None);
        assert!(series.senkou_span_b[77].is_some());

        // the shifted value equals the midpoint computed 26 periods earlier
        let mid_at_51 = (highs[0..52].iter().cloned().fold(f64::MIN, f64::max)
            + lows[0..52].iter().cloned().fold(f64::MAX, f64::min))
            / 2.0;
        assert_close(series.senkou_span_b[77].unwrap(), mid_at_51);
    }
}
