//! Indicator math. Every output is index-aligned with the input candles;
//! warm-up positions hold NaN.

use std::collections::VecDeque;

use super::config::IndicatorSpec;
use super::result::SeriesResult;
use crate::domain::market_data::Candle;

/// Compute one series over the full candle buffer
pub fn compute(id: &str, spec: &IndicatorSpec, candles: &[Candle]) -> SeriesResult {
    let kind = spec.kind();
    match *spec {
        IndicatorSpec::Sma { period } => SeriesResult::new(id, kind, sma(&closes(candles), period)),
        IndicatorSpec::Ema { period } => SeriesResult::new(id, kind, ema(&closes(candles), period)),
        IndicatorSpec::Wma { period } => SeriesResult::new(id, kind, wma(&closes(candles), period)),
        IndicatorSpec::Rsi { period } => SeriesResult::new(id, kind, rsi(&closes(candles), period)),
        IndicatorSpec::Macd { fast, slow, signal } => {
            let closes = closes(candles);
            let fast_line = ema(&closes, fast);
            let slow_line = ema(&closes, slow);
            let macd: Vec<f64> = fast_line.iter().zip(&slow_line).map(|(f, s)| f - s).collect();
            let signal_line = ema(&macd, signal);
            let histogram = macd.iter().zip(&signal_line).map(|(m, s)| m - s).collect();
            SeriesResult::new(id, kind, macd)
                .with_line("signal", signal_line)
                .with_line("histogram", histogram)
        }
        IndicatorSpec::Bollinger { period, std_dev } => {
            let closes = closes(candles);
            let middle = sma(&closes, period);
            let deviation = rolling_std(&closes, period);
            let upper = middle.iter().zip(&deviation).map(|(m, d)| m + std_dev * d).collect();
            let lower = middle.iter().zip(&deviation).map(|(m, d)| m - std_dev * d).collect();
            SeriesResult::new(id, kind, middle).with_line("upper", upper).with_line("lower", lower)
        }
        IndicatorSpec::Stochastic { k_period, d_period } => {
            let k = stochastic_k(candles, k_period);
            let d = sma(&k, d_period);
            SeriesResult::new(id, kind, k).with_line("d", d)
        }
        IndicatorSpec::WilliamsR { period } => {
            let values = stochastic_k(candles, period).into_iter().map(|k| k - 100.0).collect();
            SeriesResult::new(id, kind, values)
        }
        IndicatorSpec::Atr { period } => SeriesResult::new(id, kind, atr(candles, period)),
        IndicatorSpec::Obv => SeriesResult::new(id, kind, obv(candles)),
        IndicatorSpec::VolumeSma { period } => {
            let volumes: Vec<f64> = candles.iter().map(|c| c.ohlcv.volume.value()).collect();
            SeriesResult::new(id, kind, sma(&volumes, period))
        }
    }
}

fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.ohlcv.close.value()).collect()
}

/// Rolling mean. A NaN inside the window yields NaN until it leaves.
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 {
        return out;
    }
    let mut window: VecDeque<f64> = VecDeque::with_capacity(period + 1);
    let mut sum = 0.0;
    let mut nan_count = 0usize;
    for (i, &v) in values.iter().enumerate() {
        window.push_back(v);
        if v.is_nan() {
            nan_count += 1;
        } else {
            sum += v;
        }
        if window.len() > period
            && let Some(old) = window.pop_front()
        {
            if old.is_nan() {
                nan_count -= 1;
            } else {
                sum -= old;
            }
        }
        if window.len() == period && nan_count == 0 {
            out[i] = sum / period as f64;
        }
    }
    out
}

/// Exponential average seeded with the simple mean of the first `period`
/// finite values. Leading NaNs are skipped.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 {
        return out;
    }
    let Some(first) = values.iter().position(|v| v.is_finite()) else {
        return out;
    };
    let seed_end = first + period;
    if seed_end > values.len() {
        return out;
    }
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut prev = values[first..seed_end].iter().sum::<f64>() / period as f64;
    out[seed_end - 1] = prev;
    for i in seed_end..values.len() {
        let v = values[i];
        if v.is_finite() {
            prev = alpha * v + (1.0 - alpha) * prev;
        }
        out[i] = prev;
    }
    out
}

/// Linearly weighted mean, newest value weighted `period`
pub fn wma(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }
    let denominator = (period * (period + 1)) as f64 / 2.0;
    for i in (period - 1)..values.len() {
        let window = &values[i + 1 - period..=i];
        let weighted: f64 = window.iter().enumerate().map(|(w, v)| (w + 1) as f64 * v).sum();
        out[i] = weighted / denominator;
    }
    out
}

/// Wilder-smoothed relative strength index
pub fn rsi(closes: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; closes.len()];
    if period == 0 || closes.len() <= period {
        return out;
    }
    let mut gain = 0.0;
    let mut loss = 0.0;
    for i in 1..=period {
        let change = closes[i] - closes[i - 1];
        if change > 0.0 {
            gain += change;
        } else {
            loss -= change;
        }
    }
    let p = period as f64;
    let mut avg_gain = gain / p;
    let mut avg_loss = loss / p;
    out[period] = rsi_value(avg_gain, avg_loss);
    for i in (period + 1)..closes.len() {
        let change = closes[i] - closes[i - 1];
        avg_gain = (avg_gain * (p - 1.0) + change.max(0.0)) / p;
        avg_loss = (avg_loss * (p - 1.0) + (-change).max(0.0)) / p;
        out[i] = rsi_value(avg_gain, avg_loss);
    }
    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 { 50.0 } else { 100.0 }
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

/// Population standard deviation over a rolling window
fn rolling_std(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }
    for i in (period - 1)..values.len() {
        let window = &values[i + 1 - period..=i];
        let mean = window.iter().sum::<f64>() / period as f64;
        let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / period as f64;
        out[i] = variance.sqrt();
    }
    out
}

/// Position of the close inside the `period` high/low band, 0..100
fn stochastic_k(candles: &[Candle], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; candles.len()];
    if period == 0 || candles.len() < period {
        return out;
    }
    for i in (period - 1)..candles.len() {
        let window = &candles[i + 1 - period..=i];
        let high = window.iter().map(|c| c.ohlcv.high.value()).fold(f64::NEG_INFINITY, f64::max);
        let low = window.iter().map(|c| c.ohlcv.low.value()).fold(f64::INFINITY, f64::min);
        let close = candles[i].ohlcv.close.value();
        out[i] = if high > low { (close - low) / (high - low) * 100.0 } else { 50.0 };
    }
    out
}

/// Wilder-smoothed average true range
pub fn atr(candles: &[Candle], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; candles.len()];
    if period == 0 || candles.len() < period {
        return out;
    }
    let true_range: Vec<f64> = candles
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let high = c.ohlcv.high.value();
            let low = c.ohlcv.low.value();
            match i.checked_sub(1).map(|p| candles[p].ohlcv.close.value()) {
                Some(prev_close) => {
                    (high - low).max((high - prev_close).abs()).max((low - prev_close).abs())
                }
                None => high - low,
            }
        })
        .collect();
    let p = period as f64;
    let mut prev = true_range[..period].iter().sum::<f64>() / p;
    out[period - 1] = prev;
    for i in period..candles.len() {
        prev = (prev * (p - 1.0) + true_range[i]) / p;
        out[i] = prev;
    }
    out
}

/// On-balance volume starting at zero
pub fn obv(candles: &[Candle]) -> Vec<f64> {
    let mut out = Vec::with_capacity(candles.len());
    let mut total = 0.0;
    for (i, candle) in candles.iter().enumerate() {
        if i > 0 {
            let prev = candles[i - 1].ohlcv.close.value();
            let close = candle.ohlcv.close.value();
            let volume = candle.ohlcv.volume.value();
            if close > prev {
                total += volume;
            } else if close < prev {
                total -= volume;
            }
        }
        out.push(total);
    }
    out
}
