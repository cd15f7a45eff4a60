//! Technical indicator computation.
//!
//! EMA seeds with the simple average of the first `period` prices and smooths
//! recursively afterwards; RSI uses Wilder's smoothing over gains and losses.
//! Both return a vector aligned index-for-index with the input, with `None`
//! wherever the series is still too short, so the persisted JSON carries
//! explicit nulls.

use crate::error::{Error, Result};
use crate::models::{IndicatorSet, TickerSeries};
use crate::services::config_store::SharedConfigStore;
use crate::services::series_store::SharedSeriesStore;
use tracing::{info, warn};

/// Exponential moving average over `period` observations.
///
/// The first `period - 1` slots are `None`; the value at `period - 1` is the
/// simple average of the first `period` inputs; after that
/// `ema = value * k + prev * (1 - k)` with `k = 2 / (period + 1)`.
pub fn ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return result;
    }

    let seed: f64 = values[..period].iter().sum::<f64>() / period as f64;
    result[period - 1] = Some(seed);

    let k = 2.0 / (period as f64 + 1.0);
    let mut prev = seed;
    for (i, value) in values.iter().enumerate().skip(period) {
        prev = value * k + prev * (1.0 - k);
        result[i] = Some(prev);
    }

    result
}

/// Relative strength index over `period`, Wilder's smoothing.
///
/// The first `period` slots are `None` (one delta is consumed per pair of
/// observations, and `period` deltas seed the averages). Degenerate windows
/// clamp: all gains -> 100, flat -> 50.
pub fn rsi(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; values.len()];
    if period == 0 || values.len() < period + 1 {
        return result;
    }

    let deltas: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();

    let (sum_gain, sum_loss) = deltas[..period]
        .iter()
        .fold((0.0_f64, 0.0_f64), |(gain, loss), &d| {
            if d > 0.0 {
                (gain + d, loss)
            } else {
                (gain, loss + d.abs())
            }
        });

    let period_f = period as f64;
    let mut avg_gain = sum_gain / period_f;
    let mut avg_loss = sum_loss / period_f;
    result[period] = Some(rsi_from_averages(avg_gain, avg_loss));

    for (i, &delta) in deltas.iter().enumerate().skip(period) {
        let gain = if delta > 0.0 { delta } else { 0.0 };
        let loss = if delta < 0.0 { delta.abs() } else { 0.0 };

        avg_gain = (avg_gain * (period_f - 1.0) + gain) / period_f;
        avg_loss = (avg_loss * (period_f - 1.0) + loss) / period_f;

        // Delta at index i pairs observation i with i + 1.
        result[i + 1] = Some(rsi_from_averages(avg_gain, avg_loss));
    }

    result
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    }
}

/// Statistics for one full recompute sweep across the store.
#[derive(Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct SweepStats {
    pub recomputed: usize,
    pub failed: usize,
}

/// Rebuilds and persists `IndicatorSet`s from full ticker histories plus the
/// current configuration. There is no incremental path: any change to either
/// input invalidates the whole set.
pub struct IndicatorEngine {
    store: SharedSeriesStore,
    config: SharedConfigStore,
}

impl IndicatorEngine {
    pub fn new(store: SharedSeriesStore, config: SharedConfigStore) -> Self {
        Self { store, config }
    }

    /// Full rebuild of one ticker's indicator set from its merged history.
    pub fn recompute(&self, ticker: &str) -> Result<IndicatorSet> {
        let history = self.store.load_history(ticker)?;
        let config = self.config.get()?;
        let set = compute_indicator_set(ticker, &history, &config.ema_periods, config.rsi_period);
        self.store.save_indicators(&set)?;
        info!(
            ticker,
            records = set.dates.len(),
            keys = set.indicators.len(),
            "recomputed indicators"
        );
        Ok(set)
    }

    /// Recompute every ticker currently in the store. Per-ticker failures are
    /// logged and counted; the sweep itself always runs to completion.
    pub fn recompute_all(&self) -> Result<SweepStats> {
        let tickers = self.store.list_tickers()?;
        let mut stats = SweepStats::default();

        for ticker in tickers {
            match self.recompute(&ticker) {
                Ok(_) => stats.recomputed += 1,
                Err(e) => {
                    warn!(ticker, error = %e, "indicator recompute failed");
                    stats.failed += 1;
                }
            }
        }

        info!(
            recomputed = stats.recomputed,
            failed = stats.failed,
            "indicator sweep complete"
        );
        Ok(stats)
    }

    /// Aligned (dates, values) pair for one persisted indicator key.
    pub fn indicator_series(
        &self,
        ticker: &str,
        indicator: &str,
        period: u32,
    ) -> Result<(Vec<String>, Vec<Option<f64>>)> {
        let set = self.store.load_indicators(ticker)?;
        let key = format!("{}_{}", indicator, period);
        let values = set
            .indicators
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("indicator {} for {}", key, ticker)))?;
        Ok((set.dates, values))
    }
}

/// Pure computation of the full indicator set for a series.
pub fn compute_indicator_set(
    ticker: &str,
    history: &TickerSeries,
    ema_periods: &[u32],
    rsi_period: u32,
) -> IndicatorSet {
    let dates: Vec<String> = history.iter().map(|r| r.date().to_string()).collect();
    let prices: Vec<f64> = history.iter().map(|r| r.indicator_price()).collect();

    let mut set = IndicatorSet::new(ticker, dates);
    for &period in ema_periods {
        set.indicators
            .insert(format!("ema_{}", period), ema(&prices, period as usize));
    }
    set.indicators
        .insert(format!("rsi_{}", rsi_period), rsi(&prices, rsi_period as usize));
    set
}
