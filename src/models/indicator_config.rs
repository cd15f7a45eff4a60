use crate::constants::{DEFAULT_EMA_PERIODS, DEFAULT_RSI_PERIOD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Process-wide indicator configuration, persisted as a single JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorConfig {
    /// EMA periods to compute, e.g. `[50, 200]`.
    pub ema_periods: Vec<u32>,

    /// Single RSI lookback period.
    pub rsi_period: u32,

    pub last_updated: DateTime<Utc>,

    pub updated_by: String,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            ema_periods: DEFAULT_EMA_PERIODS.to_vec(),
            rsi_period: DEFAULT_RSI_PERIOD,
            last_updated: Utc::now(),
            updated_by: "system".to_string(),
        }
    }
}

/// Partial update applied over the current configuration.
///
/// Absent fields keep their current value; `last_updated` is always
/// restamped by the store.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndicatorConfigUpdate {
    pub ema_periods: Option<Vec<u32>>,
    pub rsi_period: Option<u32>,
    pub updated_by: Option<String>,
}
