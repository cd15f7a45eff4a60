use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Persisted indicator cache for one ticker.
///
/// Every vector in `indicators` is aligned index-for-index with `dates`;
/// undefined values are `None` and serialize as JSON `null`. The whole object
/// is derived from the ticker's history plus the current configuration and is
/// rebuilt from scratch on every change to either.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub ticker: String,

    /// Calendar dates of the underlying series, ascending.
    pub dates: Vec<String>,

    /// Mapping from `"<name>_<period>"` (e.g. `ema_50`, `rsi_14`) to values.
    pub indicators: BTreeMap<String, Vec<Option<f64>>>,
}

impl IndicatorSet {
    pub fn new(ticker: impl Into<String>, dates: Vec<String>) -> Self {
        Self {
            ticker: ticker.into(),
            dates,
            indicators: BTreeMap::new(),
        }
    }

    /// True when every indicator vector matches the length of `dates`.
    pub fn is_aligned(&self) -> bool {
        self.indicators
            .values()
            .all(|values| values.len() == self.dates.len())
    }
}
