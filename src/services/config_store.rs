//! Indicator configuration store.
//!
//! One JSON object on disk holds the process-wide indicator settings. First
//! access creates and persists the defaults; updates shallow-merge over the
//! current values and restamp `last_updated`. Every write goes through the
//! atomic rename path.

use crate::error::{Error, Result};
use crate::models::{IndicatorConfig, IndicatorConfigUpdate};
use crate::utils::write_json_atomic;
use chrono::Utc;
use parking_lot::Mutex;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub type SharedConfigStore = Arc<IndicatorConfigStore>;

pub struct IndicatorConfigStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl IndicatorConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Current configuration, lazily creating and persisting the default on
    /// first access.
    pub fn get(&self) -> Result<IndicatorConfig> {
        let _guard = self.lock.lock();
        self.read_or_create_default()
    }

    /// Apply a partial update over the current configuration, persist and
    /// return the result. Periods must be positive and the EMA list
    /// non-empty.
    pub fn update(&self, update: IndicatorConfigUpdate) -> Result<IndicatorConfig> {
        if let Some(periods) = &update.ema_periods {
            if periods.is_empty() {
                return Err(Error::InvalidInput("ema_periods must not be empty".to_string()));
            }
            if periods.iter().any(|p| *p == 0) {
                return Err(Error::InvalidInput("ema periods must be positive".to_string()));
            }
        }
        if update.rsi_period == Some(0) {
            return Err(Error::InvalidInput("rsi_period must be positive".to_string()));
        }

        let _guard = self.lock.lock();
        let mut config = self.read_or_create_default()?;

        if let Some(periods) = update.ema_periods {
            config.ema_periods = periods;
        }
        if let Some(period) = update.rsi_period {
            config.rsi_period = period;
        }
        if let Some(updated_by) = update.updated_by {
            config.updated_by = updated_by;
        }
        config.last_updated = Utc::now();

        write_json_atomic(&self.path, &config)?;
        info!(
            ema_periods = ?config.ema_periods,
            rsi_period = config.rsi_period,
            "indicator configuration updated"
        );
        Ok(config)
    }

    fn read_or_create_default(&self) -> Result<IndicatorConfig> {
        if !self.path.exists() {
            let config = IndicatorConfig::default();
            write_json_atomic(&self.path, &config)?;
            info!(path = %self.path.display(), "created default indicator configuration");
            return Ok(config);
        }

        let content = fs::read_to_string(&self.path)?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("malformed indicator config: {}", e)))
    }
}
