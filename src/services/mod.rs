pub mod classify;
pub mod config_store;
pub mod dates;
pub mod indicators;
pub mod ingest;
pub mod series_store;
pub mod validate;

pub use classify::{GroupClassifier, GroupRule};
pub use config_store::{IndicatorConfigStore, SharedConfigStore};
pub use indicators::{IndicatorEngine, SweepStats};
pub use ingest::{IngestPipeline, IngestStats, SheetFailure, TickerIngestStats};
pub use series_store::{ChartData, GroupInfo, MergeOutcome, SeriesStore, SharedSeriesStore};
