mod indicator_config;
mod indicator_set;
mod record;
mod table;
mod ticker_meta;

pub use indicator_config::{IndicatorConfig, IndicatorConfigUpdate};
pub use indicator_set::IndicatorSet;
pub use record::{Candle, PricePoint, SeriesKind, SeriesRecord};
pub use table::{CellValue, Table, Workbook};
pub use ticker_meta::{MetaIndex, TickerMeta};

/// Full price history for a single ticker, ascending by date.
pub type TickerSeries = Vec<SeriesRecord>;
