/// File name of the shared ticker metadata index inside the data directory.
pub const META_FILENAME: &str = "meta.json";

/// Subdirectory of the data directory holding per-ticker indicator files.
pub const INDICATORS_DIR: &str = "indicators";

/// Suffix appended to the ticker name for indicator files.
pub const INDICATORS_SUFFIX: &str = "_indicators.json";

/// Default location of the per-ticker history store.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Default location of the indicator configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/indicators.json";

/// Default EMA periods used when no configuration file exists yet.
pub const DEFAULT_EMA_PERIODS: [u32; 2] = [50, 200];

/// Default RSI period used when no configuration file exists yet.
pub const DEFAULT_RSI_PERIOD: u32 = 14;

/// Columns a linear upload must carry.
pub const LINEAR_REQUIRED_COLUMNS: [&str; 4] = ["date", "ticker", "volume", "price"];

/// Columns every candlestick sheet must carry.
pub const CANDLE_REQUIRED_COLUMNS: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];

/// The numeric subset of the candlestick columns, in coercion order.
pub const CANDLE_NUMERIC_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];
