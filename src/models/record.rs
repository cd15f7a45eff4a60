use serde::{Deserialize, Serialize};

/// Single observation of a linear price series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Calendar date in YYYY-MM-DD format
    pub date: String,

    /// Trading volume
    pub volume: f64,

    /// Price at the close of the day
    pub price: f64,
}

impl PricePoint {
    pub fn new(date: String, volume: f64, price: f64) -> Self {
        Self { date, volume, price }
    }
}

/// Single OHLCV candlestick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Calendar date in YYYY-MM-DD format
    pub date: String,

    /// Opening price
    pub open: f64,

    /// Highest price
    pub high: f64,

    /// Lowest price
    pub low: f64,

    /// Closing price
    pub close: f64,

    /// Trading volume
    pub volume: f64,
}

impl Candle {
    pub fn new(date: String, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// One record of a ticker's history file.
///
/// History files hold a homogeneous array of objects without a type tag, so
/// deserialization is shape-driven. `Candle` is tried first; a price point
/// lacks the OHLC fields and falls through to the second variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeriesRecord {
    Candle(Candle),
    Point(PricePoint),
}

impl SeriesRecord {
    /// Calendar date of this record
    pub fn date(&self) -> &str {
        match self {
            SeriesRecord::Candle(c) => &c.date,
            SeriesRecord::Point(p) => &p.date,
        }
    }

    /// The value indicators are computed over: `close` for candles,
    /// `price` for linear points.
    pub fn indicator_price(&self) -> f64 {
        match self {
            SeriesRecord::Candle(c) => c.close,
            SeriesRecord::Point(p) => p.price,
        }
    }
}

impl From<PricePoint> for SeriesRecord {
    fn from(point: PricePoint) -> Self {
        SeriesRecord::Point(point)
    }
}

impl From<Candle> for SeriesRecord {
    fn from(candle: Candle) -> Self {
        SeriesRecord::Candle(candle)
    }
}

/// Chart type a ticker's series is stored as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    Line,
    Candlestick,
}

impl SeriesKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesKind::Line => "line",
            SeriesKind::Candlestick => "candlestick",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_record_roundtrip_mixed() {
        let records = vec![
            SeriesRecord::from(PricePoint::new("2024-01-01".to_string(), 100.0, 50.0)),
            SeriesRecord::from(Candle::new(
                "2024-01-02".to_string(),
                10.0,
                12.0,
                9.0,
                11.0,
                500.0,
            )),
        ];

        let json = serde_json::to_string(&records).unwrap();
        let parsed: Vec<SeriesRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, records);
    }

    #[test]
    fn test_indicator_price_selects_close_or_price() {
        let point = SeriesRecord::from(PricePoint::new("2024-01-01".to_string(), 100.0, 50.0));
        let candle = SeriesRecord::from(Candle::new(
            "2024-01-02".to_string(),
            10.0,
            12.0,
            9.0,
            11.0,
            500.0,
        ));

        assert_eq!(point.indicator_price(), 50.0);
        assert_eq!(candle.indicator_price(), 11.0);
    }

    #[test]
    fn test_series_kind_labels() {
        assert_eq!(SeriesKind::Line.as_str(), "line");
        assert_eq!(SeriesKind::Candlestick.as_str(), "candlestick");
        assert_eq!(
            serde_json::to_string(&SeriesKind::Candlestick).unwrap(),
            "\"candlestick\""
        );
    }
}
