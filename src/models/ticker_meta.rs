use crate::models::SeriesKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metadata entry for one stored ticker, kept in the shared `meta.json` index.
///
/// Rewritten every time the ticker's series is written; removed only by an
/// explicit reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerMeta {
    pub ticker: String,

    /// Classification bucket; for candlestick series this equals the ticker.
    pub group: String,

    #[serde(rename = "type")]
    pub kind: SeriesKind,

    pub last_updated: DateTime<Utc>,

    pub total_records: usize,
}

/// The shared index mapping ticker -> metadata, persisted as a single object.
pub type MetaIndex = BTreeMap<String, TickerMeta>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_serializes_kind_as_type() {
        let meta = TickerMeta {
            ticker: "AI95".to_string(),
            group: "95".to_string(),
            kind: SeriesKind::Line,
            last_updated: Utc::now(),
            total_records: 3,
        };

        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("\"type\":\"line\""));

        let parsed: TickerMeta = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, meta);
    }
}
