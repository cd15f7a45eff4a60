//! Upload ingestion pipelines.
//!
//! Both variants share the same spine: check columns, sanitize rows, merge
//! into the per-ticker store, then rebuild that ticker's indicators from its
//! full merged history. Row-level problems (bad date, bad number) are counted
//! and skipped; a structurally broken candlestick sheet fails alone without
//! taking the rest of the upload down.

use crate::constants::{CANDLE_NUMERIC_COLUMNS, CANDLE_REQUIRED_COLUMNS, LINEAR_REQUIRED_COLUMNS};
use crate::error::{Error, Result};
use crate::models::{Candle, CellValue, PricePoint, SeriesKind, SeriesRecord, Table, Workbook};
use crate::services::classify::GroupClassifier;
use crate::services::dates::normalize_date;
use crate::services::indicators::IndicatorEngine;
use crate::services::series_store::SharedSeriesStore;
use crate::services::validate::{coerce_numeric, is_positive_finite, validate_row};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

/// Per-ticker ingestion outcome, reported back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct TickerIngestStats {
    pub ticker: String,
    pub group: String,
    pub new_records: usize,
    pub existing_records: usize,
    pub invalid_records: usize,
    pub total_in_file: usize,
    pub total_in_store: usize,
}

/// A candlestick sheet that failed structurally (missing columns or a
/// non-numeric column) and was skipped whole.
#[derive(Debug, Clone, Serialize)]
pub struct SheetFailure {
    pub ticker: String,
    pub error: String,
}

/// File-level aggregates across an upload.
#[derive(Debug, Default, Serialize)]
pub struct IngestStats {
    pub total_rows: usize,
    pub tickers_processed: usize,
    pub new_records_added: usize,
    pub existing_records_skipped: usize,
    pub invalid_records_skipped: usize,
    pub tickers: Vec<TickerIngestStats>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_sheets: Vec<SheetFailure>,
}

impl IngestStats {
    fn absorb(&mut self, ticker_stats: TickerIngestStats) {
        self.new_records_added += ticker_stats.new_records;
        self.existing_records_skipped += ticker_stats.existing_records;
        self.invalid_records_skipped += ticker_stats.invalid_records;
        self.tickers_processed += 1;
        self.tickers.push(ticker_stats);
    }
}

pub struct IngestPipeline {
    store: SharedSeriesStore,
    engine: Arc<IndicatorEngine>,
    classifier: GroupClassifier,
}

impl IngestPipeline {
    pub fn new(store: SharedSeriesStore, engine: Arc<IndicatorEngine>) -> Self {
        Self {
            store,
            engine,
            classifier: GroupClassifier::default(),
        }
    }

    pub fn with_classifier(mut self, classifier: GroupClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Ingest a linear upload: one table with `date, ticker, volume, price`
    /// columns, grouped by ticker. Missing columns fail the whole upload.
    pub fn ingest_linear(&self, table: &Table) -> Result<IngestStats> {
        let missing = table.missing_columns(&LINEAR_REQUIRED_COLUMNS);
        if !missing.is_empty() {
            return Err(Error::MissingColumns {
                ticker: "upload".to_string(),
                columns: missing,
            });
        }

        let mut stats = IngestStats {
            total_rows: table.rows.len(),
            ..Default::default()
        };

        // Group rows by ticker value; BTreeMap keeps ticker order stable.
        let mut by_ticker: BTreeMap<String, Vec<&Vec<CellValue>>> = BTreeMap::new();
        for row in &table.rows {
            let ticker = table
                .cell(row, "ticker")
                .map(|cell| cell.to_text().trim().to_string())
                .unwrap_or_default();
            if ticker.is_empty() {
                stats.invalid_records_skipped += 1;
                continue;
            }
            by_ticker.entry(ticker).or_default().push(row);
        }

        for (ticker, rows) in by_ticker {
            let group = self.classifier.classify(&ticker).to_string();
            let total_in_file = rows.len();

            let mut points: Vec<SeriesRecord> = Vec::with_capacity(rows.len());
            let mut invalid = 0usize;
            for row in rows {
                let date = match table
                    .require_cell(row, "date")
                    .and_then(normalize_date)
                {
                    Ok(date) => date,
                    Err(_) => {
                        invalid += 1;
                        continue;
                    }
                };

                let volume_cell = table.require_cell(row, "volume");
                let price_cell = table.require_cell(row, "price");
                let (volume_cell, price_cell) = match (volume_cell, price_cell) {
                    (Ok(v), Ok(p)) => (v, p),
                    _ => {
                        invalid += 1;
                        continue;
                    }
                };

                match validate_row(&[("volume", volume_cell), ("price", price_cell)]) {
                    Ok(values) => {
                        points.push(PricePoint::new(date, values[0], values[1]).into());
                    }
                    Err(_) => invalid += 1,
                }
            }

            let outcome = self
                .store
                .merge_and_save(points, &ticker, &group, SeriesKind::Line)?;
            self.recompute_after_merge(&ticker)?;

            stats.absorb(TickerIngestStats {
                ticker,
                group,
                new_records: outcome.new_records_added,
                existing_records: outcome.existing_records,
                invalid_records: invalid,
                total_in_file,
                total_in_store: outcome.total_records_now,
            });
        }

        info!(
            rows = stats.total_rows,
            tickers = stats.tickers_processed,
            added = stats.new_records_added,
            existing = stats.existing_records_skipped,
            invalid = stats.invalid_records_skipped,
            "linear upload processed"
        );
        Ok(stats)
    }

    /// Ingest a candlestick workbook: one sheet per ticker. Structural sheet
    /// failures (missing columns, non-numeric column) skip that sheet only;
    /// store failures abort the upload.
    pub fn ingest_candlestick(&self, workbook: &Workbook) -> Result<IngestStats> {
        let mut stats = IngestStats::default();

        for (sheet_name, table) in &workbook.sheets {
            match self.ingest_sheet(sheet_name, table) {
                Ok(ticker_stats) => {
                    stats.total_rows += ticker_stats.total_in_file;
                    stats.absorb(ticker_stats);
                }
                Err(e @ (Error::MissingColumns { .. } | Error::NumericCoercion { .. })) => {
                    warn!(sheet = %sheet_name, error = %e, "candlestick sheet rejected");
                    stats.failed_sheets.push(SheetFailure {
                        ticker: sheet_name.clone(),
                        error: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            sheets = workbook.sheets.len(),
            processed = stats.tickers_processed,
            rejected = stats.failed_sheets.len(),
            added = stats.new_records_added,
            "candlestick upload processed"
        );
        Ok(stats)
    }

    fn ingest_sheet(&self, sheet_name: &str, table: &Table) -> Result<TickerIngestStats> {
        let missing = table.missing_columns(&CANDLE_REQUIRED_COLUMNS);
        if !missing.is_empty() {
            return Err(Error::MissingColumns {
                ticker: sheet_name.to_string(),
                columns: missing,
            });
        }

        // A single non-numeric cell fails the whole sheet: silently dropping
        // a broken column would corrupt the series.
        for column in CANDLE_NUMERIC_COLUMNS {
            for row in &table.rows {
                let cell = table.cell(row, column).ok_or_else(|| Error::NumericCoercion {
                    ticker: sheet_name.to_string(),
                    column: column.to_string(),
                })?;
                coerce_numeric(cell).map_err(|_| Error::NumericCoercion {
                    ticker: sheet_name.to_string(),
                    column: column.to_string(),
                })?;
            }
        }

        let mut invalid = 0usize;
        let mut rows: Vec<(String, Vec<f64>)> = Vec::with_capacity(table.rows.len());
        for row in &table.rows {
            let date = match table.require_cell(row, "date").and_then(normalize_date) {
                Ok(date) => date,
                Err(_) => {
                    invalid += 1;
                    continue;
                }
            };

            let mut values = Vec::with_capacity(CANDLE_NUMERIC_COLUMNS.len());
            for column in CANDLE_NUMERIC_COLUMNS {
                // Coercibility was established above.
                values.push(coerce_numeric(table.require_cell(row, column)?)?);
            }
            rows.push((date, values));
        }

        // Stable sort, then keep only the last occurrence of each date.
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        let deduped = keep_last_per_date(rows);
        let total_in_file = deduped.len();

        let mut candles: Vec<SeriesRecord> = Vec::with_capacity(deduped.len());
        for (date, values) in deduped {
            if !values.iter().all(|v| is_positive_finite(*v)) {
                invalid += 1;
                continue;
            }
            candles.push(
                Candle::new(date, values[0], values[1], values[2], values[3], values[4]).into(),
            );
        }

        let outcome =
            self.store
                .merge_and_save(candles, sheet_name, sheet_name, SeriesKind::Candlestick)?;
        self.recompute_after_merge(sheet_name)?;

        Ok(TickerIngestStats {
            ticker: sheet_name.to_string(),
            group: sheet_name.to_string(),
            new_records: outcome.new_records_added,
            existing_records: outcome.existing_records,
            invalid_records: invalid,
            total_in_file,
            total_in_store: outcome.total_records_now,
        })
    }

    /// Rebuild indicators from the full merged history. A ticker with no
    /// history yet (everything in the batch was invalid) has nothing to
    /// recompute.
    fn recompute_after_merge(&self, ticker: &str) -> Result<()> {
        match self.engine.recompute(ticker) {
            Ok(_) => Ok(()),
            Err(Error::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Last occurrence wins for rows sharing a date; input must be sorted, and
/// relative order is preserved.
fn keep_last_per_date(rows: Vec<(String, Vec<f64>)>) -> Vec<(String, Vec<f64>)> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut kept: Vec<(String, Vec<f64>)> = Vec::with_capacity(rows.len());
    for row in rows.into_iter().rev() {
        if seen.insert(row.0.clone()) {
            kept.push(row);
        }
    }
    kept.reverse();
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::config_store::IndicatorConfigStore;
    use crate::services::series_store::SeriesStore;
    use tempfile::tempdir;

    fn pipeline(dir: &std::path::Path) -> (IngestPipeline, SharedSeriesStore, Arc<IndicatorEngine>) {
        let store = Arc::new(SeriesStore::new(dir.join("data")));
        let config = Arc::new(IndicatorConfigStore::new(dir.join("indicators.json")));
        let engine = Arc::new(IndicatorEngine::new(store.clone(), config));
        (
            IngestPipeline::new(store.clone(), engine.clone()),
            store,
            engine,
        )
    }

    fn linear_table(rows: &[(&str, &str, &str, &str)]) -> Table {
        let mut table = Table::new(
            ["date", "ticker", "volume", "price"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
        );
        for (date, ticker, volume, price) in rows {
            table.rows.push(vec![
                CellValue::Text(date.to_string()),
                CellValue::Text(ticker.to_string()),
                CellValue::Text(volume.to_string()),
                CellValue::Text(price.to_string()),
            ]);
        }
        table
    }

    fn candle_table(rows: &[(&str, f64, f64, f64, f64, f64)]) -> Table {
        let mut table = Table::new(
            ["date", "open", "high", "low", "close", "volume"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
        );
        for (date, open, high, low, close, volume) in rows {
            table.rows.push(vec![
                CellValue::Text(date.to_string()),
                CellValue::Number(*open),
                CellValue::Number(*high),
                CellValue::Number(*low),
                CellValue::Number(*close),
                CellValue::Number(*volume),
            ]);
        }
        table
    }

    #[test]
    fn test_linear_end_to_end_with_reupload() {
        let dir = tempdir().unwrap();
        let (pipeline, store, _) = pipeline(dir.path());
        let table = linear_table(&[
            ("2024-01-01", "AI95", "100", "50.0"),
            ("2024-01-02", "AI95", "110", "51.0"),
        ]);

        let stats = pipeline.ingest_linear(&table).unwrap();
        assert_eq!(stats.new_records_added, 2);
        assert_eq!(stats.tickers_processed, 1);
        assert_eq!(stats.tickers[0].group, "95");

        // Indicators were rebuilt from the merged history.
        let set = store.load_indicators("AI95").unwrap();
        assert_eq!(set.dates.len(), 2);
        assert!(set.is_aligned());

        // Re-upload: nothing new, everything counted as existing.
        let stats = pipeline.ingest_linear(&table).unwrap();
        assert_eq!(stats.new_records_added, 0);
        assert_eq!(stats.existing_records_skipped, 2);
    }

    #[test]
    fn test_linear_missing_columns_fails_upload() {
        let dir = tempdir().unwrap();
        let (pipeline, _, _) = pipeline(dir.path());
        let table = Table::new(vec!["date".to_string(), "ticker".to_string()]);

        let err = pipeline.ingest_linear(&table).unwrap_err();
        match err {
            Error::MissingColumns { columns, .. } => {
                assert_eq!(columns, vec!["volume".to_string(), "price".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_linear_invalid_rows_are_counted_not_fatal() {
        let dir = tempdir().unwrap();
        let (pipeline, store, _) = pipeline(dir.path());
        let table = linear_table(&[
            ("2024-01-01", "AI95", "100", "50.0"),
            ("2024-01-02", "AI95", "0", "51.0"),       // non-positive volume
            ("2024-01-03", "AI95", "100", "NaN"),      // NaN price
            ("2024-01-04", "AI95", "abc", "51.0"),     // non-numeric volume
            ("bad-date", "AI95", "100", "51.0"),       // unparseable date
            ("2024-01-05", "AI95", "120", "52.0"),
        ]);

        let stats = pipeline.ingest_linear(&table).unwrap();
        assert_eq!(stats.new_records_added, 2);
        assert_eq!(stats.invalid_records_skipped, 4);

        let history = store.load_history("AI95").unwrap();
        assert_eq!(history.len(), 2);
        // Only positive finite values reach the store.
        for record in &history {
            let value = record.indicator_price();
            assert!(value.is_finite() && value > 0.0);
        }
    }

    #[test]
    fn test_linear_groups_several_tickers() {
        let dir = tempdir().unwrap();
        let (pipeline, store, _) = pipeline(dir.path());
        let table = linear_table(&[
            ("2024-01-01", "AI95", "100", "50.0"),
            ("2024-01-01", "AI92", "90", "45.0"),
            ("2024-01-01", "ДТ-Л", "80", "60.0"),
            ("2024-01-01", "GAS", "70", "30.0"),
        ]);

        let stats = pipeline.ingest_linear(&table).unwrap();
        assert_eq!(stats.tickers_processed, 4);

        let groups = store.group_summary().unwrap();
        assert!(groups.contains_key("95"));
        assert!(groups.contains_key("92"));
        assert!(groups.contains_key("ДТ"));
        assert_eq!(groups["Other"].tickers, vec!["GAS".to_string()]);
    }

    #[test]
    fn test_candlestick_last_wins_within_batch() {
        let dir = tempdir().unwrap();
        let (pipeline, store, _) = pipeline(dir.path());
        let mut workbook = Workbook::new();
        workbook.add_sheet(
            "BRENT",
            candle_table(&[
                ("2024-01-01", 1.0, 2.0, 0.5, 1.5, 10.0),
                ("2024-01-01", 2.0, 3.0, 1.0, 2.5, 20.0), // later row wins
            ]),
        );

        let stats = pipeline.ingest_candlestick(&workbook).unwrap();
        assert_eq!(stats.new_records_added, 1);

        let history = store.load_history("BRENT").unwrap();
        assert_eq!(history.len(), 1);
        match &history[0] {
            SeriesRecord::Candle(candle) => assert_eq!(candle.close, 2.5),
            other => panic!("unexpected record: {other:?}"),
        }
    }

    #[test]
    fn test_candlestick_bad_sheet_does_not_sink_upload() {
        let dir = tempdir().unwrap();
        let (pipeline, store, _) = pipeline(dir.path());

        let mut broken = Table::new(vec!["date".to_string(), "open".to_string()]);
        broken.rows.push(vec![
            CellValue::Text("2024-01-01".to_string()),
            CellValue::Number(1.0),
        ]);

        let mut workbook = Workbook::new();
        workbook.add_sheet("BROKEN", broken);
        workbook.add_sheet(
            "BRENT",
            candle_table(&[("2024-01-01", 1.0, 2.0, 0.5, 1.5, 10.0)]),
        );

        let stats = pipeline.ingest_candlestick(&workbook).unwrap();
        assert_eq!(stats.tickers_processed, 1);
        assert_eq!(stats.failed_sheets.len(), 1);
        assert_eq!(stats.failed_sheets[0].ticker, "BROKEN");
        assert!(stats.failed_sheets[0].error.contains("high"));

        assert!(store.load_history("BRENT").is_ok());
        assert!(store.load_history("BROKEN").is_err());
    }

    #[test]
    fn test_candlestick_non_numeric_column_fails_sheet() {
        let dir = tempdir().unwrap();
        let (pipeline, _, _) = pipeline(dir.path());

        let mut table = candle_table(&[("2024-01-01", 1.0, 2.0, 0.5, 1.5, 10.0)]);
        table.rows.push(vec![
            CellValue::Text("2024-01-02".to_string()),
            CellValue::Text("oops".to_string()),
            CellValue::Number(2.0),
            CellValue::Number(1.0),
            CellValue::Number(1.5),
            CellValue::Number(10.0),
        ]);

        let mut workbook = Workbook::new();
        workbook.add_sheet("BRENT", table);

        let stats = pipeline.ingest_candlestick(&workbook).unwrap();
        assert_eq!(stats.tickers_processed, 0);
        assert_eq!(stats.failed_sheets.len(), 1);
        assert!(stats.failed_sheets[0].error.contains("open"));
    }

    #[test]
    fn test_candlestick_sorts_unsorted_sheets() {
        let dir = tempdir().unwrap();
        let (pipeline, store, _) = pipeline(dir.path());
        let mut workbook = Workbook::new();
        workbook.add_sheet(
            "BRENT",
            candle_table(&[
                ("2024-01-03", 3.0, 4.0, 2.0, 3.5, 30.0),
                ("2024-01-01", 1.0, 2.0, 0.5, 1.5, 10.0),
                ("2024-01-02", 2.0, 3.0, 1.0, 2.5, 20.0),
            ]),
        );

        pipeline.ingest_candlestick(&workbook).unwrap();

        let history = store.load_history("BRENT").unwrap();
        let dates: Vec<&str> = history.iter().map(|r| r.date()).collect();
        assert_eq!(dates, vec!["2024-01-01", "2024-01-02", "2024-01-03"]);
    }

    #[test]
    fn test_merge_keeps_dates_sorted_and_unique_across_uploads() {
        let dir = tempdir().unwrap();
        let (pipeline, store, _) = pipeline(dir.path());

        pipeline
            .ingest_linear(&linear_table(&[
                ("2024-01-02", "AI95", "110", "51.0"),
                ("2024-01-04", "AI95", "130", "53.0"),
            ]))
            .unwrap();
        pipeline
            .ingest_linear(&linear_table(&[
                ("2024-01-01", "AI95", "100", "50.0"),
                ("2024-01-03", "AI95", "120", "52.0"),
                ("2024-01-04", "AI95", "999", "99.0"), // duplicate date
            ]))
            .unwrap();

        let history = store.load_history("AI95").unwrap();
        let dates: Vec<&str> = history.iter().map(|r| r.date()).collect();
        assert_eq!(
            dates,
            vec!["2024-01-01", "2024-01-02", "2024-01-03", "2024-01-04"]
        );
    }

    #[test]
    fn test_config_update_sweep_adds_new_key_everywhere() {
        let dir = tempdir().unwrap();
        let store = Arc::new(SeriesStore::new(dir.path().join("data")));
        let config = Arc::new(IndicatorConfigStore::new(dir.path().join("indicators.json")));
        let engine = Arc::new(IndicatorEngine::new(store.clone(), config.clone()));
        let pipeline = IngestPipeline::new(store.clone(), engine.clone());

        pipeline
            .ingest_linear(&linear_table(&[
                ("2024-01-01", "AI95", "100", "50.0"),
                ("2024-01-01", "AI92", "90", "45.0"),
            ]))
            .unwrap();

        config
            .update(crate::models::IndicatorConfigUpdate {
                ema_periods: Some(vec![20, 50, 200]),
                ..Default::default()
            })
            .unwrap();
        let sweep = engine.recompute_all().unwrap();
        assert_eq!(sweep.recomputed, 2);
        assert_eq!(sweep.failed, 0);

        for ticker in ["AI95", "AI92"] {
            let set = store.load_indicators(ticker).unwrap();
            assert!(set.indicators.contains_key("ema_20"), "{ticker} missing ema_20");
            assert!(set.is_aligned());
        }
    }
}
