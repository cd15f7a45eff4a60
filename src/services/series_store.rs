//! Per-ticker history store.
//!
//! Each ticker's full history lives in `{data_dir}/{ticker}.json` as a date-
//! ascending array of records; computed indicators live in a separate
//! namespace under `{data_dir}/indicators/`; a single `meta.json` maps every
//! stored ticker to its group, chart type, last update and record count.
//!
//! A merge is a whole-file rewrite: load, concatenate, sort, write back
//! through an atomic rename. Read-modify-write per ticker is serialised by an
//! in-process lock map; concurrent processes still require external
//! serialisation.

use crate::constants::{INDICATORS_DIR, INDICATORS_SUFFIX, META_FILENAME};
use crate::error::{Error, Result};
use crate::models::{IndicatorSet, MetaIndex, SeriesKind, SeriesRecord, TickerMeta, TickerSeries};
use crate::utils::write_json_atomic;
use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of one merge: how the incoming batch split against the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeOutcome {
    /// Incoming records dropped because their date was already stored.
    pub existing_records: usize,

    /// Incoming records actually appended.
    pub new_records_added: usize,

    /// Records in the history file after the merge.
    pub total_records_now: usize,
}

/// One group in the group summary: chart type plus member tickers.
#[derive(Debug, Clone, Serialize)]
pub struct GroupInfo {
    #[serde(rename = "type")]
    pub kind: SeriesKind,
    pub tickers: Vec<String>,
}

/// Full chart payload for one ticker: series plus any computed indicators.
#[derive(Debug, Clone, Serialize)]
pub struct ChartData {
    pub ticker: String,
    pub group: String,
    #[serde(rename = "type")]
    pub kind: SeriesKind,
    pub data: TickerSeries,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indicators: Option<IndicatorSet>,
}

pub type SharedSeriesStore = Arc<SeriesStore>;

pub struct SeriesStore {
    data_dir: PathBuf,
    /// Per-ticker write serialisation; entries are created on first touch.
    ticker_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    /// The shared meta index has writers from every ticker.
    meta_lock: Mutex<()>,
}

impl SeriesStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ticker_locks: Mutex::new(HashMap::new()),
            meta_lock: Mutex::new(()),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn history_path(&self, ticker: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", ticker))
    }

    fn indicator_path(&self, ticker: &str) -> PathBuf {
        self.data_dir
            .join(INDICATORS_DIR)
            .join(format!("{}{}", ticker, INDICATORS_SUFFIX))
    }

    fn meta_path(&self) -> PathBuf {
        self.data_dir.join(META_FILENAME)
    }

    fn ticker_lock(&self, ticker: &str) -> Arc<Mutex<()>> {
        let mut locks = self.ticker_locks.lock();
        locks
            .entry(ticker.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Tickers become file names; reject anything that would escape the
    /// data directory.
    fn check_ticker_name(ticker: &str) -> Result<()> {
        if ticker.is_empty()
            || ticker.contains('/')
            || ticker.contains('\\')
            || ticker.contains("..")
        {
            return Err(Error::InvalidInput(format!("invalid ticker name: {:?}", ticker)));
        }
        Ok(())
    }

    /// History file contents, degrading to empty on absence or parse failure.
    /// A half-written or corrupt file must not block new uploads.
    fn read_history_lenient(&self, ticker: &str) -> TickerSeries {
        let path = self.history_path(ticker);
        if !path.exists() {
            return Vec::new();
        }
        match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(series) => series,
                Err(e) => {
                    warn!(ticker, error = %e, "unreadable history file, treating as empty");
                    Vec::new()
                }
            },
            Err(e) => {
                warn!(ticker, error = %e, "failed to read history file, treating as empty");
                Vec::new()
            }
        }
    }

    /// Set of dates already stored for a ticker. Empty on absence or on a
    /// parse failure (logged, not fatal).
    pub fn existing_dates(&self, ticker: &str) -> HashSet<String> {
        self.read_history_lenient(ticker)
            .iter()
            .map(|record| record.date().to_string())
            .collect()
    }

    /// Load a ticker's full history. Absence is `NotFound`; a present but
    /// malformed file is an IO error, so callers can tell the two apart.
    pub fn load_history(&self, ticker: &str) -> Result<TickerSeries> {
        Self::check_ticker_name(ticker)?;
        let path = self.history_path(ticker);
        if !path.exists() {
            return Err(Error::NotFound(format!("ticker {}", ticker)));
        }
        let content = fs::read_to_string(&path)?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Io(format!("malformed history for {}: {}", ticker, e)))
    }

    /// Merge an upload batch into a ticker's history.
    ///
    /// A record is new iff its date is absent from the store at merge time;
    /// duplicates are dropped silently and counted. Within the batch the
    /// first occurrence of a date wins (candlestick ingestion resolves its
    /// last-wins rule before calling in here). New records are placed ahead
    /// of the existing ones, the union is stably sorted ascending by date and
    /// written back whole, and the meta index entry is refreshed. A batch
    /// contributing nothing leaves both files untouched but still reports
    /// current totals.
    pub fn merge_and_save(
        &self,
        new_records: Vec<SeriesRecord>,
        ticker: &str,
        group: &str,
        kind: SeriesKind,
    ) -> Result<MergeOutcome> {
        Self::check_ticker_name(ticker)?;
        let lock = self.ticker_lock(ticker);
        let _guard = lock.lock();

        let existing = self.read_history_lenient(ticker);

        let mut fresh: Vec<SeriesRecord> = Vec::with_capacity(new_records.len());
        let mut duplicates = 0usize;
        {
            let existing_dates: HashSet<&str> =
                existing.iter().map(|record| record.date()).collect();
            let mut batch_dates: HashSet<String> = HashSet::new();
            for record in new_records {
                let date = record.date();
                if existing_dates.contains(date) || batch_dates.contains(date) {
                    duplicates += 1;
                    continue;
                }
                batch_dates.insert(date.to_string());
                fresh.push(record);
            }
        }

        if fresh.is_empty() {
            debug!(ticker, duplicates, "no fresh records, history unchanged");
            return Ok(MergeOutcome {
                existing_records: duplicates,
                new_records_added: 0,
                total_records_now: existing.len(),
            });
        }

        let added = fresh.len();
        let mut merged = fresh;
        merged.extend(existing);
        merged.sort_by(|a, b| a.date().cmp(b.date()));

        write_json_atomic(&self.history_path(ticker), &merged)?;
        self.update_meta_entry(ticker, group, kind, merged.len())?;

        info!(
            ticker,
            group,
            added,
            duplicates,
            total = merged.len(),
            "merged upload into history"
        );

        Ok(MergeOutcome {
            existing_records: duplicates,
            new_records_added: added,
            total_records_now: merged.len(),
        })
    }

    fn update_meta_entry(
        &self,
        ticker: &str,
        group: &str,
        kind: SeriesKind,
        total_records: usize,
    ) -> Result<()> {
        let _guard = self.meta_lock.lock();
        let mut meta = self.read_meta_lenient();
        meta.insert(
            ticker.to_string(),
            TickerMeta {
                ticker: ticker.to_string(),
                group: group.to_string(),
                kind,
                last_updated: Utc::now(),
                total_records,
            },
        );
        write_json_atomic(&self.meta_path(), &meta)
    }

    /// Meta index for the write path: a corrupt index is rebuilt from scratch
    /// rather than blocking uploads.
    fn read_meta_lenient(&self) -> MetaIndex {
        let path = self.meta_path();
        if !path.exists() {
            return MetaIndex::new();
        }
        match fs::read_to_string(&path).map_err(Error::from).and_then(|content| {
            serde_json::from_str::<MetaIndex>(&content).map_err(Error::from)
        }) {
            Ok(meta) => meta,
            Err(e) => {
                warn!(error = %e, "unreadable meta index, starting empty");
                MetaIndex::new()
            }
        }
    }

    /// Meta index for the read path: absence is an empty index, corruption
    /// propagates.
    pub fn load_meta(&self) -> Result<MetaIndex> {
        let path = self.meta_path();
        if !path.exists() {
            return Ok(MetaIndex::new());
        }
        let content = fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|e| Error::Io(format!("malformed meta index: {}", e)))
    }

    /// All stored tickers, in index order.
    pub fn list_tickers(&self) -> Result<Vec<String>> {
        Ok(self.load_meta()?.into_keys().collect())
    }

    /// Groups currently present in the store, each with its chart type and
    /// member tickers.
    pub fn group_summary(&self) -> Result<BTreeMap<String, GroupInfo>> {
        let meta = self.load_meta()?;
        let mut groups: BTreeMap<String, GroupInfo> = BTreeMap::new();
        for (ticker, entry) in meta {
            groups
                .entry(entry.group.clone())
                .or_insert_with(|| GroupInfo {
                    kind: entry.kind,
                    tickers: Vec::new(),
                })
                .tickers
                .push(ticker);
        }
        Ok(groups)
    }

    /// Full chart payload: history plus any previously computed indicators.
    pub fn load_full(&self, ticker: &str) -> Result<ChartData> {
        let data = self.load_history(ticker)?;
        let meta = self.load_meta()?;
        let (group, kind) = meta
            .get(ticker)
            .map(|entry| (entry.group.clone(), entry.kind))
            .unwrap_or_else(|| ("Unknown".to_string(), SeriesKind::Line));

        let indicators = match self.load_indicators(ticker) {
            Ok(set) => Some(set),
            Err(Error::NotFound(_)) => None,
            Err(e) => {
                warn!(ticker, error = %e, "failed to load indicators for chart payload");
                None
            }
        };

        Ok(ChartData {
            ticker: ticker.to_string(),
            group,
            kind,
            data,
            indicators,
        })
    }

    /// Persist a freshly computed indicator set for its ticker.
    pub fn save_indicators(&self, set: &IndicatorSet) -> Result<()> {
        Self::check_ticker_name(&set.ticker)?;
        write_json_atomic(&self.indicator_path(&set.ticker), set)
    }

    /// Load the persisted indicator set. Absence is `NotFound`.
    pub fn load_indicators(&self, ticker: &str) -> Result<IndicatorSet> {
        Self::check_ticker_name(ticker)?;
        let path = self.indicator_path(ticker);
        if !path.exists() {
            return Err(Error::NotFound(format!("indicators for {}", ticker)));
        }
        let content = fs::read_to_string(&path)?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Io(format!("malformed indicators for {}: {}", ticker, e)))
    }

    /// Delete one ticker's history, indicators and meta entry; or, with no
    /// ticker, every history and indicator file, resetting the index to
    /// empty. Deleting what does not exist is not an error.
    pub fn reset(&self, ticker: Option<&str>) -> Result<()> {
        match ticker {
            Some(ticker) => self.reset_ticker(ticker),
            None => self.reset_all(),
        }
    }

    fn reset_ticker(&self, ticker: &str) -> Result<()> {
        Self::check_ticker_name(ticker)?;
        let lock = self.ticker_lock(ticker);
        let _guard = lock.lock();

        remove_file_if_exists(&self.history_path(ticker))?;
        remove_file_if_exists(&self.indicator_path(ticker))?;

        let _meta_guard = self.meta_lock.lock();
        let mut meta = self.read_meta_lenient();
        if meta.remove(ticker).is_some() {
            write_json_atomic(&self.meta_path(), &meta)?;
        }

        info!(ticker, "reset ticker data");
        Ok(())
    }

    fn reset_all(&self) -> Result<()> {
        if self.data_dir.exists() {
            for entry in fs::read_dir(&self.data_dir)? {
                let path = entry?.path();
                let is_json = path.extension().is_some_and(|ext| ext == "json");
                let is_meta = path
                    .file_name()
                    .is_some_and(|name| name == META_FILENAME);
                if path.is_file() && is_json && !is_meta {
                    fs::remove_file(&path)?;
                }
            }

            let indicators_dir = self.data_dir.join(INDICATORS_DIR);
            if indicators_dir.exists() {
                for entry in fs::read_dir(&indicators_dir)? {
                    let path = entry?.path();
                    if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                        fs::remove_file(&path)?;
                    }
                }
            }
        }

        let _meta_guard = self.meta_lock.lock();
        write_json_atomic(&self.meta_path(), &MetaIndex::new())?;

        info!("reset all ticker data");
        Ok(())
    }
}

fn remove_file_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
