//! Candle and score loading for the runner.
//!
//! Given a symbol, loads candles from `{candles_dir}/{symbol}.csv` (with `/`
//! replaced by `-`) or, when `data.synthetic` is set, generates a synthetic
//! series. The loaded series is sorted, cleaned and windowed according to
//! the `[backtest]` section before it reaches the simulator.
//!
//! Synthetic data is a developer-only mode. Results produced on synthetic
//! data are tagged.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};
use trendband_core::data::{
    align_scores, drop_forming, resample, synthetic_candles, tail, validate_series, ScorePoint,
    SeriesError,
};
use trendband_core::domain::Candle;
use trendband_core::ConfigError;

use crate::config::{BacktestConfig, BacktestSection};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no candle file for '{symbol}' at {path} (use --synthetic for synthetic data)")]
    MissingCandles { symbol: String, path: PathBuf },

    #[error("failed to read {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path}, row {row}: unrecognized timestamp '{value}'")]
    Timestamp {
        path: PathBuf,
        row: usize,
        value: String,
    },

    #[error("invalid candle series for '{symbol}': {source}")]
    Series {
        symbol: String,
        #[source]
        source: SeriesError,
    },

    #[error("{count} synthetic candles of {interval} do not fit before {end}")]
    SyntheticSpan {
        count: usize,
        interval: Duration,
        end: DateTime<Utc>,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A symbol's candles ready for simulation, with provenance.
#[derive(Debug, Clone)]
pub struct LoadedSeries {
    pub symbol: String,
    pub candles: Vec<Candle>,
    /// Aligned one-to-one with `candles`.
    pub scores: Vec<Option<f64>>,
    /// BLAKE3 over the candle data, for fingerprinting.
    pub dataset_hash: String,
    pub synthetic: bool,
    /// Rows dropped or adjusted while loading.
    pub warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CandleRecord {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

#[derive(Debug, Deserialize)]
struct ScoreRecord {
    timestamp: String,
    score: f64,
}

/// File name for a symbol's candles: `BTC/USD` → `BTC-USD.csv`.
pub fn candle_file_name(symbol: &str) -> String {
    format!("{}.csv", symbol.replace('/', "-"))
}

/// Parse a timestamp as unix seconds, RFC 3339, `YYYY-MM-DD HH:MM:SS` or
/// `YYYY-MM-DD`. Naive forms are taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn csv_reader(path: &Path) -> Result<csv::Reader<std::fs::File>, LoadError> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })
}

/// Read `timestamp,open,high,low,close,volume` rows.
///
/// Rows come back in file order; `prepare_candles` sorts and cleans them.
pub fn load_candles_csv(path: &Path) -> Result<Vec<Candle>, LoadError> {
    let mut reader = csv_reader(path)?;
    let mut candles = Vec::new();

    for (row, record) in reader.deserialize::<CandleRecord>().enumerate() {
        let record = record.map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let timestamp = parse_timestamp(&record.timestamp).ok_or_else(|| LoadError::Timestamp {
            path: path.to_path_buf(),
            row: row + 1,
            value: record.timestamp.clone(),
        })?;
        candles.push(Candle {
            timestamp,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            volume: record.volume,
        });
    }

    debug!(path = %path.display(), rows = candles.len(), "loaded candles");
    Ok(candles)
}

/// Read `timestamp,score` rows, sorted by timestamp.
pub fn load_scores_csv(path: &Path) -> Result<Vec<ScorePoint>, LoadError> {
    let mut reader = csv_reader(path)?;
    let mut points = Vec::new();

    for (row, record) in reader.deserialize::<ScoreRecord>().enumerate() {
        let record = record.map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let timestamp = parse_timestamp(&record.timestamp).ok_or_else(|| LoadError::Timestamp {
            path: path.to_path_buf(),
            row: row + 1,
            value: record.timestamp.clone(),
        })?;
        points.push(ScorePoint {
            timestamp,
            score: record.score,
        });
    }

    points.sort_by_key(|p| p.timestamp);
    debug!(path = %path.display(), rows = points.len(), "loaded scores");
    Ok(points)
}

/// Sort, de-duplicate and drop void rows.
///
/// Duplicate timestamps keep the last row seen. Returns the cleaned series
/// and a warning per adjustment.
pub fn clean_candles(mut candles: Vec<Candle>) -> (Vec<Candle>, Vec<String>) {
    let mut warnings = Vec::new();

    let before = candles.len();
    candles.retain(|c| !c.is_void());
    let void = before - candles.len();
    if void > 0 {
        warnings.push(format!("dropped {void} candle(s) with non-finite prices"));
    }

    // Stable sort keeps file order within equal timestamps
    candles.sort_by_key(|c| c.timestamp);
    let before = candles.len();
    let mut deduped: Vec<Candle> = Vec::with_capacity(candles.len());
    for candle in candles {
        match deduped.last_mut() {
            Some(last) if last.timestamp == candle.timestamp => *last = candle,
            _ => deduped.push(candle),
        }
    }
    let dupes = before - deduped.len();
    if dupes > 0 {
        warnings.push(format!("dropped {dupes} duplicate timestamp(s)"));
    }

    for w in &warnings {
        warn!("{w}");
    }
    (deduped, warnings)
}

/// Apply the `[backtest]` window to a clean, sorted series.
///
/// Order: validate, resample, exclude the forming candle, date range, then
/// the `months_back` / `max_candles` tail.
pub fn prepare_candles(
    symbol: &str,
    candles: &[Candle],
    section: &BacktestSection,
) -> Result<Vec<Candle>, LoadError> {
    validate_series(candles).map_err(|source| LoadError::Series {
        symbol: symbol.to_string(),
        source,
    })?;

    let mut series = if section.resample {
        resample(candles, Duration::minutes(i64::from(section.candle_minutes)))
    } else {
        candles.to_vec()
    };

    if section.exclude_forming_candle {
        let closed = drop_forming(&series).len();
        series.truncate(closed);
    }

    let range = section.date_range()?;
    let mut series = range.slice(&series).to_vec();

    if let Some(n) = section.window_len() {
        series = tail(&series, n).to_vec();
    }

    Ok(series)
}

/// BLAKE3 over timestamps and OHLCV values.
pub fn dataset_hash(candles: &[Candle]) -> String {
    let mut hasher = blake3::Hasher::new();
    for c in candles {
        hasher.update(&c.timestamp.timestamp().to_le_bytes());
        for v in [c.open, c.high, c.low, c.close, c.volume] {
            hasher.update(&v.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

/// Load and prepare one symbol as configured.
pub fn load_symbol(config: &BacktestConfig, symbol: &str) -> Result<LoadedSeries, LoadError> {
    let (raw, synthetic) = if config.data.synthetic {
        warn!(symbol, "generating synthetic candles; results will be tagged as synthetic");
        let interval = Duration::minutes(i64::from(config.backtest.candle_minutes));
        let count = config.data.synthetic_count;
        let start = synthetic_start(config, interval, count)?;
        (synthetic_candles(symbol, start, interval, count), true)
    } else {
        let path = config.data.candles_dir.join(candle_file_name(symbol));
        if !path.exists() {
            return Err(LoadError::MissingCandles {
                symbol: symbol.to_string(),
                path,
            });
        }
        (load_candles_csv(&path)?, false)
    };

    let (clean, mut warnings) = clean_candles(raw);
    let candles = prepare_candles(symbol, &clean, &config.backtest)?;

    let scores = match &config.data.scores_file {
        Some(path) => align_scores(&candles, &load_scores_csv(path)?),
        None => vec![None; candles.len()],
    };

    let warmup = config.indicators.warmup();
    if candles.len() < warmup {
        warnings.push(format!(
            "only {} candles after windowing (warm-up needs {warmup})",
            candles.len()
        ));
    }

    Ok(LoadedSeries {
        symbol: symbol.to_string(),
        dataset_hash: dataset_hash(&candles),
        candles,
        scores,
        synthetic,
        warnings,
    })
}

/// Synthetic series end at the configured `end`, or start at `start`, or
/// begin at a fixed epoch.
fn synthetic_start(
    config: &BacktestConfig,
    interval: Duration,
    count: usize,
) -> Result<DateTime<Utc>, LoadError> {
    if let Some(start) = config.backtest.start {
        return Ok(start);
    }
    match config.backtest.end {
        Some(end) => i32::try_from(count)
            .ok()
            .and_then(|n| interval.checked_mul(n))
            .and_then(|span| end.checked_sub_signed(span))
            .ok_or(LoadError::SyntheticSpan {
                count,
                interval,
                end,
            }),
        None => Ok(Utc
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn parses_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 4, 0, 0).unwrap();
        assert_eq!(parse_timestamp("1709265600"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T04:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T05:00:00+01:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01 04:00:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-03-01"),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn symbol_file_name() {
        assert_eq!(candle_file_name("BTC/USD"), "BTC-USD.csv");
        assert_eq!(candle_file_name("SPY"), "SPY.csv");
    }

    #[test]
    fn loads_candle_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "BTC-USD.csv",
            "timestamp,open,high,low,close,volume\n\
             2024-01-01 00:00:00,100,105,99,104,10\n\
             2024-01-01 04:00:00, 104, 106, 103, 105, 12\n",
        );
        let candles = load_candles_csv(&path).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[1].open, 104.0);
        assert_eq!(candles[1].volume, 12.0);
    }

    #[test]
    fn bad_timestamp_reports_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "x.csv",
            "timestamp,open,high,low,close,volume\n\
             2024-01-01,1,1,1,1,1\n\
             not-a-date,1,1,1,1,1\n",
        );
        match load_candles_csv(&path) {
            Err(LoadError::Timestamp { row, value, .. }) => {
                assert_eq!(row, 2);
                assert_eq!(value, "not-a-date");
            }
            other => panic!("expected timestamp error, got {other:?}"),
        }
    }

    #[test]
    fn clean_sorts_dedupes_and_drops_void() {
        let t = |h: u32| Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap();
        let candle = |ts, close: f64| Candle {
            timestamp: ts,
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1.0,
        };
        let raw = vec![
            candle(t(8), 3.0),
            candle(t(0), 1.0),
            candle(t(4), f64::NAN),
            candle(t(8), 4.0),
        ];
        let (clean, warnings) = clean_candles(raw);
        assert_eq!(clean.len(), 2);
        assert_eq!(clean[0].timestamp, t(0));
        assert_eq!(clean[1].close, 4.0);
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn missing_file_without_synthetic_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BacktestConfig::default();
        config.data.candles_dir = dir.path().to_path_buf();
        assert!(matches!(
            load_symbol(&config, "BTC/USD"),
            Err(LoadError::MissingCandles { .. })
        ));
    }

    #[test]
    fn synthetic_load_is_tagged_and_deterministic() {
        let mut config = BacktestConfig::default();
        config.data.synthetic = true;
        config.data.synthetic_count = 200;

        let a = load_symbol(&config, "ETH/USD").unwrap();
        let b = load_symbol(&config, "ETH/USD").unwrap();
        assert!(a.synthetic);
        assert_eq!(a.candles.len(), 200);
        assert_eq!(a.scores, vec![None; 200]);
        assert_eq!(a.dataset_hash, b.dataset_hash);
    }

    #[test]
    fn synthetic_series_ends_at_configured_end() {
        let end = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let mut config = BacktestConfig::default();
        config.backtest.end = Some(end);
        let interval = Duration::hours(4);

        let start = synthetic_start(&config, interval, 6).unwrap();
        assert_eq!(start, end - Duration::hours(24));
    }

    #[test]
    fn oversized_synthetic_span_is_an_error() {
        let mut config = BacktestConfig::default();
        config.backtest.end = Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        let interval = Duration::minutes(240);

        // Overflows the i32 multiplier
        let too_many = i32::MAX as usize + 1;
        assert!(matches!(
            synthetic_start(&config, interval, too_many),
            Err(LoadError::SyntheticSpan { count, .. }) if count == too_many
        ));
        // Fits i32, overflows the TimeDelta range
        assert!(matches!(
            synthetic_start(&config, Duration::days(365 * 1_000_000), 1_000_000),
            Err(LoadError::SyntheticSpan { .. })
        ));
    }

    #[test]
    fn prepare_applies_window_and_forming_exclusion() {
        let config = BacktestConfig {
            data: crate::config::DataSection {
                synthetic: true,
                synthetic_count: 100,
                ..Default::default()
            },
            ..Default::default()
        };
        let full = load_symbol(&config, "SOL/USD").unwrap().candles;

        let section = BacktestSection {
            max_candles: Some(30),
            exclude_forming_candle: true,
            ..Default::default()
        };
        let prepared = prepare_candles("SOL/USD", &full, &section).unwrap();
        assert_eq!(prepared.len(), 30);
        assert_eq!(prepared.last().unwrap().timestamp, full[98].timestamp);
    }

    #[test]
    fn scores_are_aligned_to_candles() {
        let dir = tempfile::tempdir().unwrap();
        let scores = write_file(
            dir.path(),
            "scores.csv",
            "timestamp,score\n2024-01-01 08:00:00,12\n2024-01-01 00:00:00,55\n",
        );
        let mut config = BacktestConfig::default();
        config.data.synthetic = true;
        config.data.synthetic_count = 4;
        config.data.scores_file = Some(scores);

        let loaded = load_symbol(&config, "BTC/USD").unwrap();
        // Candles at 00:00, 04:00, 08:00, 12:00
        assert_eq!(loaded.scores, vec![Some(55.0), Some(55.0), Some(12.0), Some(12.0)]);
        assert_eq!(loaded.warnings.len(), 1);
    }
}
