//! CSV ingest and normalization.
//!
//! This module turns a lab CSV export into a validated `ObservationSet`.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation** (every bad row is reported with its line number)
//! - **Caller decides**: by default a bad row aborts the run; with
//!   `skip_invalid_rows` the row is dropped and reported instead
//! - **Separation of concerns**: no fitting logic here

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;
use log::{debug, warn};

use crate::domain::{ColumnMap, DatasetStats, Observation, ObservationSet};
use crate::error::AppError;

/// Knobs that change how rows become observations.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IngestOptions {
    /// Drop rows that fail to parse instead of aborting.
    pub skip_invalid_rows: bool,
    /// Constant `x` uncertainty for rows that do not quote one.
    pub x_err_const: Option<f64>,
    /// Constant `y` uncertainty for rows that do not quote one.
    pub y_err_const: Option<f64>,
    /// Synthesize `x_i = i / rate` from the record index `i` instead of reading
    /// an `x` column.
    pub sampling_rate: Option<f64>,
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: validated observations + stats + dropped rows.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub observations: ObservationSet,
    pub stats: DatasetStats,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Resolved column indices for the run.
#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    x: Option<usize>,
    y: usize,
    x_err: Option<usize>,
    y_err: Option<usize>,
}

/// Load a CSV with default ingest options (strict rows, no constant errors).
pub fn load_observations(path: &Path, columns: &ColumnMap) -> Result<IngestedData, AppError> {
    load_observations_with(path, columns, &IngestOptions::default())
}

/// Load a CSV and normalize it to an `ObservationSet`.
pub fn load_observations_with(
    path: &Path,
    columns: &ColumnMap,
    opts: &IngestOptions,
) -> Result<IngestedData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();

    let header_map = build_header_map(&headers);
    let index = resolve_columns(columns, &header_map, opts)?;
    debug!("resolved columns: {index:?}");

    let mut points = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header and CSV lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, &index, columns, opts) {
            Ok(mut point) => {
                // Time follows the record position, so a dropped row leaves a gap.
                if let Some(rate) = opts.sampling_rate {
                    point.x = idx as f64 / rate;
                }
                points.push(point)
            }
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if !row_errors.is_empty() {
        if opts.skip_invalid_rows {
            warn!("dropped {} invalid row(s)", row_errors.len());
        } else {
            let first = &row_errors[0];
            return Err(AppError::new(
                2,
                format!(
                    "Invalid row at line {}: {} ({} invalid row(s) total; use --skip-invalid-rows to drop them)",
                    first.line,
                    first.message,
                    row_errors.len()
                ),
            ));
        }
    }

    let rows_used = points.len();
    let observations = ObservationSet::new(points)?;
    let stats = observations.stats();

    Ok(IngestedData {
        observations,
        stats,
        row_errors,
        rows_read,
        rows_used,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

pub(crate) fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn resolve_columns(
    columns: &ColumnMap,
    header_map: &HashMap<String, usize>,
    opts: &IngestOptions,
) -> Result<ColumnIndex, AppError> {
    let lookup = |name: &str| header_map.get(&normalize_header_name(name)).copied();

    let x = match opts.sampling_rate {
        Some(rate) => {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(AppError::new(2, format!("Sampling rate must be finite and > 0 (got {rate}).")));
            }
            None
        }
        None => Some(
            lookup(&columns.x).ok_or_else(|| AppError::new(2, format!("Missing required column: `{}`", columns.x)))?,
        ),
    };
    let y = lookup(&columns.y).ok_or_else(|| AppError::new(2, format!("Missing required column: `{}`", columns.y)))?;

    let defaults = ColumnMap::default();
    let x_err = resolve_optional(columns.x_err.as_deref(), defaults.x_err.as_deref(), &lookup)?;
    let y_err = resolve_optional(columns.y_err.as_deref(), defaults.y_err.as_deref(), &lookup)?;

    Ok(ColumnIndex { x, y, x_err, y_err })
}

/// Uncertainty columns are optional, but an explicitly renamed one must exist.
fn resolve_optional(
    name: Option<&str>,
    default: Option<&str>,
    lookup: &impl Fn(&str) -> Option<usize>,
) -> Result<Option<usize>, AppError> {
    let Some(name) = name else { return Ok(None) };
    match lookup(name) {
        Some(idx) => Ok(Some(idx)),
        None if Some(name) == default => Ok(None),
        None => Err(AppError::new(2, format!("Missing uncertainty column: `{name}`"))),
    }
}

fn parse_row(
    record: &StringRecord,
    index: &ColumnIndex,
    columns: &ColumnMap,
    opts: &IngestOptions,
) -> Result<Observation, String> {
    let x = match index.x {
        Some(idx) => parse_f64(get_required(record, idx, &columns.x)?, &columns.x)?,
        None => 0.0,
    };
    let y = parse_f64(get_required(record, index.y, &columns.y)?, &columns.y)?;

    let x_err = parse_uncertainty(record, index.x_err, columns.x_err.as_deref())?.or(opts.x_err_const);
    let y_err = parse_uncertainty(record, index.y_err, columns.y_err.as_deref())?.or(opts.y_err_const);

    Ok(Observation { x, y, x_err, y_err })
}

fn parse_uncertainty(record: &StringRecord, idx: Option<usize>, name: Option<&str>) -> Result<Option<f64>, String> {
    let (Some(idx), Some(name)) = (idx, name) else {
        return Ok(None);
    };
    let Some(raw) = get_optional(record, idx) else {
        return Ok(None);
    };
    let v = parse_f64(raw, name)?;
    if v < 0.0 {
        return Err(format!("Negative uncertainty in `{name}`: {v}"));
    }
    Ok(Some(v))
}

fn get_required<'a>(record: &'a StringRecord, idx: usize, name: &str) -> Result<&'a str, String> {
    get_optional(record, idx).ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_f64(s: &str, name: &str) -> Result<f64, String> {
    let v = s
        .parse::<f64>()
        .map_err(|_| format!("Invalid number in `{name}`: '{s}'"))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(format!("Non-finite value in `{name}`: '{s}'"))
    }
}
