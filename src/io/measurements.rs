//! Measured-variable tables for error propagation.
//!
//! One row per variable:
//!
//! ```text
//! name,value,type_a,type_b,unit
//! m,0.5,0.001,0.0005,kg
//! v,2.3,0.05,0.02,m/s
//! ```
//!
//! `type_a`, `type_b` and `unit` are optional (missing or empty cells mean
//! zero / no unit). `a_uncertainty` and `b_uncertainty` are accepted as
//! column aliases. Unlike observation ingest, a bad row always aborts.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::domain::MeasuredVariable;
use crate::error::AppError;
use crate::io::ingest::normalize_header_name;

#[derive(Debug, Clone, Copy)]
struct MeasurementColumns {
    name: usize,
    value: usize,
    type_a: Option<usize>,
    type_b: Option<usize>,
    unit: Option<usize>,
}

/// Load a measurement table from a CSV file.
pub fn load_measurements(path: &Path) -> Result<Vec<MeasuredVariable>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open measurements '{}': {e}", path.display())))?;
    read_measurements(file)
}

/// Read a measurement table from any CSV source.
pub fn read_measurements<R: Read>(source: R) -> Result<Vec<MeasuredVariable>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read measurement headers: {e}")))?
        .clone();
    let columns = resolve_columns(&headers)?;

    let mut variables = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let record = result.map_err(|e| AppError::new(2, format!("Invalid measurement at line {line}: {e}")))?;
        let variable = parse_row(&record, &columns)
            .map_err(|message| AppError::new(2, format!("Invalid measurement at line {line}: {message}")))?;
        variables.push(variable);
    }

    if variables.is_empty() {
        return Err(AppError::new(2, "Measurement table has no rows."));
    }
    Ok(variables)
}

fn resolve_columns(headers: &StringRecord) -> Result<MeasurementColumns, AppError> {
    let map: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect();
    let find = |names: &[&str]| names.iter().find_map(|n| map.get(*n).copied());
    let required =
        |name: &str| find(&[name]).ok_or_else(|| AppError::new(2, format!("Missing required column: `{name}`")));

    Ok(MeasurementColumns {
        name: required("name")?,
        value: required("value")?,
        type_a: find(&["type_a", "a_uncertainty"]),
        type_b: find(&["type_b", "b_uncertainty"]),
        unit: find(&["unit"]),
    })
}

fn parse_row(record: &StringRecord, columns: &MeasurementColumns) -> Result<MeasuredVariable, String> {
    let cell = |idx: Option<usize>| idx.and_then(|i| record.get(i)).map(str::trim).filter(|s| !s.is_empty());
    let number = |idx: Option<usize>, label: &str| -> Result<Option<f64>, String> {
        cell(idx)
            .map(|raw| {
                raw.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| format!("invalid `{label}`: '{raw}'"))
            })
            .transpose()
    };

    let name = cell(Some(columns.name)).ok_or("missing `name`")?.to_string();
    let value = number(Some(columns.value), "value")?.ok_or("missing `value`")?;

    Ok(MeasuredVariable {
        name,
        value,
        type_a: number(columns.type_a, "type_a")?.unwrap_or(0.0),
        type_b: number(columns.type_b, "type_b")?.unwrap_or(0.0),
        unit: cell(columns.unit).map(str::to_string),
    })
}
