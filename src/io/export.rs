//! Export fitted traces to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream
//! plotting scripts:
//! - curve fits: `x,y_fit` rows over the dense sample grid
//! - spectra: `frequency,amplitude` rows
//!
//! Observation sets (e.g. from `labfit simulate`) are written in the same
//! `x,y,x_err,y_err` layout that ingest reads back.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::{FitResult, ObservationSet, Trace};
use crate::error::AppError;

/// Write the fit's trace to a CSV file.
pub fn write_trace_csv(path: &Path, fit: &FitResult) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    let mut writer = csv::Writer::from_writer(file);

    let write_err = |e: csv::Error| AppError::new(2, format!("Failed to write export CSV: {e}"));

    match &fit.trace {
        Trace::Curve { samples, .. } => {
            writer.write_record(["x", "y_fit"]).map_err(write_err)?;
            for p in samples {
                writer
                    .write_record([format!("{:.10}", p.x), format!("{:.10}", p.y)])
                    .map_err(write_err)?;
            }
        }
        Trace::Spectrum { points } => {
            writer.write_record(["frequency", "amplitude"]).map_err(write_err)?;
            for p in points {
                writer
                    .write_record([format!("{:.10}", p.frequency), format!("{:.10}", p.amplitude)])
                    .map_err(write_err)?;
            }
        }
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

/// Write observations as CSV. Uncertainty columns appear only when some row quotes one.
pub fn write_observations_csv<W: Write>(out: W, observations: &ObservationSet) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);
    let write_err = |e: csv::Error| AppError::new(2, format!("Failed to write observations CSV: {e}"));

    let points = observations.points();
    let with_x_err = points.iter().any(|p| p.x_err.is_some());
    let with_y_err = points.iter().any(|p| p.y_err.is_some());

    let mut header = vec!["x", "y"];
    if with_x_err {
        header.push("x_err");
    }
    if with_y_err {
        header.push("y_err");
    }
    writer.write_record(&header).map_err(write_err)?;

    let cell = |v: Option<f64>| v.map(|e| e.to_string()).unwrap_or_default();
    for p in points {
        let mut row = vec![p.x.to_string(), p.y.to_string()];
        if with_x_err {
            row.push(cell(p.x_err));
        }
        if with_y_err {
            row.push(cell(p.y_err));
        }
        writer.write_record(&row).map_err(write_err)?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush observations CSV: {e}")))?;
    Ok(())
}
