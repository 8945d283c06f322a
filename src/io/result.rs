//! Read/write result JSON files.
//!
//! Result JSON is the "portable" representation of a fit and the hand-off to
//! the report generator:
//! - the observations that were fitted
//! - the full `FitResult` (parameters, uncertainties, trace)
//! - provenance (tool, version, timestamp, source file)
//!
//! The schema is defined by `domain::ResultFile`. Error-propagation runs are
//! saved the same way as `domain::PropagationFile`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use chrono::Utc;

use serde::Serialize;

use crate::domain::{FitResult, MeasuredVariable, ObservationSet, Propagation, PropagationFile, ResultFile};
use crate::error::AppError;

/// Tool name recorded in result files.
pub const TOOL_NAME: &str = "labfit";

/// Wrap a fit and its inputs in the JSON envelope.
pub fn build_result_file(result: &FitResult, observations: &ObservationSet, source: Option<&Path>) -> ResultFile {
    ResultFile {
        tool: TOOL_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        generated_at: Utc::now(),
        source: source.map(|p| p.display().to_string()),
        observations: observations.points().to_vec(),
        result: result.clone(),
    }
}

/// Wrap a propagation and its inputs in the JSON envelope.
pub fn build_propagation_file(
    formula: &str,
    measurements: &[MeasuredVariable],
    propagation: &Propagation,
) -> PropagationFile {
    PropagationFile {
        tool: TOOL_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        generated_at: Utc::now(),
        formula: formula.to_string(),
        measurements: measurements.to_vec(),
        propagation: propagation.clone(),
    }
}

/// Write a result JSON file.
pub fn write_result_json(path: &Path, file: &ResultFile) -> Result<(), AppError> {
    write_json(path, file)
}

/// Write a propagation JSON file.
pub fn write_propagation_json(path: &Path, file: &PropagationFile) -> Result<(), AppError> {
    write_json(path, file)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), AppError> {
    let out = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create JSON '{}': {e}", path.display())))?;
    write_json_to(BufWriter::new(out), value)
}

/// Serialize into any writer and flush it.
pub fn write_json_to<W: Write, T: Serialize>(mut out: W, value: &T) -> Result<(), AppError> {
    serde_json::to_writer_pretty(&mut out, value)
        .map_err(|e| AppError::new(2, format!("Failed to write JSON: {e}")))?;
    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush JSON: {e}")))
}

/// Read a result JSON file.
pub fn read_result_json(path: &Path) -> Result<ResultFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open result JSON '{}': {e}", path.display())))?;
    let result: ResultFile = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::new(2, format!("Invalid result JSON: {e}")))?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use crate::domain::{FitOptions, ModelKind};
    use crate::fit::FitEngine;

    #[test]
    fn result_json_round_trips() {
        let obs = ObservationSet::from_columns(&[1.0, 2.0, 3.0], &[2.0, 4.1, 5.9], None, Some(&[0.1, 0.1, 0.2]))
            .unwrap();
        let fit = FitEngine::new(FitOptions::default()).fit(ModelKind::Linear, &obs).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fit.json");
        write_result_json(&path, &build_result_file(&fit, &obs, None)).unwrap();

        let back = read_result_json(&path).unwrap();
        assert_eq!(back.tool, TOOL_NAME);
        assert_eq!(back.result.model_kind, ModelKind::Linear);
        assert_eq!(back.result.weighting, fit.weighting);
        assert_eq!(back.result.parameters.len(), 2);
        assert!((back.result.parameters[0].value - fit.parameters[0].value).abs() < 1e-12);
        assert_eq!(back.observations.len(), obs.len());
    }

    #[test]
    fn invalid_json_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(read_result_json(&path).unwrap_err().exit_code(), 2);
    }

    struct FlushFails(Vec<u8>);

    impl Write for FlushFails {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::other("disk full"))
        }
    }

    #[test]
    fn failed_flush_is_reported() {
        let obs = ObservationSet::from_columns(&[1.0, 2.0, 3.0], &[2.0, 4.1, 5.9], None, None).unwrap();
        let fit = FitEngine::new(FitOptions::default()).fit(ModelKind::Linear, &obs).unwrap();

        let err = write_json_to(FlushFails(Vec::new()), &build_result_file(&fit, &obs, None)).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("disk full"));
    }
}
