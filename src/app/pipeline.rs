//! Shared "fit pipeline" logic used by the CLI front-end.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! CSV ingest -> fit (one model or all curve models) -> exports
//!
//! The CLI can then focus on presentation (printing and plotting).

use log::info;

use crate::domain::{FitResult, RunConfig};
use crate::error::AppError;
use crate::fit::{FitEngine, MultiFit};
use crate::io::ingest::{IngestOptions, IngestedData, load_observations_with};

/// Fits produced by a run.
#[derive(Debug, Clone)]
pub enum FitOutcome {
    Single(FitResult),
    Multi(MultiFit),
}

/// All computed outputs of a single `labfit fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub ingest: IngestedData,
    pub outcome: FitOutcome,
}

/// Execute the full fitting pipeline and return the computed outputs.
pub fn run_fit(config: &RunConfig) -> Result<RunOutput, AppError> {
    let ingest_opts = IngestOptions {
        skip_invalid_rows: config.skip_invalid_rows,
        x_err_const: config.x_err_const,
        y_err_const: config.y_err_const,
        sampling_rate: config.sampling_rate,
    };
    let ingest = load_observations_with(&config.csv_path, &config.columns, &ingest_opts)?;
    info!(
        "loaded {} observations from '{}'",
        ingest.rows_used,
        config.csv_path.display()
    );

    let engine = FitEngine::new(config.options);
    let outcome = match config.model_spec.to_kind() {
        Some(kind) => FitOutcome::Single(engine.fit(kind, &ingest.observations)?),
        None => {
            let multi = engine.fit_all(&ingest.observations)?;
            if multi.fits.is_empty() {
                // Every model rejected the data; surface the first reason.
                if let Some((_, err)) = multi.skipped.into_iter().next() {
                    return Err(err.into());
                }
                return Err(AppError::new(3, "No curve model could be fitted."));
            }
            FitOutcome::Multi(multi)
        }
    };

    Ok(RunOutput { ingest, outcome })
}
