//! Dispatch front-end of the fitting engine.
//!
//! `FitEngine` is the single entry point: it checks the universal
//! preconditions, dispatches to the curve fitter or the spectral analysis, and
//! hands back a fresh `FitResult`. It holds only its (copyable) options, so one
//! engine can serve any number of concurrent callers.

use log::debug;
use rayon::prelude::*;

use crate::domain::{FitOptions, FitResult, MIN_OBSERVATIONS, ModelKind, ObservationSet};
use crate::error::{FitError, FitErrorKind};
use crate::fit::fitter::fit_curve;
use crate::fit::spectrum::fit_spectrum;

/// Output of a multi-model run.
#[derive(Debug, Clone)]
pub struct MultiFit {
    /// Successful fits, in `ModelKind::CURVES` order.
    pub fits: Vec<FitResult>,
    /// Models whose domain excludes the data or whose line is degenerate, and why.
    pub skipped: Vec<(ModelKind, FitError)>,
}

/// Stateless weighted fitting engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct FitEngine {
    options: FitOptions,
}

impl FitEngine {
    pub fn new(options: FitOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &FitOptions {
        &self.options
    }

    /// Fit one model kind.
    pub fn fit(&self, model: ModelKind, obs: &ObservationSet) -> Result<FitResult, FitError> {
        if obs.len() < MIN_OBSERVATIONS {
            return Err(FitError::TooFewPoints {
                got: obs.len(),
                min: MIN_OBSERVATIONS,
            });
        }

        debug!("dispatching {model} fit ({} observations)", obs.len());
        match model {
            ModelKind::Fft => fit_spectrum(obs, &self.options),
            ModelKind::Linear | ModelKind::Logarithmic | ModelKind::Power => fit_curve(model, obs, &self.options),
        }
    }

    /// Fit every curve model in parallel.
    ///
    /// No model is preferred over another. Domain and degenerate failures are
    /// reported in `skipped`; any other failure is a problem with the data
    /// itself and is returned for the first curve model that hit it.
    pub fn fit_all(&self, obs: &ObservationSet) -> Result<MultiFit, FitError> {
        let outcomes: Vec<(ModelKind, Result<FitResult, FitError>)> = ModelKind::CURVES
            .par_iter()
            .map(|&kind| (kind, self.fit(kind, obs)))
            .collect();

        let mut fits = Vec::new();
        let mut skipped = Vec::new();
        for (kind, outcome) in outcomes {
            match outcome {
                Ok(fit) => fits.push(fit),
                Err(err) if is_model_specific(&err) => {
                    debug!("skipping {kind}: {err}");
                    skipped.push((kind, err));
                }
                Err(err) => return Err(err),
            }
        }

        Ok(MultiFit { fits, skipped })
    }
}

fn is_model_specific(err: &FitError) -> bool {
    matches!(err.kind(), FitErrorKind::InvalidDomain | FitErrorKind::DegenerateFit)
}

/// Fit one model kind with default options.
pub fn fit(model: ModelKind, obs: &ObservationSet) -> Result<FitResult, FitError> {
    FitEngine::default().fit(model, obs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Observation;

    #[test]
    fn fit_all_skips_models_outside_their_domain() {
        let obs = ObservationSet::from_columns(&[-1.0, 0.5, 2.0, 4.0], &[1.0, 2.0, 3.0, 5.0], None, None).unwrap();
        let multi = FitEngine::default().fit_all(&obs).unwrap();

        assert_eq!(multi.fits.len(), 1);
        assert_eq!(multi.fits[0].model_kind, ModelKind::Linear);
        let skipped: Vec<ModelKind> = multi.skipped.iter().map(|(k, _)| *k).collect();
        assert_eq!(skipped, vec![ModelKind::Logarithmic, ModelKind::Power]);
        assert!(multi.skipped.iter().all(|(_, e)| e.kind() == FitErrorKind::InvalidDomain));
    }

    #[test]
    fn fit_all_returns_validation_errors() {
        let points = vec![
            Observation {
                y_err: Some(0.0),
                ..Observation::new(1.0, 1.0)
            },
            Observation::new(2.0, 2.0),
            Observation::new(3.0, 3.5),
        ];
        let obs = ObservationSet::new(points).unwrap();
        let err = FitEngine::default().fit_all(&obs).unwrap_err();
        assert_eq!(err, FitError::ZeroVariance { index: 0 });
    }

    #[test]
    fn fft_needs_four_samples() {
        let obs = ObservationSet::from_sampling_rate(&[0.0, 1.0, 0.0], 10.0).unwrap();
        let err = fit(ModelKind::Fft, &obs).unwrap_err();
        assert_eq!(err, FitError::InsufficientData { got: 3, min: 4 });
    }
}
