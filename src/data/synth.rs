//! Seeded synthetic observation sets for demos and tests.
//!
//! Curves are sampled on an evenly spaced `x` grid (log-spaced for power laws)
//! and perturbed with Gaussian noise on `y`. Spectra are a single sine tone on
//! a uniform time grid. The same `SynthSpec` always yields the same data.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

use crate::domain::{ModelKind, Observation, ObservationSet};
use crate::error::AppError;
use crate::models::predict;

/// What to generate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthSpec {
    pub model: ModelKind,
    /// Model parameters in `ModelKind::parameter_names` order. For `Fft` these
    /// are `[frequency, amplitude]` of the tone.
    pub params: [f64; 2],
    pub n: usize,
    pub x_min: f64,
    pub x_max: f64,
    /// Standard deviation of the additive `y` noise.
    pub noise_sigma: f64,
    /// Quote `noise_sigma` as each point's `y_err`.
    pub attach_y_err: bool,
    pub seed: u64,
}

impl Default for SynthSpec {
    fn default() -> Self {
        Self {
            model: ModelKind::Linear,
            params: [2.0, 0.0],
            n: 20,
            x_min: 1.0,
            x_max: 10.0,
            noise_sigma: 0.1,
            attach_y_err: true,
            seed: 42,
        }
    }
}

/// Generate observations for `spec`.
pub fn generate(spec: &SynthSpec) -> Result<ObservationSet, AppError> {
    if spec.n < 2 {
        return Err(AppError::new(2, "Sample count must be >= 2."));
    }
    if !(spec.x_min.is_finite() && spec.x_max.is_finite() && spec.x_max > spec.x_min) {
        return Err(AppError::new(2, "Invalid x range for sample generation."));
    }
    if matches!(spec.model, ModelKind::Logarithmic | ModelKind::Power) && spec.x_min <= 0.0 {
        return Err(AppError::new(
            2,
            format!("{} samples need x_min > 0.", spec.model.display_name()),
        ));
    }
    if !(spec.noise_sigma.is_finite() && spec.noise_sigma >= 0.0) {
        return Err(AppError::new(2, "Noise sigma must be finite and >= 0."));
    }

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let normal = Normal::new(0.0, spec.noise_sigma)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    let y_err = (spec.attach_y_err && spec.noise_sigma > 0.0).then_some(spec.noise_sigma);
    let points = sample_grid(spec)
        .into_iter()
        .map(|x| {
            let clean = match spec.model {
                ModelKind::Fft => {
                    let [frequency, amplitude] = spec.params;
                    amplitude * (std::f64::consts::TAU * frequency * x).sin()
                }
                model => predict(model, x, &spec.params),
            };
            Observation {
                y_err,
                ..Observation::new(x, clean + normal.sample(&mut rng))
            }
        })
        .collect();

    Ok(ObservationSet::new(points)?)
}

fn sample_grid(spec: &SynthSpec) -> Vec<f64> {
    let n = spec.n;
    match spec.model {
        // Uniform spacing `(x_max - x_min) / n`, so `x_max` itself is excluded
        // and a tone at `k / (x_max - x_min)` lands exactly on bin `k`.
        ModelKind::Fft => {
            let dt = (spec.x_max - spec.x_min) / n as f64;
            (0..n).map(|i| spec.x_min + i as f64 * dt).collect()
        }
        ModelKind::Power => {
            let (lo, hi) = (spec.x_min.ln(), spec.x_max.ln());
            (0..n)
                .map(|i| (lo + (hi - lo) * i as f64 / (n - 1) as f64).exp())
                .collect()
        }
        ModelKind::Linear | ModelKind::Logarithmic => (0..n)
            .map(|i| spec.x_min + (spec.x_max - spec.x_min) * i as f64 / (n - 1) as f64)
            .collect(),
    }
}
