//! FFT spectral decomposition of a uniformly sampled series.
//!
//! The one-sided amplitude spectrum is:
//!
//! ```text
//! A_k = |X_k| / N          for k = 0 (DC) and k = N/2 (Nyquist, even N)
//! A_k = 2 · |X_k| / N      otherwise,  k = 0..=N/2
//! f_k = k / (N · Δt)
//! ```
//!
//! so a pure sine of amplitude `A` at a bin-centred frequency shows up as a
//! single bin of height `A`.

use log::debug;
use rustfft::{FftPlanner, num_complex::Complex64};

use crate::domain::{FitOptions, FitResult, ModelKind, NamedValue, ObservationSet, SpectrumPoint, Trace, Weighting};
use crate::error::FitError;

/// Fewest samples that give a meaningful spectrum.
pub const MIN_SPECTRUM_SAMPLES: usize = 4;

/// Compute the amplitude spectrum of `y` sampled at the observations' `x`.
pub fn fit_spectrum(obs: &ObservationSet, opts: &FitOptions) -> Result<FitResult, FitError> {
    let n = obs.len();
    if n < MIN_SPECTRUM_SAMPLES {
        return Err(FitError::InsufficientData {
            got: n,
            min: MIN_SPECTRUM_SAMPLES,
        });
    }

    let dt = sampling_interval(&obs.xs(), opts.sampling_tolerance)?;
    let points = amplitude_spectrum(&obs.ys(), dt);
    debug!("fft on {n} samples, dt = {dt}, {} bins", points.len());

    // Strongest non-DC component; bin 1 always exists because n >= 4.
    let dominant = points
        .iter()
        .skip(1)
        .copied()
        .fold(points[1], |best, p| if p.amplitude > best.amplitude { p } else { best });

    let names = ModelKind::Fft.parameter_names();
    let parameters = vec![
        NamedValue::new(names[0], dt),
        NamedValue::new(names[1], dominant.frequency),
        NamedValue::new(names[2], dominant.amplitude),
    ];

    Ok(FitResult {
        model_kind: ModelKind::Fft,
        parameters,
        uncertainties: Vec::new(),
        covariance: None,
        r_squared: None,
        r_squared_space: None,
        reduced_chi_square: None,
        weighting: Weighting::None,
        n,
        trace: Trace::Spectrum { points },
    })
}

/// Mean sampling interval of `x`, after checking the spacing is uniform.
///
/// Every spacing must satisfy `|Δx_i - Δt| <= tolerance · Δt` where
/// `Δt = mean(diff(x))`.
pub fn sampling_interval(x: &[f64], tolerance: f64) -> Result<f64, FitError> {
    if x.len() < 2 {
        return Err(FitError::InsufficientData {
            got: x.len(),
            min: MIN_SPECTRUM_SAMPLES,
        });
    }

    let mean = (x[x.len() - 1] - x[0]) / (x.len() - 1) as f64;
    if !(mean.is_finite() && mean > 0.0) {
        return Err(FitError::NonIncreasingSampling { mean });
    }

    for (i, pair) in x.windows(2).enumerate() {
        let spacing = pair[1] - pair[0];
        if (spacing - mean).abs() > tolerance * mean {
            return Err(FitError::NonUniformSampling {
                index: i + 1,
                spacing,
                mean,
                tolerance,
            });
        }
    }

    Ok(mean)
}

/// One-sided amplitude spectrum for frequencies in `[0, Nyquist]`.
pub fn amplitude_spectrum(y: &[f64], dt: f64) -> Vec<SpectrumPoint> {
    let n = y.len();
    let mut buffer: Vec<Complex64> = y.iter().map(|&v| Complex64::new(v, 0.0)).collect();

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut buffer);

    let df = 1.0 / (n as f64 * dt);
    let half = n / 2;
    (0..=half)
        .map(|k| {
            let mut amplitude = buffer[k].norm() / n as f64;
            let is_nyquist = n % 2 == 0 && k == half;
            if k != 0 && !is_nyquist {
                amplitude *= 2.0;
            }
            SpectrumPoint {
                frequency: k as f64 * df,
                amplitude,
            }
        })
        .collect()
}
