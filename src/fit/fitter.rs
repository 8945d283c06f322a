//! Curve fitting for a single linearizable model kind.
//!
//! Given:
//! - observations `(x_i, y_i)` with optional `x_err_i`, `y_err_i`
//! - a model kind (linear / logarithmic / power)
//!
//! we:
//! - check the model's domain (no rows are ever dropped)
//! - map the data into line space (`models::line_x`, `models::line_y`)
//! - choose weights from the supplied uncertainties
//! - solve the weighted line problem and derive parameter errors, R² and χ²/ν
//!
//! Weighting policy:
//! - If no point quotes an uncertainty, the fit is unweighted and parameter
//!   errors come from the residual scatter `s² = Σr²/(N-2)`. No χ²/ν is
//!   reported in that case.
//! - Otherwise a point with uncertainties gets `w = 1/σ²` where
//!   `σ² = σ_y² + a²·σ_x²` (uncertainties in line space). A point without any
//!   uncertainty keeps `w = 1`. The covariance is used unscaled.
//! - A point that quotes only `x_err` folds to `σ² = a²·σ_x²`, which is zero
//!   on a flat trend. Such a point keeps `w = 1` as if it quoted nothing; a
//!   quoted `y_err` of zero is still rejected.
//! - χ²/ν needs `y` uncertainties: it is reported only when at least one point
//!   quotes `y_err`.
//!
//! The `σ_x` fold is the usual effective-variance approximation, not an
//! orthogonal-distance regression: `a` is the unweighted slope on the first
//! pass and the previous pass's slope on any further pass.

use log::{debug, warn};

use crate::domain::{
    Axis, CurvePoint, FitOptions, FitResult, ModelKind, NamedValue, ObservationSet, ResidualSpace, Trace,
    Weighting,
};
use crate::error::FitError;
use crate::math::{residual_variance, reduced_chi_square, weighted_line, weighted_r_squared, LineFit};
use crate::models::{line_x, line_x_err, line_y, line_y_err, params_from_line, predict};

/// Number of fitted line parameters.
const LINE_PARAMS: usize = 2;

/// Observations mapped into line space.
#[derive(Debug, Clone)]
struct LineData {
    x: Vec<f64>,
    y: Vec<f64>,
    x_err: Vec<Option<f64>>,
    y_err: Vec<Option<f64>>,
}

/// Fit a curve model (linear, logarithmic or power) to the observations.
pub fn fit_curve(model: ModelKind, obs: &ObservationSet, opts: &FitOptions) -> Result<FitResult, FitError> {
    debug_assert!(model != ModelKind::Fft, "spectra are handled by fit::spectrum");

    check_domain(model, obs)?;
    let data = to_line_space(model, obs);
    let n = data.x.len();

    let unit = vec![1.0; n];
    let unweighted = weighted_line(&data.x, &data.y, &unit)?;

    let weighted = obs.has_uncertainties();
    debug!(
        "{model} fit on {n} points ({})",
        if weighted { "weighted" } else { "unweighted" }
    );

    let (line, weights, sigma) = if weighted {
        let mut sigma = effective_sigma(&data, unweighted.slope)?;
        let mut w = inverse_variance(&sigma);
        let mut line = weighted_line(&data.x, &data.y, &w)?;
        for _ in 1..opts.x_err_passes {
            sigma = effective_sigma(&data, line.slope)?;
            w = inverse_variance(&sigma);
            line = weighted_line(&data.x, &data.y, &w)?;
        }
        (line, w, sigma)
    } else {
        (unweighted, unit.clone(), unit)
    };

    let y_hat: Vec<f64> = data.x.iter().map(|&x| line.predict(x)).collect();
    let r_squared = weighted_r_squared(&data.y, &y_hat, &weights);

    let (covariance, reduced_chi_square) = if weighted {
        let chi2 = if data.y_err.iter().any(Option::is_some) {
            reduced_chi_square(&data.y, &y_hat, &sigma, LINE_PARAMS)
        } else {
            None
        };
        (line.covariance, chi2)
    } else {
        if n <= LINE_PARAMS {
            warn!("{model} fit on {n} points has no residual degrees of freedom; parameter errors are zero");
        }
        let s2 = residual_variance(&data.y, &y_hat, LINE_PARAMS);
        (line.scaled_covariance(s2), None)
    };

    let (slope_err, intercept_err) = LineFit::standard_errors(&covariance);
    let (values, errors) = params_from_line(model, line.slope, line.intercept, slope_err, intercept_err);

    let names = model.parameter_names();
    let parameters = names.iter().zip(values).map(|(n, v)| NamedValue::new(*n, v)).collect();
    let uncertainties = names.iter().zip(errors).map(|(n, e)| NamedValue::new(*n, e)).collect();

    let predicted_y = obs.points().iter().map(|p| predict(model, p.x, &values)).collect();
    let samples = sample_curve(model, obs, &values, opts.curve_samples);

    Ok(FitResult {
        model_kind: model,
        parameters,
        uncertainties,
        covariance: Some([
            [covariance[(0, 0)], covariance[(0, 1)]],
            [covariance[(1, 0)], covariance[(1, 1)]],
        ]),
        r_squared: Some(r_squared),
        r_squared_space: Some(match model {
            ModelKind::Power => ResidualSpace::Log,
            _ => ResidualSpace::Linear,
        }),
        reduced_chi_square,
        weighting: if weighted { Weighting::Weighted } else { Weighting::Unweighted },
        n,
        trace: Trace::Curve { predicted_y, samples },
    })
}

/// Reject data outside the model's domain, naming the first offending sample.
fn check_domain(model: ModelKind, obs: &ObservationSet) -> Result<(), FitError> {
    let needs_positive_x = matches!(model, ModelKind::Logarithmic | ModelKind::Power);
    let needs_positive_y = model == ModelKind::Power;

    for (index, p) in obs.points().iter().enumerate() {
        if needs_positive_x && p.x <= 0.0 {
            return Err(FitError::InvalidDomain {
                model,
                axis: Axis::X,
                index,
                value: p.x,
            });
        }
        if needs_positive_y && p.y <= 0.0 {
            return Err(FitError::InvalidDomain {
                model,
                axis: Axis::Y,
                index,
                value: p.y,
            });
        }
    }
    Ok(())
}

fn to_line_space(model: ModelKind, obs: &ObservationSet) -> LineData {
    let points = obs.points();
    LineData {
        x: points.iter().map(|p| line_x(model, p.x)).collect(),
        y: points.iter().map(|p| line_y(model, p.y)).collect(),
        x_err: points.iter().map(|p| p.x_err.map(|e| line_x_err(model, p.x, e))).collect(),
        y_err: points.iter().map(|p| p.y_err.map(|e| line_y_err(model, p.y, e))).collect(),
    }
}

/// Per-point `σ` in line space for the weighted branch.
fn effective_sigma(data: &LineData, slope: f64) -> Result<Vec<f64>, FitError> {
    data.x_err
        .iter()
        .zip(&data.y_err)
        .enumerate()
        .map(|(index, (ex, ey))| {
            if ex.is_none() && ey.is_none() {
                return Ok(1.0);
            }
            let sy = ey.unwrap_or(0.0);
            let sx = ex.unwrap_or(0.0);
            let var = sy * sy + slope * slope * sx * sx;
            if var > 0.0 && var.is_finite() {
                Ok(var.sqrt())
            } else if ey.is_none() && var == 0.0 {
                Ok(1.0)
            } else {
                Err(FitError::ZeroVariance { index })
            }
        })
        .collect()
}

fn inverse_variance(sigma: &[f64]) -> Vec<f64> {
    sigma.iter().map(|s| 1.0 / (s * s)).collect()
}

/// Dense samples of the fitted curve across the observed `x` range.
///
/// Power laws are sampled evenly in `ln x` so the curve is smooth on log-log axes.
fn sample_curve(model: ModelKind, obs: &ObservationSet, params: &[f64; 2], n: usize) -> Vec<CurvePoint> {
    let stats = obs.stats();
    let n = n.max(2);
    let (lo, hi) = match model {
        ModelKind::Power => (stats.x_min.ln(), stats.x_max.ln()),
        _ => (stats.x_min, stats.x_max),
    };

    (0..n)
        .map(|i| {
            let u = i as f64 / (n as f64 - 1.0);
            let t = lo + u * (hi - lo);
            let x = if model == ModelKind::Power { t.exp() } else { t };
            CurvePoint {
                x,
                y: predict(model, x, params),
            }
        })
        .collect()
}
