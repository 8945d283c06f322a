//! Model evaluation for the linear / logarithmic / power families.
//!
//! All three curve models are straight lines after a change of variables:
//!
//! | model       | fitted line          | x′     | y′     |
//! |-------------|----------------------|--------|--------|
//! | linear      | y  = slope·x + icpt  | x      | y      |
//! | logarithmic | y  = a·x′ + b        | ln x   | y      |
//! | power       | y′ = k·x′ + ln C     | ln x   | ln y   |
//!
//! The fitter relies on three primitive operations implemented here:
//! - map observations into line space (`line_x`, `line_y`)
//! - map line coefficients back to model parameters (`params_from_line`)
//! - predict `y(x)` from model parameters (for residuals/plots)

use crate::domain::ModelKind;

/// Abscissa in line space.
pub fn line_x(model: ModelKind, x: f64) -> f64 {
    match model {
        ModelKind::Linear | ModelKind::Fft => x,
        ModelKind::Logarithmic | ModelKind::Power => x.ln(),
    }
}

/// Ordinate in line space.
pub fn line_y(model: ModelKind, y: f64) -> f64 {
    match model {
        ModelKind::Power => y.ln(),
        _ => y,
    }
}

/// First-order propagation of an `x` uncertainty into line space.
pub fn line_x_err(model: ModelKind, x: f64, x_err: f64) -> f64 {
    match model {
        ModelKind::Linear | ModelKind::Fft => x_err,
        // d(ln x) = dx / x
        ModelKind::Logarithmic | ModelKind::Power => x_err / x,
    }
}

/// First-order propagation of a `y` uncertainty into line space.
pub fn line_y_err(model: ModelKind, y: f64, y_err: f64) -> f64 {
    match model {
        ModelKind::Power => y_err / y,
        _ => y_err,
    }
}

/// Model parameters `[p0, p1]` (in `ModelKind::parameter_names` order) and
/// their standard errors, from the line coefficients and their errors.
///
/// For the power law `C = exp(b)` and `σ_C = C·σ_b` (first-order propagation of
/// `exp` at `b`).
pub fn params_from_line(
    model: ModelKind,
    slope: f64,
    intercept: f64,
    slope_err: f64,
    intercept_err: f64,
) -> ([f64; 2], [f64; 2]) {
    match model {
        ModelKind::Power => {
            let c = intercept.exp();
            ([slope, c], [slope_err, c * intercept_err])
        }
        _ => ([slope, intercept], [slope_err, intercept_err]),
    }
}

/// Predict `y(x)` for the given curve model.
///
/// # Panics
/// Panics if `params` has fewer than two entries. FFT results have no curve and
/// callers must not pass them here.
pub fn predict(model: ModelKind, x: f64, params: &[f64]) -> f64 {
    match model {
        ModelKind::Linear => params[0] * x + params[1],
        ModelKind::Logarithmic => params[0] * x.ln() + params[1],
        ModelKind::Power => params[1] * x.powf(params[0]),
        ModelKind::Fft => f64::NAN,
    }
}
