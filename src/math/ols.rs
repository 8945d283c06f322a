//! Weighted straight-line least squares.
//!
//! Every curve model in this crate reduces to the problem:
//!
//! ```text
//! minimize Σ w_i (y_i - a x_i - b)^2
//! ```
//!
//! whose closed-form solution is
//!
//! ```text
//! S = Σw   Sx = Σw x   Sy = Σw y   Sxx = Σw x²   Sxy = Σw x y
//! Δ = S·Sxx - Sx²
//! a = (S·Sxy - Sx·Sy) / Δ        b = (Sxx·Sy - Sx·Sxy) / Δ
//! var(a) = S / Δ                 var(b) = Sxx / Δ        cov(a, b) = -Sx / Δ
//! ```
//!
//! Implementation choices:
//! - The sums are accumulated about the weighted mean of `x`. This gives the
//!   same `a`, `b` and covariance but avoids the cancellation in `S·Sxx - Sx²`
//!   when `x` carries a large offset (e.g. absolute timestamps).
//! - The covariance is returned as a `nalgebra::Matrix2` so callers can scale
//!   it and propagate it to predictions with plain matrix algebra.

use nalgebra::{Matrix2, Vector2};

use crate::error::FitError;

/// Relative threshold on `Δ / (S·Sxx)` below which the system is singular.
const DEGENERATE_REL_EPS: f64 = 1e-12;

/// Solution of a weighted line fit.
#[derive(Debug, Clone, PartialEq)]
pub struct LineFit {
    pub slope: f64,
    pub intercept: f64,
    /// Unscaled covariance of `(slope, intercept)`: the inverse of the
    /// weighted normal matrix.
    pub covariance: Matrix2<f64>,
    /// Determinant `Δ = S·Sxx - Sx²` of the normal matrix.
    pub delta: f64,
    /// Sum of weights `S`.
    pub weight_sum: f64,
}

impl LineFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// Covariance multiplied by `factor` (e.g. a residual variance estimate).
    pub fn scaled_covariance(&self, factor: f64) -> Matrix2<f64> {
        self.covariance * factor
    }

    /// Standard errors `(σ_a, σ_b)` from a covariance matrix.
    pub fn standard_errors(covariance: &Matrix2<f64>) -> (f64, f64) {
        (covariance[(0, 0)].max(0.0).sqrt(), covariance[(1, 1)].max(0.0).sqrt())
    }

    /// Variance of the fitted line at `x` given a parameter covariance:
    /// `gᵀ C g` with `g = (x, 1)`.
    pub fn prediction_variance(covariance: &Matrix2<f64>, x: f64) -> f64 {
        let g = Vector2::new(x, 1.0);
        (g.transpose() * *covariance * g)[(0, 0)]
    }
}

/// Solve the weighted normal equations for `y = a x + b`.
///
/// Fails with `DegenerateFit` when fewer than two points are given or when all
/// `x` coincide (the normal matrix is singular).
pub fn weighted_line(x: &[f64], y: &[f64], w: &[f64]) -> Result<LineFit, FitError> {
    debug_assert_eq!(x.len(), y.len());
    debug_assert_eq!(x.len(), w.len());

    if x.len() < 2 {
        return Err(FitError::DegenerateFit { delta: 0.0 });
    }

    let s: f64 = w.iter().sum();
    let sx: f64 = w.iter().zip(x).map(|(wi, xi)| wi * xi).sum();
    let sy: f64 = w.iter().zip(y).map(|(wi, yi)| wi * yi).sum();
    let x_bar = sx / s;
    let y_bar = sy / s;

    let mut sxx_c = 0.0;
    let mut sxy_c = 0.0;
    let mut sxx = 0.0;
    for i in 0..x.len() {
        let dx = x[i] - x_bar;
        sxx_c += w[i] * dx * dx;
        sxy_c += w[i] * dx * (y[i] - y_bar);
        sxx += w[i] * x[i] * x[i];
    }

    // Δ = S·Sxx - Sx² = S · Σw (x - x̄)²
    let delta = s * sxx_c;
    if !(delta.is_finite() && s > 0.0) || sxx_c <= DEGENERATE_REL_EPS * sxx {
        return Err(FitError::DegenerateFit { delta });
    }

    let slope = sxy_c / sxx_c;
    let intercept = y_bar - slope * x_bar;

    // var(a) = S/Δ = 1/Sxx_c ; var(b) = Sxx/Δ ; cov(a,b) = -Sx/Δ
    let covariance = Matrix2::new(s / delta, -sx / delta, -sx / delta, sxx / delta);

    if !(slope.is_finite() && intercept.is_finite()) {
        return Err(FitError::DegenerateFit { delta });
    }

    Ok(LineFit {
        slope,
        intercept,
        covariance,
        delta,
        weight_sum: s,
    })
}
