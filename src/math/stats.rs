//! Goodness-of-fit statistics for weighted fits.

/// Weighted mean `Σw y / Σw`. `None` when the weights sum to zero.
pub fn weighted_mean(y: &[f64], w: &[f64]) -> Option<f64> {
    let s: f64 = w.iter().sum();
    if s <= 0.0 || !s.is_finite() {
        return None;
    }
    Some(w.iter().zip(y).map(|(wi, yi)| wi * yi).sum::<f64>() / s)
}

/// Weighted residual sum of squares `Σw (y - ŷ)²`.
pub fn weighted_sse(y: &[f64], y_hat: &[f64], w: &[f64]) -> f64 {
    y.iter()
        .zip(y_hat)
        .zip(w)
        .map(|((yi, fi), wi)| {
            let r = yi - fi;
            wi * r * r
        })
        .sum()
}

/// Weighted coefficient of determination.
///
/// `1 - Σw(y-ŷ)² / Σw(y-ȳw)²`. When every `y` is equal the total sum of squares
/// is zero and the constant is fitted perfectly, so this returns `1.0`.
pub fn weighted_r_squared(y: &[f64], y_hat: &[f64], w: &[f64]) -> f64 {
    let Some(y_bar) = weighted_mean(y, w) else {
        return 1.0;
    };
    let sst: f64 = y
        .iter()
        .zip(w)
        .map(|(yi, wi)| {
            let d = yi - y_bar;
            wi * d * d
        })
        .sum();
    if sst <= 0.0 {
        return 1.0;
    }
    1.0 - weighted_sse(y, y_hat, w) / sst
}

/// Reduced chi-square `Σ((y-ŷ)/σ)² / (n - n_params)`.
///
/// `None` when there are no residual degrees of freedom.
pub fn reduced_chi_square(y: &[f64], y_hat: &[f64], sigma: &[f64], n_params: usize) -> Option<f64> {
    let dof = y.len().checked_sub(n_params).filter(|&d| d > 0)?;
    let chi2: f64 = y
        .iter()
        .zip(y_hat)
        .zip(sigma)
        .map(|((yi, fi), si)| {
            let z = (yi - fi) / si;
            z * z
        })
        .sum();
    Some(chi2 / dof as f64)
}

/// Unweighted residual variance `Σ(y-ŷ)² / max(1, n - n_params)`.
pub fn residual_variance(y: &[f64], y_hat: &[f64], n_params: usize) -> f64 {
    let dof = y.len().saturating_sub(n_params).max(1);
    let sse: f64 = y
        .iter()
        .zip(y_hat)
        .map(|(yi, fi)| {
            let r = yi - fi;
            r * r
        })
        .sum();
    sse / dof as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn r_squared_of_constant_is_one() {
        let y = [3.0, 3.0, 3.0];
        assert_eq!(weighted_r_squared(&y, &y, &[1.0, 2.0, 3.0]), 1.0);
    }

    #[test]
    fn r_squared_uses_weights() {
        let y = [0.0, 1.0, 5.0];
        let y_hat = [0.0, 1.0, 2.0];
        let flat = weighted_r_squared(&y, &y_hat, &[1.0, 1.0, 1.0]);
        let down = weighted_r_squared(&y, &y_hat, &[1.0, 1.0, 0.01]);
        assert!(flat < 1.0);
        assert!(down != flat);
    }

    #[test]
    fn chi_square_needs_degrees_of_freedom() {
        assert!(reduced_chi_square(&[1.0, 2.0], &[1.0, 2.0], &[0.1, 0.1], 2).is_none());
        let chi = reduced_chi_square(&[1.0, 2.0, 3.2], &[1.0, 2.0, 3.0], &[0.1, 0.1, 0.1], 2).unwrap();
        assert!((chi - 4.0).abs() < 1e-9);
    }
}
