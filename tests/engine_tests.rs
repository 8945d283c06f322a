//! End-to-end tests of the fitting engine through the public API.
//!
//! ## Test Organization
//!
//! 1. **Curve models** - exact recovery, weighting branches, uncertainties
//! 2. **Spectra** - FFT peak location and sampling checks
//! 3. **Failures** - domain, degenerate and validation errors

use approx::{assert_abs_diff_eq, assert_relative_eq};

use labfit::data::synth::{SynthSpec, generate};
use labfit::domain::{Axis, FitOptions, ModelKind, ObservationSet, ResidualSpace, Weighting};
use labfit::error::{FitError, FitErrorKind};
use labfit::fit::{FitEngine, fit};
use labfit::math::LineFit;

fn engine() -> FitEngine {
    FitEngine::new(FitOptions::default())
}

// ============================================================================
// Curve models
// ============================================================================

/// Five points with a common y uncertainty of 0.1.
#[test]
fn test_linear_weighted_lab_scenario() {
    let obs = ObservationSet::from_columns(
        &[1.0, 2.0, 3.0, 4.0, 5.0],
        &[2.1, 3.9, 6.2, 7.8, 10.1],
        None,
        Some(&[0.1; 5]),
    )
    .unwrap();
    let fit = engine().fit(ModelKind::Linear, &obs).unwrap();

    assert_eq!(fit.weighting, Weighting::Weighted);
    assert_abs_diff_eq!(fit.parameter("slope").unwrap(), 1.99, epsilon = 1e-9);
    assert_abs_diff_eq!(fit.parameter("intercept").unwrap(), 0.05, epsilon = 1e-9);
    // Unscaled covariance: σ_a² = 1 / Σw(x - x̄)² = 1 / 1000.
    assert_relative_eq!(fit.uncertainty("slope").unwrap(), 0.001_f64.sqrt(), max_relative = 1e-9);
    assert_relative_eq!(fit.uncertainty("intercept").unwrap(), 0.011_f64.sqrt(), max_relative = 1e-9);
    assert!(fit.r_squared.unwrap() > 0.99);
    assert_relative_eq!(fit.reduced_chi_square.unwrap(), 3.566_666_666_666_667, max_relative = 1e-9);
}

#[test]
fn test_linear_unweighted_exact_recovery() {
    let x: Vec<f64> = (0..10).map(|i| i as f64 * 0.7 - 2.0).collect();
    let y: Vec<f64> = x.iter().map(|v| 3.5 * v - 1.25).collect();
    let fit = fit(ModelKind::Linear, &ObservationSet::from_columns(&x, &y, None, None).unwrap()).unwrap();

    assert_eq!(fit.weighting, Weighting::Unweighted);
    assert_abs_diff_eq!(fit.parameter("slope").unwrap(), 3.5, epsilon = 1e-10);
    assert_abs_diff_eq!(fit.parameter("intercept").unwrap(), -1.25, epsilon = 1e-10);
    assert_abs_diff_eq!(fit.r_squared.unwrap(), 1.0, epsilon = 1e-12);
    assert!(fit.reduced_chi_square.is_none());
    assert_abs_diff_eq!(fit.uncertainty("slope").unwrap(), 0.0, epsilon = 1e-8);
}

/// Only `x` uncertainties: the weighted branch folds them through the slope.
#[test]
fn test_x_errors_alone_engage_weighting() {
    let x = [1.0, 2.0, 3.0, 4.0];
    let y: Vec<f64> = x.iter().map(|v| 2.0 * v + 1.0).collect();
    let obs = ObservationSet::from_columns(&x, &y, Some(&[0.1; 4]), None).unwrap();
    let fit = engine().fit(ModelKind::Linear, &obs).unwrap();

    assert_eq!(fit.weighting, Weighting::Weighted);
    assert_abs_diff_eq!(fit.parameter("slope").unwrap(), 2.0, epsilon = 1e-10);
    // σ² = (2·0.1)² for every point; Σw(x - x̄)² = 25 · 5.
    assert_relative_eq!(fit.uncertainty("slope").unwrap(), (1.0 / 125.0_f64).sqrt(), max_relative = 1e-9);
    // No y uncertainties, so no χ²/ν.
    assert!(fit.reduced_chi_square.is_none());
}

#[test]
fn test_two_points_unweighted_has_zero_errors() {
    let obs = ObservationSet::from_columns(&[1.0, 3.0], &[2.0, 6.0], None, None).unwrap();
    let fit = engine().fit(ModelKind::Linear, &obs).unwrap();

    assert_abs_diff_eq!(fit.parameter("slope").unwrap(), 2.0, epsilon = 1e-12);
    assert_abs_diff_eq!(fit.uncertainty("slope").unwrap(), 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(fit.uncertainty("intercept").unwrap(), 0.0, epsilon = 1e-12);
}

/// Inflating one outlier's uncertainty must pull the fit back to the trend.
#[test]
fn test_weighting_discounts_uncertain_outlier() {
    let x: Vec<f64> = (0..10).map(f64::from).collect();
    let mut y: Vec<f64> = x.iter().map(|v| 2.0 * v + 1.0).collect();
    y[9] = 30.0;

    let mut y_err = vec![0.1; 10];
    let tight = engine()
        .fit(ModelKind::Linear, &ObservationSet::from_columns(&x, &y, None, Some(&y_err)).unwrap())
        .unwrap();
    y_err[9] = 100.0;
    let loose = engine()
        .fit(ModelKind::Linear, &ObservationSet::from_columns(&x, &y, None, Some(&y_err)).unwrap())
        .unwrap();

    let tight_bias = (tight.parameter("slope").unwrap() - 2.0).abs();
    let loose_bias = (loose.parameter("slope").unwrap() - 2.0).abs();
    assert!(loose_bias < tight_bias);
    assert!(loose_bias < 1e-3);
}

/// Over several seeded noisy data sets, raising one point's `y_err` moves the
/// slope strictly closer to the slope fitted without that point.
#[test]
fn test_raising_y_err_strictly_reduces_point_influence() {
    let sigmas = [0.1, 0.3, 1.0, 3.0, 10.0, 30.0, 100.0];

    for seed in [1, 2, 3, 5, 8] {
        let spec = SynthSpec {
            model: ModelKind::Linear,
            params: [1.5, -0.5],
            n: 12,
            x_min: 0.0,
            x_max: 11.0,
            noise_sigma: 0.5,
            attach_y_err: true,
            seed,
        };
        let mut points = generate(&spec).unwrap().points().to_vec();
        let last = points.len() - 1;
        points[last].y += 3.0;

        let without = ObservationSet::new(points[..last].to_vec()).unwrap();
        let reference = engine().fit(ModelKind::Linear, &without).unwrap().parameter("slope").unwrap();

        let mut previous = f64::INFINITY;
        for sigma in sigmas {
            points[last].y_err = Some(sigma);
            let obs = ObservationSet::new(points.clone()).unwrap();
            let slope = engine().fit(ModelKind::Linear, &obs).unwrap().parameter("slope").unwrap();
            let influence = (slope - reference).abs();
            assert!(
                influence < previous,
                "seed {seed}: influence {influence} at σ = {sigma} did not drop below {previous}"
            );
            previous = influence;
        }
    }
}

/// Scaling every σ by a constant leaves the parameters alone and scales
/// their uncertainties by the same constant.
#[test]
fn test_uniform_sigma_scaling() {
    let x = [0.5, 1.0, 2.0, 3.5, 5.0];
    let y = [1.1, 2.3, 3.9, 7.4, 10.2];
    let sigma = [0.2, 0.1, 0.3, 0.2, 0.4];
    let doubled: Vec<f64> = sigma.iter().map(|s| 2.0 * s).collect();

    let a = engine()
        .fit(ModelKind::Linear, &ObservationSet::from_columns(&x, &y, None, Some(&sigma)).unwrap())
        .unwrap();
    let b = engine()
        .fit(ModelKind::Linear, &ObservationSet::from_columns(&x, &y, None, Some(&doubled)).unwrap())
        .unwrap();

    assert_relative_eq!(a.parameter("slope").unwrap(), b.parameter("slope").unwrap(), max_relative = 1e-12);
    assert_relative_eq!(
        2.0 * a.uncertainty("slope").unwrap(),
        b.uncertainty("slope").unwrap(),
        max_relative = 1e-12
    );
}

#[test]
fn test_logarithmic_exact_recovery() {
    let x = [1.0, 2.0, 4.0, 8.0, 16.0];
    let y: Vec<f64> = x.iter().map(|v: &f64| 3.0 * v.ln() + 2.0).collect();
    let fit = engine()
        .fit(ModelKind::Logarithmic, &ObservationSet::from_columns(&x, &y, None, None).unwrap())
        .unwrap();

    assert_abs_diff_eq!(fit.parameter("a").unwrap(), 3.0, epsilon = 1e-10);
    assert_abs_diff_eq!(fit.parameter("b").unwrap(), 2.0, epsilon = 1e-10);
    assert_eq!(fit.r_squared_space, Some(ResidualSpace::Linear));
}

#[test]
fn test_power_law_recovery_and_prediction() {
    let x = [1.0, 2.0, 4.0, 8.0];
    let y: Vec<f64> = x.iter().map(|v: &f64| 2.0 * v.powf(1.5)).collect();
    let fit = engine()
        .fit(ModelKind::Power, &ObservationSet::from_columns(&x, &y, None, None).unwrap())
        .unwrap();

    assert_relative_eq!(fit.parameter("k").unwrap(), 1.5, max_relative = 1e-10);
    assert_relative_eq!(fit.parameter("C").unwrap(), 2.0, max_relative = 1e-10);
    assert_eq!(fit.r_squared_space, Some(ResidualSpace::Log));
    assert_relative_eq!(fit.predict(3.0).unwrap(), 2.0 * 3.0_f64.powf(1.5), max_relative = 1e-9);

    let predicted = fit.predicted_y().unwrap();
    for (p, yi) in predicted.iter().zip(&y) {
        assert_relative_eq!(*p, *yi, max_relative = 1e-9);
    }
}

/// `σ_C = C·σ_b` where `σ_b` comes from the reported line-space covariance.
#[test]
fn test_power_prefactor_error_propagates_through_exp() {
    let x = [1.0, 2.0, 3.0, 5.0, 8.0];
    let y = [3.1, 8.2, 15.9, 33.0, 69.0];
    let y_err = [0.2, 0.4, 0.8, 1.5, 3.0];
    let fit = engine()
        .fit(ModelKind::Power, &ObservationSet::from_columns(&x, &y, None, Some(&y_err)).unwrap())
        .unwrap();

    let cov = fit.covariance.unwrap();
    let c = fit.parameter("C").unwrap();
    assert_relative_eq!(fit.uncertainty("C").unwrap(), c * cov[1][1].sqrt(), max_relative = 1e-12);
    assert_relative_eq!(fit.uncertainty("k").unwrap(), cov[0][0].sqrt(), max_relative = 1e-12);
}

#[test]
fn test_prediction_variance_at_origin_is_intercept_variance() {
    let obs = ObservationSet::from_columns(&[1.0, 2.0, 3.0], &[1.0, 2.2, 2.9], None, Some(&[0.1, 0.2, 0.1])).unwrap();
    let fit = engine().fit(ModelKind::Linear, &obs).unwrap();
    let cov = fit.covariance.unwrap();
    let m = nalgebra::Matrix2::new(cov[0][0], cov[0][1], cov[1][0], cov[1][1]);

    assert_relative_eq!(LineFit::prediction_variance(&m, 0.0), cov[1][1], max_relative = 1e-12);
}

/// Seeded Gaussian noise with its σ quoted: the estimate lands within a few
/// standard errors and χ²/ν is close to one.
#[test]
fn test_seeded_noise_is_consistent_with_quoted_errors() {
    let spec = SynthSpec {
        model: ModelKind::Linear,
        params: [2.0, 1.0],
        n: 200,
        x_min: 0.0,
        x_max: 10.0,
        noise_sigma: 0.5,
        attach_y_err: true,
        seed: 7,
    };
    let fit = engine().fit(ModelKind::Linear, &generate(&spec).unwrap()).unwrap();

    let slope = fit.parameter("slope").unwrap();
    assert!((slope - 2.0).abs() < 5.0 * fit.uncertainty("slope").unwrap());
    let chi2 = fit.reduced_chi_square.unwrap();
    assert!(chi2 > 0.6 && chi2 < 1.4, "chi2/nu = {chi2}");
}

#[test]
fn test_fit_all_reports_every_curve_model() {
    let x = [1.0, 2.0, 3.0, 4.0];
    let y = [1.0, 1.8, 2.2, 2.5];
    let multi = engine()
        .fit_all(&ObservationSet::from_columns(&x, &y, None, None).unwrap())
        .unwrap();

    let kinds: Vec<ModelKind> = multi.fits.iter().map(|f| f.model_kind).collect();
    assert_eq!(kinds, ModelKind::CURVES.to_vec());
    assert!(multi.skipped.is_empty());
}

// ============================================================================
// Spectra
// ============================================================================

#[test]
fn test_fft_locates_sine_peak() {
    let spec = SynthSpec {
        model: ModelKind::Fft,
        params: [5.0, 1.5],
        n: 64,
        x_min: 0.0,
        x_max: 1.0,
        noise_sigma: 0.0,
        attach_y_err: false,
        seed: 1,
    };
    let fit = engine().fit(ModelKind::Fft, &generate(&spec).unwrap()).unwrap();

    assert_eq!(fit.weighting, Weighting::None);
    assert!(fit.uncertainties.is_empty());
    assert_relative_eq!(fit.parameter("sampling_interval").unwrap(), 1.0 / 64.0, max_relative = 1e-9);
    assert_abs_diff_eq!(fit.parameter("dominant_frequency").unwrap(), 5.0, epsilon = 1e-9);
    assert_abs_diff_eq!(fit.parameter("dominant_amplitude").unwrap(), 1.5, epsilon = 1e-9);

    let spectrum = fit.spectrum().unwrap();
    assert_eq!(spectrum.len(), 33);
    assert_abs_diff_eq!(spectrum[32].frequency, 32.0, epsilon = 1e-9);
    assert!(fit.predict(0.5).is_none());
}

#[test]
fn test_fft_from_sampling_rate() {
    let y: Vec<f64> = (0..16)
        .map(|i| (std::f64::consts::TAU * 2.0 * i as f64 / 16.0).cos())
        .collect();
    let fit = engine()
        .fit(ModelKind::Fft, &ObservationSet::from_sampling_rate(&y, 16.0).unwrap())
        .unwrap();
    assert_abs_diff_eq!(fit.parameter("dominant_frequency").unwrap(), 2.0, epsilon = 1e-9);
    assert_abs_diff_eq!(fit.parameter("dominant_amplitude").unwrap(), 1.0, epsilon = 1e-9);
}

#[test]
fn test_fft_rejects_irregular_sampling() {
    let obs = ObservationSet::from_columns(&[0.0, 0.1, 0.2, 0.35, 0.4], &[0.0, 1.0, 0.0, -1.0, 0.0], None, None)
        .unwrap();
    let err = engine().fit(ModelKind::Fft, &obs).unwrap_err();
    assert_eq!(err.kind(), FitErrorKind::NonUniformSampling);
}

#[test]
fn test_fft_spacing_tolerance_is_configurable() {
    let obs = ObservationSet::from_columns(&[0.0, 1.0, 2.01, 3.0], &[0.0, 1.0, 0.0, -1.0], None, None).unwrap();
    assert!(engine().fit(ModelKind::Fft, &obs).is_err());

    let loose = FitEngine::new(FitOptions {
        sampling_tolerance: 0.05,
        ..FitOptions::default()
    });
    assert!(loose.fit(ModelKind::Fft, &obs).is_ok());
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_power_rejects_zero_and_negative_x() {
    for bad in [0.0, -2.0] {
        let obs = ObservationSet::from_columns(&[1.0, bad, 3.0], &[1.0, 2.0, 3.0], None, None).unwrap();
        let err = engine().fit(ModelKind::Power, &obs).unwrap_err();
        assert_eq!(err.kind(), FitErrorKind::InvalidDomain);
        assert!(matches!(err, FitError::InvalidDomain { axis: Axis::X, index: 1, .. }));
        assert!(err.to_string().contains("x[1]"));
    }
}

#[test]
fn test_identical_x_is_degenerate() {
    let obs = ObservationSet::from_columns(&[2.0, 2.0], &[1.0, 3.0], None, None).unwrap();
    for model in ModelKind::CURVES {
        let err = engine().fit(model, &obs).unwrap_err();
        assert_eq!(err.kind(), FitErrorKind::DegenerateFit, "{model}");
    }
}

#[test]
fn test_fft_needs_four_samples() {
    let obs = ObservationSet::from_columns(&[0.0, 1.0, 2.0], &[1.0, 0.0, 1.0], None, None).unwrap();
    let err = engine().fit(ModelKind::Fft, &obs).unwrap_err();
    assert_eq!(err.kind(), FitErrorKind::InsufficientData);
}

#[test]
fn test_fit_never_mutates_input() {
    let obs = ObservationSet::from_columns(&[1.0, 2.0, 3.0], &[2.0, 4.1, 5.9], None, Some(&[0.1; 3])).unwrap();
    let before = obs.clone();
    let _ = engine().fit_all(&obs).unwrap();
    assert_eq!(obs, before);
}
