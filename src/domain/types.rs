//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - validated once at the boundary (`ObservationSet`)
//! - passed read-only into the engine
//! - exported to JSON/CSV for the report generator and reloaded for plotting

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::FitError;

/// Model family fitted by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// `y = slope·x + intercept`
    Linear,
    /// `y = a·ln(x) + b`
    #[value(alias = "log")]
    Logarithmic,
    /// `y = C·x^k`
    Power,
    /// One-sided amplitude spectrum of uniformly sampled `y`.
    Fft,
}

impl ModelKind {
    /// Curve models, in the order a multi-model run reports them.
    pub const CURVES: [ModelKind; 3] = [ModelKind::Linear, ModelKind::Logarithmic, ModelKind::Power];

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Linear => "Linear",
            ModelKind::Logarithmic => "Logarithmic",
            ModelKind::Power => "Power law",
            ModelKind::Fft => "FFT spectrum",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModelKind::Linear => "linear",
            ModelKind::Logarithmic => "logarithmic",
            ModelKind::Power => "power",
            ModelKind::Fft => "fft",
        }
    }

    /// Names of the fitted parameters, in reporting order.
    pub fn parameter_names(self) -> &'static [&'static str] {
        match self {
            ModelKind::Linear => &["slope", "intercept"],
            ModelKind::Logarithmic => &["a", "b"],
            ModelKind::Power => &["k", "C"],
            ModelKind::Fft => &["sampling_interval", "dominant_frequency", "dominant_amplitude"],
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which model(s) a run should fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelSpec {
    Linear,
    #[value(alias = "log")]
    Logarithmic,
    Power,
    Fft,
    /// Every curve model (linear, logarithmic, power); inapplicable ones are skipped.
    All,
}

impl ModelSpec {
    pub fn to_kind(self) -> Option<ModelKind> {
        match self {
            ModelSpec::Linear => Some(ModelKind::Linear),
            ModelSpec::Logarithmic => Some(ModelKind::Logarithmic),
            ModelSpec::Power => Some(ModelKind::Power),
            ModelSpec::Fft => Some(ModelKind::Fft),
            ModelSpec::All => None,
        }
    }
}

/// Column role of an observation value. Used in error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    X,
    Y,
    XErr,
    YErr,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::XErr => "x_err",
            Axis::YErr => "y_err",
        })
    }
}

/// One measured sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub x: f64,
    pub y: f64,
    /// Standard uncertainty on `x` (absent means none was quoted).
    pub x_err: Option<f64>,
    /// Standard uncertainty on `y` (absent means none was quoted).
    pub y_err: Option<f64>,
}

impl Observation {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            x_err: None,
            y_err: None,
        }
    }
}

/// Minimum number of samples for any fit.
pub const MIN_OBSERVATIONS: usize = 2;

/// A validated, ordered set of observations.
///
/// Invariants (checked on construction):
/// - at least `MIN_OBSERVATIONS` samples
/// - every `x`, `y` finite
/// - every supplied uncertainty finite and `>= 0`
///
/// Model-specific domain checks (positivity for log/power, uniform spacing for
/// FFT) are left to the engine because they depend on the chosen model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservationSet {
    points: Vec<Observation>,
}

impl ObservationSet {
    /// Validate and wrap a list of observations.
    pub fn new(points: Vec<Observation>) -> Result<Self, FitError> {
        if points.len() < MIN_OBSERVATIONS {
            return Err(FitError::TooFewPoints {
                got: points.len(),
                min: MIN_OBSERVATIONS,
            });
        }

        for (index, p) in points.iter().enumerate() {
            if !p.x.is_finite() {
                return Err(FitError::NonFinite { axis: Axis::X, index });
            }
            if !p.y.is_finite() {
                return Err(FitError::NonFinite { axis: Axis::Y, index });
            }
            check_uncertainty(p.x_err, Axis::XErr, index)?;
            check_uncertainty(p.y_err, Axis::YErr, index)?;
        }

        Ok(Self { points })
    }

    /// Build from column slices. Uncertainty columns are optional as a whole.
    pub fn from_columns(
        x: &[f64],
        y: &[f64],
        x_err: Option<&[f64]>,
        y_err: Option<&[f64]>,
    ) -> Result<Self, FitError> {
        let n = x.len();
        check_len(y.len(), n, Axis::Y)?;
        if let Some(e) = x_err {
            check_len(e.len(), n, Axis::XErr)?;
        }
        if let Some(e) = y_err {
            check_len(e.len(), n, Axis::YErr)?;
        }

        let points = (0..n)
            .map(|i| Observation {
                x: x[i],
                y: y[i],
                x_err: x_err.map(|e| e[i]),
                y_err: y_err.map(|e| e[i]),
            })
            .collect();
        Self::new(points)
    }

    /// Build a uniformly sampled series where `x_i = i / sampling_rate`.
    pub fn from_sampling_rate(y: &[f64], sampling_rate: f64) -> Result<Self, FitError> {
        if !(sampling_rate.is_finite() && sampling_rate > 0.0) {
            return Err(FitError::NonIncreasingSampling { mean: 1.0 / sampling_rate });
        }
        let points = y
            .iter()
            .enumerate()
            .map(|(i, &y)| Observation::new(i as f64 / sampling_rate, y))
            .collect();
        Self::new(points)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Observation] {
        &self.points
    }

    pub fn xs(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.x).collect()
    }

    pub fn ys(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.y).collect()
    }

    /// True when any sample quotes an uncertainty on either axis.
    pub fn has_uncertainties(&self) -> bool {
        self.points.iter().any(|p| p.x_err.is_some() || p.y_err.is_some())
    }

    pub fn stats(&self) -> DatasetStats {
        let mut stats = DatasetStats {
            n_points: self.points.len(),
            x_min: f64::INFINITY,
            x_max: f64::NEG_INFINITY,
            y_min: f64::INFINITY,
            y_max: f64::NEG_INFINITY,
        };
        for p in &self.points {
            stats.x_min = stats.x_min.min(p.x);
            stats.x_max = stats.x_max.max(p.x);
            stats.y_min = stats.y_min.min(p.y);
            stats.y_max = stats.y_max.max(p.y);
        }
        stats
    }
}

fn check_len(got: usize, expected: usize, axis: Axis) -> Result<(), FitError> {
    if got != expected {
        return Err(FitError::LengthMismatch { axis, expected, got });
    }
    Ok(())
}

fn check_uncertainty(value: Option<f64>, axis: Axis, index: usize) -> Result<(), FitError> {
    let Some(v) = value else { return Ok(()) };
    if !v.is_finite() {
        return Err(FitError::NonFinite { axis, index });
    }
    if v < 0.0 {
        return Err(FitError::NegativeUncertainty { axis, index, value: v });
    }
    Ok(())
}

/// Summary stats about an observation set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetStats {
    pub n_points: usize,
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

/// A named scalar (parameter value or its standard uncertainty).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedValue {
    pub name: String,
    pub value: f64,
}

impl NamedValue {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Sample of a fitted curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub x: f64,
    pub y: f64,
}

/// One bin of a one-sided amplitude spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectrumPoint {
    pub frequency: f64,
    pub amplitude: f64,
}

/// Plotting payload of a fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trace {
    Curve {
        /// Model prediction at each observed `x`, in input order.
        predicted_y: Vec<f64>,
        /// Dense samples across the observed `x` range.
        samples: Vec<CurvePoint>,
    },
    Spectrum { points: Vec<SpectrumPoint> },
}

/// Space in which residual statistics were computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResidualSpace {
    /// Original `y` values.
    Linear,
    /// `ln(y)` (power-law fits).
    Log,
}

/// Which uncertainty branch produced the parameter errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weighting {
    /// Inverse-variance weights from supplied uncertainties.
    Weighted,
    /// Uniform weights; uncertainties estimated from residual scatter.
    Unweighted,
    /// No least-squares problem (spectral analysis).
    None,
}

/// Output of a single fit. Created fresh per call and never mutated by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub model_kind: ModelKind,
    pub parameters: Vec<NamedValue>,
    /// Standard (1σ) errors, same names and order as `parameters`; empty for FFT.
    pub uncertainties: Vec<NamedValue>,
    /// Covariance of (slope, intercept) in the space the line was fitted in.
    pub covariance: Option<[[f64; 2]; 2]>,
    pub r_squared: Option<f64>,
    pub r_squared_space: Option<ResidualSpace>,
    pub reduced_chi_square: Option<f64>,
    pub weighting: Weighting,
    pub n: usize,
    pub trace: Trace,
}

impl FitResult {
    pub fn parameter(&self, name: &str) -> Option<f64> {
        lookup(&self.parameters, name)
    }

    pub fn uncertainty(&self, name: &str) -> Option<f64> {
        lookup(&self.uncertainties, name)
    }

    /// Parameter values in `ModelKind::parameter_names` order.
    pub fn parameter_values(&self) -> Vec<f64> {
        self.parameters.iter().map(|p| p.value).collect()
    }

    /// Evaluate the fitted curve at `x`. `None` for spectra or outside the model domain.
    pub fn predict(&self, x: f64) -> Option<f64> {
        if self.model_kind == ModelKind::Fft {
            return None;
        }
        let y = crate::models::predict(self.model_kind, x, &self.parameter_values());
        y.is_finite().then_some(y)
    }

    pub fn predicted_y(&self) -> Option<&[f64]> {
        match &self.trace {
            Trace::Curve { predicted_y, .. } => Some(predicted_y),
            Trace::Spectrum { .. } => None,
        }
    }

    pub fn spectrum(&self) -> Option<&[SpectrumPoint]> {
        match &self.trace {
            Trace::Spectrum { points } => Some(points),
            Trace::Curve { .. } => None,
        }
    }
}

fn lookup(values: &[NamedValue], name: &str) -> Option<f64> {
    values.iter().find(|v| v.name == name).map(|v| v.value)
}

/// Engine options. The base models need nothing beyond `ModelKind`; these
/// knobs have defaults that reproduce the documented behavior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitOptions {
    /// Maximum relative deviation of any `x` spacing from the mean spacing (FFT).
    pub sampling_tolerance: f64,
    /// Number of dense samples in a fitted curve trace.
    pub curve_samples: usize,
    /// Passes of the `x_err` effective-variance fold. Pass 1 uses the
    /// unweighted slope; later passes use the previous pass's slope.
    pub x_err_passes: usize,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            sampling_tolerance: 1e-3,
            curve_samples: 100,
            x_err_passes: 1,
        }
    }
}

/// Names of the CSV columns mapped onto observation roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub x: String,
    pub y: String,
    pub x_err: Option<String>,
    pub y_err: Option<String>,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            x: "x".to_string(),
            y: "y".to_string(),
            x_err: Some("x_err".to_string()),
            y_err: Some("y_err".to_string()),
        }
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub csv_path: PathBuf,
    pub columns: ColumnMap,
    pub model_spec: ModelSpec,
    pub options: FitOptions,

    /// Synthesize `x = i / rate` instead of reading an `x` column.
    pub sampling_rate: Option<f64>,
    /// Constant uncertainty applied to every `x` lacking one.
    pub x_err_const: Option<f64>,
    /// Constant uncertainty applied to every `y` lacking one.
    pub y_err_const: Option<f64>,
    /// Drop rows that fail to parse instead of aborting.
    pub skip_invalid_rows: bool,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_result: Option<PathBuf>,
    pub export_trace: Option<PathBuf>,
}

/// A saved fit (JSON) handed to the report generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultFile {
    pub tool: String,
    pub version: String,
    pub generated_at: DateTime<Utc>,
    /// Input file the observations came from, when known.
    pub source: Option<String>,
    pub observations: Vec<Observation>,
    pub result: FitResult,
}

/// One measured input of a derived quantity.
///
/// `type_a` is the statistical (repeat-measurement) standard uncertainty and
/// `type_b` the instrument/systematic one. They are combined in quadrature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasuredVariable {
    pub name: String,
    pub value: f64,
    #[serde(default)]
    pub type_a: f64,
    #[serde(default)]
    pub type_b: f64,
    #[serde(default)]
    pub unit: Option<String>,
}

impl MeasuredVariable {
    pub fn new(name: impl Into<String>, value: f64, type_a: f64, type_b: f64) -> Self {
        Self {
            name: name.into(),
            value,
            type_a,
            type_b,
            unit: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// `sqrt(u_A² + u_B²)`.
    pub fn standard_uncertainty(&self) -> f64 {
        self.type_a.hypot(self.type_b)
    }
}

/// How much one variable feeds into the propagated uncertainty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableContribution {
    pub name: String,
    /// `∂f/∂x` at the measured point.
    pub partial: f64,
    pub type_a: f64,
    pub type_b: f64,
    /// `(∂f/∂x · u_A)²`
    pub a_contribution: f64,
    /// `(∂f/∂x · u_B)²`
    pub b_contribution: f64,
    pub total_contribution: f64,
    /// Share of the total variance, in percent.
    pub percent: f64,
}

/// First-order propagation of measurement uncertainties through a formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Propagation {
    /// Formula evaluated at the measured values.
    pub value: f64,
    /// Combined Type A uncertainty.
    pub u_a: f64,
    /// Combined Type B uncertainty.
    pub u_b: f64,
    /// `sqrt(u_A² + u_B²)`
    pub u_total: f64,
    /// `u_total / |value|`; absent when the value is zero.
    pub relative: Option<f64>,
    /// One entry per measured variable, in input order.
    pub contributions: Vec<VariableContribution>,
}

/// A saved propagation (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropagationFile {
    pub tool: String,
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub formula: String,
    pub measurements: Vec<MeasuredVariable>,
    pub propagation: Propagation,
}
