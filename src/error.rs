//! Error types.
//!
//! - `FitError`: typed failures of the fitting engine. Every variant names the
//!   check that failed and, where it applies, the axis and sample index.
//! - `PropagationError`: failures of first-order error propagation through a
//!   formula, naming the offending variable.
//! - `AppError`: process-level error with an exit code, used by the CLI,
//!   ingest and export layers.
//!
//! Exit codes: 2 = input/IO, 3 = data rejected by validation, 4 = numerical
//! failure (degenerate system, unusable sampling).

use crate::domain::{Axis, ModelKind};

/// Coarse error category, matching the failure kinds callers act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitErrorKind {
    Validation,
    InvalidDomain,
    DegenerateFit,
    NonUniformSampling,
    InsufficientData,
}

/// Failure of a single fit invocation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitError {
    #[error("need at least {min} observations, got {got}")]
    TooFewPoints { got: usize, min: usize },

    #[error("`{axis}` has {got} values but `x` has {expected}")]
    LengthMismatch { axis: Axis, expected: usize, got: usize },

    #[error("non-finite `{axis}` value at index {index}")]
    NonFinite { axis: Axis, index: usize },

    #[error("negative uncertainty `{axis}[{index}]` = {value}")]
    NegativeUncertainty { axis: Axis, index: usize, value: f64 },

    /// A point carries uncertainties that fold to zero variance, which would
    /// give it infinite weight.
    #[error("zero effective variance at index {index}: a weighted point needs a positive uncertainty")]
    ZeroVariance { index: usize },

    #[error("{model} fit requires `{axis}` > 0, but `{axis}[{index}]` = {value}")]
    InvalidDomain {
        model: ModelKind,
        axis: Axis,
        index: usize,
        value: f64,
    },

    #[error("normal equations are singular (delta = {delta:e}): the fit has no unique solution")]
    DegenerateFit { delta: f64 },

    #[error(
        "non-uniform sampling: spacing {spacing} at index {index} deviates from the mean spacing {mean} by more than {tolerance} (relative)"
    )]
    NonUniformSampling {
        index: usize,
        spacing: f64,
        mean: f64,
        tolerance: f64,
    },

    #[error("`x` must increase for spectral analysis (mean spacing = {mean})")]
    NonIncreasingSampling { mean: f64 },

    #[error("spectral analysis needs at least {min} samples, got {got}")]
    InsufficientData { got: usize, min: usize },
}

impl FitError {
    pub fn kind(&self) -> FitErrorKind {
        match self {
            FitError::TooFewPoints { .. }
            | FitError::LengthMismatch { .. }
            | FitError::NonFinite { .. }
            | FitError::NegativeUncertainty { .. }
            | FitError::ZeroVariance { .. } => FitErrorKind::Validation,
            FitError::InvalidDomain { .. } => FitErrorKind::InvalidDomain,
            FitError::DegenerateFit { .. } => FitErrorKind::DegenerateFit,
            FitError::NonUniformSampling { .. } | FitError::NonIncreasingSampling { .. } => {
                FitErrorKind::NonUniformSampling
            }
            FitError::InsufficientData { .. } => FitErrorKind::InsufficientData,
        }
    }
}

/// Failure of an error-propagation run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PropagationError {
    #[error("no measured variables supplied")]
    NoVariables,

    #[error("variable `{0}` is listed more than once")]
    DuplicateVariable(String),

    #[error("variable `{name}` has a non-finite value")]
    NonFiniteValue { name: String },

    #[error("variable `{name}` has {kind} uncertainty {value}; it must be finite and >= 0")]
    InvalidUncertainty {
        name: String,
        kind: &'static str,
        value: f64,
    },

    #[error("formula uses `{0}`, which has no measurement")]
    UnknownVariable(String),

    #[error("invalid formula: {0}")]
    Formula(String),

    #[error("formula evaluates to a non-finite value {at}")]
    NonFiniteResult { at: String },
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        let exit_code = match err.kind() {
            FitErrorKind::Validation | FitErrorKind::InvalidDomain | FitErrorKind::InsufficientData => 3,
            FitErrorKind::DegenerateFit | FitErrorKind::NonUniformSampling => 4,
        };
        AppError::new(exit_code, format!("Fit failed: {err}"))
    }
}

impl From<PropagationError> for AppError {
    fn from(err: PropagationError) -> Self {
        let exit_code = match err {
            PropagationError::Formula(_) | PropagationError::UnknownVariable(_) => 2,
            _ => 3,
        };
        AppError::new(exit_code, format!("Propagation failed: {err}"))
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
