//! First-order propagation of measurement uncertainties.
//!
//! For a derived quantity `f(x_1, ..., x_n)` with independent inputs:
//!
//! ```text
//! u_A(f)² = Σ (∂f/∂x_i · u_A(x_i))²
//! u_B(f)² = Σ (∂f/∂x_i · u_B(x_i))²
//! u(f)²   = u_A² + u_B²
//! ```
//!
//! Partial derivatives come from central differences with a step scaled to
//! each input, so any `Fn(&[f64]) -> f64` works. `Formula` wraps a user
//! expression (evalexpr syntax: `^` is exponentiation, functions live under
//! `math::`, e.g. `math::ln(x)`; integer literals divide as integers, so write
//! `0.5` rather than `1/2`).

use std::collections::HashSet;

use evalexpr::{ContextWithMutableVariables, DefaultNumericTypes, HashMapContext, Node, Value};
use log::debug;

use crate::domain::{MeasuredVariable, Propagation, VariableContribution};
use crate::error::PropagationError;

/// Relative uncertainty above which a measurement looks suspicious.
pub const MAX_PLAUSIBLE_RELATIVE: f64 = 0.5;
/// Relative uncertainty below which a measurement looks underestimated.
pub const MIN_PLAUSIBLE_RELATIVE: f64 = 1e-3;

/// A parsed user formula.
#[derive(Debug, Clone)]
pub struct Formula {
    source: String,
    tree: Node<DefaultNumericTypes>,
    variables: Vec<String>,
}

impl Formula {
    pub fn parse(source: &str) -> Result<Self, PropagationError> {
        let tree = evalexpr::build_operator_tree::<DefaultNumericTypes>(source)
            .map_err(|e| PropagationError::Formula(e.to_string()))?;

        let mut variables: Vec<String> = tree.iter_variable_identifiers().map(str::to_string).collect();
        variables.sort();
        variables.dedup();

        Ok(Self {
            source: source.trim().to_string(),
            tree,
            variables,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Variable names used by the formula, sorted.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Evaluate with `values[i]` bound to `variables[i].name`.
    pub fn eval(&self, variables: &[MeasuredVariable], values: &[f64]) -> Result<f64, PropagationError> {
        let mut context = HashMapContext::<DefaultNumericTypes>::new();
        for (var, &value) in variables.iter().zip(values) {
            context
                .set_value(var.name.clone(), Value::Float(value))
                .map_err(|e| PropagationError::Formula(e.to_string()))?;
        }
        self.tree
            .eval_number_with_context(&context)
            .map_err(|e| PropagationError::Formula(e.to_string()))
    }
}

/// Propagate the uncertainties of `variables` through `formula`.
///
/// Every variable the formula names must be measured. Measured variables the
/// formula ignores get a zero partial derivative.
pub fn propagate_formula(formula: &Formula, variables: &[MeasuredVariable]) -> Result<Propagation, PropagationError> {
    if let Some(missing) = formula
        .variables()
        .iter()
        .find(|name| !variables.iter().any(|v| &v.name == *name))
    {
        return Err(PropagationError::UnknownVariable(missing.clone()));
    }
    propagate(variables, |values| formula.eval(variables, values))
}

/// Propagate the uncertainties of `variables` through `f`.
///
/// `f` receives the input values in the order of `variables`.
pub fn propagate<F>(variables: &[MeasuredVariable], f: F) -> Result<Propagation, PropagationError>
where
    F: Fn(&[f64]) -> Result<f64, PropagationError>,
{
    check_variables(variables)?;

    let nominal: Vec<f64> = variables.iter().map(|v| v.value).collect();
    let value = finite(f(&nominal)?, || "at the measured values".to_string())?;

    let step_scale = f64::EPSILON.cbrt();
    let mut shifted = nominal.clone();
    let mut contributions = Vec::with_capacity(variables.len());

    for (i, var) in variables.iter().enumerate() {
        let h = step_scale * var.value.abs().max(1.0);

        shifted[i] = var.value + h;
        let upper = finite(f(&shifted)?, || format!("at {} = {}", var.name, var.value + h))?;
        shifted[i] = var.value - h;
        let lower = finite(f(&shifted)?, || format!("at {} = {}", var.name, var.value - h))?;
        shifted[i] = var.value;

        let partial = (upper - lower) / (2.0 * h);
        let a_contribution = (partial * var.type_a).powi(2);
        let b_contribution = (partial * var.type_b).powi(2);
        debug!("∂f/∂{} = {partial}", var.name);

        contributions.push(VariableContribution {
            name: var.name.clone(),
            partial,
            type_a: var.type_a,
            type_b: var.type_b,
            a_contribution,
            b_contribution,
            total_contribution: a_contribution + b_contribution,
            percent: 0.0,
        });
    }

    let var_a: f64 = contributions.iter().map(|c| c.a_contribution).sum();
    let var_b: f64 = contributions.iter().map(|c| c.b_contribution).sum();
    let total = var_a + var_b;
    if total > 0.0 {
        for c in &mut contributions {
            c.percent = c.total_contribution / total * 100.0;
        }
    }

    let u_total = total.sqrt();
    Ok(Propagation {
        value,
        u_a: var_a.sqrt(),
        u_b: var_b.sqrt(),
        u_total,
        relative: (value != 0.0).then(|| u_total / value.abs()),
        contributions,
    })
}

fn finite(v: f64, at: impl FnOnce() -> String) -> Result<f64, PropagationError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(PropagationError::NonFiniteResult { at: at() })
    }
}

fn check_variables(variables: &[MeasuredVariable]) -> Result<(), PropagationError> {
    if variables.is_empty() {
        return Err(PropagationError::NoVariables);
    }
    let mut seen = HashSet::new();
    for v in variables {
        if !seen.insert(v.name.as_str()) {
            return Err(PropagationError::DuplicateVariable(v.name.clone()));
        }
        if !v.value.is_finite() {
            return Err(PropagationError::NonFiniteValue { name: v.name.clone() });
        }
        for (kind, u) in [("Type A", v.type_a), ("Type B", v.type_b)] {
            if !(u.is_finite() && u >= 0.0) {
                return Err(PropagationError::InvalidUncertainty {
                    name: v.name.clone(),
                    kind,
                    value: u,
                });
            }
        }
    }
    Ok(())
}

/// A plausibility concern about one measurement. These never block a run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeasurementWarning {
    #[error("{name}: relative uncertainty {:.1}% is large; check for a measurement error", .relative * 100.0)]
    RelativeTooLarge { name: String, relative: f64 },

    #[error("{name}: relative uncertainty {:.2}% is small; the error may be underestimated", .relative * 100.0)]
    RelativeTooSmall { name: String, relative: f64 },

    #[error("{name}: uncertainties must not be negative")]
    NegativeUncertainty { name: String },

    #[error("{name}: no unit given")]
    MissingUnit { name: String },
}

/// Plausibility checks on measured inputs.
pub fn validate_measurements(variables: &[MeasuredVariable]) -> Vec<MeasurementWarning> {
    let mut warnings = Vec::new();
    for v in variables {
        let name = || v.name.clone();
        if v.value != 0.0 {
            let relative = v.standard_uncertainty() / v.value.abs();
            if relative > MAX_PLAUSIBLE_RELATIVE {
                warnings.push(MeasurementWarning::RelativeTooLarge { name: name(), relative });
            } else if relative < MIN_PLAUSIBLE_RELATIVE {
                warnings.push(MeasurementWarning::RelativeTooSmall { name: name(), relative });
            }
        }
        if v.type_a < 0.0 || v.type_b < 0.0 {
            warnings.push(MeasurementWarning::NegativeUncertainty { name: name() });
        }
        if v.unit.as_deref().is_none_or(|u| u.trim().is_empty()) {
            warnings.push(MeasurementWarning::MissingUnit { name: name() });
        }
    }
    warnings
}
