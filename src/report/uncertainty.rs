//! Rounding of `value ± uncertainty` pairs for display.
//!
//! Convention:
//! - the uncertainty keeps two significant figures when its leading digit is
//!   1, otherwise one
//! - the value is rounded to the same decimal place as the uncertainty
//! - if rounding changes the uncertainty's leading digit (0.0196 -> 0.020,
//!   0.0096 -> 0.010) the rule is applied again to the rounded uncertainty
//!
//! The last step makes formatting idempotent: parsing `"v ± u"` back and
//! formatting it again yields the same text.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Significant figures used for a value with no usable uncertainty.
const BARE_SIG_FIGS: i32 = 4;

/// Format `value ± uncertainty` with the rounding convention above.
pub fn format_with_uncertainty(value: f64, uncertainty: f64) -> String {
    let (v, u) = format_parts(value, uncertainty);
    format!("{v} ± {u}")
}

/// Same as `format_with_uncertainty` but returns the two rounded strings.
///
/// A zero or non-finite uncertainty prints the value to four significant
/// figures and the uncertainty as `"0"`.
pub fn format_parts(value: f64, uncertainty: f64) -> (String, String) {
    let u = uncertainty.abs();
    if !(u.is_finite() && u > 0.0) {
        return (format_sig(value, BARE_SIG_FIGS), "0".to_string());
    }
    if !value.is_finite() {
        return (format!("{value}"), format_sig(u, 2));
    }

    let decimals = uncertainty_decimals(u);
    (format_fixed(value, decimals), format_fixed(u, decimals))
}

/// Decimal place (may be negative) that the uncertainty is rounded to.
fn uncertainty_decimals(u: f64) -> i32 {
    // Rounding can change the leading digit (0.0196 -> 0.020, 0.0096 -> 0.010);
    // the rule is then re-applied to the rounded value.
    decimals_for(round_to(u, decimals_for(u)))
}

fn decimals_for(u: f64) -> i32 {
    let exp = decade(u);
    let leading = u / 10f64.powi(exp);
    let sig = if leading < 2.0 - REL_EPS { 2 } else { 1 };
    sig - 1 - exp
}

/// Relative slack for decade and leading-digit decisions on rounded inputs.
const REL_EPS: f64 = 1e-9;

/// `floor(log10(|v|))`, corrected for floating-point error at exact powers of ten.
fn decade(v: f64) -> i32 {
    let v = v.abs();
    let mut exp = v.log10().floor() as i32;
    let scaled = v / 10f64.powi(exp);
    if scaled >= 10.0 * (1.0 - REL_EPS) {
        exp += 1;
    } else if scaled < 1.0 - REL_EPS {
        exp -= 1;
    }
    exp
}

fn round_to(v: f64, decimals: i32) -> f64 {
    if decimals >= 0 {
        let scale = 10f64.powi(decimals);
        (v * scale).round() / scale
    } else {
        let scale = 10f64.powi(-decimals);
        (v / scale).round() * scale
    }
}

fn format_fixed(v: f64, decimals: i32) -> String {
    let mut rounded = round_to(v, decimals);
    if rounded == 0.0 {
        // Avoid printing "-0.00".
        rounded = 0.0;
    }
    let places = decimals.max(0) as usize;
    format!("{rounded:.places$}")
}

/// Format `v` with `sig` significant figures in positional notation.
pub fn format_sig(v: f64, sig: i32) -> String {
    if !v.is_finite() {
        return format!("{v}");
    }
    if v == 0.0 {
        return "0".to_string();
    }
    format_fixed(v, sig - 1 - decade(v))
}

/// A measured quantity with its standard uncertainty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub value: f64,
    pub uncertainty: f64,
}

impl Measurement {
    pub fn new(value: f64, uncertainty: f64) -> Self {
        Self { value, uncertainty }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_with_uncertainty(self.value, self.uncertainty))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseMeasurementError {
    #[error("expected `value ± uncertainty` or `value +/- uncertainty`, got '{0}'")]
    MissingSeparator(String),
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
}

impl FromStr for Measurement {
    type Err = ParseMeasurementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (v, u) = s
            .split_once('±')
            .or_else(|| s.split_once("+/-"))
            .ok_or_else(|| ParseMeasurementError::MissingSeparator(s.to_string()))?;

        let parse = |t: &str| {
            let t = t.trim();
            t.parse::<f64>()
                .map_err(|_| ParseMeasurementError::InvalidNumber(t.to_string()))
        };
        Ok(Measurement::new(parse(v)?, parse(u)?))
    }
}
