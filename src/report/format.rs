//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized

use crate::domain::{DatasetStats, FitResult, ModelKind, Propagation, ResidualSpace, Weighting};
use crate::fit::MultiFit;
use crate::io::ingest::IngestedData;
use crate::math::MeasurementWarning;
use crate::report::uncertainty::{format_sig, format_with_uncertainty};

/// One-line equation for plot legends, e.g.
/// `y = (2.00 ± 0.03)·x + (0.0 ± 0.1), R² = 0.999`.
pub fn equation_label(fit: &FitResult) -> String {
    let p = |name: &str| {
        let value = fit.parameter(name).unwrap_or(f64::NAN);
        let err = fit.uncertainty(name).unwrap_or(0.0);
        format!("({})", format_with_uncertainty(value, err))
    };

    let equation = match fit.model_kind {
        ModelKind::Linear => format!("y = {}·x + {}", p("slope"), p("intercept")),
        ModelKind::Logarithmic => format!("y = {}·ln(x) + {}", p("a"), p("b")),
        ModelKind::Power => format!("y = {}·x^{}", p("C"), p("k")),
        ModelKind::Fft => {
            let freq = fit.parameter("dominant_frequency").unwrap_or(f64::NAN);
            let amp = fit.parameter("dominant_amplitude").unwrap_or(f64::NAN);
            return format!("peak f = {}, A = {}", format_sig(freq, 4), format_sig(amp, 4));
        }
    };

    match fit.r_squared {
        Some(r2) => format!("{equation}, R² = {r2:.3}"),
        None => equation,
    }
}

/// Format the report for a single fit.
pub fn format_fit_summary(fit: &FitResult, stats: &DatasetStats) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== labfit - {} ===\n", fit.model_kind.display_name()));
    out.push_str(&format_stats_line(stats));
    out.push_str(&format!("Weighting: {}\n", weighting_label(fit.weighting)));

    out.push_str("\nParameters:\n");
    if fit.model_kind == ModelKind::Fft {
        for p in &fit.parameters {
            out.push_str(&format!("- {:<20} {}\n", p.name, format_sig(p.value, 6)));
        }
        if let Some(points) = fit.spectrum() {
            out.push_str(&format!("- {:<20} {}\n", "bins", points.len()));
        }
    } else {
        for p in &fit.parameters {
            let err = fit.uncertainty(&p.name).unwrap_or(0.0);
            out.push_str(&format!("- {:<10} {}\n", p.name, format_with_uncertainty(p.value, err)));
        }
    }

    if let Some(r2) = fit.r_squared {
        let note = match fit.r_squared_space {
            Some(ResidualSpace::Log) => " (computed on ln y)",
            _ => "",
        };
        out.push_str(&format!("\nR² = {r2:.4}{note}\n"));
    }
    if let Some(chi2) = fit.reduced_chi_square {
        out.push_str(&format!("χ²/ν = {chi2:.3} (ν = {})\n", fit.n.saturating_sub(2)));
    }
    if fit.model_kind != ModelKind::Fft {
        out.push_str(&format!("Equation: {}\n", equation_label(fit)));
    }

    out
}

/// Format a multi-model run, listing skipped models with their reason.
pub fn format_multi_summary(multi: &MultiFit, stats: &DatasetStats) -> String {
    let mut out = String::new();

    out.push_str("=== labfit - all curve models ===\n");
    out.push_str(&format_stats_line(stats));

    out.push_str("\nModels:\n");
    for fit in &multi.fits {
        let r2 = fit.r_squared.map(|r| format!("{r:.4}")).unwrap_or_else(|| "-".to_string());
        let space = match fit.r_squared_space {
            Some(ResidualSpace::Log) => " (ln y)",
            _ => "",
        };
        out.push_str(&format!("  {:<12} R²={r2}{space}\n", fit.model_kind.display_name()));
        out.push_str(&format!("    {}\n", equation_label(fit)));
    }
    for (kind, reason) in &multi.skipped {
        out.push_str(&format!("  (skipped {}) {reason}\n", kind.display_name()));
    }

    out
}

/// Summarize ingest problems (rows dropped with `--skip-invalid-rows`).
pub fn format_ingest_notes(ingest: &IngestedData) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Rows: read={} used={} dropped={}\n",
        ingest.rows_read,
        ingest.rows_used,
        ingest.row_errors.len()
    ));
    for e in ingest.row_errors.iter().take(MAX_ROW_ERRORS_SHOWN) {
        out.push_str(&format!("  line {}: {}\n", e.line, e.message));
    }
    if ingest.row_errors.len() > MAX_ROW_ERRORS_SHOWN {
        out.push_str(&format!(
            "  ... and {} more\n",
            ingest.row_errors.len() - MAX_ROW_ERRORS_SHOWN
        ));
    }
    out
}

const MAX_ROW_ERRORS_SHOWN: usize = 10;

/// Format an error-propagation breakdown.
pub fn format_propagation(formula: &str, p: &Propagation, warnings: &[MeasurementWarning]) -> String {
    let mut out = String::new();

    out.push_str("=== labfit - error propagation ===\n");
    out.push_str(&format!("Formula: {formula}\n"));
    out.push_str(&format!("Result: {}\n", format_with_uncertainty(p.value, p.u_total)));
    out.push_str(&format!("- {:<10} {}\n", "u_A", format_sig(p.u_a, 3)));
    out.push_str(&format!("- {:<10} {}\n", "u_B", format_sig(p.u_b, 3)));
    match p.relative {
        Some(r) => out.push_str(&format!("- {:<10} {:.2}%\n", "relative", r * 100.0)),
        None => out.push_str(&format!("- {:<10} n/a (value is zero)\n", "relative")),
    }

    out.push_str("\nContributions:\n");
    out.push_str(&format!(
        "  {:<10} {:>12} {:>10} {:>10} {:>8}\n",
        "variable", "df/dx", "u_A", "u_B", "share"
    ));
    for c in &p.contributions {
        out.push_str(&format!(
            "- {:<10} {:>12} {:>10} {:>10} {:>7.2}%\n",
            c.name,
            format_sig(c.partial, 4),
            format_sig(c.type_a, 2),
            format_sig(c.type_b, 2),
            c.percent
        ));
    }

    if !warnings.is_empty() {
        out.push_str("\nWarnings:\n");
        for w in warnings {
            out.push_str(&format!("- {w}\n"));
        }
    }

    out
}

fn format_stats_line(stats: &DatasetStats) -> String {
    format!(
        "Points: n={} | x=[{}, {}] | y=[{}, {}]\n",
        stats.n_points,
        format_sig(stats.x_min, 4),
        format_sig(stats.x_max, 4),
        format_sig(stats.y_min, 4),
        format_sig(stats.y_max, 4),
    )
}

fn weighting_label(w: Weighting) -> &'static str {
    match w {
        Weighting::Weighted => "inverse-variance (supplied uncertainties)",
        Weighting::Unweighted => "uniform (errors from residual scatter)",
        Weighting::None => "n/a",
    }
}
