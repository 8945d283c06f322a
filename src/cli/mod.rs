//! Command-line parsing for the lab data fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::{ModelKind, ModelSpec};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "labfit", version, about = "Weighted curve fitting and uncertainty reporting for lab data")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit a model to a CSV file, print the report, and optionally plot/export.
    Fit(FitArgs),
    /// Plot a previously exported result JSON.
    Plot(PlotArgs),
    /// Generate a seeded synthetic data set as CSV.
    Simulate(SimulateArgs),
    /// Propagate measurement uncertainties through a formula.
    Propagate(PropagateArgs),
}

/// Options for fitting a CSV file.
#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Input CSV with a header row.
    #[arg(value_name = "CSV")]
    pub csv: PathBuf,

    /// Which model(s) to fit. `all` fits every curve model and skips inapplicable ones.
    #[arg(short = 'm', long, value_enum, default_value_t = ModelSpec::Linear)]
    pub model: ModelSpec,

    /// Column holding x.
    #[arg(long, default_value = "x")]
    pub x_col: String,

    /// Column holding y.
    #[arg(long, default_value = "y")]
    pub y_col: String,

    /// Column holding the x uncertainty (optional in the CSV).
    #[arg(long, default_value = "x_err")]
    pub x_err_col: String,

    /// Column holding the y uncertainty (optional in the CSV).
    #[arg(long, default_value = "y_err")]
    pub y_err_col: String,

    /// Ignore uncertainty columns and fit unweighted.
    #[arg(long)]
    pub no_errors: bool,

    /// Constant x uncertainty for rows that do not quote one.
    #[arg(long)]
    pub x_err_const: Option<f64>,

    /// Constant y uncertainty for rows that do not quote one (e.g. instrument resolution).
    #[arg(long)]
    pub y_err_const: Option<f64>,

    /// Synthesize x = i / rate instead of reading the x column.
    #[arg(long, value_name = "HZ")]
    pub sampling_rate: Option<f64>,

    /// Drop rows that fail to parse instead of aborting.
    #[arg(long)]
    pub skip_invalid_rows: bool,

    /// Maximum relative deviation of any x spacing from the mean (FFT).
    #[arg(long, env = "LABFIT_SAMPLING_TOLERANCE", default_value_t = 1e-3)]
    pub sampling_tolerance: f64,

    /// Number of samples in the exported fitted curve.
    #[arg(long, default_value_t = 100)]
    pub curve_samples: usize,

    /// Passes of the x-uncertainty effective-variance fold.
    #[arg(long, default_value_t = 1)]
    pub x_err_passes: usize,

    /// Disable the terminal plot (shown by default).
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Export the fit (observations + result) to JSON.
    #[arg(long = "export-result", value_name = "JSON")]
    pub export_result: Option<PathBuf>,

    /// Export the fitted curve or spectrum to CSV.
    #[arg(long = "export-trace", value_name = "CSV")]
    pub export_trace: Option<PathBuf>,
}

/// Options for plotting a saved result.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Result JSON file produced by `labfit fit --export-result`.
    #[arg(long, value_name = "JSON")]
    pub result: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

/// Options for synthetic data generation.
#[derive(Debug, Parser)]
pub struct SimulateArgs {
    /// Model to sample.
    #[arg(short = 'm', long, value_enum, default_value_t = ModelKind::Linear)]
    pub model: ModelKind,

    /// Model parameters in report order (fft: frequency amplitude).
    #[arg(long, num_args = 2, value_names = ["P0", "P1"], allow_negative_numbers = true, default_values_t = [2.0, 0.0])]
    pub params: Vec<f64>,

    /// Number of samples.
    #[arg(short = 'n', long, default_value_t = 20)]
    pub count: usize,

    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    pub x_min: f64,

    #[arg(long, default_value_t = 10.0, allow_negative_numbers = true)]
    pub x_max: f64,

    /// Standard deviation of the Gaussian y noise.
    #[arg(long, default_value_t = 0.1)]
    pub noise: f64,

    /// Do not write a y_err column.
    #[arg(long)]
    pub no_y_err: bool,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Output CSV (stdout when omitted).
    #[arg(short = 'o', long, value_name = "CSV")]
    pub output: Option<PathBuf>,
}

/// Options for error propagation.
#[derive(Debug, Parser)]
pub struct PropagateArgs {
    /// Formula in terms of the measured variables, e.g. `0.5 * m * v^2`.
    #[arg(value_name = "FORMULA")]
    pub formula: String,

    /// CSV with `name,value[,type_a,type_b,unit]` rows.
    #[arg(short = 'i', long, value_name = "CSV")]
    pub measurements: PathBuf,

    /// Do not print plausibility warnings about the measurements.
    #[arg(long)]
    pub no_warnings: bool,

    /// Export the breakdown to JSON.
    #[arg(long = "export", value_name = "JSON")]
    pub export: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_defaults() {
        let cli = Cli::parse_from(["labfit", "fit", "data.csv"]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.model, ModelSpec::Linear);
        assert_eq!(args.y_err_col, "y_err");
        assert!(!args.no_plot);
    }

    #[test]
    fn model_accepts_log_alias() {
        let cli = Cli::parse_from(["labfit", "fit", "d.csv", "--model", "log"]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.model, ModelSpec::Logarithmic);
    }

    #[test]
    fn plot_is_not_a_flag() {
        assert!(Cli::try_parse_from(["labfit", "fit", "d.csv", "--plot"]).is_err());
    }

    #[test]
    fn propagate_takes_formula_and_table() {
        let cli = Cli::parse_from(["labfit", "propagate", "m * g * h", "-i", "meas.csv"]);
        let Command::Propagate(args) = cli.command else {
            panic!("expected propagate");
        };
        assert_eq!(args.formula, "m * g * h");
        assert_eq!(args.measurements, PathBuf::from("meas.csv"));
        assert!(args.export.is_none());
    }

    #[test]
    fn simulate_takes_two_params() {
        let cli = Cli::parse_from(["labfit", "simulate", "-m", "power", "--params", "1.5", "-2"]);
        let Command::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(args.model, ModelKind::Power);
        assert_eq!(args.params, vec![1.5, -2.0]);
    }
}
