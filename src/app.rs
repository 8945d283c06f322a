//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and initializes logging
//! - parses CLI arguments
//! - runs the fit pipeline or an error propagation
//! - prints reports/plots
//! - writes optional exports

use std::fs::File;
use std::io::BufWriter;

use clap::Parser;

use crate::cli::{Command, FitArgs, PlotArgs, PropagateArgs, SimulateArgs};
use crate::data::synth::{SynthSpec, generate};
use crate::domain::{ColumnMap, FitOptions, RunConfig};
use crate::error::AppError;
use crate::io::export::{write_observations_csv, write_trace_csv};
use crate::io::measurements::load_measurements;
use crate::io::result::{
    build_propagation_file, build_result_file, read_result_json, write_propagation_json, write_result_json,
};
use crate::math::{Formula, propagate_formula, validate_measurements};
use crate::plot::{render_ascii_plot, render_ascii_plot_from_result_file};
use crate::report::{format_fit_summary, format_ingest_notes, format_multi_summary, format_propagation};

use self::pipeline::FitOutcome;

pub mod pipeline;

/// Entry point for the `labfit` binary.
pub fn run() -> Result<(), AppError> {
    // A missing `.env` is fine; it only supplies defaults.
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .try_init()
        .ok();

    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Plot(args) => handle_plot(args),
        Command::Simulate(args) => handle_simulate(args),
        Command::Propagate(args) => handle_propagate(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args)?;
    let run = pipeline::run_fit(&config)?;

    if !run.ingest.row_errors.is_empty() {
        println!("{}", format_ingest_notes(&run.ingest));
    }

    match &run.outcome {
        FitOutcome::Single(fit) => {
            println!("{}", format_fit_summary(fit, &run.ingest.stats));
            if config.plot {
                let observations = run.ingest.observations.points();
                println!(
                    "{}",
                    render_ascii_plot(observations, fit, config.plot_width, config.plot_height)
                );
            }

            // Optional exports.
            if let Some(path) = &config.export_result {
                let file = build_result_file(fit, &run.ingest.observations, Some(&config.csv_path));
                write_result_json(path, &file)?;
            }
            if let Some(path) = &config.export_trace {
                write_trace_csv(path, fit)?;
            }
        }
        FitOutcome::Multi(multi) => {
            println!("{}", format_multi_summary(multi, &run.ingest.stats));
        }
    }

    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let file = read_result_json(&args.result)?;
    println!("{}", render_ascii_plot_from_result_file(&file, args.width, args.height));
    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let [p0, p1] = args.params[..] else {
        return Err(AppError::new(2, "`--params` takes exactly two values."));
    };
    let spec = SynthSpec {
        model: args.model,
        params: [p0, p1],
        n: args.count,
        x_min: args.x_min,
        x_max: args.x_max,
        noise_sigma: args.noise,
        attach_y_err: !args.no_y_err,
        seed: args.seed,
    };
    let observations = generate(&spec)?;

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .map_err(|e| AppError::new(2, format!("Failed to create CSV '{}': {e}", path.display())))?;
            write_observations_csv(BufWriter::new(file), &observations)
        }
        None => write_observations_csv(std::io::stdout().lock(), &observations),
    }
}

fn handle_propagate(args: PropagateArgs) -> Result<(), AppError> {
    let formula = Formula::parse(&args.formula)?;
    let measurements = load_measurements(&args.measurements)?;

    let warnings = if args.no_warnings {
        Vec::new()
    } else {
        validate_measurements(&measurements)
    };
    let propagation = propagate_formula(&formula, &measurements)?;
    println!("{}", format_propagation(formula.source(), &propagation, &warnings));

    if let Some(path) = &args.export {
        let file = build_propagation_file(formula.source(), &measurements, &propagation);
        write_propagation_json(path, &file)?;
    }
    Ok(())
}

/// Map parsed CLI flags onto the pipeline's configuration.
pub fn run_config_from_args(args: &FitArgs) -> Result<RunConfig, AppError> {
    if !(args.sampling_tolerance.is_finite() && args.sampling_tolerance >= 0.0) {
        return Err(AppError::new(2, "Sampling tolerance must be finite and >= 0."));
    }
    for (flag, value) in [("--x-err-const", args.x_err_const), ("--y-err-const", args.y_err_const)] {
        if let Some(v) = value {
            if !(v.is_finite() && v >= 0.0) {
                return Err(AppError::new(2, format!("`{flag}` must be finite and >= 0 (got {v}).")));
            }
        }
    }
    let single_model = args.model.to_kind().is_some();
    if !single_model && (args.export_result.is_some() || args.export_trace.is_some()) {
        return Err(AppError::new(2, "Exports need a single model; pick one with `--model`."));
    }

    let columns = ColumnMap {
        x: args.x_col.clone(),
        y: args.y_col.clone(),
        x_err: (!args.no_errors).then(|| args.x_err_col.clone()),
        y_err: (!args.no_errors).then(|| args.y_err_col.clone()),
    };

    Ok(RunConfig {
        csv_path: args.csv.clone(),
        columns,
        model_spec: args.model,
        options: FitOptions {
            sampling_tolerance: args.sampling_tolerance,
            curve_samples: args.curve_samples,
            x_err_passes: args.x_err_passes.max(1),
        },
        sampling_rate: args.sampling_rate,
        x_err_const: if args.no_errors { None } else { args.x_err_const },
        y_err_const: if args.no_errors { None } else { args.y_err_const },
        skip_invalid_rows: args.skip_invalid_rows,
        plot: !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        export_result: args.export_result.clone(),
        export_trace: args.export_trace.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;

    fn fit_args(argv: &[&str]) -> FitArgs {
        let mut full = vec!["labfit", "fit"];
        full.extend_from_slice(argv);
        match Cli::parse_from(full).command {
            Command::Fit(args) => args,
            _ => panic!("expected fit"),
        }
    }

    #[test]
    fn no_errors_drops_uncertainty_columns() {
        let config = run_config_from_args(&fit_args(&["d.csv", "--no-errors", "--y-err-const", "0.1"])).unwrap();
        assert_eq!(config.columns.x_err, None);
        assert_eq!(config.columns.y_err, None);
        assert_eq!(config.y_err_const, None);
    }

    #[test]
    fn exports_require_single_model() {
        let err = run_config_from_args(&fit_args(&["d.csv", "--model", "all", "--export-trace", "t.csv"]))
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn no_plot_disables_plot() {
        let config = run_config_from_args(&fit_args(&["d.csv", "--no-plot"])).unwrap();
        assert!(!config.plot);
    }
}
