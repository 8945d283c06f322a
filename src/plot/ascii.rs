//! ASCII/Unicode plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - observed points: `o`
//! - `y` error bars: `|`
//! - fitted curve or spectrum: `-` line
//! - dominant spectral peak: `^`

use crate::domain::{FitResult, Observation, ResultFile, Trace};

/// Render a plot for an in-memory fit result.
///
/// Curve fits overlay the observations on the fitted curve. Spectra plot
/// amplitude against frequency and mark the dominant peak.
pub fn render_ascii_plot(observations: &[Observation], fit: &FitResult, width: usize, height: usize) -> String {
    match &fit.trace {
        Trace::Curve { samples, .. } => {
            let curve: Vec<(f64, f64)> = samples.iter().map(|p| (p.x, p.y)).collect();
            let xs = observations.iter().map(|p| p.x).chain(curve.iter().map(|c| c.0));
            let (x_min, x_max) = range(xs).unwrap_or((0.0, 1.0));
            render_plot(observations, &curve, None, x_min, x_max, width, height)
        }
        Trace::Spectrum { points } => {
            let curve: Vec<(f64, f64)> = points.iter().map(|p| (p.frequency, p.amplitude)).collect();
            let (x_min, x_max) = range(curve.iter().map(|c| c.0)).unwrap_or((0.0, 1.0));
            let peak = fit
                .parameter("dominant_frequency")
                .zip(fit.parameter("dominant_amplitude"));
            render_plot(&[], &curve, peak, x_min, x_max, width, height)
        }
    }
}

/// Render a plot from a saved result JSON file.
pub fn render_ascii_plot_from_result_file(file: &ResultFile, width: usize, height: usize) -> String {
    render_ascii_plot(&file.observations, &file.result, width, height)
}

fn render_plot(
    observations: &[Observation],
    curve: &[(f64, f64)],
    peak: Option<(f64, f64)>,
    x_min: f64,
    x_max: f64,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    // Determine y-range from observed points (with error bars) and curve points.
    let ys = observations
        .iter()
        .flat_map(|p| {
            let e = p.y_err.unwrap_or(0.0);
            [p.y - e, p.y + e]
        })
        .chain(curve.iter().map(|c| c.1));
    let (y_min, y_max) = range(ys).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Draw curve first (so points can overlay).
    draw_curve(&mut grid, curve, x_min, x_max, y_min, y_max);

    for p in observations {
        let x = map_x(p.x, x_min, x_max, width);
        if let Some(err) = p.y_err.filter(|e| *e > 0.0) {
            let top = map_y(p.y + err, y_min, y_max, height);
            let bottom = map_y(p.y - err, y_min, y_max, height);
            for row in grid.iter_mut().take(bottom + 1).skip(top) {
                row[x] = '|';
            }
        }
        grid[map_y(p.y, y_min, y_max, height)][x] = 'o';
    }

    if let Some((f, a)) = peak {
        grid[map_y(a, y_min, y_max, height)][map_x(f, x_min, x_max, width)] = '^';
    }

    // Build final string. We include a small header with ranges.
    let mut out = String::new();
    out.push_str(&format!(
        "Plot: x=[{x_min:.3}, {x_max:.3}] | y=[{y_min:.3}, {y_max:.3}]\n"
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

fn range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values.filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
    }
    if min.is_finite() && max.is_finite() && max > min {
        Some((min, max))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], x_min: f64, x_max: f64, y_min: f64, y_max: f64) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(cx, y) in curve.iter().filter(|(cx, y)| cx.is_finite() && y.is_finite()) {
        let x = map_x(cx, x_min, x_max, width);
        let yy = map_y(y, y_min, y_max, height);
        if let Some((x0, y0)) = prev {
            draw_line(grid, x0, y0, x, yy, '-');
        } else {
            grid[yy][x] = '-';
        }
        prev = Some((x, yy));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CurvePoint, ModelKind, NamedValue, ResidualSpace, SpectrumPoint, Weighting};

    fn flat_fit() -> FitResult {
        FitResult {
            model_kind: ModelKind::Linear,
            parameters: vec![NamedValue::new("slope", 0.0), NamedValue::new("intercept", 100.0)],
            uncertainties: vec![NamedValue::new("slope", 0.0), NamedValue::new("intercept", 0.0)],
            covariance: None,
            r_squared: Some(0.0),
            r_squared_space: Some(ResidualSpace::Linear),
            reduced_chi_square: None,
            weighting: Weighting::Unweighted,
            n: 2,
            trace: Trace::Curve {
                predicted_y: vec![100.0, 100.0],
                samples: vec![CurvePoint { x: 1.0, y: 100.0 }, CurvePoint { x: 10.0, y: 100.0 }],
            },
        }
    }

    #[test]
    fn plot_golden_snapshot_small() {
        let points = vec![Observation::new(1.0, 100.0), Observation::new(10.0, 110.0)];

        let txt = render_ascii_plot(&points, &flat_fit(), 10, 5);
        let expected = concat!(
            "Plot: x=[1.000, 10.000] | y=[99.500, 110.500]\n",
            "         o\n",
            "          \n",
            "          \n",
            "          \n",
            "o---------\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn error_bars_span_rows() {
        let points = vec![
            Observation::new(1.0, 100.0),
            Observation {
                y_err: Some(5.0),
                ..Observation::new(10.0, 105.0)
            },
        ];
        let txt = render_ascii_plot(&points, &flat_fit(), 10, 5);
        let column: String = txt.lines().skip(1).map(|l| l.chars().nth(9).unwrap_or(' ')).collect();
        assert_eq!(column, "||o||");
    }

    #[test]
    fn spectrum_marks_peak() {
        let fit = FitResult {
            model_kind: ModelKind::Fft,
            parameters: vec![
                NamedValue::new("sampling_interval", 0.25),
                NamedValue::new("dominant_frequency", 1.0),
                NamedValue::new("dominant_amplitude", 2.0),
            ],
            uncertainties: Vec::new(),
            covariance: None,
            r_squared: None,
            r_squared_space: None,
            reduced_chi_square: None,
            weighting: Weighting::None,
            n: 4,
            trace: Trace::Spectrum {
                points: vec![
                    SpectrumPoint { frequency: 0.0, amplitude: 0.0 },
                    SpectrumPoint { frequency: 1.0, amplitude: 2.0 },
                    SpectrumPoint { frequency: 2.0, amplitude: 0.0 },
                ],
            },
        };
        let txt = render_ascii_plot(&[], &fit, 11, 5);
        assert!(txt.lines().nth(1).unwrap_or("").contains('^'));
    }
}
