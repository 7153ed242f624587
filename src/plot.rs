//! Rendering the phase-plot figure.
//!
//! Each statistic matrix is drawn as a pseudocolor panel over the swept
//! parameters, `g` on the horizontal axis and `eta` on the vertical axis,
//! with a diverging red-to-blue color scale from 0 to the statistic's
//! observed maximum and a color bar strip next to each panel. The figure is
//! written as SVG, which keeps the renderer free of system font dependencies.

use std::path::PathBuf;

use nalgebra::DMatrix;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters_svg::SVGBackend;

use crate::config::Config;
use crate::error::SweepError;
use crate::grid::PhaseGrid;

/// Width of the color bar strip, as a share of each panel.
const PANEL_SPLIT_PERCENT: i32 = 84;
/// Number of gradient slabs used to draw a color bar.
const COLORBAR_SLABS: usize = 64;

/// Render one panel per statistic held by the grid and write the figure into
/// the results directory. Returns the path of the written file.
pub fn render_phase_plots(config: &Config, grid: &PhaseGrid) -> Result<PathBuf, SweepError> {
    let path = config.figure_file();

    let (rows, cols, size) = match grid.num_statistics() {
        0 => {
            return Err(SweepError::InvalidParameter(
                "The grid holds no statistic to plot.".to_string(),
            ))
        }
        1..=2 => (1, 2, (1200, 500)),
        _ => (2, 2, (1200, 1000)),
    };

    let root = SVGBackend::new(&path, size).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| SweepError::PlotError(e.to_string()))?;

    let areas = root.split_evenly((rows, cols));
    for (k, (name, matrix)) in grid.iter().enumerate() {
        draw_panel(&areas[k], name, matrix, grid, k == 0)?;
    }

    root.present()
        .map_err(|e| SweepError::PlotError(e.to_string()))?;
    Ok(path)
}

/// Draw one pseudocolor panel with its color bar. Axis descriptions are only
/// attached to the first panel.
fn draw_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    name: &str,
    matrix: &DMatrix<f64>,
    grid: &PhaseGrid,
    labelled: bool,
) -> Result<(), SweepError> {
    let (panel, bar) = area.split_horizontally((PANEL_SPLIT_PERCENT).percent_width());

    let xedges = bin_edges(grid.gvec());
    let yedges = bin_edges(grid.etavec());
    let vmax = matrix.max();

    let mut chart = ChartBuilder::on(&panel)
        .caption(panel_title(name), ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(45)
        .build_cartesian_2d(
            xedges[0]..xedges[xedges.len() - 1],
            yedges[0]..yedges[yedges.len() - 1],
        )
        .map_err(|e| SweepError::PlotError(e.to_string()))?;

    let mut mesh = chart.configure_mesh();
    mesh.disable_x_mesh().disable_y_mesh();
    if labelled {
        mesh.x_desc("g").y_desc("eta");
    }
    mesh.draw().map_err(|e| SweepError::PlotError(e.to_string()))?;

    let mut cells = Vec::with_capacity(matrix.nrows() * matrix.ncols());
    for i in 0..matrix.nrows() {
        for j in 0..matrix.ncols() {
            let level = if vmax > 0.0 { matrix[(i, j)] / vmax } else { 0.0 };
            cells.push(Rectangle::new(
                [(xedges[j], yedges[i]), (xedges[j + 1], yedges[i + 1])],
                rdbu(level).filled(),
            ));
        }
    }
    chart
        .draw_series(cells)
        .map_err(|e| SweepError::PlotError(e.to_string()))?;

    draw_colorbar(&bar, vmax)
}

/// Draw a vertical gradient bar with a value axis from 0 to the statistic's
/// observed maximum.
fn draw_colorbar<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    vmax: f64,
) -> Result<(), SweepError> {
    // a degenerate scale still gets a gradient over a unit axis
    let axis_max = if vmax > 0.0 { vmax } else { 1.0 };

    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .margin_top(35)
        .y_label_area_size(34)
        .build_cartesian_2d(0.0..1.0, 0.0..axis_max)
        .map_err(|e| SweepError::PlotError(e.to_string()))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .disable_x_axis()
        .draw()
        .map_err(|e| SweepError::PlotError(e.to_string()))?;

    let slabs = (0..COLORBAR_SLABS).map(|k| {
        let y0 = axis_max * k as f64 / COLORBAR_SLABS as f64;
        let y1 = axis_max * (k + 1) as f64 / COLORBAR_SLABS as f64;
        let level = (k as f64 + 0.5) / COLORBAR_SLABS as f64;
        Rectangle::new([(0.0, y0), (1.0, y1)], rdbu(level).filled())
    });
    chart
        .draw_series(slabs)
        .map_err(|e| SweepError::PlotError(e.to_string()))?;

    Ok(())
}

/// Human-readable panel title for a statistic name.
fn panel_title(name: &str) -> String {
    match name {
        "firing_rate" => "Firing rate".to_string(),
        "cv_isi" => "CV (ISI)".to_string(),
        "cc_mean" => "Mean correlation coefficient".to_string(),
        "spike_counts" => "Spike counts".to_string(),
        other => other.to_string(),
    }
}

/// Cell edges for a sorted sequence of parameter values: the midpoints between
/// consecutive values, clamped to the data extent at both ends. A single value
/// gets a unit-wide cell.
fn bin_edges(values: &[f64]) -> Vec<f64> {
    if values.len() == 1 {
        return vec![values[0] - 0.5, values[0] + 0.5];
    }
    let mut edges = Vec::with_capacity(values.len() + 1);
    edges.push(values[0]);
    for pair in values.windows(2) {
        edges.push(0.5 * (pair[0] + pair[1]));
    }
    edges.push(values[values.len() - 1]);
    edges
}

/// Diverging red-white-blue color scale over `[0, 1]`.
fn rdbu(level: f64) -> RGBColor {
    let level = level.clamp(0.0, 1.0);
    let (from, to, t) = if level < 0.5 {
        ((178u8, 24u8, 43u8), (247u8, 247u8, 247u8), 2.0 * level)
    } else {
        ((247u8, 247u8, 247u8), (33u8, 102u8, 172u8), 2.0 * level - 1.0)
    };
    RGBColor(
        lerp(from.0, to.0, t),
        lerp(from.1, to.1, t),
        lerp(from.2, to.2, t),
    )
}

fn lerp(from: u8, to: u8, t: f64) -> u8 {
    (from as f64 + (to as f64 - from as f64) * t).round() as u8
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::sweep::StatisticsRow;

    #[test]
    fn test_bin_edges() {
        assert_eq!(bin_edges(&[4.0]), vec![3.5, 4.5]);
        assert_eq!(bin_edges(&[4.0, 5.0, 7.0]), vec![4.0, 4.5, 6.0, 7.0]);
    }

    #[test]
    fn test_rdbu_endpoints() {
        assert_eq!(rdbu(0.0), RGBColor(178, 24, 43));
        assert_eq!(rdbu(0.5), RGBColor(247, 247, 247));
        assert_eq!(rdbu(1.0), RGBColor(33, 102, 172));
        // out-of-range levels are clamped
        assert_eq!(rdbu(-1.0), rdbu(0.0));
        assert_eq!(rdbu(2.0), rdbu(1.0));
    }

    #[test]
    fn test_render_phase_plots_smoke() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(dir.path()).unwrap();

        let mut rows = Vec::new();
        for eta in [1.0, 2.0] {
            for g in [3.0, 4.5, 6.0] {
                rows.push(StatisticsRow {
                    g,
                    eta,
                    output_file: PathBuf::from("run.json"),
                    spike_counts: 10,
                    firing_rate: g * eta,
                    cv_isi: 0.5,
                    cc_mean: None,
                });
            }
        }
        let grid = PhaseGrid::from_rows(&rows, &["firing_rate", "cv_isi"]).unwrap();

        let figure = render_phase_plots(&config, &grid).unwrap();
        assert_eq!(figure, dir.path().join("brunel_network_phase_plots.svg"));
        let metadata = std::fs::metadata(&figure).unwrap();
        assert!(metadata.len() > 0);
    }

    #[test]
    fn test_render_flat_statistic() {
        // a statistic whose maximum is zero renders as a flat panel
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(dir.path()).unwrap();

        let rows = vec![
            StatisticsRow {
                g: 3.0,
                eta: 1.0,
                output_file: PathBuf::from("run.json"),
                spike_counts: 0,
                firing_rate: 0.0,
                cv_isi: 0.0,
                cc_mean: None,
            },
            StatisticsRow {
                g: 4.0,
                eta: 2.0,
                output_file: PathBuf::from("run.json"),
                spike_counts: 0,
                firing_rate: 0.0,
                cv_isi: 0.0,
                cc_mean: None,
            },
        ];
        let grid = PhaseGrid::from_rows(&rows, &["firing_rate", "cv_isi"]).unwrap();
        assert!(render_phase_plots(&config, &grid).is_ok());
    }
}
