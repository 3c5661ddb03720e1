//! SVG diagrams of a baseline network.
//!
//! Plotting is an optional feature; without it the functions here return a
//! configuration error instead of drawing.

use crate::core::pair_selection::PairNetwork;
use crate::types::{SarResult, Scene};
use std::path::{Path, PathBuf};

/// File name of the network diagram for a project
pub fn network_plot_file_name(project: &str) -> String {
    format!("{}_network.svg", project)
}

/// Draw the network: every Delaunay edge dashed, selected pairs solid,
/// scenes as markers and the event date (if any) as a vertical line.
/// Writes `<project>_network.svg` into `output_dir`.
pub fn plot_network<P: AsRef<Path>>(network: &PairNetwork, project: &str, output_dir: P) -> SarResult<PathBuf> {
    let output = output_dir.as_ref().join(network_plot_file_name(project));
    plotting::draw_network(network, project, &output)?;
    log::info!("Network plot written to {}", output.display());
    Ok(output)
}

/// Draw perpendicular baseline against acquisition date
pub fn plot_baselines<P: AsRef<Path>>(scenes: &[Scene], output: P) -> SarResult<PathBuf> {
    let output = output.as_ref().to_path_buf();
    plotting::draw_baselines(scenes, &output)?;
    log::info!("Baseline plot written to {}", output.display());
    Ok(output)
}

#[cfg(not(feature = "plotting"))]
mod plotting {
    use super::*;
    use crate::types::SarError;

    fn no_plotting() -> SarError {
        SarError::Config("gmtsar-stack was not compiled with the \"plotting\" feature".to_string())
    }

    pub(super) fn draw_network(_network: &PairNetwork, _project: &str, _output: &Path) -> SarResult<()> {
        Err(no_plotting())
    }

    pub(super) fn draw_baselines(_scenes: &[Scene], _output: &Path) -> SarResult<()> {
        Err(no_plotting())
    }
}

#[cfg(feature = "plotting")]
mod plotting {
    use super::*;
    use crate::types::{Pair, SarError};
    use chrono::{Duration, NaiveDate};
    use plotters::coord::ranged1d::Ranged;
    use plotters::coord::types::RangedCoordf64;
    use plotters::prelude::*;
    use std::ops::Range;

    const PLOT_SIZE: (u32, u32) = (1200, 800);
    const EDGE_GREY: RGBColor = RGBColor(128, 128, 128);
    const GRID_GREY: RGBColor = RGBColor(200, 200, 200);
    /// Dashes per unit of normalised segment length
    const DASHES_PER_UNIT: f64 = 40.0;

    fn draw_error<E: std::fmt::Display>(e: E) -> SarError {
        SarError::Processing(format!("Error from the plotters library: {}", e))
    }

    /// Padded range covering `values`
    pub(super) fn axis_range(values: impl Iterator<Item = f64>) -> Range<f64> {
        let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if !min.is_finite() || !max.is_finite() {
            return 0.0..1.0;
        }
        let pad = if max > min { (max - min) * 0.05 } else { 1.0 };
        (min - pad)..(max + pad)
    }

    /// Split a segment into dashes, spacing them by the segment's length
    /// relative to the axis spans
    pub(super) fn dash_segments(
        from: (f64, f64),
        to: (f64, f64),
        spans: (f64, f64),
    ) -> Vec<[(f64, f64); 2]> {
        let length = (((to.0 - from.0) / spans.0).powi(2) + ((to.1 - from.1) / spans.1).powi(2)).sqrt();
        let pieces = ((length * DASHES_PER_UNIT).ceil() as usize).max(1) * 2 - 1;
        let at = |k: usize| {
            let f = k as f64 / pieces as f64;
            (from.0 + f * (to.0 - from.0), from.1 + f * (to.1 - from.1))
        };
        (0..pieces).step_by(2).map(|k| [at(k), at(k + 1)]).collect()
    }

    fn day_label(first: NaiveDate, day: f64) -> String {
        first
            .checked_add_signed(Duration::days(day.round() as i64))
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }

    pub(super) fn draw_network(network: &PairNetwork, project: &str, output: &Path) -> SarResult<()> {
        let dates = network.dates();
        let pbase = network.perpendicular_baselines();
        let Some(&first) = dates.iter().min() else {
            return Err(SarError::Processing("Cannot plot a network without scenes".to_string()));
        };
        let day = |d: NaiveDate| (d - first).num_days() as f64;
        let xy = |i: usize| (day(dates[i]), pbase[i]);

        let x_range = axis_range(dates.iter().map(|&d| day(d)).chain(network.event.map(day)));
        let y_range = axis_range(pbase.iter().copied());
        let spans = (x_range.end - x_range.start, y_range.end - y_range.start);

        let root = SVGBackend::new(output, PLOT_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(draw_error)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(format!("SBAS Network - {}", project), ("sans-serif", 28))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(x_range.clone(), y_range.clone())
            .map_err(draw_error)?;

        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc("Date")
            .y_desc("Perpendicular Baseline (m)")
            .x_label_formatter(&|x| day_label(first, *x))
            .draw()
            .map_err(draw_error)?;

        let dashes = network.geometry_edges.iter().flat_map(|&Pair(a, b)| dash_segments(xy(a), xy(b), spans));
        chart
            .draw_series(dashes.map(|dash| PathElement::new(dash.to_vec(), EDGE_GREY.stroke_width(1))))
            .map_err(draw_error)?;

        chart
            .draw_series(
                network
                    .selected
                    .iter()
                    .map(|&Pair(a, b)| PathElement::new(vec![xy(a), xy(b)], BLUE.stroke_width(2))),
            )
            .map_err(draw_error)?;

        chart
            .draw_series(PointSeries::of_element(
                (0..dates.len()).map(xy),
                5,
                RED.filled(),
                &|coord, size, style| EmptyElement::at(coord) + Circle::new((0, 0), size, style),
            ))
            .map_err(draw_error)?;

        if let Some(event) = network.event {
            let x = day(event);
            chart
                .draw_series(std::iter::once(PathElement::new(
                    vec![(x, y_range.start), (x, y_range.end)],
                    GREEN.stroke_width(2),
                )))
                .map_err(draw_error)?;
            chart
                .draw_series(std::iter::once(Text::new(
                    "Event",
                    (x, y_range.start + 0.02 * spans.1),
                    ("sans-serif", 16).into_font().color(&GREEN),
                )))
                .map_err(draw_error)?;
        }

        root.present().map_err(draw_error)?;
        Ok(())
    }

    pub(super) fn draw_baselines(scenes: &[Scene], output: &Path) -> SarResult<()> {
        let mut points: Vec<(NaiveDate, f64)> = scenes.iter().map(|s| (s.date, s.perpendicular_baseline)).collect();
        points.sort_by_key(|p| p.0);
        let Some(&(first, _)) = points.first() else {
            return Err(SarError::Processing("Cannot plot an empty baseline table".to_string()));
        };
        let xy: Vec<(f64, f64)> = points.iter().map(|&(d, b)| ((d - first).num_days() as f64, b)).collect();

        let x_range = axis_range(xy.iter().map(|p| p.0));
        let y_range = axis_range(xy.iter().map(|p| p.1));
        let spans = (x_range.end - x_range.start, y_range.end - y_range.start);

        let root = SVGBackend::new(output, PLOT_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(draw_error)?;

        let mut chart = ChartBuilder::on(&root)
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(x_range.clone(), y_range.clone())
            .map_err(draw_error)?;

        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc("tbase (date)")
            .y_desc("bperp(m)")
            .x_label_formatter(&|x| day_label(first, *x))
            .draw()
            .map_err(draw_error)?;

        // Dashed horizontal grid on the y tick positions
        let ticks = RangedCoordf64::from(y_range).key_points(10);
        let grid = ticks
            .into_iter()
            .flat_map(|y| dash_segments((x_range.start, y), (x_range.end, y), spans));
        chart
            .draw_series(grid.map(|dash| PathElement::new(dash.to_vec(), GRID_GREY.stroke_width(1))))
            .map_err(draw_error)?;

        chart
            .draw_series(LineSeries::new(xy.iter().copied(), RED.stroke_width(1)))
            .map_err(draw_error)?;
        chart
            .draw_series(PointSeries::of_element(
                xy.iter().copied(),
                4,
                RED.filled(),
                &|coord, size, style| EmptyElement::at(coord) + Circle::new((0, 0), size, style),
            ))
            .map_err(draw_error)?;

        root.present().map_err(draw_error)?;
        Ok(())
    }

}
