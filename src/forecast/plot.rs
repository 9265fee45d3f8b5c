//! Renders a fitted forecast as a PNG line chart.

use std::fs;
use std::path::{Path, PathBuf};

use plotters::prelude::*;

use crate::error::{Result, ScanError};
use crate::forecast::Forecast;

const PLOT_SIZE: (u32, u32) = (800, 600);

/// Draws the observed series together with both projections and the
/// acceptance band for the target date. Returns the path of the written PNG.
pub fn plot_to_file(forecast: &Forecast, images_dir: &Path, thresholds: [f64; 2]) -> Result<PathBuf> {
    fs::create_dir_all(images_dir)?;
    let path = images_dir.join(format!("{}-{}.png", forecast.state, forecast.date));

    let observed: Vec<(f64, f64)> = forecast
        .observed
        .iter()
        .map(|(date, value)| ((*date - forecast.observed[0].0).num_days() as f64, *value as f64))
        .collect();

    let min_value = thresholds[0] * forecast.expected_linear;
    let max_value = thresholds[1] * forecast.expected_exp;
    let top = observed
        .iter()
        .map(|(_, value)| *value)
        .fold(max_value.max(forecast.actual_value as f64), f64::max);

    // sample the fitted curves day by day through the target date
    let steps = forecast.target_day.ceil() as i64;
    let linear_curve: Vec<(f64, f64)> = (0..=steps)
        .map(|day| (day as f64, forecast.linear_at(day as f64)))
        .collect();
    let exp_curve: Vec<(f64, f64)> = (0..=steps)
        .map(|day| (day as f64, forecast.exp_at(day as f64)))
        .collect();

    {
        let root = BitMapBackend::new(&path, PLOT_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(to_plot_error)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(
                format!("{} positive cases, target {}", forecast.state, forecast.date),
                ("sans-serif", 30).into_font(),
            )
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(50)
            .build_cartesian_2d(0.0..forecast.target_day + 1.0, 0.0..top * 1.1)
            .map_err(to_plot_error)?;

        chart
            .configure_mesh()
            .x_desc("days since first observation")
            .y_desc("cumulative positive cases")
            .draw()
            .map_err(to_plot_error)?;

        chart
            .draw_series(LineSeries::new(observed.iter().copied(), &BLUE))
            .map_err(to_plot_error)?
            .label("observed")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));

        chart
            .draw_series(LineSeries::new(linear_curve, &GREEN))
            .map_err(to_plot_error)?
            .label("linear fit")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], GREEN));

        chart
            .draw_series(LineSeries::new(exp_curve, &MAGENTA))
            .map_err(to_plot_error)?
            .label("exponential fit")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], MAGENTA));

        chart
            .draw_series(LineSeries::new(
                vec![
                    (forecast.target_day, min_value),
                    (forecast.target_day, max_value),
                ],
                &BLACK,
            ))
            .map_err(to_plot_error)?
            .label("expected range")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK));

        chart
            .draw_series(std::iter::once(Circle::new(
                (forecast.target_day, forecast.actual_value as f64),
                4,
                RED.filled(),
            )))
            .map_err(to_plot_error)?
            .label("reported")
            .legend(|(x, y)| Circle::new((x + 10, y), 4, RED.filled()));

        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(to_plot_error)?;

        root.present().map_err(to_plot_error)?;
    }

    Ok(path)
}

fn to_plot_error(error: impl std::fmt::Display) -> ScanError {
    ScanError::Plot(error.to_string())
}
