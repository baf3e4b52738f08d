// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use crate::config::ChartFormat;
use crate::models::{CategoryTally, EnrichedRecord, PerformanceCategory};
use crate::stats::{gaussian_kde, histogram};
use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDate};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use std::ops::Range;
use std::path::{Path, PathBuf};

const COLOR_BLUE: RGBColor = RGBColor(59, 130, 246);
const COLOR_ORANGE: RGBColor = RGBColor(249, 115, 22);
const COLOR_RED: RGBColor = RGBColor(220, 38, 38);
const COLOR_GREEN: RGBColor = RGBColor(22, 163, 74);
const COLOR_AMBER: RGBColor = RGBColor(245, 158, 11);
const COLOR_SLATE: RGBColor = RGBColor(100, 116, 139);
const COLOR_GRAY_LIGHT: RGBColor = RGBColor(229, 231, 235);

// Deficit, Within Forecast, Surplus
const CATEGORY_COLORS: [RGBColor; 3] = [
    RGBColor(0xff, 0x6b, 0x6b),
    RGBColor(0xfe, 0xca, 0x57),
    RGBColor(0x1d, 0xd1, 0xa1),
];

const KDE_POINTS: usize = 200;

/// A static chart that can be drawn on any plotters backend.
pub trait Chart {
    fn file_stem(&self) -> &'static str;

    fn size(&self) -> (u32, u32) {
        (1200, 600)
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>
    where
        DB::ErrorType: 'static;
}

/// Render `chart` into `output_dir` and return the written path.
pub fn render<C: Chart>(chart: &C, output_dir: &Path, format: ChartFormat) -> Result<PathBuf> {
    let path = output_dir.join(format!("{}.{}", chart.file_stem(), format.extension()));
    match format {
        ChartFormat::Svg => {
            let root = SVGBackend::new(&path, chart.size()).into_drawing_area();
            root.fill(&WHITE)?;
            chart.draw(&root)?;
            root.present()?;
        }
        ChartFormat::Png => {
            let root = BitMapBackend::new(&path, chart.size()).into_drawing_area();
            root.fill(&WHITE)?;
            chart.draw(&root)?;
            root.present()?;
        }
    }
    tracing::debug!(path = %path.display(), "chart written");
    Ok(path)
}

/// Render a chart and attach the target file to any error.
pub fn render_with_context<C: Chart>(
    chart: &C,
    output_dir: &Path,
    format: ChartFormat,
) -> Result<PathBuf> {
    render(chart, output_dir, format)
        .with_context(|| format!("Failed to render chart '{}'", chart.file_stem()))
}

/// Day range covering all records, padded by one day on each side.
pub fn day_range(records: &[EnrichedRecord]) -> Range<NaiveDate> {
    let days = records.iter().map(|r| r.record.day);
    match (days.clone().min(), days.max()) {
        (Some(first), Some(last)) => (first - Duration::days(1))..(last + Duration::days(1)),
        _ => {
            let today = Local::now().date_naive();
            today..(today + Duration::days(1))
        }
    }
}

/// Value range with 10% headroom. Degenerate inputs still give a usable
/// range; `include_zero` anchors bar charts at the axis.
pub fn value_range(values: impl IntoIterator<Item = f64>, include_zero: bool) -> Range<f64> {
    let (mut lo, mut hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));

    if include_zero {
        lo = lo.min(0.0);
        hi = hi.max(0.0);
    }
    if !lo.is_finite() || !hi.is_finite() {
        return 0.0..1.0;
    }
    if lo == hi {
        return (lo - 1.0)..(hi + 1.0);
    }

    let pad = (hi - lo) * 0.1;
    let lo = if include_zero && lo == 0.0 { 0.0 } else { lo - pad };
    lo..(hi + pad)
}

fn day_label(day: &NaiveDate) -> String {
    day.format("%d/%m").to_string()
}

/// Label for a position on an index axis, empty between slots.
pub fn index_label(labels: &[String], x: f64) -> String {
    let nearest = x.round();
    if (x - nearest).abs() > 1e-6 || nearest < 0.0 {
        return String::new();
    }
    labels.get(nearest as usize).cloned().unwrap_or_default()
}

/// Generated and forecast energy against the day.
pub struct TimeSeriesChart<'a> {
    pub records: &'a [EnrichedRecord],
}

impl Chart for TimeSeriesChart<'_> {
    fn file_stem(&self) -> &'static str {
        "timeseries"
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        let generated: Vec<(NaiveDate, f64)> = self
            .records
            .iter()
            .filter_map(|r| Some((r.record.day, r.record.generated_kwh?)))
            .collect();
        let forecast: Vec<(NaiveDate, f64)> = self
            .records
            .iter()
            .filter_map(|r| Some((r.record.day, r.record.forecast_kwh?)))
            .collect();

        let y_range = value_range(generated.iter().chain(&forecast).map(|(_, v)| *v), false);

        let mut chart = ChartBuilder::on(root)
            .caption(
                "Energy Generation vs Forecast (kWh)",
                ("sans-serif", 28).into_font().color(&BLACK),
            )
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(day_range(self.records), y_range)?;

        chart
            .configure_mesh()
            .x_desc("Date")
            .y_desc("Energy (kWh)")
            .x_label_formatter(&day_label)
            .axis_desc_style(("sans-serif", 16))
            .draw()?;

        chart
            .draw_series(LineSeries::new(generated.iter().copied(), COLOR_BLUE.stroke_width(2)))?
            .label("Generated")
            .legend(|(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], COLOR_BLUE.stroke_width(2))
            });
        chart.draw_series(
            generated
                .iter()
                .map(|p| Circle::new(*p, 4, COLOR_BLUE.filled())),
        )?;

        chart
            .draw_series(DashedLineSeries::new(
                forecast.iter().copied(),
                8,
                5,
                COLOR_ORANGE.stroke_width(2),
            ))?
            .label("Forecast")
            .legend(|(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], COLOR_ORANGE.stroke_width(2))
            });

        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&COLOR_SLATE)
            .draw()?;

        Ok(())
    }
}

/// Generated and forecast bars side by side for each day.
pub struct BarComparisonChart<'a> {
    pub records: &'a [EnrichedRecord],
}

impl Chart for BarComparisonChart<'_> {
    fn file_stem(&self) -> &'static str {
        "bar_comparison"
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        let labels: Vec<String> = self.records.iter().map(|r| day_label(&r.record.day)).collect();
        let n = self.records.len().max(1);

        let y_range = value_range(
            self.records
                .iter()
                .flat_map(|r| [r.record.generated_kwh, r.record.forecast_kwh])
                .flatten(),
            true,
        );

        let mut chart = ChartBuilder::on(root)
            .caption(
                "Generated vs Forecast Energy (kWh)",
                ("sans-serif", 28).into_font().color(&BLACK),
            )
            .margin(20)
            .x_label_area_size(60)
            .y_label_area_size(70)
            .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), y_range)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n.min(40))
            .x_desc("Date")
            .y_desc("Energy (kWh)")
            .x_label_formatter(&|x| index_label(&labels, *x))
            .axis_desc_style(("sans-serif", 16))
            .draw()?;

        let bars = |offset: f64, value: fn(&EnrichedRecord) -> Option<f64>| {
            self.records
                .iter()
                .enumerate()
                .filter_map(move |(i, r)| Some((i as f64 + offset, value(r)?)))
                .collect::<Vec<_>>()
        };

        chart
            .draw_series(bars(-0.4, |r| r.record.generated_kwh).into_iter().map(|(x, v)| {
                Rectangle::new([(x, 0.0), (x + 0.4, v)], COLOR_BLUE.filled())
            }))?
            .label("Generated")
            .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 15, y + 5)], COLOR_BLUE.filled()));

        chart
            .draw_series(bars(0.0, |r| r.record.forecast_kwh).into_iter().map(|(x, v)| {
                Rectangle::new([(x, 0.0), (x + 0.4, v)], COLOR_ORANGE.filled())
            }))?
            .label("Forecast")
            .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 15, y + 5)], COLOR_ORANGE.filled()));

        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&COLOR_SLATE)
            .draw()?;

        Ok(())
    }
}

/// Daily percentage error with reference lines at zero and at the
/// classification thresholds.
pub struct ErrorPctChart<'a> {
    pub records: &'a [EnrichedRecord],
    pub threshold: f64,
}

impl Chart for ErrorPctChart<'_> {
    fn file_stem(&self) -> &'static str {
        "error_pct"
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        let points: Vec<(NaiveDate, f64)> = self
            .records
            .iter()
            .filter_map(|r| Some((r.record.day, r.error_pct.value()?)))
            .collect();

        let days = day_range(self.records);
        let y_range = value_range(
            points
                .iter()
                .map(|(_, v)| *v)
                .chain([self.threshold, -self.threshold]),
            false,
        );

        let mut chart = ChartBuilder::on(root)
            .caption(
                "Daily Percentage Error of Energy Generation",
                ("sans-serif", 28).into_font().color(&BLACK),
            )
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(days.clone(), y_range)?;

        chart
            .configure_mesh()
            .x_desc("Date")
            .y_desc("Error (%)")
            .x_label_formatter(&day_label)
            .y_label_formatter(&|y| format!("{:.0}%", y))
            .axis_desc_style(("sans-serif", 16))
            .draw()?;

        let hline = |y: f64| [(days.start, y), (days.end, y)];

        chart.draw_series(DashedLineSeries::new(hline(0.0), 8, 5, COLOR_SLATE.stroke_width(1)))?;
        chart
            .draw_series(DashedLineSeries::new(
                hline(self.threshold),
                8,
                5,
                COLOR_GREEN.stroke_width(2),
            ))?
            .label(format!("+{}% (Surplus)", self.threshold))
            .legend(|(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], COLOR_GREEN.stroke_width(2))
            });
        chart
            .draw_series(DashedLineSeries::new(
                hline(-self.threshold),
                8,
                5,
                COLOR_AMBER.stroke_width(2),
            ))?
            .label(format!("-{}% (Deficit)", self.threshold))
            .legend(|(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], COLOR_AMBER.stroke_width(2))
            });

        chart.draw_series(LineSeries::new(points.iter().copied(), COLOR_RED.stroke_width(2)))?;
        chart.draw_series(points.iter().map(|p| Circle::new(*p, 4, COLOR_RED.filled())))?;

        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&COLOR_SLATE)
            .draw()?;

        Ok(())
    }
}

/// Distribution of the defined percentage errors with a density curve
/// scaled to counts.
pub struct ErrorDistributionChart<'a> {
    pub records: &'a [EnrichedRecord],
    pub bins: usize,
}

impl Chart for ErrorDistributionChart<'_> {
    fn file_stem(&self) -> &'static str {
        "error_distribution"
    }

    fn size(&self) -> (u32, u32) {
        (1000, 500)
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        let values: Vec<f64> = self.records.iter().filter_map(|r| r.error_pct.value()).collect();
        let caption = ("sans-serif", 28).into_font().color(&BLACK);

        let hist = match histogram(&values, self.bins) {
            Some(hist) => hist,
            None => {
                let mut chart = ChartBuilder::on(root)
                    .caption("Distribution of Percentage Error", caption)
                    .margin(20)
                    .x_label_area_size(50)
                    .y_label_area_size(60)
                    .build_cartesian_2d(-1f64..1f64, 0f64..1f64)?;
                chart
                    .configure_mesh()
                    .x_desc("Error (%)")
                    .y_desc("Frequency")
                    .draw()?;
                chart.draw_series(std::iter::once(Text::new(
                    "No defined error percentages",
                    (-0.4, 0.5),
                    ("sans-serif", 18).into_font().color(&COLOR_SLATE),
                )))?;
                return Ok(());
            }
        };

        let lo = hist.edges[0];
        let hi = hist.edges[hist.edges.len() - 1];
        let scale = values.len() as f64 * hist.bin_width();
        let kde = gaussian_kde(&values, (lo, hi), KDE_POINTS);

        let y_max = kde
            .iter()
            .flatten()
            .map(|(_, d)| d * scale)
            .fold(hist.max_count() as f64, f64::max);

        let mut chart = ChartBuilder::on(root)
            .caption("Distribution of Percentage Error", caption)
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(60)
            .build_cartesian_2d(lo..hi, 0f64..(y_max * 1.1).max(1.0))?;

        chart
            .configure_mesh()
            .x_desc("Error (%)")
            .y_desc("Frequency")
            .light_line_style(&COLOR_GRAY_LIGHT)
            .axis_desc_style(("sans-serif", 16))
            .draw()?;

        chart.draw_series(hist.counts.iter().enumerate().map(|(i, count)| {
            Rectangle::new(
                [(hist.edges[i], 0.0), (hist.edges[i + 1], *count as f64)],
                COLOR_ORANGE.mix(0.6).filled(),
            )
        }))?;
        chart.draw_series(hist.counts.iter().enumerate().map(|(i, count)| {
            Rectangle::new(
                [(hist.edges[i], 0.0), (hist.edges[i + 1], *count as f64)],
                COLOR_ORANGE.stroke_width(1),
            )
        }))?;

        if let Some(curve) = kde {
            chart.draw_series(LineSeries::new(
                curve.into_iter().map(|(x, d)| (x, d * scale)),
                COLOR_ORANGE.stroke_width(2),
            ))?;
        }

        Ok(())
    }
}

/// Number of days in each performance category.
pub struct CategoryCountChart<'a> {
    pub tally: &'a CategoryTally,
}

impl Chart for CategoryCountChart<'_> {
    fn file_stem(&self) -> &'static str {
        "performance_categories"
    }

    fn size(&self) -> (u32, u32) {
        (700, 500)
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        let labels: Vec<String> = PerformanceCategory::ALL
            .iter()
            .map(|c| c.label().to_string())
            .collect();
        let counts: Vec<usize> = PerformanceCategory::ALL
            .iter()
            .map(|c| self.tally.get(*c))
            .collect();
        let y_max = counts.iter().copied().max().unwrap_or(0).max(1) as f64;

        let mut chart = ChartBuilder::on(root)
            .caption(
                "Plant Performance Classification",
                ("sans-serif", 24).into_font().color(&BLACK),
            )
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(50)
            .build_cartesian_2d(-0.5f64..2.5f64, 0f64..(y_max * 1.15))?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(3)
            .x_desc("Performance Category")
            .y_desc("Number of Days")
            .x_label_formatter(&|x| index_label(&labels, *x))
            .axis_desc_style(("sans-serif", 16))
            .draw()?;

        chart.draw_series(counts.iter().enumerate().map(|(i, count)| {
            let x = i as f64;
            Rectangle::new(
                [(x - 0.4, 0.0), (x + 0.4, *count as f64)],
                CATEGORY_COLORS[i].filled(),
            )
        }))?;

        chart.draw_series(counts.iter().enumerate().map(|(i, count)| {
            Text::new(
                count.to_string(),
                (i as f64 - 0.03, *count as f64 + y_max * 0.03),
                ("sans-serif", 16).into_font(),
            )
        }))?;

        Ok(())
    }
}
