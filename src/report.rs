// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use crate::config::ChartFormat;
use crate::interactive;
use crate::models::{CategoryTally, EnrichedRecord, GenerationRecord, Summary};
use crate::quality::QualityReport;
use crate::visualizations::{
    render_with_context, BarComparisonChart, CategoryCountChart, ErrorDistributionChart,
    ErrorPctChart, TimeSeriesChart,
};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt::Write as FmtWrite;
use std::path::{Path, PathBuf};

const CHART_COUNT: u64 = 6;

fn kwh(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2} kWh", v))
        .unwrap_or_else(|| "n/a".to_string())
}

fn pct(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}%", v))
        .unwrap_or_else(|| "n/a".to_string())
}

fn format_cell(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}", v))
        .unwrap_or_else(|| "NA".to_string())
}

fn format_row(record: &GenerationRecord) -> String {
    let mut cells = vec![
        record.day.format("%d/%m/%Y").to_string(),
        format_cell(record.generated_kwh),
        format_cell(record.forecast_kwh),
    ];
    cells.extend(
        record
            .extra
            .iter()
            .map(|v| v.clone().unwrap_or_else(|| "NA".to_string())),
    );
    cells.join(" | ")
}

/// Duplicate and null diagnostics.
pub fn format_quality(report: &QualityReport) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "Number of duplicate rows: {}", report.duplicate_count())?;
    for duplicate in &report.duplicates {
        writeln!(out, "  row {}: {}", duplicate.row_number, format_row(&duplicate.record))?;
    }
    writeln!(out)?;
    writeln!(out, "Null values per column:")?;
    for (column, nulls) in &report.null_counts {
        writeln!(out, "  {:<24} {}", column, nulls)?;
    }
    Ok(out)
}

/// Means and error metrics, two decimals.
pub fn format_summary(summary: &Summary) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "=== General Statistics ===")?;
    writeln!(out, "Mean generated energy: {}", kwh(summary.mean_generated))?;
    writeln!(out, "Mean forecast energy: {}", kwh(summary.mean_forecast))?;
    writeln!(out, "Mean percentage error: {}", pct(summary.mean_error_pct))?;
    if summary.zero_forecast_rows > 0 {
        writeln!(
            out,
            "⚠️  {} day(s) with zero forecast: percentage error undefined",
            summary.zero_forecast_rows
        )?;
    }
    if summary.missing_input_rows > 0 {
        writeln!(
            out,
            "⚠️  {} day(s) with missing values: percentage error undefined",
            summary.missing_input_rows
        )?;
    }
    writeln!(out)?;
    writeln!(out, "=== Error Metrics ===")?;
    writeln!(out, "MAE: {}", kwh(summary.mae))?;
    writeln!(out, "RMSE: {}", kwh(summary.rmse))?;
    writeln!(out, "Days with both values: {}", summary.paired_rows)?;
    Ok(out)
}

/// Derived columns for the first `rows` days.
pub fn format_daily(records: &[EnrichedRecord], rows: usize) -> Result<String> {
    let mut out = String::new();
    writeln!(
        out,
        "{:<12} {:>12} {:>12} {:>12} {:>28}  {}",
        "Day", "Generated", "Forecast", "Difference", "Error", "Category"
    )?;
    for r in records.iter().take(rows) {
        writeln!(
            out,
            "{:<12} {:>12} {:>12} {:>12} {:>28}  {}",
            r.record.day.format("%d/%m/%Y").to_string(),
            format_cell(r.record.generated_kwh),
            format_cell(r.record.forecast_kwh),
            format_cell(r.diff_kwh),
            r.error_pct.to_string(),
            r.category
                .map(|c| c.label())
                .unwrap_or("Unclassified")
        )?;
    }
    Ok(out)
}

/// Days per category, most frequent first.
pub fn format_tally(tally: &CategoryTally) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "Performance summary:")?;
    for (category, count) in tally.ranked() {
        writeln!(out, "  {:<16} {}", category.label(), count)?;
    }
    if tally.unclassified > 0 {
        writeln!(out, "  {:<16} {}", "Unclassified", tally.unclassified)?;
    }
    Ok(out)
}

pub struct ChartOptions<'a> {
    pub output_dir: &'a Path,
    pub format: ChartFormat,
    pub threshold: f64,
    pub bins: usize,
}

/// Render every chart and return the written files in output order.
pub fn render_charts(
    records: &[EnrichedRecord],
    tally: &CategoryTally,
    options: &ChartOptions,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(options.output_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            options.output_dir.display()
        )
    })?;

    let progress = ProgressBar::new(CHART_COUNT);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );

    let dir = options.output_dir;
    let format = options.format;
    let mut written = Vec::with_capacity(CHART_COUNT as usize);

    progress.set_message("time series");
    written.push(render_with_context(&TimeSeriesChart { records }, dir, format)?);
    progress.inc(1);

    progress.set_message("bar comparison");
    written.push(render_with_context(&BarComparisonChart { records }, dir, format)?);
    progress.inc(1);

    progress.set_message("daily error");
    written.push(render_with_context(
        &ErrorPctChart {
            records,
            threshold: options.threshold,
        },
        dir,
        format,
    )?);
    progress.inc(1);

    progress.set_message("interactive chart");
    written.push(interactive::write_interactive_chart(records, dir)?);
    progress.inc(1);

    progress.set_message("error distribution");
    written.push(render_with_context(
        &ErrorDistributionChart {
            records,
            bins: options.bins,
        },
        dir,
        format,
    )?);
    progress.inc(1);

    progress.set_message("performance categories");
    written.push(render_with_context(&CategoryCountChart { tally }, dir, format)?);
    progress.inc(1);

    progress.finish_with_message("charts complete");

    for path in &written {
        tracing::info!(path = %path.display(), "chart generated");
    }
    Ok(written)
}
