// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

//! Standalone HTML line chart with hover tooltips and a clickable legend.

use crate::models::{EnrichedRecord, GenerationRecord};
use crate::visualizations::{day_range, value_range};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fmt::Write as FmtWrite;
use std::fs;
use std::path::{Path, PathBuf};

pub const FILE_NAME: &str = "interactive.html";

const WIDTH: f64 = 1000.0;
const HEIGHT: f64 = 500.0;
const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 30.0;
const MARGIN_BOTTOM: f64 = 60.0;
const Y_TICKS: usize = 5;
const MAX_X_TICKS: usize = 12;

struct Series {
    key: &'static str,
    label: &'static str,
    color: &'static str,
    dashed: bool,
    value: fn(&GenerationRecord) -> Option<f64>,
}

fn generated_kwh(record: &GenerationRecord) -> Option<f64> {
    record.generated_kwh
}

fn forecast_kwh(record: &GenerationRecord) -> Option<f64> {
    record.forecast_kwh
}

const SERIES: [Series; 2] = [
    Series {
        key: "generated",
        label: "Generated",
        color: "#3b82f6",
        dashed: false,
        value: generated_kwh,
    },
    Series {
        key: "forecast",
        label: "Forecast",
        color: "#f97316",
        dashed: true,
        value: forecast_kwh,
    },
];

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

struct Scale {
    first_day: NaiveDate,
    span_days: f64,
    y_lo: f64,
    y_hi: f64,
}

impl Scale {
    fn x(&self, day: NaiveDate) -> f64 {
        let offset = (day - self.first_day).num_days() as f64;
        MARGIN_LEFT + offset / self.span_days * (WIDTH - MARGIN_LEFT - MARGIN_RIGHT)
    }

    fn y(&self, value: f64) -> f64 {
        let plot_height = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
        MARGIN_TOP + (self.y_hi - value) / (self.y_hi - self.y_lo) * plot_height
    }
}

/// Build the HTML page for the generated/forecast series.
pub fn build_html(records: &[EnrichedRecord], title: &str) -> Result<String> {
    let days = day_range(records);
    let y_range = value_range(
        records
            .iter()
            .flat_map(|r| [r.record.generated_kwh, r.record.forecast_kwh])
            .flatten(),
        false,
    );
    let scale = Scale {
        first_day: days.start,
        span_days: (days.end - days.start).num_days().max(1) as f64,
        y_lo: y_range.start,
        y_hi: y_range.end,
    };

    let mut svg = String::new();
    writeln!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 {} {}\" width=\"100%\">",
        WIDTH, HEIGHT
    )?;

    // Horizontal grid with value labels
    for i in 0..=Y_TICKS {
        let value = scale.y_lo + (scale.y_hi - scale.y_lo) * i as f64 / Y_TICKS as f64;
        let y = scale.y(value);
        writeln!(
            svg,
            "<line class=\"grid\" x1=\"{:.1}\" y1=\"{:.1}\" x2=\"{:.1}\" y2=\"{:.1}\"/>",
            MARGIN_LEFT,
            y,
            WIDTH - MARGIN_RIGHT,
            y
        )?;
        writeln!(
            svg,
            "<text class=\"tick\" x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"end\">{:.1}</text>",
            MARGIN_LEFT - 8.0,
            y + 4.0,
            value
        )?;
    }

    // Day labels along the bottom
    let mut unique_days: Vec<NaiveDate> = records.iter().map(|r| r.record.day).collect();
    unique_days.sort();
    unique_days.dedup();
    let step = unique_days.len().div_ceil(MAX_X_TICKS).max(1);
    for day in unique_days.iter().step_by(step) {
        writeln!(
            svg,
            "<text class=\"tick\" x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"middle\">{}</text>",
            scale.x(*day),
            HEIGHT - MARGIN_BOTTOM + 20.0,
            day.format("%d/%m")
        )?;
    }

    writeln!(
        svg,
        "<text class=\"axis\" x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"middle\">Date</text>",
        (MARGIN_LEFT + WIDTH - MARGIN_RIGHT) / 2.0,
        HEIGHT - 15.0
    )?;
    writeln!(
        svg,
        "<text class=\"axis\" transform=\"translate(20 {:.1}) rotate(-90)\" text-anchor=\"middle\">Energy (kWh)</text>",
        (MARGIN_TOP + HEIGHT - MARGIN_BOTTOM) / 2.0
    )?;

    for series in &SERIES {
        let points: Vec<(NaiveDate, f64)> = records
            .iter()
            .filter_map(|r| Some((r.record.day, (series.value)(&r.record)?)))
            .collect();

        writeln!(svg, "<g class=\"series series-{}\">", series.key)?;
        let path: Vec<String> = points
            .iter()
            .map(|(day, v)| format!("{:.1},{:.1}", scale.x(*day), scale.y(*v)))
            .collect();
        writeln!(
            svg,
            "<polyline fill=\"none\" stroke=\"{}\" stroke-width=\"2\"{} points=\"{}\"/>",
            series.color,
            if series.dashed { " stroke-dasharray=\"8 5\"" } else { "" },
            path.join(" ")
        )?;
        for (day, v) in &points {
            writeln!(
                svg,
                "<circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"4\" fill=\"{}\"><title>{} | {}: {:.2} kWh</title></circle>",
                scale.x(*day),
                scale.y(*v),
                series.color,
                day.format("%d/%m/%Y"),
                series.label,
                v
            )?;
        }
        writeln!(svg, "</g>")?;
    }
    writeln!(svg, "</svg>")?;

    let mut html = String::with_capacity(svg.len() + 2048);
    writeln!(html, "<!DOCTYPE html>")?;
    writeln!(html, "<html lang=\"en\">")?;
    writeln!(html, "<head>")?;
    writeln!(html, "<meta charset=\"utf-8\"/>")?;
    writeln!(html, "<title>{}</title>", escape(title))?;
    writeln!(html, "<style>")?;
    writeln!(
        html,
        "body{{font-family:Arial,Helvetica,sans-serif;margin:20px;color:#222;background:#fff;}}"
    )?;
    writeln!(html, ".grid{{stroke:#e5e7eb;stroke-width:1;}}")?;
    writeln!(html, ".tick{{font-size:12px;fill:#555;}}")?;
    writeln!(html, ".axis{{font-size:14px;fill:#222;}}")?;
    writeln!(html, "circle:hover{{r:7;}}")?;
    writeln!(html, ".legend span{{cursor:pointer;margin-right:18px;user-select:none;}}")?;
    writeln!(html, ".legend span.off{{opacity:0.35;}}")?;
    writeln!(html, ".hidden{{display:none;}}")?;
    writeln!(html, "</style>")?;
    writeln!(html, "</head>")?;
    writeln!(html, "<body>")?;
    writeln!(html, "<h1>{}</h1>", escape(title))?;

    writeln!(html, "<div class=\"legend\">")?;
    for series in &SERIES {
        writeln!(
            html,
            "<span data-series=\"{}\" onclick=\"toggleSeries(this)\" style=\"color:{}\">&#9632; {}</span>",
            series.key, series.color, series.label
        )?;
    }
    writeln!(html, "</div>")?;

    html.push_str(&svg);

    writeln!(html, "<script>")?;
    writeln!(html, "function toggleSeries(el) {{")?;
    writeln!(
        html,
        "  document.querySelector('.series-' + el.dataset.series).classList.toggle('hidden');"
    )?;
    writeln!(html, "  el.classList.toggle('off');")?;
    writeln!(html, "}}")?;
    writeln!(html, "</script>")?;
    writeln!(html, "</body>")?;
    writeln!(html, "</html>")?;

    Ok(html)
}

/// Write the interactive chart into `output_dir`.
pub fn write_interactive_chart(records: &[EnrichedRecord], output_dir: &Path) -> Result<PathBuf> {
    let path = output_dir.join(FILE_NAME);
    let html = build_html(records, "Energy Generation vs Forecast (kWh)")?;
    fs::write(&path, html)
        .with_context(|| format!("Failed to write interactive chart: {}", path.display()))?;
    tracing::debug!(path = %path.display(), "interactive chart written");
    Ok(path)
}
