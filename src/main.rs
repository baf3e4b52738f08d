// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

mod config;
mod interactive;
mod loader;
mod metrics;
mod models;
mod quality;
mod report;
mod stats;
mod visualizations;

use anyhow::Result;
use clap::Parser;
use config::{ChartFormat, Config, Encoding};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Daily energy generation report: data quality, forecast accuracy and charts.
#[derive(Debug, Parser)]
#[command(name = "gen-report", version, about)]
struct Cli {
    /// Generation log (CSV)
    #[arg(short, long, env = "GEN_REPORT_INPUT")]
    input: Option<PathBuf>,

    /// Field delimiter
    #[arg(short, long)]
    delimiter: Option<char>,

    /// Input encoding (iso-8859-1, utf-8)
    #[arg(short, long)]
    encoding: Option<Encoding>,

    /// Directory for chart files
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Static chart format
    #[arg(long, value_enum)]
    format: Option<ChartFormat>,

    /// Classification threshold in percent
    #[arg(long)]
    threshold: Option<f64>,

    /// Histogram bin count
    #[arg(long)]
    bins: Option<usize>,

    /// Config file (defaults to gen-report.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the text report only
    #[arg(long)]
    no_charts: bool,
}

impl Cli {
    fn apply(&self, mut config: Config) -> Config {
        if let Some(input) = &self.input {
            config.input = input.clone();
        }
        if let Some(delimiter) = self.delimiter {
            config.delimiter = delimiter;
        }
        if let Some(encoding) = self.encoding {
            config.encoding = encoding;
        }
        if let Some(output_dir) = &self.output_dir {
            config.output_dir = output_dir.clone();
        }
        if let Some(format) = self.format {
            config.chart_format = format;
        }
        if let Some(threshold) = self.threshold {
            config.threshold_pct = threshold;
        }
        if let Some(bins) = self.bins {
            config.histogram_bins = bins;
        }
        config
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing();

    let config = cli.apply(config::resolve_config(cli.config.as_deref())?);
    config.validate()?;

    run(&config, !cli.no_charts)
}

fn run(config: &Config, charts: bool) -> Result<()> {
    let options = loader::LoadOptions {
        delimiter: config.delimiter_byte(),
        encoding: config.encoding,
        columns: config.columns.clone(),
    };
    let table = loader::load_records(&config.input, &options)?;

    println!("First rows:");
    loader::print_preview(&table, config.preview_rows);
    println!();
    loader::print_schema(&table);
    println!();

    let quality = quality::check_quality(&table);
    print!("{}", report::format_quality(&quality)?);
    println!();

    tracing::info!(threshold = config.threshold_pct, "computing metrics");
    let enriched = metrics::enrich(&table.records, config.threshold_pct);
    let summary = metrics::summarize(&enriched);
    let tally = metrics::category_counts(&enriched);
    print!("{}", report::format_summary(&summary)?);
    println!();
    print!("{}", report::format_daily(&enriched, config.preview_rows)?);
    println!();

    if charts {
        let written = report::render_charts(
            &enriched,
            &tally,
            &report::ChartOptions {
                output_dir: &config.output_dir,
                format: config.chart_format,
                threshold: config.threshold_pct,
                bins: config.histogram_bins,
            },
        )?;
        println!(
            "✅ {} charts written to {}",
            written.len(),
            config.output_dir.display()
        );
    } else {
        println!("⚠️  Chart rendering skipped");
    }
    println!();

    print!("{}", report::format_tally(&tally)?);
    Ok(())
}
