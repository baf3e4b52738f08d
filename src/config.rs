// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use crate::metrics::DEFAULT_THRESHOLD_PCT;
use anyhow::{bail, Context};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_CONFIG_FILE: &str = "gen-report.toml";

/// Text encoding of the input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Encoding {
    Iso8859_1,
    Utf8,
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "iso-8859-1" | "iso8859-1" | "latin1" | "latin-1" => Ok(Encoding::Iso8859_1),
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            other => Err(format!("unsupported encoding: {}", other)),
        }
    }
}

impl TryFrom<String> for Encoding {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ChartFormat {
    Svg,
    Png,
}

impl ChartFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ChartFormat::Svg => "svg",
            ChartFormat::Png => "png",
        }
    }
}

/// Source column names, matched after header normalization.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub day: String,
    pub generated: String,
    pub forecast: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            day: "dia".to_string(),
            generated: "gerado(kwh)".to_string(),
            forecast: "prognóstico(kwh)".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub input: PathBuf,
    pub delimiter: char,
    pub encoding: Encoding,
    pub output_dir: PathBuf,
    pub chart_format: ChartFormat,
    pub threshold_pct: f64,
    pub histogram_bins: usize,
    pub preview_rows: usize,
    pub columns: ColumnNames,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: PathBuf::from("csv_analise.csv"),
            delimiter: ';',
            encoding: Encoding::Iso8859_1,
            output_dir: PathBuf::from("output"),
            chart_format: ChartFormat::Svg,
            threshold_pct: DEFAULT_THRESHOLD_PCT,
            histogram_bins: 20,
            preview_rows: 5,
            columns: ColumnNames::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.delimiter.is_ascii() {
            bail!("delimiter must be a single ASCII character, got {:?}", self.delimiter);
        }
        if !self.threshold_pct.is_finite() || self.threshold_pct < 0.0 {
            bail!("threshold_pct must be a non-negative number, got {}", self.threshold_pct);
        }
        if self.histogram_bins == 0 {
            bail!("histogram_bins must be at least 1");
        }
        Ok(())
    }

    pub fn delimiter_byte(&self) -> u8 {
        // validate() guarantees ASCII
        self.delimiter as u8
    }
}

pub fn parse_config(config_str: &str) -> anyhow::Result<Config> {
    let config: Config = toml::from_str(config_str)?;
    Ok(config)
}

pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&config_str).with_context(|| format!("Invalid config file: {}", path.display()))
}

/// Load the explicit config file, or the default one when present, or fall
/// back to built-in defaults.
pub fn resolve_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    match explicit {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading config");
            load_config(path)
        }
        None => {
            let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                tracing::info!(path = %default_path.display(), "loading config");
                load_config(&default_path)
            } else {
                tracing::debug!("no config file, using defaults");
                Ok(Config::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_source_layout() {
        let config = Config::default();
        assert_eq!(config.delimiter, ';');
        assert_eq!(config.encoding, Encoding::Iso8859_1);
        assert_eq!(config.threshold_pct, 15.0);
        assert_eq!(config.histogram_bins, 20);
        assert_eq!(config.columns.forecast, "prognóstico(kwh)");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_keeps_defaults() -> anyhow::Result<()> {
        let config = parse_config(
            r#"
            input = "data/june.csv"
            encoding = "UTF-8"
            chart_format = "png"

            [columns]
            generated = "gerado"
            "#,
        )?;

        assert_eq!(config.input, PathBuf::from("data/june.csv"));
        assert_eq!(config.encoding, Encoding::Utf8);
        assert_eq!(config.chart_format, ChartFormat::Png);
        assert_eq!(config.columns.generated, "gerado");
        assert_eq!(config.columns.day, "dia");
        assert_eq!(config.delimiter, ';');
        Ok(())
    }

    #[test]
    fn test_unknown_encoding_is_rejected() {
        assert!(parse_config("encoding = \"ebcdic\"").is_err());
        assert_eq!("Latin-1".parse::<Encoding>(), Ok(Encoding::Iso8859_1));
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        config.threshold_pct = -1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.histogram_bins = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.delimiter = 'ç';
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_config_from_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("report.toml");
        let mut file = fs::File::create(&path)?;
        writeln!(file, "threshold_pct = 10.0")?;
        writeln!(file, "delimiter = \",\"")?;

        let config = load_config(&path)?;
        assert_eq!(config.threshold_pct, 10.0);
        assert_eq!(config.delimiter, ',');

        assert!(load_config(&dir.path().join("missing.toml")).is_err());
        Ok(())
    }
}
