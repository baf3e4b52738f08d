// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use crate::config::{ColumnNames, Encoding};
use crate::models::{GenerationRecord, LoadedTable};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use std::fs;
use std::num::ParseFloatError;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("input is not valid {encoding}: {detail}")]
    Encoding { encoding: &'static str, detail: String },

    #[error("malformed table: {0}")]
    Csv(#[from] csv::Error),

    #[error("required column '{column}' not found (available: {available})")]
    MissingColumn { column: String, available: String },

    #[error("column '{column}' appears more than once in the header")]
    DuplicateColumn { column: String },

    #[error("line {line}: invalid date '{value}', expected dd/mm/yyyy")]
    InvalidDate { line: u64, value: String },

    #[error("line {line}: invalid number '{value}' in column '{column}'")]
    InvalidNumber { line: u64, column: String, value: String },
}

pub struct LoadOptions {
    pub delimiter: u8,
    pub encoding: Encoding,
    pub columns: ColumnNames,
}

/// Trim, lowercase and replace spaces with underscores.
pub fn normalize_header(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

pub fn decode(bytes: &[u8], encoding: Encoding) -> Result<String, LoadError> {
    let text = match encoding {
        // Every ISO-8859-1 byte is the code point of the same value
        Encoding::Iso8859_1 => bytes.iter().map(|&b| b as char).collect::<String>(),
        Encoding::Utf8 => String::from_utf8(bytes.to_vec()).map_err(|e| LoadError::Encoding {
            encoding: "UTF-8",
            detail: e.to_string(),
        })?,
    };
    Ok(match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    })
}

pub fn parse_day(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

/// Cell texts read as missing values, in addition to an empty cell.
pub const NA_MARKERS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// True for an empty cell or one of the [`NA_MARKERS`].
pub fn is_missing(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || NA_MARKERS.contains(&value)
}

/// Parse a decimal that may use a comma as decimal separator.
///
/// When a comma is present, dots are thousands separators. Missing markers
/// and non-finite results are null values.
pub fn parse_decimal(value: &str) -> Result<Option<f64>, ParseFloatError> {
    let value = value.trim();
    if is_missing(value) {
        return Ok(None);
    }
    let normalized = if value.contains(',') {
        value.replace('.', "").replace(',', ".")
    } else {
        value.to_string()
    };
    let parsed = normalized.parse::<f64>()?;
    Ok(parsed.is_finite().then_some(parsed))
}

fn find_column(headers: &[String], wanted: &str) -> Result<usize, LoadError> {
    let wanted = normalize_header(wanted);
    headers
        .iter()
        .position(|h| *h == wanted)
        .ok_or_else(|| LoadError::MissingColumn {
            column: wanted,
            available: headers.join(", "),
        })
}

/// Parse an already decoded table.
pub fn parse_table(text: &str, options: &LoadOptions) -> Result<LoadedTable, LoadError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .from_reader(text.as_bytes());

    let columns: Vec<String> = reader.headers()?.iter().map(normalize_header).collect();
    for (i, column) in columns.iter().enumerate() {
        if columns[..i].contains(column) {
            return Err(LoadError::DuplicateColumn {
                column: column.clone(),
            });
        }
    }

    let day_idx = find_column(&columns, &options.columns.day)?;
    let generated_idx = find_column(&columns, &options.columns.generated)?;
    let forecast_idx = find_column(&columns, &options.columns.forecast)?;

    let extra_idx: Vec<usize> = (0..columns.len())
        .filter(|i| ![day_idx, generated_idx, forecast_idx].contains(i))
        .collect();

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result?;
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        let cell = |idx: usize| row.get(idx).unwrap_or("");

        let raw_day = cell(day_idx);
        let day = parse_day(raw_day).ok_or_else(|| LoadError::InvalidDate {
            line,
            value: raw_day.to_string(),
        })?;

        let number = |idx: usize| {
            let raw = cell(idx);
            parse_decimal(raw).map_err(|_| LoadError::InvalidNumber {
                line,
                column: columns[idx].clone(),
                value: raw.to_string(),
            })
        };

        let generated_kwh = number(generated_idx)?;
        let forecast_kwh = number(forecast_idx)?;

        let extra = extra_idx
            .iter()
            .map(|&idx| {
                let value = cell(idx).trim();
                (!is_missing(value)).then(|| value.to_string())
            })
            .collect();

        records.push(GenerationRecord {
            day,
            generated_kwh,
            forecast_kwh,
            extra,
        });
    }

    Ok(LoadedTable {
        day_column: columns[day_idx].clone(),
        generated_column: columns[generated_idx].clone(),
        forecast_column: columns[forecast_idx].clone(),
        extra_columns: extra_idx.iter().map(|&i| columns[i].clone()).collect(),
        columns,
        records,
    })
}

/// Read, decode and parse the generation log at `path`.
pub fn load_records(path: &Path, options: &LoadOptions) -> Result<LoadedTable, LoadError> {
    let bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let text = decode(&bytes, options.encoding)?;
    let table = parse_table(&text, options)?;
    tracing::info!(
        path = %path.display(),
        rows = table.records.len(),
        columns = table.columns.len(),
        "loaded generation log"
    );
    Ok(table)
}

fn format_number(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "NA".to_string())
}

/// Print the first `rows` records of the table.
pub fn print_preview(table: &LoadedTable, rows: usize) {
    let mut header = vec![
        table.day_column.clone(),
        table.generated_column.clone(),
        table.forecast_column.clone(),
    ];
    header.extend(table.extra_columns.iter().cloned());
    println!("{}", header.join(" | "));

    for record in table.records.iter().take(rows) {
        let mut cells = vec![
            record.day.format("%Y-%m-%d").to_string(),
            format_number(record.generated_kwh),
            format_number(record.forecast_kwh),
        ];
        cells.extend(
            record
                .extra
                .iter()
                .map(|v| v.clone().unwrap_or_else(|| "NA".to_string())),
        );
        println!("{}", cells.join(" | "));
    }
}

/// Print column names, non-null counts and types.
pub fn print_schema(table: &LoadedTable) {
    let total = table.records.len();
    println!("{} entries, {} columns", total, table.columns.len());
    println!("{:<4} {:<24} {:>14}  {}", "#", "Column", "Non-Null Count", "Dtype");

    let count = |f: &dyn Fn(&GenerationRecord) -> bool| {
        table.records.iter().filter(|&r| f(r)).count()
    };
    let generated = count(&|r: &GenerationRecord| r.generated_kwh.is_some());
    let forecast = count(&|r: &GenerationRecord| r.forecast_kwh.is_some());

    let mut rows = vec![
        (table.day_column.as_str(), total, "date"),
        (table.generated_column.as_str(), generated, "float64"),
        (table.forecast_column.as_str(), forecast, "float64"),
    ];
    for (i, name) in table.extra_columns.iter().enumerate() {
        let non_null = count(&|r: &GenerationRecord| r.extra[i].is_some());
        rows.push((name.as_str(), non_null, "text"));
    }

    for (i, (name, non_null, dtype)) in rows.iter().enumerate() {
        println!("{:<4} {:<24} {:>14}  {}", i, name, format!("{} non-null", non_null), dtype);
    }
}
