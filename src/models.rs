// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use chrono::NaiveDate;
use std::fmt;

/// One row of the generation log, as loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRecord {
    pub day: NaiveDate,
    pub generated_kwh: Option<f64>,
    pub forecast_kwh: Option<f64>,
    // Cells of the non-required columns, in header order
    pub extra: Vec<Option<String>>,
}

/// Loaded records plus the normalized header they were read with.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub columns: Vec<String>,
    pub day_column: String,
    pub generated_column: String,
    pub forecast_column: String,
    /// Names of the columns backing `GenerationRecord::extra`
    pub extra_columns: Vec<String>,
    pub records: Vec<GenerationRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndefinedReason {
    ZeroForecast,
    MissingInput,
}

/// Relative error of a day, in percent of the forecast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ErrorPct {
    Defined(f64),
    Undefined(UndefinedReason),
}

impl ErrorPct {
    pub fn value(&self) -> Option<f64> {
        match self {
            ErrorPct::Defined(v) => Some(*v),
            ErrorPct::Undefined(_) => None,
        }
    }
}

impl fmt::Display for ErrorPct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorPct::Defined(v) => write!(f, "{:.2}%", v),
            ErrorPct::Undefined(UndefinedReason::ZeroForecast) => {
                write!(f, "undefined (zero forecast)")
            }
            ErrorPct::Undefined(UndefinedReason::MissingInput) => {
                write!(f, "undefined (missing value)")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PerformanceCategory {
    Deficit,
    WithinForecast,
    Surplus,
}

impl PerformanceCategory {
    pub const ALL: [PerformanceCategory; 3] = [
        PerformanceCategory::Deficit,
        PerformanceCategory::WithinForecast,
        PerformanceCategory::Surplus,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PerformanceCategory::Deficit => "Deficit",
            PerformanceCategory::WithinForecast => "Within Forecast",
            PerformanceCategory::Surplus => "Surplus",
        }
    }
}

impl fmt::Display for PerformanceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A record together with the columns derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    pub record: GenerationRecord,
    pub diff_kwh: Option<f64>,
    pub error_pct: ErrorPct,
    pub category: Option<PerformanceCategory>,
}

/// Aggregate statistics over the whole collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub mean_generated: Option<f64>,
    pub mean_forecast: Option<f64>,
    pub mean_error_pct: Option<f64>,
    pub mae: Option<f64>,
    pub rmse: Option<f64>,
    /// Rows where both generated and forecast are present
    pub paired_rows: usize,
    pub zero_forecast_rows: usize,
    pub missing_input_rows: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryTally {
    pub deficit: usize,
    pub within_forecast: usize,
    pub surplus: usize,
    pub unclassified: usize,
}

impl CategoryTally {
    pub fn get(&self, category: PerformanceCategory) -> usize {
        match category {
            PerformanceCategory::Deficit => self.deficit,
            PerformanceCategory::WithinForecast => self.within_forecast,
            PerformanceCategory::Surplus => self.surplus,
        }
    }

    /// Categories with their counts, most frequent first.
    ///
    /// Ties keep the Deficit, Within Forecast, Surplus order.
    pub fn ranked(&self) -> Vec<(PerformanceCategory, usize)> {
        let mut counts: Vec<_> = PerformanceCategory::ALL
            .iter()
            .map(|c| (*c, self.get(*c)))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts
    }
}
