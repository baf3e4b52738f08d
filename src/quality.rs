// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use crate::models::{GenerationRecord, LoadedTable};
use chrono::NaiveDate;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateRow {
    /// 1-based position among the data rows
    pub row_number: usize,
    pub record: GenerationRecord,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QualityReport {
    pub total_rows: usize,
    pub duplicates: Vec<DuplicateRow>,
    /// Missing values per column, in header order
    pub null_counts: Vec<(String, usize)>,
}

impl QualityReport {
    pub fn duplicate_count(&self) -> usize {
        self.duplicates.len()
    }

    pub fn total_nulls(&self) -> usize {
        self.null_counts.iter().map(|(_, n)| n).sum()
    }
}

// Floats compare by bit pattern so that nulls match nulls and equal values
// match exactly.
type RowKey<'a> = (NaiveDate, Option<u64>, Option<u64>, &'a [Option<String>]);

// -0.0 and 0.0 are the same value
fn float_key(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

fn row_key(record: &GenerationRecord) -> RowKey<'_> {
    (
        record.day,
        record.generated_kwh.map(float_key),
        record.forecast_kwh.map(float_key),
        record.extra.as_slice(),
    )
}

/// Rows whose full tuple matches an earlier row. Every later occurrence is
/// reported; the first one is not.
pub fn find_duplicates(records: &[GenerationRecord]) -> Vec<DuplicateRow> {
    let mut seen = HashSet::new();
    records
        .iter()
        .enumerate()
        .filter(|&(_, record)| !seen.insert(row_key(record)))
        .map(|(i, record)| DuplicateRow {
            row_number: i + 1,
            record: record.clone(),
        })
        .collect()
}

pub fn count_nulls(table: &LoadedTable) -> Vec<(String, usize)> {
    let records = &table.records;
    table
        .columns
        .iter()
        .map(|column| {
            let nulls = if *column == table.day_column {
                // The loader rejects rows without a date
                0
            } else if *column == table.generated_column {
                records.iter().filter(|r| r.generated_kwh.is_none()).count()
            } else if *column == table.forecast_column {
                records.iter().filter(|r| r.forecast_kwh.is_none()).count()
            } else {
                match table.extra_columns.iter().position(|c| c == column) {
                    Some(idx) => records.iter().filter(|r| r.extra[idx].is_none()).count(),
                    None => 0,
                }
            };
            (column.clone(), nulls)
        })
        .collect()
}

/// Inspect the loaded table for duplicate rows and missing values.
pub fn check_quality(table: &LoadedTable) -> QualityReport {
    let report = QualityReport {
        total_rows: table.records.len(),
        duplicates: find_duplicates(&table.records),
        null_counts: count_nulls(table),
    };
    tracing::info!(
        rows = report.total_rows,
        duplicates = report.duplicate_count(),
        nulls = report.total_nulls(),
        "quality check complete"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(day: u32, generated: Option<f64>, forecast: Option<f64>) -> GenerationRecord {
        GenerationRecord {
            day: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            generated_kwh: generated,
            forecast_kwh: forecast,
            extra: vec![],
        }
    }

    fn table(records: Vec<GenerationRecord>) -> LoadedTable {
        LoadedTable {
            columns: vec!["dia".into(), "gerado(kwh)".into(), "prognóstico(kwh)".into()],
            day_column: "dia".into(),
            generated_column: "gerado(kwh)".into(),
            forecast_column: "prognóstico(kwh)".into(),
            extra_columns: vec![],
            records,
        }
    }

    #[test]
    fn test_two_identical_rows_count_once() {
        let records = vec![
            record(1, Some(90.0), Some(100.0)),
            record(2, Some(50.0), Some(100.0)),
            record(1, Some(90.0), Some(100.0)),
        ];
        let duplicates = find_duplicates(&records);
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].row_number, 3);
        assert_eq!(duplicates[0].record, records[0]);
    }

    #[test]
    fn test_same_day_different_values_is_not_duplicate() {
        let records = vec![record(1, Some(90.0), Some(100.0)), record(1, Some(91.0), Some(100.0))];
        assert!(find_duplicates(&records).is_empty());
    }

    #[test]
    fn test_signed_zero_rows_are_duplicates() {
        let records = vec![record(1, Some(0.0), Some(10.0)), record(1, Some(-0.0), Some(10.0))];
        let duplicates = find_duplicates(&records);
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].row_number, 2);
    }

    #[test]
    fn test_triplicate_reports_two() {
        let records = vec![record(1, None, Some(1.0)); 3];
        let duplicates = find_duplicates(&records);
        assert_eq!(
            duplicates.iter().map(|d| d.row_number).collect::<Vec<_>>(),
            vec![2, 3]
        );
    }

    #[test]
    fn test_extra_columns_take_part_in_duplicates() {
        let mut a = record(1, Some(1.0), Some(1.0));
        a.extra = vec![Some("sol".into())];
        let mut b = a.clone();
        b.extra = vec![Some("chuva".into())];
        assert!(find_duplicates(&[a.clone(), b]).is_empty());
        assert_eq!(find_duplicates(&[a.clone(), a]).len(), 1);
    }

    #[test]
    fn test_null_counts_per_column() {
        let report = check_quality(&table(vec![
            record(1, None, Some(100.0)),
            record(2, None, None),
            record(3, Some(1.0), Some(1.0)),
        ]));

        assert_eq!(
            report.null_counts,
            vec![
                ("dia".to_string(), 0),
                ("gerado(kwh)".to_string(), 2),
                ("prognóstico(kwh)".to_string(), 1),
            ]
        );
        assert_eq!(report.total_nulls(), 3);
        assert_eq!(report.total_rows, 3);
        assert_eq!(report.duplicate_count(), 0);
    }

    #[test]
    fn test_check_does_not_mutate() {
        let original = table(vec![
            record(1, Some(1.0), Some(1.0)),
            record(1, Some(1.0), Some(1.0)),
        ]);
        let before = original.records.clone();
        let report = check_quality(&original);
        assert_eq!(report.duplicate_count(), 1);
        assert_eq!(original.records, before);
    }
}
