// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use crate::models::{
    CategoryTally, EnrichedRecord, ErrorPct, GenerationRecord, PerformanceCategory, Summary,
    UndefinedReason,
};

pub const DEFAULT_THRESHOLD_PCT: f64 = 15.0;

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Mean absolute error between two equal-length series.
pub fn mean_absolute_error(reference: &[f64], predicted: &[f64]) -> Option<f64> {
    debug_assert_eq!(reference.len(), predicted.len());
    let errors: Vec<f64> = reference
        .iter()
        .zip(predicted)
        .map(|(r, p)| (p - r).abs())
        .collect();
    mean(&errors)
}

/// Root mean squared error between two equal-length series.
pub fn root_mean_squared_error(reference: &[f64], predicted: &[f64]) -> Option<f64> {
    debug_assert_eq!(reference.len(), predicted.len());
    let squared: Vec<f64> = reference
        .iter()
        .zip(predicted)
        .map(|(r, p)| (p - r).powi(2))
        .collect();
    mean(&squared).map(f64::sqrt)
}

pub fn diff_kwh(record: &GenerationRecord) -> Option<f64> {
    Some(record.generated_kwh? - record.forecast_kwh?)
}

pub fn error_pct(generated: Option<f64>, forecast: Option<f64>) -> ErrorPct {
    match (generated, forecast) {
        (Some(_), Some(f)) if f == 0.0 => ErrorPct::Undefined(UndefinedReason::ZeroForecast),
        (Some(g), Some(f)) => ErrorPct::Defined((g - f) / f * 100.0),
        _ => ErrorPct::Undefined(UndefinedReason::MissingInput),
    }
}

/// Three-way split of the error axis; the middle band is closed at both ends.
pub fn classify(error_pct: f64, threshold: f64) -> PerformanceCategory {
    if error_pct < -threshold {
        PerformanceCategory::Deficit
    } else if error_pct <= threshold {
        PerformanceCategory::WithinForecast
    } else {
        PerformanceCategory::Surplus
    }
}

/// Add the derived columns to every record: difference, then percentage
/// error, then category.
pub fn enrich(records: &[GenerationRecord], threshold: f64) -> Vec<EnrichedRecord> {
    records
        .iter()
        .map(|record| {
            let diff_kwh = diff_kwh(record);
            let error_pct = error_pct(record.generated_kwh, record.forecast_kwh);
            let category = error_pct.value().map(|pct| classify(pct, threshold));
            EnrichedRecord {
                record: record.clone(),
                diff_kwh,
                error_pct,
                category,
            }
        })
        .collect()
}

pub fn summarize(records: &[EnrichedRecord]) -> Summary {
    let generated: Vec<f64> = records.iter().filter_map(|r| r.record.generated_kwh).collect();
    let forecast: Vec<f64> = records.iter().filter_map(|r| r.record.forecast_kwh).collect();
    let errors: Vec<f64> = records.iter().filter_map(|r| r.error_pct.value()).collect();

    let (paired_forecast, paired_generated): (Vec<f64>, Vec<f64>) = records
        .iter()
        .filter_map(|r| Some((r.record.forecast_kwh?, r.record.generated_kwh?)))
        .unzip();

    let undefined = |reason: UndefinedReason| {
        records
            .iter()
            .filter(|r| r.error_pct == ErrorPct::Undefined(reason))
            .count()
    };

    let summary = Summary {
        mean_generated: mean(&generated),
        mean_forecast: mean(&forecast),
        mean_error_pct: mean(&errors),
        mae: mean_absolute_error(&paired_forecast, &paired_generated),
        rmse: root_mean_squared_error(&paired_forecast, &paired_generated),
        paired_rows: paired_forecast.len(),
        zero_forecast_rows: undefined(UndefinedReason::ZeroForecast),
        missing_input_rows: undefined(UndefinedReason::MissingInput),
    };
    if summary.zero_forecast_rows > 0 {
        tracing::warn!(
            rows = summary.zero_forecast_rows,
            "zero forecast, error percentage undefined"
        );
    }
    summary
}

pub fn category_counts(records: &[EnrichedRecord]) -> CategoryTally {
    let mut tally = CategoryTally::default();
    for record in records {
        match record.category {
            Some(PerformanceCategory::Deficit) => tally.deficit += 1,
            Some(PerformanceCategory::WithinForecast) => tally.within_forecast += 1,
            Some(PerformanceCategory::Surplus) => tally.surplus += 1,
            None => tally.unclassified += 1,
        }
    }
    tally
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn record(day: u32, generated: Option<f64>, forecast: Option<f64>) -> GenerationRecord {
        GenerationRecord {
            day: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            generated_kwh: generated,
            forecast_kwh: forecast,
            extra: vec![],
        }
    }

    #[test]
    fn test_scenario_rows() {
        let enriched = enrich(
            &[
                record(1, Some(90.0), Some(100.0)),
                record(2, Some(50.0), Some(100.0)),
                record(3, Some(130.0), Some(100.0)),
            ],
            DEFAULT_THRESHOLD_PCT,
        );

        assert_relative_eq!(enriched[0].diff_kwh.unwrap(), -10.0);
        assert_relative_eq!(enriched[0].error_pct.value().unwrap(), -10.0);
        assert_eq!(enriched[0].category, Some(PerformanceCategory::WithinForecast));

        assert_relative_eq!(enriched[1].error_pct.value().unwrap(), -50.0);
        assert_eq!(enriched[1].category, Some(PerformanceCategory::Deficit));

        assert_relative_eq!(enriched[2].error_pct.value().unwrap(), 30.0);
        assert_eq!(enriched[2].category, Some(PerformanceCategory::Surplus));
    }

    #[test]
    fn test_derived_values_are_exact() {
        let r = record(1, Some(123.45), Some(67.8));
        assert_eq!(diff_kwh(&r), Some(123.45 - 67.8));
        assert_eq!(
            error_pct(r.generated_kwh, r.forecast_kwh),
            ErrorPct::Defined((123.45 - 67.8) / 67.8 * 100.0)
        );
    }

    #[test]
    fn test_classify_band_edges() {
        let t = DEFAULT_THRESHOLD_PCT;
        assert_eq!(classify(-15.0, t), PerformanceCategory::WithinForecast);
        assert_eq!(classify(15.0, t), PerformanceCategory::WithinForecast);
        assert_eq!(classify(0.0, t), PerformanceCategory::WithinForecast);
        assert_eq!(classify(-15.000001, t), PerformanceCategory::Deficit);
        assert_eq!(classify(15.000001, t), PerformanceCategory::Surplus);
        assert_eq!(classify(f64::NEG_INFINITY, t), PerformanceCategory::Deficit);
        assert_eq!(classify(f64::INFINITY, t), PerformanceCategory::Surplus);
    }

    #[test]
    fn test_zero_forecast_is_undefined() {
        let enriched = enrich(
            &[record(1, Some(42.0), Some(0.0)), record(2, Some(90.0), Some(100.0))],
            DEFAULT_THRESHOLD_PCT,
        );

        assert_eq!(
            enriched[0].error_pct,
            ErrorPct::Undefined(UndefinedReason::ZeroForecast)
        );
        assert_eq!(enriched[0].diff_kwh, Some(42.0));
        assert_eq!(enriched[0].category, None);

        let summary = summarize(&enriched);
        assert_eq!(summary.zero_forecast_rows, 1);
        // Only the defined row contributes to the mean error
        assert_relative_eq!(summary.mean_error_pct.unwrap(), -10.0);
        assert!(summary.mean_error_pct.unwrap().is_finite());

        let tally = category_counts(&enriched);
        assert_eq!(tally.unclassified, 1);
        assert_eq!(tally.within_forecast, 1);
    }

    #[test]
    fn test_missing_input_is_undefined() {
        assert_eq!(
            error_pct(None, Some(100.0)),
            ErrorPct::Undefined(UndefinedReason::MissingInput)
        );
        assert_eq!(
            error_pct(Some(0.0), None),
            ErrorPct::Undefined(UndefinedReason::MissingInput)
        );
        assert_eq!(diff_kwh(&record(1, None, Some(1.0))), None);
    }

    #[test]
    fn test_enrich_is_idempotent() {
        let records = vec![
            record(1, Some(90.0), Some(100.0)),
            record(2, Some(12.5), Some(0.0)),
            record(3, None, Some(3.0)),
        ];
        assert_eq!(enrich(&records, 15.0), enrich(&records, 15.0));

        let once = enrich(&records, 15.0);
        let base: Vec<GenerationRecord> = once.iter().map(|e| e.record.clone()).collect();
        assert_eq!(enrich(&base, 15.0), once);
    }

    #[test]
    fn test_summary_statistics() {
        let enriched = enrich(
            &[
                record(1, Some(90.0), Some(100.0)),
                record(2, Some(50.0), Some(100.0)),
                record(3, Some(130.0), Some(100.0)),
            ],
            DEFAULT_THRESHOLD_PCT,
        );
        let summary = summarize(&enriched);

        assert_relative_eq!(summary.mean_generated.unwrap(), 90.0);
        assert_relative_eq!(summary.mean_forecast.unwrap(), 100.0);
        assert_relative_eq!(summary.mean_error_pct.unwrap(), -10.0);
        assert_relative_eq!(summary.mae.unwrap(), 30.0, epsilon = 1e-9);
        assert_relative_eq!(
            summary.rmse.unwrap(),
            ((100.0 + 2500.0 + 900.0) / 3.0_f64).sqrt(),
            epsilon = 1e-9
        );
        assert_eq!(summary.paired_rows, 3);
    }

    #[test]
    fn test_nulls_are_skipped_in_means() {
        let enriched = enrich(
            &[record(1, None, Some(100.0)), record(2, Some(80.0), Some(100.0))],
            DEFAULT_THRESHOLD_PCT,
        );
        let summary = summarize(&enriched);
        assert_relative_eq!(summary.mean_generated.unwrap(), 80.0);
        assert_relative_eq!(summary.mean_forecast.unwrap(), 100.0);
        assert_relative_eq!(summary.mae.unwrap(), 20.0);
        assert_eq!(summary.paired_rows, 1);
        assert_eq!(summary.missing_input_rows, 1);
    }

    #[test]
    fn test_summary_stays_finite_with_missing_markers() -> anyhow::Result<()> {
        let text = "dia;gerado(kwh);prognóstico(kwh)\n\
                    01/01/2024;NaN;100.0\n\
                    02/01/2024;90,00;inf\n\
                    03/01/2024;90,00;100.0\n";
        let options = crate::loader::LoadOptions {
            delimiter: b';',
            encoding: crate::config::Encoding::Utf8,
            columns: crate::config::ColumnNames::default(),
        };
        let table = crate::loader::parse_table(text, &options)?;
        let enriched = enrich(&table.records, DEFAULT_THRESHOLD_PCT);
        let summary = summarize(&enriched);

        assert_relative_eq!(summary.mean_generated.unwrap(), 90.0);
        assert_relative_eq!(summary.mean_forecast.unwrap(), 100.0);
        assert_relative_eq!(summary.mean_error_pct.unwrap(), -10.0);
        assert_relative_eq!(summary.mae.unwrap(), 10.0);
        assert_relative_eq!(summary.rmse.unwrap(), 10.0);
        assert_eq!(summary.missing_input_rows, 2);

        let tally = category_counts(&enriched);
        assert_eq!(tally.surplus, 0);
        assert_eq!(tally.within_forecast, 1);
        assert_eq!(tally.unclassified, 2);
        Ok(())
    }

    #[test]
    fn test_empty_collection() {
        let summary = summarize(&[]);
        assert_eq!(summary.mean_generated, None);
        assert_eq!(summary.mae, None);
        assert_eq!(summary.rmse, None);
        assert_eq!(category_counts(&[]), CategoryTally::default());
    }

    #[test]
    fn test_rmse_never_below_mae() {
        let series = [
            (vec![100.0, 100.0, 100.0], vec![90.0, 50.0, 130.0]),
            (vec![1.0, 2.0, 3.0, 4.0], vec![1.0, 2.0, 3.0, 4.0]),
            (vec![10.0, -3.5, 0.0], vec![-1.0, 7.25, 1e6]),
            (vec![5.0], vec![7.0]),
        ];
        for (reference, predicted) in series {
            let mae = mean_absolute_error(&reference, &predicted).unwrap();
            let rmse = root_mean_squared_error(&reference, &predicted).unwrap();
            assert!(mae >= 0.0);
            assert!(rmse + 1e-9 >= mae, "rmse {} < mae {}", rmse, mae);
        }
    }

    #[test]
    fn test_category_tally_ranking() {
        let enriched = enrich(
            &[
                record(1, Some(50.0), Some(100.0)),
                record(2, Some(40.0), Some(100.0)),
                record(3, Some(100.0), Some(100.0)),
            ],
            DEFAULT_THRESHOLD_PCT,
        );
        let tally = category_counts(&enriched);
        assert_eq!(
            tally.ranked(),
            vec![
                (PerformanceCategory::Deficit, 2),
                (PerformanceCategory::WithinForecast, 1),
                (PerformanceCategory::Surplus, 0),
            ]
        );
    }
}
