use serde::Serialize;

use super::cohorts::{
    CohortShortfallRow, ReadinessDeltaRow, readiness_delta_by_cohort, shortfall_by_cohort,
};
use super::types::{ProjectedRecord, ProjectionError, Record, RetirementMetrics, ScenarioParams};

/// Everything one scenario run produces: the projected records in
/// post-filter order, the two population metrics, and the cohort tables
/// a rendering collaborator consumes as-is.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioOutcome {
    pub records: Vec<ProjectedRecord>,
    pub metrics: RetirementMetrics,
    pub shortfall_by_cohort: Vec<CohortShortfallRow>,
    pub readiness_delta_by_cohort: Vec<ReadinessDeltaRow>,
}

/// Rescales each record's nominal income to the start year. The exponent
/// is `start_year - initial_age` and may be negative, in which case the
/// income deflates; both directions must round-trip the same offset the
/// match calculator recomputes later.
pub fn adjust_income_for_inflation(records: &mut [Record], params: &ScenarioParams) {
    for record in records.iter_mut() {
        let years = params.years_since_start(record.initial_age);
        // Saturating: past i32 range the power has long since hit inf or
        // zero, so clamping preserves the result while a plain cast would
        // wrap the exponent.
        let exponent = years.clamp(i32::MIN as i64, i32::MAX as i64) as i32;
        record.income *= (1.0 + params.inflation_rate).powi(exponent);
    }
}

/// Retains records at or above the age threshold, preserving input order.
pub fn filter_eligible(records: Vec<Record>, params: &ScenarioParams) -> Vec<Record> {
    records
        .into_iter()
        .filter(|record| record.initial_age >= params.age_threshold)
        .collect()
}

/// Matched dollars the program adds for one record, amortized over the
/// eligible years. Records over the income ceiling get exactly zero.
/// `eligible_years` can go negative when the record is already past
/// retirement age in the projection; the negative match is kept as-is so
/// the metrics stage sees the same figures the program design produces.
pub fn matched_savings(record: &Record, params: &ScenarioParams) -> f64 {
    if record.income > params.income_threshold {
        return 0.0;
    }
    let years_since_start = params.years_since_start(record.initial_age);
    let years_until_retirement =
        params.retirement_age - (record.initial_age + years_since_start);
    let eligible_years = years_until_retirement.min(years_since_start);
    record.income * record.annual_contribution * params.max_match_amount * eligible_years as f64
}

/// Folds the program match into baseline capital:
/// `new_accumulated_capital = accumulated_capital + additional_savings`.
pub fn accumulate_capital(records: Vec<Record>, params: &ScenarioParams) -> Vec<ProjectedRecord> {
    records
        .into_iter()
        .map(|record| {
            let additional_savings = matched_savings(&record, params);
            let new_accumulated_capital = record.accumulated_capital + additional_savings;
            ProjectedRecord {
                record,
                additional_savings,
                new_accumulated_capital,
            }
        })
        .collect()
}

/// Population readiness rating and per-capita shortfall. Both divide by
/// the full population size, so an empty set is a hard error rather than
/// a NaN that would poison every downstream table.
pub fn retirement_metrics(
    projected: &[ProjectedRecord],
) -> Result<RetirementMetrics, ProjectionError> {
    if projected.is_empty() {
        return Err(ProjectionError::EmptyPopulation);
    }
    let total = projected.len() as f64;
    let ready = projected
        .iter()
        .filter(|p| p.new_accumulated_capital >= 0.0)
        .count();
    let shortfall_sum: f64 = projected
        .iter()
        .map(|p| p.new_accumulated_capital)
        .filter(|capital| *capital < 0.0)
        .sum();
    Ok(RetirementMetrics {
        readiness_rating: ready as f64 / total,
        savings_shortfall: shortfall_sum / total,
    })
}

/// Runs the full pipeline in stage order: inflation adjustment,
/// eligibility filter, match calculation, capital accumulation, metrics,
/// cohort aggregation.
pub fn run_scenario(
    mut records: Vec<Record>,
    params: &ScenarioParams,
) -> Result<ScenarioOutcome, ProjectionError> {
    adjust_income_for_inflation(&mut records, params);
    let eligible = filter_eligible(records, params);
    let projected = accumulate_capital(eligible, params);
    let metrics = retirement_metrics(&projected)?;
    let shortfall_by_cohort = shortfall_by_cohort(&projected);
    let readiness_delta_by_cohort =
        readiness_delta_by_cohort(&projected, metrics.readiness_rating);
    Ok(ScenarioOutcome {
        records: projected,
        metrics,
        shortfall_by_cohort,
        readiness_delta_by_cohort,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f64 = 1e-9;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_params() -> ScenarioParams {
        ScenarioParams {
            start_year: 50,
            inflation_rate: 0.044,
            age_threshold: 18,
            max_match_amount: 5_000.0,
            income_threshold: 10_000.0,
            retirement_age: 65,
        }
    }

    fn record(initial_age: i64, income: f64, capital: f64, contribution: f64) -> Record {
        Record {
            initial_age,
            weight: 1.0,
            family_kind: 1,
            race: 1,
            marital_status: 1,
            accumulated_capital: capital,
            annual_contribution: contribution,
            income,
        }
    }

    #[test]
    fn inflation_adjustment_applies_signed_exponent() {
        let params = sample_params();
        let mut records = vec![record(45, 1_000.0, 0.0, 0.0), record(55, 1_000.0, 0.0, 0.0)];
        adjust_income_for_inflation(&mut records, &params);

        // 50 - 45 = 5 years of inflation; 50 - 55 = -5 years of deflation.
        assert_close(records[0].income, 1_000.0 * 1.044_f64.powi(5));
        assert_close(records[1].income, 1_000.0 * 1.044_f64.powi(-5));
    }

    #[test]
    fn extreme_year_offsets_saturate_instead_of_wrapping() {
        let params = sample_params();
        let mut records = vec![
            record(-(i32::MAX as i64) - 100, 1_000.0, 0.0, 0.0),
            record(i32::MAX as i64 + 100, 1_000.0, 0.0, 0.0),
        ];
        adjust_income_for_inflation(&mut records, &params);

        // Offsets beyond i32 range keep the sign of the true exponent:
        // a huge positive offset overflows to infinity, a huge negative
        // one underflows to zero.
        assert!(records[0].income.is_infinite() && records[0].income > 0.0);
        assert_eq!(records[1].income, 0.0);
    }

    #[test]
    fn filter_keeps_threshold_age_and_drops_below() {
        let params = sample_params();
        let records = vec![
            record(17, 0.0, 0.0, 0.0),
            record(18, 0.0, 0.0, 0.0),
            record(40, 0.0, 0.0, 0.0),
        ];
        let kept = filter_eligible(records, &params);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].initial_age, 18);
        assert_eq!(kept[1].initial_age, 40);
    }

    #[test]
    fn match_is_exactly_zero_above_income_threshold() {
        let params = sample_params();
        let over = record(40, 10_000.000001, 0.0, 0.05);
        assert_eq!(matched_savings(&over, &params), 0.0);
    }

    #[test]
    fn match_amortizes_over_min_of_both_year_caps() {
        let params = sample_params();
        // years_since_start = 50 - 40 = 10; years_until_retirement = 65 - 50 = 15.
        let r = record(40, 8_000.0, 0.0, 0.05);
        let expected = 8_000.0 * 0.05 * 5_000.0 * 10.0;
        assert_close(matched_savings(&r, &params), expected);
    }

    #[test]
    fn negative_eligible_years_produces_negative_match() {
        let mut params = sample_params();
        params.retirement_age = 45;
        // years_until_retirement = 45 - 50 = -5 < years_since_start = 10.
        let r = record(40, 8_000.0, 0.0, 0.05);
        let expected = 8_000.0 * 0.05 * 5_000.0 * -5.0;
        assert_close(matched_savings(&r, &params), expected);
        assert!(matched_savings(&r, &params) < 0.0);
    }

    #[test]
    fn capital_accumulation_is_exact_sum() {
        let params = sample_params();
        let projected = accumulate_capital(vec![record(40, 8_000.0, 5_000.0, 0.05)], &params);
        assert_eq!(projected.len(), 1);
        assert_eq!(
            projected[0].new_accumulated_capital,
            projected[0].record.accumulated_capital + projected[0].additional_savings
        );
    }

    #[test]
    fn metrics_on_empty_population_fail_explicitly() {
        assert_eq!(
            retirement_metrics(&[]).unwrap_err(),
            ProjectionError::EmptyPopulation
        );
    }

    #[test]
    fn all_ready_population_has_zero_shortfall() {
        let params = sample_params();
        let projected = accumulate_capital(
            vec![
                record(40, 8_000.0, 1_000.0, 0.05),
                record(41, 8_000.0, 2_000.0, 0.05),
            ],
            &params,
        );
        let metrics = retirement_metrics(&projected).expect("non-empty");
        assert_eq!(metrics.readiness_rating, 1.0);
        assert_eq!(metrics.savings_shortfall, 0.0);
    }

    #[test]
    fn shortfall_divides_by_whole_population() {
        let projected = vec![
            ProjectedRecord {
                record: record(40, 0.0, 0.0, 0.0),
                additional_savings: 0.0,
                new_accumulated_capital: -900.0,
            },
            ProjectedRecord {
                record: record(41, 0.0, 0.0, 0.0),
                additional_savings: 0.0,
                new_accumulated_capital: 100.0,
            },
            ProjectedRecord {
                record: record(42, 0.0, 0.0, 0.0),
                additional_savings: 0.0,
                new_accumulated_capital: 200.0,
            },
        ];
        let metrics = retirement_metrics(&projected).expect("non-empty");
        // Per-capita shortfall: -900 over three people, not one.
        assert_close(metrics.savings_shortfall, -300.0);
        assert_close(metrics.readiness_rating, 2.0 / 3.0);
    }

    #[test]
    fn two_record_scenario_filters_the_minor_and_rates_one_person() {
        let params = sample_params();
        let records = vec![
            record(40, 10_000.0, 5_000.0, 0.05),
            record(10, 8_000.0, 1_000.0, 0.1),
        ];
        let outcome = run_scenario(records, &params).expect("one eligible record");
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].record.initial_age, 40);
        assert_eq!(outcome.metrics.readiness_rating, 1.0);
    }

    #[test]
    fn scenario_with_no_eligible_records_reports_empty_population() {
        let params = sample_params();
        let records = vec![record(10, 8_000.0, 1_000.0, 0.1)];
        assert_eq!(
            run_scenario(records, &params).unwrap_err(),
            ProjectionError::EmptyPopulation
        );
    }

    fn arb_record() -> impl Strategy<Value = Record> {
        (
            0i64..90,
            0.0f64..20_000.0,
            -50_000.0f64..50_000.0,
            0.0f64..0.2,
        )
            .prop_map(|(age, income, capital, contribution)| {
                record(age, income, capital, contribution)
            })
    }

    proptest! {
        #[test]
        fn prop_filter_is_order_preserving_subset(
            records in proptest::collection::vec(arb_record(), 0..40),
            threshold in 0i64..90
        ) {
            let mut params = sample_params();
            params.age_threshold = threshold;
            let kept = filter_eligible(records.clone(), &params);

            prop_assert!(kept.iter().all(|r| r.initial_age >= threshold));

            let mut cursor = records.iter();
            for keep in &kept {
                prop_assert!(cursor.any(|r| r == keep));
            }
        }

        #[test]
        fn prop_new_capital_is_baseline_plus_match(
            records in proptest::collection::vec(arb_record(), 1..40)
        ) {
            let params = sample_params();
            let projected = accumulate_capital(records, &params);
            for p in &projected {
                prop_assert_eq!(
                    p.new_accumulated_capital,
                    p.record.accumulated_capital + p.additional_savings
                );
            }
        }

        #[test]
        fn prop_readiness_in_unit_interval_and_shortfall_nonpositive(
            records in proptest::collection::vec(arb_record(), 1..40)
        ) {
            let params = sample_params();
            let projected = accumulate_capital(records, &params);
            let metrics = retirement_metrics(&projected).unwrap();
            prop_assert!((0.0..=1.0).contains(&metrics.readiness_rating));
            prop_assert!(metrics.savings_shortfall <= 0.0);
        }

        #[test]
        fn prop_over_threshold_income_never_earns_a_match(
            age in 0i64..90,
            income_excess in 0.001f64..100_000.0,
            contribution in 0.0f64..0.2
        ) {
            let params = sample_params();
            let r = record(age, params.income_threshold + income_excess, 0.0, contribution);
            prop_assert_eq!(matched_savings(&r, &params), 0.0);
        }
    }
}
