use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One individual from the input panel. Field order matches the input
/// table's column order so the same shape serves CSV rows and API rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub initial_age: i64,
    pub weight: f64,
    pub family_kind: i64,
    pub race: i64,
    pub marital_status: i64,
    pub accumulated_capital: f64,
    pub annual_contribution: f64,
    pub income: f64,
}

/// A record after the full projection: the input row (with
/// inflation-adjusted income) plus the two derived fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedRecord {
    #[serde(flatten)]
    pub record: Record,
    pub additional_savings: f64,
    pub new_accumulated_capital: f64,
}

/// Policy constants for one scenario run. Built and validated once at the
/// API boundary, then passed read-only to every stage.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioParams {
    pub start_year: i64,
    pub inflation_rate: f64,
    pub age_threshold: i64,
    pub max_match_amount: f64,
    pub income_threshold: f64,
    pub retirement_age: i64,
}

impl ScenarioParams {
    /// Signed year offset used by both the inflation adjustment and the
    /// matched-contribution amortization. A record "older" than the start
    /// year deflates rather than inflates; that sign is intentional.
    pub fn years_since_start(&self, initial_age: i64) -> i64 {
        self.start_year - initial_age
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetirementMetrics {
    /// Fraction of the population with non-negative final capital.
    pub readiness_rating: f64,
    /// Sum of negative final capital divided by the whole population
    /// size, so a per-capita figure rather than a per-shortfaller one.
    pub savings_shortfall: f64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("no records remain after the eligibility filter; metrics are undefined")]
    EmptyPopulation,
}
