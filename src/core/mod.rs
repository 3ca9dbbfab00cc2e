mod cohorts;
mod pipeline;
mod types;

pub use cohorts::{
    AGE_BIN_EDGES, AgeCohort, CohortShortfallRow, RaceLabel, ReadinessDeltaRow,
    readiness_delta_by_cohort, shortfall_by_cohort,
};
pub use pipeline::{
    ScenarioOutcome, accumulate_capital, adjust_income_for_inflation, filter_eligible,
    matched_savings, retirement_metrics, run_scenario,
};
pub use types::{ProjectedRecord, ProjectionError, Record, RetirementMetrics, ScenarioParams};
