use serde::Serialize;

use super::types::ProjectedRecord;

/// Age-bin edges for cohort reporting. Bins are left-open/right-closed,
/// so age 35 itself falls outside the first bin and ages 36..=39 land in
/// `35-39`. Ages outside `36..=64` carry no cohort and are skipped by the
/// aggregates (they stay in the population metrics).
pub const AGE_BIN_EDGES: [i64; 7] = [35, 39, 44, 49, 54, 59, 64];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AgeCohort {
    #[serde(rename = "35-39")]
    From35To39,
    #[serde(rename = "40-44")]
    From40To44,
    #[serde(rename = "45-49")]
    From45To49,
    #[serde(rename = "50-54")]
    From50To54,
    #[serde(rename = "55-59")]
    From55To59,
    #[serde(rename = "60-64")]
    From60To64,
}

impl AgeCohort {
    pub const ALL: [AgeCohort; 6] = [
        AgeCohort::From35To39,
        AgeCohort::From40To44,
        AgeCohort::From45To49,
        AgeCohort::From50To54,
        AgeCohort::From55To59,
        AgeCohort::From60To64,
    ];

    pub fn from_age(age: i64) -> Option<Self> {
        match age {
            36..=39 => Some(AgeCohort::From35To39),
            40..=44 => Some(AgeCohort::From40To44),
            45..=49 => Some(AgeCohort::From45To49),
            50..=54 => Some(AgeCohort::From50To54),
            55..=59 => Some(AgeCohort::From55To59),
            60..=64 => Some(AgeCohort::From60To64),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AgeCohort::From35To39 => "35-39",
            AgeCohort::From40To44 => "40-44",
            AgeCohort::From45To49 => "45-49",
            AgeCohort::From50To54 => "50-54",
            AgeCohort::From55To59 => "55-59",
            AgeCohort::From60To64 => "60-64",
        }
    }
}

/// Human-readable race group. Codes outside the known map are their own
/// `Unknown` group rather than dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RaceLabel {
    White,
    Black,
    Hispanic,
    Other,
    Unknown,
}

impl RaceLabel {
    pub const ALL: [RaceLabel; 5] = [
        RaceLabel::White,
        RaceLabel::Black,
        RaceLabel::Hispanic,
        RaceLabel::Other,
        RaceLabel::Unknown,
    ];

    pub fn from_code(code: i64) -> Self {
        match code {
            1 => RaceLabel::White,
            2 => RaceLabel::Black,
            3 => RaceLabel::Hispanic,
            4 => RaceLabel::Other,
            _ => RaceLabel::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RaceLabel::White => "White",
            RaceLabel::Black => "Black",
            RaceLabel::Hispanic => "Hispanic",
            RaceLabel::Other => "Other",
            RaceLabel::Unknown => "Unknown",
        }
    }
}

/// One cell of the race × age-cohort shortfall table: the mean final
/// capital over the group's members. Empty groups are omitted instead of
/// reported as NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortShortfallRow {
    pub race: RaceLabel,
    pub age_cohort: AgeCohort,
    pub mean_new_accumulated_capital: f64,
    pub count: usize,
}

/// Per-cohort readiness impact versus the whole population, in
/// percentage points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessDeltaRow {
    pub age_cohort: AgeCohort,
    pub delta_percentage_points: f64,
}

pub fn shortfall_by_cohort(projected: &[ProjectedRecord]) -> Vec<CohortShortfallRow> {
    let mut sums = [[0.0f64; AgeCohort::ALL.len()]; RaceLabel::ALL.len()];
    let mut counts = [[0usize; AgeCohort::ALL.len()]; RaceLabel::ALL.len()];

    for p in projected {
        let Some(cohort) = AgeCohort::from_age(p.record.initial_age) else {
            continue;
        };
        let race = RaceLabel::from_code(p.record.race);
        sums[race as usize][cohort as usize] += p.new_accumulated_capital;
        counts[race as usize][cohort as usize] += 1;
    }

    let mut rows = Vec::new();
    for race in RaceLabel::ALL {
        for cohort in AgeCohort::ALL {
            let count = counts[race as usize][cohort as usize];
            if count == 0 {
                continue;
            }
            rows.push(CohortShortfallRow {
                race,
                age_cohort: cohort,
                mean_new_accumulated_capital: sums[race as usize][cohort as usize]
                    / count as f64,
                count,
            });
        }
    }
    rows
}

pub fn readiness_delta_by_cohort(
    projected: &[ProjectedRecord],
    overall_readiness_rating: f64,
) -> Vec<ReadinessDeltaRow> {
    let mut ready = [0usize; AgeCohort::ALL.len()];
    let mut totals = [0usize; AgeCohort::ALL.len()];

    for p in projected {
        let Some(cohort) = AgeCohort::from_age(p.record.initial_age) else {
            continue;
        };
        totals[cohort as usize] += 1;
        if p.new_accumulated_capital >= 0.0 {
            ready[cohort as usize] += 1;
        }
    }

    AgeCohort::ALL
        .into_iter()
        .filter(|cohort| totals[*cohort as usize] > 0)
        .map(|cohort| {
            let cohort_rating =
                ready[cohort as usize] as f64 / totals[cohort as usize] as f64;
            ReadinessDeltaRow {
                age_cohort: cohort,
                delta_percentage_points: (cohort_rating - overall_readiness_rating) * 100.0,
            }
        })
        .collect()
}
