use axum::{
    Router,
    extract::Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;

use crate::core::{
    CohortShortfallRow, ProjectedRecord, ReadinessDeltaRow, Record, RetirementMetrics,
    ScenarioParams, run_scenario,
};
use crate::io::{load_records, write_records, write_report};

#[derive(Debug, Parser)]
#[command(
    name = "savers-match",
    about = "Project retirement readiness under the Saver's Match program"
)]
pub struct Cli {
    #[arg(long, default_value = "data.csv", help = "Input CSV panel of individuals")]
    input: PathBuf,
    #[arg(
        long,
        default_value = "new_scenario.csv",
        help = "Output CSV of projected records"
    )]
    output: PathBuf,
    #[arg(long, default_value_t = 2020, help = "Reference year of the simulation")]
    start_year: i64,
    #[arg(long, default_value_t = 4.4, help = "Annual inflation in percent")]
    inflation_rate: f64,
    #[arg(long, default_value_t = 18, help = "Minimum age for program eligibility")]
    age_threshold: i64,
    #[arg(
        long,
        default_value_t = 5000.0,
        help = "Absolute cap on matched dollars per year"
    )]
    max_match_amount: f64,
    #[arg(
        long,
        default_value_t = 10000.0,
        help = "Income ceiling for match eligibility"
    )]
    income_threshold: f64,
    #[arg(long, default_value_t = 65, help = "Retirement age")]
    retirement_age: i64,
    #[arg(
        long,
        help = "Optional JSON report with metrics and cohort tables for chart rendering"
    )]
    report: Option<PathBuf>,
}

fn build_params(cli: &Cli) -> Result<ScenarioParams, String> {
    if !cli.inflation_rate.is_finite() || !(0.0..=100.0).contains(&cli.inflation_rate) {
        return Err("--inflation-rate must be between 0 and 100".to_string());
    }

    if cli.age_threshold < 0 {
        return Err("--age-threshold must be >= 0".to_string());
    }

    if !cli.max_match_amount.is_finite() || cli.max_match_amount < 0.0 {
        return Err("--max-match-amount must be >= 0".to_string());
    }

    if !cli.income_threshold.is_finite() || cli.income_threshold < 0.0 {
        return Err("--income-threshold must be >= 0".to_string());
    }

    if cli.retirement_age <= 0 {
        return Err("--retirement-age must be > 0".to_string());
    }

    Ok(ScenarioParams {
        start_year: cli.start_year,
        inflation_rate: cli.inflation_rate / 100.0,
        age_threshold: cli.age_threshold,
        max_match_amount: cli.max_match_amount,
        income_threshold: cli.income_threshold,
        retirement_age: cli.retirement_age,
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScenarioReport {
    metrics: RetirementMetrics,
    shortfall_by_cohort: Vec<CohortShortfallRow>,
    readiness_delta_by_cohort: Vec<ReadinessDeltaRow>,
}

/// One-shot batch run: load, project, write, report. Any failure is a
/// single message and no partial output file.
pub fn run_batch() -> Result<(), String> {
    run_batch_with(Cli::parse())
}

fn run_batch_with(cli: Cli) -> Result<(), String> {
    let params = build_params(&cli)?;
    let records = load_records(&cli.input).map_err(|e| e.to_string())?;
    let outcome = run_scenario(records, &params).map_err(|e| e.to_string())?;

    write_records(&cli.output, &outcome.records).map_err(|e| e.to_string())?;
    if let Some(report_path) = &cli.report {
        let report = ScenarioReport {
            metrics: outcome.metrics,
            shortfall_by_cohort: outcome.shortfall_by_cohort,
            readiness_delta_by_cohort: outcome.readiness_delta_by_cohort,
        };
        write_report(report_path, &report).map_err(|e| e.to_string())?;
    }

    println!(
        "Projected {} eligible records into {}",
        outcome.records.len(),
        cli.output.display()
    );
    println!(
        "Retirement Readiness Rating: {}",
        outcome.metrics.readiness_rating
    );
    println!(
        "Retirement Savings Shortfall: {}",
        outcome.metrics.savings_shortfall
    );
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectPayload {
    #[serde(default, alias = "start_year")]
    start_year: Option<i64>,
    #[serde(default, alias = "inflation_rate")]
    inflation_rate: Option<f64>,
    #[serde(default, alias = "age_threshold")]
    age_threshold: Option<i64>,
    #[serde(default, alias = "max_match_amount")]
    max_match_amount: Option<f64>,
    #[serde(default, alias = "income_threshold")]
    income_threshold: Option<f64>,
    #[serde(default, alias = "retirement_age")]
    retirement_age: Option<i64>,
    records: Vec<Record>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse {
    readiness_rating: f64,
    savings_shortfall: f64,
    eligible_records: usize,
    records: Vec<ProjectedRecord>,
    shortfall_by_cohort: Vec<CohortShortfallRow>,
    readiness_delta_by_cohort: Vec<ReadinessDeltaRow>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn default_cli() -> Cli {
    Cli::parse_from(["savers-match"])
}

fn params_from_payload(payload: &ProjectPayload) -> Result<ScenarioParams, String> {
    let mut cli = default_cli();
    if let Some(start_year) = payload.start_year {
        cli.start_year = start_year;
    }
    if let Some(inflation_rate) = payload.inflation_rate {
        cli.inflation_rate = inflation_rate;
    }
    if let Some(age_threshold) = payload.age_threshold {
        cli.age_threshold = age_threshold;
    }
    if let Some(max_match_amount) = payload.max_match_amount {
        cli.max_match_amount = max_match_amount;
    }
    if let Some(income_threshold) = payload.income_threshold {
        cli.income_threshold = income_threshold;
    }
    if let Some(retirement_age) = payload.retirement_age {
        cli.retirement_age = retirement_age;
    }
    build_params(&cli)
}

fn project_response_from_payload(payload: ProjectPayload) -> Result<ProjectResponse, String> {
    let params = params_from_payload(&payload)?;
    let outcome = run_scenario(payload.records, &params).map_err(|e| e.to_string())?;
    Ok(ProjectResponse {
        readiness_rating: outcome.metrics.readiness_rating,
        savings_shortfall: outcome.metrics.savings_shortfall,
        eligible_records: outcome.records.len(),
        records: outcome.records,
        shortfall_by_cohort: outcome.shortfall_by_cohort,
        readiness_delta_by_cohort: outcome.readiness_delta_by_cohort,
    })
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/api/project", post(project_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    println!("Saver's Match HTTP API listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/api/project");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_handler(Json(payload): Json<ProjectPayload>) -> Response {
    match project_response_from_payload(payload) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
