use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::core::{ProjectedRecord, Record};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("input file not found: {0}")]
    Unavailable(PathBuf),
    #[error("input file has no records: {0}")]
    Empty(PathBuf),
    #[error("failed to read {path}: {message}")]
    Malformed { path: PathBuf, message: String },
}

#[derive(Debug, Error)]
#[error("failed to write {path}: {message}")]
pub struct SinkError {
    pub path: PathBuf,
    pub message: String,
}

/// Loads the input panel from a headed CSV file. A missing file, an
/// unparsable table, and a table with zero data rows are reported as
/// distinct failures, and none of them starts the pipeline.
pub fn load_records(path: &Path) -> Result<Vec<Record>, SourceError> {
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => SourceError::Unavailable(path.to_path_buf()),
        _ => SourceError::Malformed {
            path: path.to_path_buf(),
            message: e.to_string(),
        },
    })?;
    load_from_reader(file, path)
}

fn load_from_reader<R: Read>(reader: R, path: &Path) -> Result<Vec<Record>, SourceError> {
    let records = read_records(reader).map_err(|e| SourceError::Malformed {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    if records.is_empty() {
        return Err(SourceError::Empty(path.to_path_buf()));
    }
    Ok(records)
}

fn read_records<R: Read>(reader: R) -> Result<Vec<Record>, csv::Error> {
    csv::Reader::from_reader(reader).deserialize().collect()
}

/// Output row: the input columns plus the final capital figure, under the
/// exact column names the downstream consumers expect.
#[derive(Debug, Serialize)]
struct OutputRow {
    initial_age: i64,
    weight: f64,
    family_kind: i64,
    race: i64,
    marital_status: i64,
    accumulated_capital: f64,
    annual_contribution: f64,
    income: f64,
    new_accumulated_capital: f64,
}

impl From<&ProjectedRecord> for OutputRow {
    fn from(p: &ProjectedRecord) -> Self {
        OutputRow {
            initial_age: p.record.initial_age,
            weight: p.record.weight,
            family_kind: p.record.family_kind,
            race: p.record.race,
            marital_status: p.record.marital_status,
            accumulated_capital: p.record.accumulated_capital,
            annual_contribution: p.record.annual_contribution,
            income: p.record.income,
            new_accumulated_capital: p.new_accumulated_capital,
        }
    }
}

/// Writes the projected records as CSV, one row per eligible record in
/// post-filter order. The rows go to a temporary sibling first and only
/// a fully written file is renamed into place, so a failure mid-write
/// leaves no partial output at the target path.
pub fn write_records(path: &Path, projected: &[ProjectedRecord]) -> Result<(), SinkError> {
    commit_via_temp(path, |tmp| {
        let file = File::create(tmp).map_err(|e| e.to_string())?;
        let mut writer = csv::Writer::from_writer(file);
        for record in projected {
            writer
                .serialize(OutputRow::from(record))
                .map_err(|e| e.to_string())?;
        }
        writer.flush().map_err(|e| e.to_string())
    })
}

/// Serializes any report artifact (metrics plus cohort tables) as pretty
/// JSON for a chart-rendering collaborator. Same temp-then-rename
/// discipline as the CSV sink.
pub fn write_report<T: Serialize>(path: &Path, report: &T) -> Result<(), SinkError> {
    let body = serde_json::to_vec_pretty(report).map_err(|e| SinkError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    commit_via_temp(path, |tmp| {
        let mut file = File::create(tmp).map_err(|e| e.to_string())?;
        file.write_all(&body).map_err(|e| e.to_string())
    })
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "output".into());
    name.push(".tmp");
    path.with_file_name(name)
}

fn commit_via_temp(
    path: &Path,
    write: impl FnOnce(&Path) -> Result<(), String>,
) -> Result<(), SinkError> {
    let sink_error = |message: String| SinkError {
        path: path.to_path_buf(),
        message,
    };
    let tmp = temp_sibling(path);
    if let Err(message) = write(&tmp) {
        let _ = fs::remove_file(&tmp);
        return Err(sink_error(message));
    }
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        sink_error(e.to_string())
    })
}
