//! Output formatting and persistence for statistics.
//!
//! Supports JSON logging and CSV export.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use tracing::{debug, info};

use crate::analyzers::aggregate::combined_metrics;
use crate::error::Result;
use crate::stats::StatsRecord;

/// One flattened CSV row per record, with counts and averages combined
/// according to the include-test flag.
#[derive(Debug, Serialize)]
pub struct ExportRow {
    pub instructor_id: Option<String>,
    pub instructor_name: Option<String>,
    pub education_year: i32,
    pub education_round: i32,
    pub course_name: String,
    pub survey_count: u64,
    pub active_survey_count: u64,
    pub response_count: u64,
    pub text_response_count: u64,
    pub avg_overall: Option<f64>,
    pub avg_course: Option<f64>,
    pub avg_instructor: Option<f64>,
    pub avg_operation: Option<f64>,
    pub last_response_at: Option<DateTime<Utc>>,
    pub includes_test_data: bool,
}

impl ExportRow {
    pub fn from_record(record: &StatsRecord, include_test: bool) -> Self {
        let combined = combined_metrics(record, include_test);
        ExportRow {
            instructor_id: record.instructor_id.clone(),
            instructor_name: record.instructor_name.clone(),
            education_year: record.education_year,
            education_round: record.education_round,
            course_name: record.course_name.clone(),
            survey_count: combined.counts.survey_count,
            active_survey_count: combined.counts.active_survey_count,
            response_count: combined.counts.response_count,
            text_response_count: combined.counts.text_response_count,
            avg_overall: combined.averages.overall.map(round2),
            avg_course: combined.averages.course.map(round2),
            avg_instructor: combined.averages.instructor.map(round2),
            avg_operation: combined.averages.operation.map(round2),
            last_response_at: record.last_response_at,
            includes_test_data: include_test,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Logs a value as pretty-printed JSON.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Writes every record as a CSV row with a header line to `writer`.
pub fn write_csv<W: Write>(writer: W, records: &[StatsRecord], include_test: bool) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(writer);
    for record in records {
        writer.serialize(ExportRow::from_record(record, include_test))?;
    }
    writer.flush()?;
    Ok(())
}

/// Creates (or truncates) `path` and exports `records` into it.
pub fn export_records(path: &Path, records: &[StatsRecord], include_test: bool) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_csv(file, records, include_test)?;
    info!(path = %path.display(), rows = records.len(), "CSV export written");
    Ok(())
}

/// Appends records to a CSV file, writing the header only when the file is new.
pub fn append_records(path: &Path, records: &[StatsRecord], include_test: bool) -> Result<()> {
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, "Appending CSV records");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);

    for record in records {
        writer.serialize(ExportRow::from_record(record, include_test))?;
    }
    writer.flush()?;

    Ok(())
}
