//! CSV export of the detection history.

use std::io::Write;

use chrono::{Local, NaiveDate, TimeZone};
use thiserror::Error;

use crate::models::DetectionRecord;

pub const HEADERS: [&str; 10] = [
    "Date",
    "Time",
    "Name",
    "Roll No",
    "Department",
    "Smoking Detected",
    "Face Detected",
    "Confidence (%)",
    "Action Taken",
    "Evidence",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to write CSV: {0}")]
    Io(#[from] std::io::Error),
}

/// `detection_history_2024-03-01.csv`
pub fn default_file_name(today: NaiveDate) -> String {
    format!("detection_history_{}.csv", today.format("%Y-%m-%d"))
}

/// Write records with dates in local time.
pub fn write_csv<W: Write>(writer: W, records: &[DetectionRecord]) -> Result<(), ExportError> {
    write_csv_in(writer, records, &Local)
}

pub fn write_csv_in<W: Write, Tz: TimeZone>(
    writer: W,
    records: &[DetectionRecord],
    tz: &Tz,
) -> Result<(), ExportError>
where
    Tz::Offset: std::fmt::Display,
{
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(HEADERS)?;
    for record in records {
        let at = record.timestamp.with_timezone(tz);
        out.write_record([
            at.format("%Y-%m-%d").to_string(),
            at.format("%H:%M:%S").to_string(),
            record.display_name().to_string(),
            record.display_roll_no().to_string(),
            record.department.clone().unwrap_or_default(),
            yes_no(record.smoking_detected).to_string(),
            yes_no(record.face_detected).to_string(),
            record.confidence_pct().to_string(),
            record.action_taken.clone().unwrap_or_default(),
            record.evidence().unwrap_or_default().to_string(),
        ])?;
    }
    out.flush()?;
    Ok(())
}

pub fn to_csv_string(records: &[DetectionRecord]) -> Result<String, ExportError> {
    let mut buf = Vec::new();
    write_csv(&mut buf, records)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}
