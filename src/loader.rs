use std::error::Error;

use csv::ReaderBuilder;

use crate::types::{RawRow, TaskRecord};
use crate::util::{parse_datetime_safe, parse_f64_safe};

/// Diagnostics from one CSV load.
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub parse_errors: usize,
}

/// Read the task export and normalize it into `TaskRecord`s.
///
/// Rows that fail CSV deserialization or lack a parseable gross amount
/// count as parse errors and are dropped here; every other inclusion
/// rule (missing technician, missing date, non-positive gross) is the
/// aggregator's call and passes through untouched.
pub fn load_records(path: &str) -> Result<(Vec<TaskRecord>, LoadReport), Box<dyn Error>> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut total_rows = 0usize;
    let mut parse_errors = 0usize;
    let mut records: Vec<TaskRecord> = Vec::new();

    for result in rdr.deserialize::<RawRow>() {
        total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(_) => {
                parse_errors += 1;
                continue;
            }
        };

        let gross = match parse_f64_safe(row.gross.as_deref()) {
            Some(v) => v,
            None => {
                parse_errors += 1;
                continue;
            }
        };

        let field = |v: Option<String>| v.unwrap_or_default().trim().to_string();

        records.push(TaskRecord {
            task: field(row.task),
            form: field(row.form),
            technician: field(row.technician),
            typology: field(row.typology),
            activity: field(row.activity),
            trajectory: field(row.trajectory),
            gross,
            closed_at: parse_datetime_safe(row.closed_at.as_deref()),
            finished_at: parse_datetime_safe(row.finished_at.as_deref()),
            city: field(row.city),
            department: field(row.department),
            site_name: field(row.site_name),
            outcome: field(row.outcome),
            reported_discount: parse_f64_safe(row.reported_discount.as_deref()),
            reported_net: parse_f64_safe(row.reported_net.as_deref()),
        });
    }

    let loaded_rows = records.len();
    let report = LoadReport {
        total_rows,
        loaded_rows,
        parse_errors,
    };
    Ok((records, report))
}
