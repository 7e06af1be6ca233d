use std::collections::BTreeMap;
use std::error::Error;

use chrono::Local;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::config::Config;
use crate::reports;
use crate::types::{ExportDocument, TechnicianSummary};

/// Assemble the export document handed to serialization. The generation
/// timestamp is stamped here and nowhere else.
pub fn export_document<'a>(
    technicians: &'a BTreeMap<String, TechnicianSummary>,
    config: &Config,
) -> ExportDocument<'a> {
    ExportDocument {
        generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        summary: reports::global_summary(technicians, config),
        technicians,
    }
}

pub fn write_csv<T: Serialize>(path: &str, rows: &[T]) -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &str, value: &T) -> Result<(), Box<dyn Error>> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}
