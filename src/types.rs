use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize, Serializer};
use tabled::Tabled;

use crate::classify::Category;
use crate::util::ser_round2;

/// One row of the upstream task export, exactly as it comes off the wire.
///
/// Column names mirror the task platform's export headers; everything is
/// optional text because the export is hand-curated and frequently sparse.
#[derive(Debug, Deserialize)]
pub struct RawRow {
    #[serde(rename = "tarea")]
    pub task: Option<String>,
    #[serde(rename = "formulario")]
    pub form: Option<String>,
    #[serde(rename = "tipo_actividad")]
    pub activity: Option<String>,
    #[serde(rename = "tecnico")]
    pub technician: Option<String>,
    #[serde(rename = "tipologia")]
    pub typology: Option<String>,
    #[serde(rename = "trayecto")]
    pub trajectory: Option<String>,
    #[serde(rename = "fecha_cierre_plataforma_cliente")]
    pub closed_at: Option<String>,
    #[serde(rename = "fecha_fin")]
    pub finished_at: Option<String>,
    #[serde(rename = "ciudad")]
    pub city: Option<String>,
    #[serde(rename = "departamento")]
    pub department: Option<String>,
    #[serde(rename = "nombre_punto")]
    pub site_name: Option<String>,
    #[serde(rename = "resultado_actividad")]
    pub outcome: Option<String>,
    #[serde(rename = "prod_tecnico_final")]
    pub gross: Option<String>,
    #[serde(rename = "valor_descuento")]
    pub reported_discount: Option<String>,
    #[serde(rename = "valor_neto")]
    pub reported_net: Option<String>,
}

/// A normalized billable unit of work, ready for aggregation.
///
/// `reported_discount` / `reported_net` are values some upstream paths
/// precompute; the aggregator recomputes both and only uses these for
/// drift diagnostics.
#[derive(Debug, Clone, Default)]
pub struct TaskRecord {
    pub task: String,
    pub form: String,
    pub technician: String,
    pub typology: String,
    pub activity: String,
    pub trajectory: String,
    pub gross: f64,
    pub closed_at: Option<NaiveDateTime>,
    pub finished_at: Option<NaiveDateTime>,
    pub city: String,
    pub department: String,
    pub site_name: String,
    pub outcome: String,
    pub reported_discount: Option<f64>,
    pub reported_net: Option<f64>,
}

/// Calendar month a bucket is keyed by. Orders chronologically and
/// serializes as `YYYY-MM` so exported maps iterate in time order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Self {
        MonthKey { year, month }
    }

    pub fn from_datetime(ts: NaiveDateTime) -> Self {
        use chrono::Datelike;
        MonthKey { year: ts.year(), month: ts.month() }
    }

    /// Human-readable label, e.g. `March 2026`.
    pub fn label(&self) -> String {
        match NaiveDate::from_ymd_opt(self.year, self.month, 1) {
            Some(d) => d.format("%B %Y").to_string(),
            None => self.to_string(),
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Detail row retained per task inside a monthly bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskDetail {
    pub task: String,
    pub form: String,
    pub category: Category,
    pub activity: String,
    pub typology: String,
    pub trajectory: String,
    #[serde(serialize_with = "ser_round2")]
    pub gross: f64,
    pub discount_pct: f64,
    #[serde(serialize_with = "ser_round2")]
    pub discount: f64,
    #[serde(serialize_with = "ser_round2")]
    pub net: f64,
    pub closed_at: NaiveDateTime,
    pub city: String,
    pub department: String,
    pub site_name: String,
    pub outcome: String,
}

/// Task count plus net total for one classified category.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryStat {
    pub count: usize,
    #[serde(serialize_with = "ser_round2")]
    pub total: f64,
}

/// Per-typology rollup inside a monthly bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TypologyStat {
    pub count: usize,
    #[serde(serialize_with = "ser_round2")]
    pub gross: f64,
    #[serde(serialize_with = "ser_round2")]
    pub net: f64,
    pub discount_pct: f64,
}

/// Everything accumulated for one technician in one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyBucket {
    pub label: String,
    pub month: u32,
    pub year: i32,
    pub task_count: usize,
    #[serde(serialize_with = "ser_round2")]
    pub total_gross: f64,
    #[serde(serialize_with = "ser_round2")]
    pub total_discount: f64,
    #[serde(serialize_with = "ser_round2")]
    pub total_net: f64,
    pub by_category: BTreeMap<Category, CategoryStat>,
    pub by_typology: BTreeMap<String, TypologyStat>,
    pub tasks: Vec<TaskDetail>,
}

impl MonthlyBucket {
    pub fn new(key: MonthKey) -> Self {
        MonthlyBucket {
            label: key.label(),
            month: key.month,
            year: key.year,
            task_count: 0,
            total_gross: 0.0,
            total_discount: 0.0,
            total_net: 0.0,
            by_category: BTreeMap::new(),
            by_typology: BTreeMap::new(),
            tasks: Vec::new(),
        }
    }
}

/// One technician's full payout picture: monthly buckets (exclusively
/// owned) plus grand totals across all months.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechnicianSummary {
    pub name: String,
    pub task_count: usize,
    #[serde(serialize_with = "ser_round2")]
    pub total_net: f64,
    pub by_category: BTreeMap<Category, CategoryStat>,
    pub months: BTreeMap<MonthKey, MonthlyBucket>,
}

impl TechnicianSummary {
    pub fn new(name: &str) -> Self {
        TechnicianSummary {
            name: name.to_string(),
            task_count: 0,
            total_net: 0.0,
            by_category: BTreeMap::new(),
            months: BTreeMap::new(),
        }
    }
}

/// Run-level statistics over the whole aggregation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalSummary {
    pub technician_count: usize,
    pub task_count: usize,
    #[serde(serialize_with = "ser_round2")]
    pub total_net: f64,
    pub by_category: BTreeMap<Category, CategoryStat>,
    pub months: Vec<String>,
    pub discounts: BTreeMap<String, f64>,
}

/// Top-level JSON export: summary first, then every technician keyed by
/// name. The timestamp is stamped here, at the export boundary.
#[derive(Debug, Serialize)]
pub struct ExportDocument<'a> {
    pub generated_at: String,
    pub summary: GlobalSummary,
    pub technicians: &'a BTreeMap<String, TechnicianSummary>,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CommissionRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Technician")]
    #[tabled(rename = "Technician")]
    pub technician: String,
    #[serde(rename = "Tasks")]
    #[tabled(rename = "Tasks")]
    pub tasks: usize,
    #[serde(rename = "Gross")]
    #[tabled(rename = "Gross")]
    pub total_gross: String,
    #[serde(rename = "Discount")]
    #[tabled(rename = "Discount")]
    pub total_discount: String,
    #[serde(rename = "Net")]
    #[tabled(rename = "Net")]
    pub total_net: String,
    #[serde(rename = "Goal")]
    #[tabled(rename = "Goal")]
    pub goal: String,
    #[serde(rename = "Excess")]
    #[tabled(rename = "Excess")]
    pub excess: String,
    #[serde(rename = "Tier")]
    #[tabled(rename = "Tier")]
    pub tier: String,
    #[serde(rename = "Bonus")]
    #[tabled(rename = "Bonus")]
    pub bonus: String,
}
