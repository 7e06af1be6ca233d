// Folds raw task records into the per-technician / per-month summary tree.
//
// This is a strict, order-preserving fold: no reordering, no
// deduplication. Records that fail an inclusion rule are skipped and
// tallied, never raised as errors.
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::classify::classify;
use crate::config::Config;
use crate::types::{MonthKey, MonthlyBucket, TaskDetail, TaskRecord, TechnicianSummary};

/// Tolerance when comparing upstream-precomputed nets against our own.
const DRIFT_EPSILON: f64 = 0.01;

/// Per-run tallies surfaced to the caller for diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateReport {
    pub total_records: usize,
    pub processed: usize,
    pub rejected_no_technician: usize,
    pub rejected_no_date: usize,
    pub rejected_non_positive: usize,
    /// Records whose upstream-precomputed net disagreed with the
    /// recomputed one by more than a cent. Diagnostic only; the
    /// recomputed value always wins.
    pub precomputed_divergences: usize,
}

/// Fold `records` into technician summaries.
///
/// Inclusion rules, applied per record in input order:
/// 1. technician name must be non-blank and not "NONE",
/// 2. a closure timestamp must exist (`closed_at`, falling back to
///    `finished_at`),
/// 3. gross must be positive.
/// Discount and net are always recomputed from gross + typology;
/// upstream-supplied values are only compared for drift.
pub fn aggregate(
    records: &[TaskRecord],
    config: &Config,
) -> (BTreeMap<String, TechnicianSummary>, AggregateReport) {
    let mut technicians: BTreeMap<String, TechnicianSummary> = BTreeMap::new();
    let mut report = AggregateReport::default();

    for record in records {
        report.total_records += 1;

        let technician = record.technician.trim();
        if technician.is_empty() || technician.eq_ignore_ascii_case("none") {
            report.rejected_no_technician += 1;
            continue;
        }

        let closed_at = match record.closed_at.or(record.finished_at) {
            Some(ts) => ts,
            None => {
                report.rejected_no_date += 1;
                continue;
            }
        };

        if record.gross <= 0.0 {
            report.rejected_non_positive += 1;
            continue;
        }

        let typology = record.typology.trim().to_uppercase();
        let fraction = config.discounts.resolve(&typology);
        let discount = record.gross * fraction;
        let net = record.gross - discount;

        if let Some(reported) = record.reported_net {
            if (reported - net).abs() > DRIFT_EPSILON {
                report.precomputed_divergences += 1;
            }
        }

        let category = classify(&record.activity);
        let key = MonthKey::from_datetime(closed_at);

        let summary = technicians
            .entry(technician.to_string())
            .or_insert_with(|| TechnicianSummary::new(technician));
        let bucket = summary
            .months
            .entry(key)
            .or_insert_with(|| MonthlyBucket::new(key));

        bucket.tasks.push(TaskDetail {
            task: record.task.clone(),
            form: record.form.clone(),
            category,
            activity: record.activity.clone(),
            typology: typology.clone(),
            trajectory: record.trajectory.clone(),
            gross: record.gross,
            discount_pct: fraction * 100.0,
            discount,
            net,
            closed_at,
            city: record.city.clone(),
            department: record.department.clone(),
            site_name: record.site_name.clone(),
            outcome: record.outcome.clone(),
        });

        bucket.task_count += 1;
        bucket.total_gross += record.gross;
        bucket.total_discount += discount;
        bucket.total_net += net;

        let cat = bucket.by_category.entry(category).or_default();
        cat.count += 1;
        cat.total += net;

        if !typology.is_empty() {
            let typ = bucket.by_typology.entry(typology).or_default();
            typ.count += 1;
            typ.gross += record.gross;
            typ.net += net;
            typ.discount_pct = fraction * 100.0;
        }

        summary.task_count += 1;
        summary.total_net += net;
        let cat = summary.by_category.entry(category).or_default();
        cat.count += 1;
        cat.total += net;

        report.processed += 1;
    }

    (technicians, report)
}

/// Merge a partial aggregation into another, for partitioned runs over
/// disjoint inputs. Totals and breakdowns add; detail rows concatenate.
pub fn merge(
    into: &mut BTreeMap<String, TechnicianSummary>,
    from: BTreeMap<String, TechnicianSummary>,
) {
    for (name, summary) in from {
        match into.entry(name) {
            Entry::Vacant(slot) => {
                slot.insert(summary);
            }
            Entry::Occupied(mut slot) => merge_summary(slot.get_mut(), summary),
        }
    }
}

fn merge_summary(into: &mut TechnicianSummary, from: TechnicianSummary) {
    into.task_count += from.task_count;
    into.total_net += from.total_net;
    for (category, stat) in from.by_category {
        let slot = into.by_category.entry(category).or_default();
        slot.count += stat.count;
        slot.total += stat.total;
    }
    for (key, bucket) in from.months {
        match into.months.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(bucket);
            }
            Entry::Occupied(mut slot) => merge_bucket(slot.get_mut(), bucket),
        }
    }
}

fn merge_bucket(into: &mut MonthlyBucket, from: MonthlyBucket) {
    into.task_count += from.task_count;
    into.total_gross += from.total_gross;
    into.total_discount += from.total_discount;
    into.total_net += from.total_net;
    for (category, stat) in from.by_category {
        let slot = into.by_category.entry(category).or_default();
        slot.count += stat.count;
        slot.total += stat.total;
    }
    for (typology, stat) in from.by_typology {
        let slot = into.by_typology.entry(typology).or_default();
        slot.count += stat.count;
        slot.gross += stat.gross;
        slot.net += stat.net;
        slot.discount_pct = stat.discount_pct;
    }
    into.tasks.extend(from.tasks);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Category;
    use crate::util::round2;
    use chrono::NaiveDate;

    fn ts(y: i32, m: u32, d: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap()
    }

    fn rec(technician: &str, typology: &str, gross: f64, y: i32, m: u32, d: u32) -> TaskRecord {
        TaskRecord {
            technician: technician.to_string(),
            typology: typology.to_string(),
            activity: "Soporte en sitio".to_string(),
            gross,
            closed_at: Some(ts(y, m, d)),
            ..TaskRecord::default()
        }
    }

    #[test]
    fn applies_typology_discount() {
        let cfg = Config::default();
        let records = vec![rec("Carlos Ruiz", "TIPO I", 1_000_000.0, 2026, 3, 5)];
        let (technicians, report) = aggregate(&records, &cfg);

        let bucket = &technicians["Carlos Ruiz"].months[&MonthKey::new(2026, 3)];
        assert_eq!(bucket.total_gross, 1_000_000.0);
        assert_eq!(bucket.total_discount, 200_000.0);
        assert_eq!(bucket.total_net, 800_000.0);
        assert_eq!(report.processed, 1);
    }

    #[test]
    fn unknown_typology_pays_in_full() {
        let cfg = Config::default();
        let records = vec![rec("Carlos Ruiz", "TIPO X", 500.0, 2026, 3, 5)];
        let (technicians, _) = aggregate(&records, &cfg);

        let summary = &technicians["Carlos Ruiz"];
        assert_eq!(summary.total_net, 500.0);
    }

    #[test]
    fn same_month_records_share_a_bucket() {
        let cfg = Config::default();
        let records = vec![
            rec("Ana Gomez", "TIPO I", 100_000.0, 2026, 3, 2),
            rec("Ana Gomez", "TIPO II", 200_000.0, 2026, 3, 20),
        ];
        let (technicians, _) = aggregate(&records, &cfg);

        let summary = &technicians["Ana Gomez"];
        assert_eq!(summary.months.len(), 1);
        let bucket = &summary.months[&MonthKey::new(2026, 3)];
        assert_eq!(bucket.task_count, 2);
        assert_eq!(bucket.tasks.len(), 2);
        assert_eq!(bucket.total_gross, 300_000.0);
        assert_eq!(bucket.total_net, 80_000.0 + 140_000.0);
        assert_eq!(bucket.by_typology.len(), 2);
    }

    #[test]
    fn different_months_get_separate_buckets() {
        let cfg = Config::default();
        let records = vec![
            rec("Ana Gomez", "TIPO I", 100_000.0, 2026, 3, 2),
            rec("Ana Gomez", "TIPO I", 100_000.0, 2026, 4, 2),
        ];
        let (technicians, _) = aggregate(&records, &cfg);
        assert_eq!(technicians["Ana Gomez"].months.len(), 2);
    }

    #[test]
    fn rejects_blank_and_none_technicians() {
        let cfg = Config::default();
        let records = vec![
            rec("", "TIPO I", 100.0, 2026, 3, 2),
            rec("  ", "TIPO I", 100.0, 2026, 3, 2),
            rec("none", "TIPO I", 100.0, 2026, 3, 2),
            rec("NONE", "TIPO I", 100.0, 2026, 3, 2),
        ];
        let (technicians, report) = aggregate(&records, &cfg);
        assert!(technicians.is_empty());
        assert_eq!(report.rejected_no_technician, 4);
        assert_eq!(report.processed, 0);
    }

    #[test]
    fn falls_back_to_secondary_timestamp() {
        let cfg = Config::default();
        let mut record = rec("Ana Gomez", "TIPO I", 100.0, 2026, 3, 2);
        record.closed_at = None;
        record.finished_at = Some(ts(2026, 5, 1));
        let (technicians, report) = aggregate(&[record], &cfg);

        assert!(technicians["Ana Gomez"]
            .months
            .contains_key(&MonthKey::new(2026, 5)));
        assert_eq!(report.rejected_no_date, 0);
    }

    #[test]
    fn rejects_records_without_any_timestamp() {
        let cfg = Config::default();
        let mut record = rec("Ana Gomez", "TIPO I", 100.0, 2026, 3, 2);
        record.closed_at = None;
        let (technicians, report) = aggregate(&[record], &cfg);
        assert!(technicians.is_empty());
        assert_eq!(report.rejected_no_date, 1);
    }

    #[test]
    fn rejects_non_positive_gross() {
        let cfg = Config::default();
        let records = vec![
            rec("Ana Gomez", "TIPO I", 0.0, 2026, 3, 2),
            rec("Ana Gomez", "TIPO I", -50.0, 2026, 3, 2),
        ];
        let (technicians, report) = aggregate(&records, &cfg);
        assert!(technicians.is_empty());
        assert_eq!(report.rejected_non_positive, 2);
    }

    #[test]
    fn counts_upstream_net_divergence() {
        let cfg = Config::default();
        let mut drifted = rec("Ana Gomez", "TIPO I", 1_000_000.0, 2026, 3, 2);
        drifted.reported_net = Some(790_000.0);
        let mut agreeing = rec("Ana Gomez", "TIPO I", 1_000_000.0, 2026, 3, 3);
        agreeing.reported_net = Some(800_000.0);
        let (technicians, report) = aggregate(&[drifted, agreeing], &cfg);

        assert_eq!(report.precomputed_divergences, 1);
        // The recomputed value wins either way.
        assert_eq!(
            technicians["Ana Gomez"].months[&MonthKey::new(2026, 3)].total_net,
            1_600_000.0
        );
    }

    #[test]
    fn tracks_category_breakdowns_at_both_levels() {
        let cfg = Config::default();
        let mut incident = rec("Ana Gomez", "TIPO I", 100_000.0, 2026, 3, 2);
        incident.activity = "Incidente de red".to_string();
        let mut closure = rec("Ana Gomez", "TIPO I", 100_000.0, 2026, 4, 2);
        closure.activity = "Cierre remoto".to_string();
        let (technicians, _) = aggregate(&[incident, closure], &cfg);

        let summary = &technicians["Ana Gomez"];
        assert_eq!(summary.by_category[&Category::Incident].count, 1);
        assert_eq!(summary.by_category[&Category::Closure].count, 1);
        let march = &summary.months[&MonthKey::new(2026, 3)];
        assert_eq!(march.by_category[&Category::Incident].total, 80_000.0);
        assert!(!march.by_category.contains_key(&Category::Closure));
    }

    #[test]
    fn aggregation_is_idempotent() {
        let cfg = Config::default();
        let records = vec![
            rec("Ana Gomez", "TIPO I", 123_456.78, 2026, 3, 2),
            rec("Carlos Ruiz", "LEJANA", 98_765.43, 2026, 3, 9),
            rec("Ana Gomez", "TIPO V", 55_000.0, 2026, 4, 1),
        ];
        let first = aggregate(&records, &cfg);
        let second = aggregate(&records, &cfg);
        assert_eq!(first, second);
    }

    #[test]
    fn merging_partitions_matches_single_pass() {
        let cfg = Config::default();
        let records = vec![
            rec("Ana Gomez", "TIPO I", 100_000.0, 2026, 3, 2),
            rec("Carlos Ruiz", "TIPO II", 200_000.0, 2026, 3, 5),
            rec("Ana Gomez", "TIPO III", 300_000.0, 2026, 3, 9),
            rec("Ana Gomez", "TIPO I", 400_000.0, 2026, 4, 1),
        ];
        let (whole, _) = aggregate(&records, &cfg);

        let (mut left, _) = aggregate(&records[..2], &cfg);
        let (right, _) = aggregate(&records[2..], &cfg);
        merge(&mut left, right);

        assert_eq!(left, whole);
    }

    #[test]
    fn totals_round_late_not_per_task() {
        let cfg = Config::default();
        // Each net is 0.056; per-task rounding would give 0.06 * 3 = 0.18.
        let records = vec![
            rec("Ana Gomez", "TIPO I", 0.07, 2026, 3, 1),
            rec("Ana Gomez", "TIPO I", 0.07, 2026, 3, 2),
            rec("Ana Gomez", "TIPO I", 0.07, 2026, 3, 3),
        ];
        let (technicians, _) = aggregate(&records, &cfg);
        let bucket = &technicians["Ana Gomez"].months[&MonthKey::new(2026, 3)];

        let summed_then_rounded = round2(bucket.total_net);
        let rounded_then_summed: f64 = bucket.tasks.iter().map(|t| round2(t.net)).sum();
        assert_eq!(summed_then_rounded, 0.17);
        assert_eq!(round2(rounded_then_summed), 0.18);
    }
}
