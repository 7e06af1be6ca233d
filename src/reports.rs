use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::classify::Category;
use crate::commission;
use crate::config::Config;
use crate::types::{
    CategoryStat, CommissionRow, GlobalSummary, MonthKey, MonthlyBucket, TechnicianSummary,
};
use crate::util::format_number;

/// Derive run-level statistics across all technicians.
pub fn global_summary(
    technicians: &BTreeMap<String, TechnicianSummary>,
    config: &Config,
) -> GlobalSummary {
    let mut task_count = 0;
    let mut total_net = 0.0;
    let mut by_category: BTreeMap<Category, CategoryStat> = BTreeMap::new();
    let mut months: BTreeSet<MonthKey> = BTreeSet::new();

    for summary in technicians.values() {
        task_count += summary.task_count;
        total_net += summary.total_net;
        for (category, stat) in &summary.by_category {
            let slot = by_category.entry(*category).or_default();
            slot.count += stat.count;
            slot.total += stat.total;
        }
        months.extend(summary.months.keys());
    }

    GlobalSummary {
        technician_count: technicians.len(),
        task_count,
        total_net,
        by_category,
        months: months.iter().map(MonthKey::to_string).collect(),
        discounts: config.discounts.fractions().clone(),
    }
}

/// Build the commission rows for one requested month.
///
/// Technicians with no bucket for that month are omitted, not
/// zero-filled. Rows are ranked by net total, highest first.
pub fn commission_report(
    technicians: &BTreeMap<String, TechnicianSummary>,
    month: MonthKey,
    config: &Config,
) -> Vec<CommissionRow> {
    let mut ranked: Vec<(f64, &str, &MonthlyBucket)> = technicians
        .iter()
        .filter_map(|(name, summary)| {
            summary
                .months
                .get(&month)
                .map(|bucket| (bucket.total_net, name.as_str(), bucket))
        })
        .collect();
    ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

    ranked
        .into_iter()
        .enumerate()
        .map(|(idx, (_, name, bucket))| {
            let result = commission::compute(bucket.total_net, config);
            CommissionRow {
                rank: idx + 1,
                technician: name.to_string(),
                tasks: bucket.task_count,
                total_gross: format_number(bucket.total_gross, 2),
                total_discount: format_number(bucket.total_discount, 2),
                total_net: format_number(bucket.total_net, 2),
                goal: format_number(config.monthly_goal, 2),
                excess: format_number(result.excess, 2),
                tier: result.tier.unwrap_or_else(|| "Ninguno".to_string()),
                bonus: format_number(result.bonus, 2),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::types::TaskRecord;
    use chrono::NaiveDate;

    fn rec(technician: &str, gross: f64, y: i32, m: u32) -> TaskRecord {
        TaskRecord {
            technician: technician.to_string(),
            typology: "TIPO I".to_string(),
            activity: "Visita preventiva".to_string(),
            gross,
            closed_at: NaiveDate::from_ymd_opt(y, m, 15)
                .unwrap()
                .and_hms_opt(9, 0, 0),
            ..TaskRecord::default()
        }
    }

    #[test]
    fn summary_totals_span_all_technicians() {
        let cfg = Config::default();
        let records = vec![
            rec("Ana Gomez", 1_000_000.0, 2026, 3),
            rec("Carlos Ruiz", 500_000.0, 2026, 3),
            rec("Carlos Ruiz", 500_000.0, 2026, 4),
        ];
        let (technicians, _) = aggregate(&records, &cfg);
        let summary = global_summary(&technicians, &cfg);

        assert_eq!(summary.technician_count, 2);
        assert_eq!(summary.task_count, 3);
        assert_eq!(summary.total_net, 1_600_000.0);
        assert_eq!(summary.by_category[&Category::Visit].count, 3);
        assert_eq!(summary.months, vec!["2026-03", "2026-04"]);
        assert_eq!(summary.discounts["TIPO I"], 0.20);
    }

    #[test]
    fn summary_of_empty_run_is_empty() {
        let cfg = Config::default();
        let summary = global_summary(&BTreeMap::new(), &cfg);
        assert_eq!(summary.technician_count, 0);
        assert_eq!(summary.task_count, 0);
        assert_eq!(summary.total_net, 0.0);
        assert!(summary.months.is_empty());
    }

    #[test]
    fn omits_technicians_without_the_month() {
        let cfg = Config::default();
        let records = vec![
            rec("Ana Gomez", 1_000_000.0, 2026, 3),
            rec("Carlos Ruiz", 1_000_000.0, 2026, 4),
        ];
        let (technicians, _) = aggregate(&records, &cfg);
        let rows = commission_report(&technicians, MonthKey::new(2026, 3), &cfg);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].technician, "Ana Gomez");
    }

    #[test]
    fn empty_month_yields_no_rows() {
        let cfg = Config::default();
        let records = vec![rec("Ana Gomez", 1_000_000.0, 2026, 3)];
        let (technicians, _) = aggregate(&records, &cfg);
        let rows = commission_report(&technicians, MonthKey::new(2025, 12), &cfg);
        assert!(rows.is_empty());
    }

    #[test]
    fn rows_rank_by_net_and_carry_the_bonus() {
        let cfg = Config::default();
        // Nets: 7,500,000 * 0.8 = 6,000,000 (tier 2) and 800,000 (below goal).
        let records = vec![
            rec("Ana Gomez", 1_000_000.0, 2026, 3),
            rec("Carlos Ruiz", 7_500_000.0, 2026, 3),
        ];
        let (technicians, _) = aggregate(&records, &cfg);
        let rows = commission_report(&technicians, MonthKey::new(2026, 3), &cfg);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[0].technician, "Carlos Ruiz");
        assert_eq!(rows[0].total_net, "6,000,000.00");
        assert_eq!(rows[0].excess, "1,500,000.00");
        assert_eq!(rows[0].tier, "Nivel 2");
        assert_eq!(rows[0].bonus, "190,000.00");

        assert_eq!(rows[1].rank, 2);
        assert_eq!(rows[1].technician, "Ana Gomez");
        assert_eq!(rows[1].tier, "Ninguno");
        assert_eq!(rows[1].bonus, "0.00");
    }
}
