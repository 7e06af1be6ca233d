// Entry point and high-level CLI flow.
//
// - Option [1] loads the task export CSV, printing load diagnostics.
// - Option [2] aggregates the loaded records, writes the JSON payout
//   export and a commission report for a chosen month, and prints
//   previews. Afterwards the user can go back to the menu or exit.
// - Option [3] prints one technician's recent months to the console.
use std::io::{self, Write};
use std::sync::Mutex;

use once_cell::sync::Lazy;

use payout_report::config::Config;
use payout_report::types::{MonthKey, TaskRecord};
use payout_report::util::{format_int, format_number};
use payout_report::{aggregate, loader, output, reports};

// Simple in-memory app state so we only load the CSV once but can
// generate reports multiple times in a single run.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState { records: None }));

// Discount table, goal and commission ladder, fixed for the whole run.
static CONFIG: Lazy<Config> = Lazy::new(Config::default);

struct AppState {
    records: Option<Vec<TaskRecord>>,
}

/// Print a prompt and read a single trimmed line from stdin.
fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

fn read_choice() -> String {
    read_line("Enter choice: ")
}

/// Ask the user whether to go back to the menu after generating reports.
///
/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        match read_line("Back to menu (Y/N): ").to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Handle option [1]: load the task export.
fn handle_load() {
    let path = "task_export.csv";
    match loader::load_records(path) {
        Ok((records, report)) => {
            println!(
                "Processing task export... ({} rows, {} loaded)",
                format_int(report.total_rows as i64),
                format_int(report.loaded_rows as i64)
            );
            if report.parse_errors > 0 {
                println!(
                    "Note: {} rows skipped due to parse errors.",
                    format_int(report.parse_errors as i64)
                );
            }
            println!();
            let mut state = APP_STATE.lock().unwrap();
            state.records = Some(records);
        }
        Err(e) => {
            eprintln!("Failed to load file: {}\n", e);
        }
    }
}

/// Handle option [2]: aggregate, export JSON, and build the commission
/// report for a chosen month.
fn handle_generate(config: &Config) {
    let records = {
        let state = APP_STATE.lock().unwrap();
        state.records.clone()
    };
    let Some(records) = records else {
        println!("Error: No data loaded. Please load the task export first (option 1).\n");
        return;
    };

    let (technicians, agg) = aggregate::aggregate(&records, config);
    println!(
        "Aggregated {} of {} records.",
        format_int(agg.processed as i64),
        format_int(agg.total_records as i64)
    );
    if agg.rejected_no_technician > 0 {
        println!(
            "  Skipped (no technician): {}",
            format_int(agg.rejected_no_technician as i64)
        );
    }
    if agg.rejected_no_date > 0 {
        println!(
            "  Skipped (no closure date): {}",
            format_int(agg.rejected_no_date as i64)
        );
    }
    if agg.rejected_non_positive > 0 {
        println!(
            "  Skipped (non-positive gross): {}",
            format_int(agg.rejected_non_positive as i64)
        );
    }
    if agg.precomputed_divergences > 0 {
        println!(
            "  Warning: {} records disagree with upstream net values.",
            format_int(agg.precomputed_divergences as i64)
        );
    }
    println!();

    let doc = output::export_document(&technicians, config);
    let export_file = "payouts.json";
    if let Err(e) = output::write_json(export_file, &doc) {
        eprintln!("Write error: {}", e);
    }
    println!("Payout export written to {}", export_file);
    println!(
        "  Technicians: {}",
        format_int(doc.summary.technician_count as i64)
    );
    println!("  Tasks: {}", format_int(doc.summary.task_count as i64));
    println!(
        "  Total net paid: {}",
        format_number(doc.summary.total_net, 2)
    );
    for (category, stat) in &doc.summary.by_category {
        println!(
            "    {}: {} tasks - {}",
            category,
            format_int(stat.count as i64),
            format_number(stat.total, 2)
        );
    }
    println!();

    let month = read_line("Commission report month (1-12): ");
    let year = read_line("Commission report year: ");
    let (Ok(month), Ok(year)) = (month.parse::<u32>(), year.parse::<i32>()) else {
        println!("Invalid month/year.\n");
        return;
    };
    if !(1..=12).contains(&month) {
        println!("Invalid month/year.\n");
        return;
    }

    let key = MonthKey::new(year, month);
    let rows = reports::commission_report(&technicians, key, config);
    let report_file = format!("commission_{}.csv", key);
    if let Err(e) = output::write_csv(&report_file, &rows) {
        eprintln!("Write error: {}", e);
    }
    println!("\nCommission Report - {}\n", key.label());
    output::preview_table_rows(&rows, 10);
    println!("(Full table exported to {})\n", report_file);
}

/// Handle option [3]: console summary for one technician, matched by
/// case-insensitive substring.
fn handle_lookup(config: &Config) {
    let records = {
        let state = APP_STATE.lock().unwrap();
        state.records.clone()
    };
    let Some(records) = records else {
        println!("Error: No data loaded. Please load the task export first (option 1).\n");
        return;
    };

    let query = read_line("Technician name: ");
    if query.is_empty() {
        println!("No name given.\n");
        return;
    }

    let (technicians, _) = aggregate::aggregate(&records, config);
    let needle = query.to_uppercase();
    let Some(summary) = technicians
        .values()
        .find(|s| s.name.to_uppercase().contains(&needle))
    else {
        println!("Technician '{}' not found.", query);
        println!("Available technicians (first 10):");
        for name in technicians.keys().take(10) {
            println!("  {}", name);
        }
        println!();
        return;
    };

    println!("\nSummary for {}", summary.name);
    println!("  Total net: {}", format_number(summary.total_net, 2));
    println!("  Tasks: {}", format_int(summary.task_count as i64));
    println!("  By category:");
    for (category, stat) in &summary.by_category {
        println!(
            "    {}: {} tasks - {}",
            category,
            format_int(stat.count as i64),
            format_number(stat.total, 2)
        );
    }
    println!("  Last 3 months:");
    for bucket in summary.months.values().rev().take(3) {
        println!("\n  {}:", bucket.label);
        println!("    Tasks: {}", format_int(bucket.task_count as i64));
        println!(
            "    Gross: {} / Discounts: {} / Net: {}",
            format_number(bucket.total_gross, 2),
            format_number(bucket.total_discount, 2),
            format_number(bucket.total_net, 2)
        );
        for (typology, stat) in &bucket.by_typology {
            println!(
                "    {}: {} tasks - {} (discount {}%)",
                typology,
                format_int(stat.count as i64),
                format_number(stat.net, 2),
                stat.discount_pct
            );
        }
    }
    println!();
}

fn main() {
    loop {
        println!("Technician Payouts:");
        println!("[1] Load the task export");
        println!("[2] Generate payout reports");
        println!("[3] Technician summary\n");
        match read_choice().as_str() {
            "1" => {
                handle_load();
            }
            "2" => {
                println!();
                handle_generate(&CONFIG);
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            "3" => {
                println!();
                handle_lookup(&CONFIG);
            }
            _ => {
                println!("Invalid choice. Please enter 1, 2 or 3.\n");
            }
        }
    }
}
