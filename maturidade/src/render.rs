//! Text output for the maturidade CLI.

use maturidade_core::analytics::{
    BuildAllResult, CompanyMaturityStats, MaturityDashboard, PeriodComparison, TimelinePoint,
};
use maturidade_core::ingest::ImportResult;
use maturidade_core::JourneyMaturitySnapshot;

pub fn import_result(result: &ImportResult) {
    println!(
        "Imported {} file(s), {} unchanged",
        result.files_imported, result.files_skipped
    );
    let counts = &result.counts;
    println!(
        "  companies: {}  journeys: {}  processes: {}  tasks: {}",
        counts.companies, counts.journeys, counts.processes, counts.tasks
    );
    println!(
        "  evaluations: {} new, {} already present",
        counts.evaluations_inserted, counts.evaluations_skipped
    );
    for (path, error) in &result.errors {
        eprintln!("  [!] {}: {}", path.display(), error);
    }
}

pub fn snapshot(snapshot: &JourneyMaturitySnapshot) {
    println!(
        "{} {} {}  {:>6.2}%  ({}/{} mature, {} pending, {} completed tasks)",
        snapshot.snapshot_date,
        snapshot.snapshot_type,
        snapshot.journey_id,
        snapshot.maturity_percentage,
        snapshot.mature_processes,
        snapshot.total_processes,
        snapshot.pending_processes,
        snapshot.in_progress_processes,
    );
}

pub fn build_result(result: &BuildAllResult) {
    println!(
        "Built {} {} snapshot(s) for {}",
        result.snapshots.len(),
        result.snapshot_type,
        result.snapshot_date
    );
    for s in &result.snapshots {
        snapshot(s);
    }
    for failure in &result.failures {
        eprintln!("  [!] {}: {}", failure.journey_slug, failure.error);
    }
}

pub fn backfill(results: &[BuildAllResult]) {
    let built: usize = results.iter().map(|r| r.snapshots.len()).sum();
    let failed: usize = results.iter().map(|r| r.failures.len()).sum();
    println!(
        "Backfilled {} bucket(s): {} snapshot(s) built, {} failed",
        results.len(),
        built,
        failed
    );
    for result in results {
        for failure in &result.failures {
            eprintln!(
                "  [!] {} {}: {}",
                result.snapshot_date, failure.journey_slug, failure.error
            );
        }
    }
}

pub fn journey_timeline(points: &[TimelinePoint]) {
    if points.is_empty() {
        println!("No snapshots in range.");
        return;
    }
    println!("{:<12} {:>8} {:>7} {:>7} {:>8}", "Date", "Maturity", "Mature", "Total", "Pending");
    for p in points {
        println!(
            "{:<12} {:>7.2}% {:>7} {:>7} {:>8}",
            p.date.format("%d/%m/%Y"),
            p.percentage,
            p.mature,
            p.total,
            p.pending
        );
    }
}

pub fn dashboard(dashboard: &MaturityDashboard) {
    println!(
        "Company {} - {} snapshots {} to {}",
        dashboard.company_id, dashboard.snapshot_type, dashboard.range.start, dashboard.range.end
    );
    if let Some(ref built) = dashboard.backfilled {
        println!(
            "(no snapshots in range; built {} for {})",
            built.snapshots.len(),
            built.snapshot_date
        );
    }
    println!();

    let chart = &dashboard.chart;
    if chart.is_empty() {
        println!("No snapshots in range.");
        return;
    }

    print!("{:<12}", "Data");
    for column in &chart.columns {
        print!(" {:>14}", truncate(&column.name, 14));
    }
    println!();
    for row in &chart.rows {
        print!("{:<12}", row.label());
        for column in &chart.columns {
            print!(" {:>13.2}%", row.value(&column.slug));
        }
        println!();
    }

    println!();
    println!("Start vs end of range:");
    for point in &dashboard.radar {
        println!(
            "  {:<24} {:>6.2}% -> {:>6.2}%",
            truncate(&point.name, 24),
            point.previous,
            point.current
        );
    }

    println!();
    stats(&dashboard.stats.rounded());
}

pub fn stats(stats: &CompanyMaturityStats) {
    println!("Average maturity:  {:.2}%", stats.average_maturity);
    println!(
        "Processes:         {} mature of {}",
        stats.mature_processes, stats.total_processes
    );
    println!("Journeys:          {}", stats.journey_count);
    println!("Growth:            {:+.2}% ({})", stats.growth_rate, stats.trend);
}

pub fn comparison(comparison: &PeriodComparison) {
    for (label, period) in [("Period 1", &comparison.period1), ("Period 2", &comparison.period2)] {
        let date = period
            .snapshot
            .as_ref()
            .map(|s| s.snapshot_date.to_string())
            .unwrap_or_else(|| "no snapshot".to_string());
        println!(
            "{}: {} to {}  {:>6.2}%  ({})",
            label, period.range.start, period.range.end, period.percentage, date
        );
    }
    let delta = &comparison.comparison;
    println!(
        "Difference: {:+.2} points, growth {:+.2}% ({})",
        delta.difference, delta.growth_rate, delta.trend
    );
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        value.to_string()
    } else {
        let mut out: String = value.chars().take(max.saturating_sub(1)).collect();
        out.push('~');
        out
    }
}
