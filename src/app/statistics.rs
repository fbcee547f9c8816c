//! Pass summaries for the operator.

use log::info;
use strum::IntoEnumIterator;

use crate::error_handling::{ProbeFailure, ProbeInfo, ProcessingStats};
use crate::probe::StatsReport;

/// Renders rows as a two-column table with a `Metric | Count` header.
pub fn format_table(rows: &[(&str, usize)]) -> String {
    let label_width = rows
        .iter()
        .map(|(label, _)| label.len())
        .chain(std::iter::once("Metric".len()))
        .max()
        .unwrap_or(0);
    let count_width = rows
        .iter()
        .map(|(_, count)| count.to_string().len())
        .chain(std::iter::once("Count".len()))
        .max()
        .unwrap_or(0);

    let border = format!(
        "+-{}-+-{}-+",
        "-".repeat(label_width),
        "-".repeat(count_width)
    );
    let mut table = vec![
        border.clone(),
        format!("| {:<label_width$} | {:<count_width$} |", "Metric", "Count"),
        border.clone(),
    ];
    for (label, count) in rows {
        table.push(format!("| {:<label_width$} | {:<count_width$} |", label, count));
    }
    table.push(border);
    table.join("\n")
}

/// Table of total/successful/failed sites of a stats pass.
pub fn format_stats_summary(report: &StatsReport) -> String {
    format_table(&[
        ("Total Sites", report.total),
        ("Successful", report.successful),
        ("Failed", report.failed),
    ])
}

/// Logs the per-category breakdown of a stats pass.
pub fn print_probe_statistics(stats: &ProcessingStats) {
    let total_failures = stats.total_failures();
    let total_info = stats.total_info();

    if total_failures > 0 {
        info!("Failure Counts ({} total):", total_failures);
        for failure in ProbeFailure::iter() {
            let count = stats.get_failure_count(failure);
            if count > 0 {
                info!("   {}: {}", failure.as_str(), count);
            }
        }
    }

    if total_info > 0 {
        info!("Info Counts ({} total):", total_info);
        for info_type in ProbeInfo::iter() {
            let count = stats.get_info_count(info_type);
            if count > 0 {
                info!("   {}: {}", info_type.as_str(), count);
            }
        }
    }
}
