use crate::error::CliError;
use engine_core::progress::JobReport;
use serde::Serialize;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

pub fn print_job_table(report: &JobReport) {
    let total = report
        .total_expected
        .map(|total| total.to_string())
        .unwrap_or_else(|| "n/a".to_string());

    println!("Progress for load job '{}':", report.job_id);
    println!("-----------------------------");
    println!("{:<16} {}", "Status", report.status);
    println!("{:<16} {}%", "Progress", report.percent);
    println!("{:<16} {}", "Files loaded", report.finished_count);
    println!("{:<16} {}", "Files expected", total);
    println!("{:<16} {}", "Started", report.started_at.to_rfc3339());
    println!("{:<16} {}", "Updated", report.updated_at.to_rfc3339());
    if let Some(error) = &report.error {
        println!("{:<16} {}", "Error", error);
    }
}

pub fn print_jobs_table(reports: &[JobReport]) {
    if reports.is_empty() {
        println!("No load jobs recorded.");
        return;
    }

    println!(
        "{:<32} {:<10} {:>8} {:>10}  {}",
        "Job", "Status", "Percent", "Loaded", "Updated"
    );
    for report in reports {
        println!(
            "{:<32} {:<10} {:>7}% {:>10}  {}",
            report.job_id,
            report.status.as_str(),
            report.percent,
            report.finished_count,
            report.updated_at.to_rfc3339()
        );
    }
}
