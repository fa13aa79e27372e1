//! Output formatting for the run summary

use colored::Colorize;

use crate::cli::OutputFormat;
use crate::client::models::JobStatus;
use crate::error::Result;
use crate::orchestrator::RunSummary;

pub mod json;

/// Format the summary according to `format`
pub fn format_summary(summary: &RunSummary, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Pretty => Ok(format_pretty(summary)),
        OutputFormat::Json => Ok(json::format_json(summary)?),
    }
}

/// Format and print the summary to stdout
pub fn print(summary: &RunSummary, format: OutputFormat) -> Result<()> {
    let output = format_summary(summary, format)?;
    println!("{}", output);
    Ok(())
}

fn format_pretty(summary: &RunSummary) -> String {
    let mut lines = Vec::new();

    let headline = if summary.dry_run {
        format!("{} Dry run passed, nothing was uploaded", "✓".green())
    } else {
        match summary.final_status {
            Some(JobStatus::Completed) => format!("{} Analysis completed", "✓".green()),
            _ => format!("{} Analysis submitted", "✓".green()),
        }
    };
    lines.push(headline.bold().to_string());

    lines.push(row("Server version", &summary.server_version));

    let project = match (summary.project_id, summary.project_name.as_deref()) {
        (Some(id), Some(name)) => format!("{} ({})", name, id),
        (Some(id), None) => id.to_string(),
        (None, Some(name)) => format!("{} (would be created)", name),
        (None, None) => "-".to_string(),
    };
    let project = if summary.project_created {
        format!("{} {}", project, "[created]".yellow())
    } else {
        project
    };
    lines.push(row("Project", &project));

    if summary.branching {
        if let Some(ref target) = summary.target_branch {
            let branch = match summary.base_branch {
                Some(ref base) if summary.target_branch_created => {
                    format!("{} (new, from {})", target, base)
                }
                _ => target.clone(),
            };
            lines.push(row("Branch", &branch));
        }
    }

    if !summary.dry_run {
        lines.push(row("Files archived", &summary.files_archived.to_string()));
        lines.push(row(
            "Tool outputs",
            &summary.scan_files_attached.to_string(),
        ));
    }
    if let Some(ref analysis_id) = summary.analysis_id {
        lines.push(row("Analysis", analysis_id));
    }
    if let Some(ref job_id) = summary.job_id {
        lines.push(row("Job", job_id));
    }
    if let Some(status) = summary.final_status {
        lines.push(row("Status", &status.to_string()));
    }

    lines.join("\n")
}

fn row(label: &str, value: &str) -> String {
    format!("  {:<16}{}", format!("{}:", label).dimmed(), value)
}
