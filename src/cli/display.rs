//! Terminal display for pipeline runs and reports
//!
//! All output goes to stderr so stdout remains clean for piping the
//! run result.

use colored::Colorize;
use serde_json::Value;

use crate::check::{DiagnosticReport, Severity};
use crate::config::PipelineFile;
use crate::flow::{Resolution, RunReport};

/// Maximum length of a value shown in the run summary
const MAX_VALUE_LEN: usize = 200;

/// Display handler for a single pipeline run
pub struct RunDisplay {
    pipeline: String,
}

impl RunDisplay {
    /// Create a new display handler for the given pipeline
    #[must_use]
    pub fn new(pipeline: &str) -> Self {
        Self {
            pipeline: pipeline.to_string(),
        }
    }

    /// Print the pipeline header and the processors it will run
    pub fn print_header(&self, processors: &[String]) {
        eprintln!(
            "\n{} {}",
            "===".bold().cyan(),
            format!("Pipeline: {}", self.pipeline).bold().cyan()
        );
        if !processors.is_empty() {
            eprintln!("  {} {}", "Processors:".dimmed(), processors.join(" → "));
        }
        eprintln!("{}", "─".repeat(50).dimmed());
    }

    /// Render the post-run summary
    pub fn render_report(&self, report: &RunReport<Value>) {
        eprintln!("{}", "─".repeat(50).dimmed());
        eprintln!(
            "  {} {}",
            resolution_label(report.resolution),
            self.pipeline.bold()
        );

        match &report.result {
            Ok(value) => eprintln!("  {}", truncate(&value.to_string(), MAX_VALUE_LEN)),
            Err(fault) => eprintln!(
                "  {} {}",
                "✗".red().bold(),
                truncate(&format!("{fault:#}"), MAX_VALUE_LEN).red()
            ),
        }

        eprintln!(
            "  {} {}/{} processors entered | {}",
            "Stats:".dimmed(),
            report.steps,
            report.processors,
            format_elapsed(report.elapsed.as_millis())
        );
        eprintln!();
    }
}

fn resolution_label(resolution: Resolution) -> String {
    let label = resolution.to_string().to_uppercase();
    match resolution {
        Resolution::Resolved => label.green().bold().to_string(),
        Resolution::Missed => label.yellow().bold().to_string(),
        Resolution::Recovered => label.magenta().bold().to_string(),
        Resolution::Faulted => label.red().bold().to_string(),
    }
}

/// Format a millisecond duration for display
fn format_elapsed(millis: u128) -> String {
    if millis < 1000 {
        format!("{millis}ms")
    } else {
        let secs = millis / 1000;
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// Shorten `text` to at most `max` characters
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let kept: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    } else {
        text.to_string()
    }
}

/// Print the pipelines defined in a pipeline file
pub fn render_pipeline_list(file: &PipelineFile) {
    if file.pipelines.is_empty() {
        eprintln!("No pipelines defined.");
        return;
    }
    for pipeline in &file.pipelines {
        eprintln!(
            "  {} {}",
            pipeline.name.bold(),
            format!("({} processors)", pipeline.processors.len()).dimmed()
        );
        if !pipeline.description.is_empty() {
            eprintln!("      {}", pipeline.description);
        }
    }
}

/// Print a diagnostic report
pub fn render_diagnostic_report(report: &DiagnosticReport) {
    eprintln!("\n{} {}", "===".bold().cyan(), "Pipeline Check".bold().cyan());
    eprintln!("{}", "─".repeat(50).dimmed());

    if report.is_clean() {
        eprintln!("  {} No issues found", "✓".green().bold());
        eprintln!();
        return;
    }

    for finding in &report.findings {
        let tag = match finding.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
            Severity::Info => "info".blue().bold(),
        };
        eprintln!("  {} [{}] {}", tag, finding.code.dimmed(), finding.message);
        if let Some(ref suggestion) = finding.suggestion {
            eprintln!("      {} {}", "→".dimmed(), suggestion);
        }
    }

    eprintln!("{}", "─".repeat(50).dimmed());
    eprintln!(
        "  {} error(s), {} warning(s), {} info",
        report.error_count(),
        report.warning_count(),
        report.info_count()
    );
    eprintln!();
}
