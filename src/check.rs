//! Pipeline checks
//!
//! Analyzes the pipeline definition file together with the run log
//! (`<log_dir>/runs.jsonl`) and reports problems. Findings come in three
//! categories: errors (must fix), warnings (should fix) and info
//! (suggestions).

use std::collections::BTreeMap;

use crate::config::registry::{build_flow, TERMINAL_KINDS};
use crate::config::{PipelineConfig, PipelineFile};
use crate::flow::Resolution;
use crate::log::RunRecord;

/// Severity level for a diagnostic finding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Must fix, the pipeline cannot run
    Error,
    /// Should fix, the pipeline runs but misbehaves
    Warning,
    /// Suggestion
    Info,
}

/// A single diagnostic finding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    /// Severity of the finding
    pub severity: Severity,
    /// Short code for the finding (e.g., "C001")
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Suggested fix (optional)
    pub suggestion: Option<String>,
}

/// Diagnostic report from `blockflow check`
#[derive(Debug, Clone)]
pub struct DiagnosticReport {
    /// All findings, errors first
    pub findings: Vec<Finding>,
}

impl DiagnosticReport {
    /// Returns true if the report has no findings at all
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    /// Returns the number of errors
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    /// Returns the number of warnings
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    /// Returns the number of info items
    #[must_use]
    pub fn info_count(&self) -> usize {
        self.count(Severity::Info)
    }

    fn count(&self, severity: Severity) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == severity)
            .count()
    }
}

/// Run all checks and return a report
#[must_use]
pub fn diagnose(file: &PipelineFile, runs: &[RunRecord]) -> DiagnosticReport {
    let mut findings = Vec::new();

    for pipeline in &file.pipelines {
        check_definition(pipeline, &mut findings);
        check_empty(pipeline, &mut findings);
        check_unreachable(pipeline, &mut findings);
        check_swallowed_faults(pipeline, &mut findings);
    }
    check_fault_rate(runs, &mut findings);

    findings.sort_by_key(|f| match f.severity {
        Severity::Error => 0,
        Severity::Warning => 1,
        Severity::Info => 2,
    });

    DiagnosticReport { findings }
}

/// C001: the pipeline cannot be built
fn check_definition(pipeline: &PipelineConfig, findings: &mut Vec<Finding>) {
    if let Err(err) = build_flow(pipeline) {
        findings.push(Finding {
            severity: Severity::Error,
            code: "C001".to_string(),
            message: err.to_string(),
            suggestion: Some(format!(
                "Fix the definition of '{}' in the pipeline file",
                pipeline.name
            )),
        });
    }
}

/// C002: no processors, every run goes straight to the blocker
fn check_empty(pipeline: &PipelineConfig, findings: &mut Vec<Finding>) {
    if pipeline.processors.is_empty() {
        findings.push(Finding {
            severity: Severity::Warning,
            code: "C002".to_string(),
            message: format!("Pipeline '{}' has no processors", pipeline.name),
            suggestion: Some(format!(
                "Add a [[pipeline.processor]] entry to '{}'",
                pipeline.name
            )),
        });
    }
}

/// C003: processors after one that never delegates are never entered
fn check_unreachable(pipeline: &PipelineConfig, findings: &mut Vec<Finding>) {
    let Some(position) = pipeline
        .processors
        .iter()
        .position(|p| TERMINAL_KINDS.contains(&p.kind.as_str()))
    else {
        return;
    };

    let unreachable = pipeline.processors.len() - position - 1;
    if unreachable > 0 {
        findings.push(Finding {
            severity: Severity::Warning,
            code: "C003".to_string(),
            message: format!(
                "Pipeline '{}' has {unreachable} unreachable processor(s) after '{}' at position {}",
                pipeline.name,
                pipeline.processors[position].kind,
                position + 1
            ),
            suggestion: Some(format!(
                "Move '{}' to the end of '{}' or remove the processors after it",
                pipeline.processors[position].kind, pipeline.name
            )),
        });
    }
}

/// C004: a fallback blocker turns every fault into its value
fn check_swallowed_faults(pipeline: &PipelineConfig, findings: &mut Vec<Finding>) {
    if pipeline.blocker.kind == "fallback" {
        findings.push(Finding {
            severity: Severity::Info,
            code: "C004".to_string(),
            message: format!(
                "Pipeline '{}' uses a fallback blocker, faults are replaced by the fallback value",
                pipeline.name
            ),
            suggestion: Some(
                "Use `kind = \"missed\"` if faults should reach the caller".to_string(),
            ),
        });
    }
}

/// C005: pipelines that fault in most logged runs
fn check_fault_rate(runs: &[RunRecord], findings: &mut Vec<Finding>) {
    let mut by_pipeline: BTreeMap<&str, Vec<&RunRecord>> = BTreeMap::new();
    for run in runs {
        by_pipeline.entry(run.pipeline.as_str()).or_default().push(run);
    }

    for (name, records) in &by_pipeline {
        let total = records.len();
        let faulted = records
            .iter()
            .filter(|r| r.resolution == Resolution::Faulted)
            .count();

        if total >= 2 && faulted * 2 > total {
            findings.push(Finding {
                severity: Severity::Warning,
                code: "C005".to_string(),
                message: format!("Pipeline '{name}' faulted {faulted}/{total} times"),
                suggestion: Some(format!(
                    "Run `blockflow run {name}` with BLOCKFLOW_LOG=debug to see which processor fails"
                )),
            });
        }
    }
}
