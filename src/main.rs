//! Blockflow - processor pipeline runner
//!
//! CLI entry point for running pipelines defined in a TOML file.

// Allow multiple crate versions from dependencies (can't easily control)
#![allow(clippy::multiple_crate_versions)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use tracing::debug;

use blockflow::check::diagnose;
use blockflow::cli::{render_diagnostic_report, render_pipeline_list, RunDisplay};
use blockflow::config::{build_flow, ConfigEvent, GlobalConfig, PipelineFile, Repository};
use blockflow::log::{
    init_tracing, JsonlHandler, JsonlWriter, Level, LevelGate, Logger, RunRecord, StderrHandler,
};
use blockflow::{Input, Resolution, RunReport};

/// File the run history is appended to inside the log directory
const RUN_LOG: &str = "runs.jsonl";

/// File application log records are appended to inside the log directory
const APP_LOG: &str = "blockflow.jsonl";

/// Processor pipeline runner
///
/// Runs an input through a chain of processors terminated by a blocker,
/// as defined in a pipeline file.
#[derive(Parser, Debug)]
#[command(name = "blockflow", version, about)]
struct Cli {
    /// Path to the pipeline definition file
    #[arg(long, global = true, default_value = "blockflow.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a pipeline and print its result as JSON
    Run {
        /// Name of the pipeline to run
        pipeline: String,

        /// Input as a JSON object
        #[arg(long)]
        input: Option<String>,
    },
    /// List the pipelines in the pipeline file
    List,
    /// Check the pipeline file and run history for problems
    Check,
    /// Look up a value from a directory of configuration groups
    Config {
        /// Directory holding `<group>.toml` or `<group>.json` files
        dir: PathBuf,

        /// Dot path of the value, starting with the group name
        path: String,
    },
}

/// Parse the `--input` argument into an [`Input`].
fn parse_input(raw: Option<&str>) -> Result<Input> {
    let Some(raw) = raw else {
        return Ok(Input::new());
    };
    let value: Value = serde_json::from_str(raw).context("Failed to parse --input as JSON")?;
    Input::try_from(value).context("--input must be a JSON object")
}

/// Build a `RunRecord` from a `RunReport` for JSONL logging.
fn build_run_record(pipeline: &str, report: &RunReport<Value>) -> RunRecord {
    let (result, error) = match &report.result {
        Ok(value) => (Some(value.clone()), None),
        Err(fault) => (None, Some(format!("{fault:#}"))),
    };

    RunRecord {
        pipeline: pipeline.to_string(),
        timestamp: chrono::Utc::now(),
        resolution: report.resolution,
        processors: report.processors,
        steps: report.steps,
        duration_ms: u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
        result,
        error,
    }
}

/// Application logger writing to the log directory and, for warnings, stderr.
fn build_logger(global: &GlobalConfig) -> Result<Logger> {
    let mut logger = Logger::new("blockflow");
    logger.push_handler(
        JsonlHandler::new(&global.log_dir, APP_LOG, Level::Debug, true)
            .context("Failed to initialize application log")?,
    );
    logger.push_handler(StderrHandler::new(Level::Warning, true));
    logger.push_handler(LevelGate::new(global.log_level));
    Ok(logger)
}

fn load_pipeline_file(path: &Path) -> Result<PipelineFile> {
    PipelineFile::from_path(path)
        .with_context(|| format!("Failed to load pipelines from '{}'", path.display()))
}

fn run_pipeline(file: &PipelineFile, name: &str, raw_input: Option<&str>) -> Result<Resolution> {
    let config = file.get_pipeline(name).with_context(|| {
        format!(
            "Unknown pipeline '{name}'. Available pipelines: {}",
            file.pipeline_names()
        )
    })?;
    let mut input = parse_input(raw_input)?;

    let flow = build_flow(config)?;
    let logger = build_logger(&file.global)?;
    let run_log = JsonlWriter::new(&file.global.log_dir, RUN_LOG)
        .context("Failed to initialize run log")?;

    let display = RunDisplay::new(name);
    let processor_names: Vec<String> = flow
        .to_ordered_list()
        .iter()
        .map(|p| p.name().to_string())
        .collect();
    display.print_header(&processor_names);

    let report = flow.run(&mut input);
    display.render_report(&report);

    let record = build_run_record(name, &report);
    run_log
        .append(&record)
        .context("Failed to write to run log")?;

    let mut context = Map::new();
    context.insert("pipeline".to_string(), Value::from(name));
    context.insert("resolution".to_string(), Value::from(record.resolution.to_string()));
    context.insert("steps".to_string(), Value::from(record.steps));
    match &record.error {
        Some(error) => {
            context.insert("error".to_string(), Value::from(error.as_str()));
            logger.log(Level::Error, "pipeline run faulted", context);
        }
        None => {
            logger.log(Level::Info, "pipeline run finished", context);
        }
    }

    if let Ok(value) = &report.result {
        println!(
            "{}",
            serde_json::to_string_pretty(value).context("Failed to serialize result")?
        );
    }

    Ok(report.resolution)
}

fn check_pipelines(file: &PipelineFile) -> Result<usize> {
    let run_log: JsonlWriter<RunRecord> = JsonlWriter::new(&file.global.log_dir, RUN_LOG)
        .context("Failed to initialize run log")?;
    let runs = run_log
        .read_all()
        .context("Failed to read run history")?;

    let report = diagnose(file, &runs);
    render_diagnostic_report(&report);
    Ok(report.error_count())
}

fn lookup_config(dir: &Path, path: &str) -> Result<Option<Value>> {
    let mut repository = Repository::with_directory(dir);
    repository.listen(|event| match event {
        ConfigEvent::Loaded { group, source } => {
            debug!(group = group.as_str(), source = source.as_deref(), "loaded config group");
        }
        ConfigEvent::Missed { group } => debug!(group = group.as_str(), "config group not found"),
        _ => {}
    });
    repository.get(path)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Command::Run { pipeline, input } => {
            let file = load_pipeline_file(&cli.config)?;
            let resolution = run_pipeline(&file, &pipeline, input.as_deref())?;
            if resolution == Resolution::Faulted {
                std::process::exit(1);
            }
        }
        Command::List => {
            let file = load_pipeline_file(&cli.config)?;
            render_pipeline_list(&file);
        }
        Command::Check => {
            let file = load_pipeline_file(&cli.config)?;
            if check_pipelines(&file)? > 0 {
                std::process::exit(1);
            }
        }
        Command::Config { dir, path } => {
            let value = lookup_config(&dir, &path)?
                .with_context(|| format!("No configuration value at '{path}'"))?;
            println!(
                "{}",
                serde_json::to_string_pretty(&value).context("Failed to serialize value")?
            );
        }
    }

    Ok(())
}
