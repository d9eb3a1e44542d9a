//! Run command handler
//!
//! Loads a sequence definition, drives an engine to settlement, and
//! renders the log stream as it grows.

use std::sync::Arc;

use crate::cancel::CancelToken;
use crate::cli::args::{OutputFormat, RunArgs};
use crate::config;
use crate::engine::{EngineConfig, ExecutionEngine, ExecutionState};
use crate::error::StagecueError;
use crate::observability::init_metrics;
use crate::schedule::DelaySchedule;
use crate::source::LineSource;
use crate::stream::{LogEntry, LogLevel, LogStream};

/// Run a sequence to settlement.
///
/// # Errors
///
/// Returns a configuration error if the sequence file is missing or
/// invalid, or an I/O error if the run task fails to join.
pub async fn run(args: &RunArgs, cancel: CancelToken) -> Result<(), StagecueError> {
    if let Some(port) = args.metrics_port {
        init_metrics(Some(port))?;
        tracing::info!(port, "Prometheus metrics endpoint started");
    }

    tracing::info!(sequence = %args.sequence.display(), "loading sequence");
    let spec = config::load(&args.sequence)?;
    let origin = args.sequence.display().to_string();

    for issue in spec.validate() {
        if issue.severity == crate::error::Severity::Warning {
            tracing::warn!(location = %issue.path, "{}", issue.message);
        }
    }
    spec.ensure_valid(&origin, false)?;

    let table = spec.to_phase_table();
    let schedule: Arc<dyn DelaySchedule> = Arc::new(spec.to_schedule()?);
    let source: Arc<dyn LineSource> = Arc::new(spec.to_source(args.seed));

    let engine = ExecutionEngine::new(
        table,
        EngineConfig {
            log_capacity: spec.log_capacity,
        },
    );
    let log = engine.log_stream();
    let mut states = engine.subscribe();

    let sequence_name = spec.name.clone();
    let handle = engine.start(
        schedule,
        source,
        Box::new(move || {
            tracing::info!(sequence = %sequence_name, "sequence complete");
        }),
        cancel,
    )?;

    render_to_settlement(args.format, &log, &mut states, &spec.name).await;

    handle
        .await
        .map_err(|e| StagecueError::Io(std::io::Error::other(e.to_string())))?;
    Ok(())
}

/// Prints new log entries on every published snapshot until the run
/// reaches a terminal state.
async fn render_to_settlement(
    format: OutputFormat,
    log: &LogStream,
    states: &mut tokio::sync::watch::Receiver<ExecutionState>,
    name: &str,
) {
    let mut cursor = 0u64;
    loop {
        if states.changed().await.is_err() {
            break;
        }
        let state = states.borrow_and_update().clone();

        for entry in log.entries_since(cursor) {
            cursor = entry.sequence + 1;
            render_entry(format, &state, &entry);
        }

        if state.status.is_terminal() {
            render_settlement(format, &state, name);
            break;
        }
    }
}

fn render_entry(format: OutputFormat, state: &ExecutionState, entry: &LogEntry) {
    match format {
        OutputFormat::Human => {
            let marker = match entry.level {
                LogLevel::Info => ' ',
                LogLevel::Success => '+',
                LogLevel::Warning => '!',
            };
            println!(
                "[{:>5.1}%] {marker} {}: {}",
                state.progress_percent, entry.phase_id, entry.message
            );
        }
        OutputFormat::Json => {
            if let Ok(line) = serde_json::to_string(entry) {
                println!("{line}");
            }
        }
    }
}

fn render_settlement(format: OutputFormat, state: &ExecutionState, name: &str) {
    match format {
        OutputFormat::Human => {
            println!("{name}: {}", state.status);
        }
        OutputFormat::Json => {
            if let Ok(line) = serde_json::to_string(state) {
                println!("{line}");
            }
        }
    }
}
