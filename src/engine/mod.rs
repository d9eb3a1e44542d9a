//! Staged execution engine.
//!
//! One engine drives one run: phases in order, sub-steps in order, a
//! schedule-controlled pause and one log line per sub-step, progress
//! recomputed and published after each advance. Cancellation is observed
//! cooperatively at every suspension point; a cancelled run settles
//! without invoking the completion hook. All state transitions happen on
//! a single spawned task, so there is exactly one writer per run.

mod state;

pub use state::{ExecutionState, RunStatus};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cancel::CancelToken;
use crate::error::{EngineError, StagecueError};
use crate::observability::metrics;
use crate::plan::PhaseTable;
use crate::progress;
use crate::schedule::DelaySchedule;
use crate::source::LineSource;
use crate::stream::{LogLevel, LogStream};

/// Default log stream capacity when none is configured.
pub const DEFAULT_LOG_CAPACITY: usize = 256;

/// Hook invoked exactly once when a run completes naturally.
///
/// Never invoked for a cancelled run.
pub type CompletionHook = Box<dyn FnOnce() + Send + 'static>;

/// Engine construction options.
///
/// Passed explicitly at construction so behavior variants are visible at
/// the call site rather than read from ambient process state.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of buffered log entries before FIFO eviction.
    pub log_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

/// Drives a [`PhaseTable`] to completion or cancellation.
///
/// Engines are single-run: once started they either complete or cancel,
/// and a settled engine is discarded rather than restarted.
pub struct ExecutionEngine {
    table: Arc<PhaseTable>,
    log: Arc<LogStream>,
    state_tx: Arc<watch::Sender<ExecutionState>>,
    started: AtomicBool,
    run_id: Uuid,
}

impl ExecutionEngine {
    /// Creates an engine for the given table.
    #[must_use]
    pub fn new(table: PhaseTable, config: EngineConfig) -> Self {
        let run_id = Uuid::new_v4();
        let (state_tx, _state_rx) = watch::channel(ExecutionState::idle(run_id));
        Self {
            table: Arc::new(table),
            log: Arc::new(LogStream::new(config.log_capacity)),
            state_tx: Arc::new(state_tx),
            started: AtomicBool::new(false),
            run_id,
        }
    }

    /// Returns a handle to the run's log stream.
    #[must_use]
    pub fn log_stream(&self) -> Arc<LogStream> {
        Arc::clone(&self.log)
    }

    /// Subscribes to state snapshots.
    ///
    /// A new snapshot is published after every sub-step and at every
    /// terminal transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ExecutionState> {
        self.state_tx.subscribe()
    }

    /// Returns the current state snapshot.
    #[must_use]
    pub fn state(&self) -> ExecutionState {
        self.state_tx.borrow().clone()
    }

    /// Returns this run's identifier.
    #[must_use]
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns the phase table driving this run.
    #[must_use]
    pub fn table(&self) -> &PhaseTable {
        &self.table
    }

    /// Starts the run on a spawned task.
    ///
    /// If `cancel` is already signalled when the task begins, the run
    /// settles as `Cancelled` immediately: no phase executes, the log
    /// stays empty, and `on_complete` never fires.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the table fails validation (the
    /// engine never enters `Running`), or [`EngineError::DoubleStart`] if
    /// this engine was already started.
    pub fn start(
        &self,
        schedule: Arc<dyn DelaySchedule>,
        source: Arc<dyn LineSource>,
        on_complete: CompletionHook,
        cancel: CancelToken,
    ) -> Result<JoinHandle<()>, StagecueError> {
        self.table.validate()?;

        if self.started.swap(true, Ordering::SeqCst) {
            return Err(EngineError::DoubleStart.into());
        }

        let driver = Driver {
            table: Arc::clone(&self.table),
            log: Arc::clone(&self.log),
            state_tx: Arc::clone(&self.state_tx),
            cancel,
            run_id: self.run_id,
        };
        Ok(tokio::spawn(driver.drive(schedule, source, on_complete)))
    }
}

impl std::fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("ExecutionEngine")
            .field("run_id", &self.run_id)
            .field("phases", &self.table.len())
            .field("status", &state.status)
            .field("progress_percent", &state.progress_percent)
            .finish_non_exhaustive()
    }
}

/// The single writer for one run's state and log stream.
struct Driver {
    table: Arc<PhaseTable>,
    log: Arc<LogStream>,
    state_tx: Arc<watch::Sender<ExecutionState>>,
    cancel: CancelToken,
    run_id: Uuid,
}

impl Driver {
    async fn drive(
        self,
        schedule: Arc<dyn DelaySchedule>,
        source: Arc<dyn LineSource>,
        on_complete: CompletionHook,
    ) {
        let started_at = Utc::now();
        let clock = Instant::now();

        if self.cancel.is_cancelled() {
            info!(run_id = %self.run_id, "run cancelled before start");
            self.settle_cancelled(0, 0, 0.0, started_at, clock);
            return;
        }

        info!(run_id = %self.run_id, phases = self.table.len(), "run started");
        self.publish(RunStatus::Running, 0, 0, 0.0, started_at, false);

        let num_phases = self.table.len();
        let mut pct = 0.0_f64;

        for phase_idx in 0..num_phases {
            let phase = &self.table.phases()[phase_idx];
            debug!(run_id = %self.run_id, phase = %phase.id, "phase entered");

            for sub in 0..phase.sub_steps {
                if self.cancel.is_cancelled() {
                    self.settle_cancelled(phase_idx, sub, pct, started_at, clock);
                    return;
                }

                let delay = schedule.delay(phase_idx, sub);
                tokio::select! {
                    () = self.cancel.cancelled() => {
                        self.settle_cancelled(phase_idx, sub, pct, started_at, clock);
                        return;
                    }
                    () = tokio::time::sleep(delay) => {}
                }

                let line = tokio::select! {
                    () = self.cancel.cancelled() => {
                        self.settle_cancelled(phase_idx, sub, pct, started_at, clock);
                        return;
                    }
                    result = source.generate_line(&phase.id, sub) => result,
                };

                // A cancellation that raced the fetch wins: the resolved
                // line is discarded and nothing mutates past a terminal
                // state.
                if self.cancel.is_cancelled() {
                    self.settle_cancelled(phase_idx, sub, pct, started_at, clock);
                    return;
                }

                let is_last_in_phase = sub + 1 == phase.sub_steps;
                let (level, message) = match line {
                    Ok(text) => {
                        let level = if is_last_in_phase {
                            LogLevel::Success
                        } else {
                            LogLevel::Info
                        };
                        (level, text)
                    }
                    Err(err) => {
                        warn!(
                            run_id = %self.run_id,
                            phase = %phase.id,
                            %err,
                            "line source failed; using fallback"
                        );
                        metrics::record_fallback(&phase.id);
                        (LogLevel::Warning, phase.fallback_line())
                    }
                };

                self.log.append(&phase.id, level, message);
                pct = progress::percent(&self.table, phase_idx, sub + 1);
                metrics::record_sub_step(&phase.id);
                metrics::set_progress(pct);

                if is_last_in_phase && phase_idx + 1 == num_phases {
                    // The final sub-step's publish is the Completed
                    // transition, so progress hits 100 only there.
                    self.publish(RunStatus::Completed, phase_idx, sub + 1, pct, started_at, true);
                } else {
                    self.publish(RunStatus::Running, phase_idx, sub + 1, pct, started_at, false);
                }
            }
        }

        info!(run_id = %self.run_id, "run completed");
        metrics::record_run_settled("completed");
        metrics::record_run_duration(clock.elapsed());
        on_complete();
    }

    fn settle_cancelled(
        &self,
        phase_index: usize,
        sub_step: u32,
        pct: f64,
        started_at: DateTime<Utc>,
        clock: Instant,
    ) {
        info!(run_id = %self.run_id, phase_index, "run cancelled");
        self.publish(
            RunStatus::Cancelled,
            phase_index,
            sub_step,
            pct,
            started_at,
            true,
        );
        metrics::record_run_settled("cancelled");
        metrics::record_run_duration(clock.elapsed());
    }

    fn publish(
        &self,
        status: RunStatus,
        phase_index: usize,
        sub_step: u32,
        progress_percent: f64,
        started_at: DateTime<Utc>,
        settled: bool,
    ) {
        self.state_tx.send_replace(ExecutionState {
            status,
            phase_index,
            sub_step,
            progress_percent,
            started_at: Some(started_at),
            settled_at: settled.then(Utc::now),
            run_id: self.run_id,
        });
    }
}
