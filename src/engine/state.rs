//! Execution state snapshots.
//!
//! The engine is the only writer; readers receive cloned snapshots
//! through a watch channel and must treat them as read-only.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Lifecycle status of a run.
///
/// `Cancelled` and `Completed` are terminal: no transition leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Constructed but not started.
    Idle,
    /// Advancing through sub-steps.
    Running,
    /// Settled by cancellation; the completion hook never fires.
    Cancelled,
    /// Settled naturally; the completion hook fired exactly once.
    Completed,
}

impl RunStatus {
    /// Returns whether this status is terminal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        };
        write!(f, "{name}")
    }
}

/// Snapshot of a run's position, published after every sub-step and at
/// every terminal transition.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionState {
    /// Current lifecycle status.
    pub status: RunStatus,
    /// Zero-based index of the current phase.
    pub phase_index: usize,
    /// Sub-steps completed within the current phase.
    pub sub_step: u32,
    /// Aggregate progress in `[0, 100]`; exactly 100 only at `Completed`.
    pub progress_percent: f64,
    /// When the run started (set on the first transition out of `Idle`).
    pub started_at: Option<DateTime<Utc>>,
    /// When the run settled (set only on terminal states).
    pub settled_at: Option<DateTime<Utc>>,
    /// Identifier of this run.
    pub run_id: Uuid,
}

impl ExecutionState {
    /// The initial snapshot before `start`.
    #[must_use]
    pub(crate) const fn idle(run_id: Uuid) -> Self {
        Self {
            status: RunStatus::Idle,
            phase_index: 0,
            sub_step: 0,
            progress_percent: 0.0,
            started_at: None,
            settled_at: None,
            run_id,
        }
    }
}
