//! Per-sub-step delay schedules.
//!
//! The engine suspends before every sub-step; the schedule decides for how
//! long. Schedules are injected so callers control pacing without the
//! engine growing per-screen timing variants.

use std::time::Duration;

/// Default pause before each sub-step when a phase configures none.
pub const DEFAULT_SUB_STEP_DELAY: Duration = Duration::from_millis(250);

/// Supplies the pause preceding a given sub-step.
pub trait DelaySchedule: Send + Sync {
    /// Returns the delay before `sub_step` of the phase at `phase_idx`.
    fn delay(&self, phase_idx: usize, sub_step: u32) -> Duration;
}

/// Uniform delay for every sub-step.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

impl DelaySchedule for FixedDelay {
    fn delay(&self, _phase_idx: usize, _sub_step: u32) -> Duration {
        self.0
    }
}

/// Per-phase delays with a shared default.
#[derive(Debug, Clone)]
pub struct PerPhaseDelay {
    delays: Vec<Option<Duration>>,
    default: Duration,
}

impl PerPhaseDelay {
    /// Creates a schedule from per-phase overrides (indexed like the phase
    /// table) and a default for phases without one.
    #[must_use]
    pub const fn new(delays: Vec<Option<Duration>>, default: Duration) -> Self {
        Self { delays, default }
    }
}

impl DelaySchedule for PerPhaseDelay {
    fn delay(&self, phase_idx: usize, _sub_step: u32) -> Duration {
        self.delays
            .get(phase_idx)
            .copied()
            .flatten()
            .unwrap_or(self.default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_delay_uniform() {
        let schedule = FixedDelay(Duration::from_millis(10));
        assert_eq!(schedule.delay(0, 0), Duration::from_millis(10));
        assert_eq!(schedule.delay(3, 7), Duration::from_millis(10));
    }

    #[test]
    fn test_per_phase_override_and_default() {
        let schedule = PerPhaseDelay::new(
            vec![Some(Duration::from_millis(50)), None],
            Duration::from_millis(100),
        );
        assert_eq!(schedule.delay(0, 0), Duration::from_millis(50));
        assert_eq!(schedule.delay(1, 0), Duration::from_millis(100));
    }

    #[test]
    fn test_per_phase_out_of_range_uses_default() {
        let schedule = PerPhaseDelay::new(vec![], Duration::from_millis(100));
        assert_eq!(schedule.delay(9, 0), Duration::from_millis(100));
    }
}
