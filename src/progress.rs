//! Progress computation.
//!
//! Maps an engine position (phase index, sub-steps completed within the
//! phase) onto an aggregate percentage. Fully completed phases contribute
//! their whole weight; the current phase contributes a fraction of its
//! weight proportional to completed sub-steps.

use crate::plan::PhaseTable;

/// Computes the overall progress percentage for a position in a table.
///
/// `done_in_phase` is the number of sub-steps completed within the phase
/// at `phase_idx` (clamped to that phase's sub-step count). The result is
/// clamped to `[0, 100]`, is non-decreasing along the engine's advance
/// order, and is exactly `100.0` at the final sub-step of the final phase:
/// the completed-weight sum then folds the same additions in the same
/// order as [`PhaseTable::total_weight`], so the division is `x / x`.
#[must_use]
pub fn percent(table: &PhaseTable, phase_idx: usize, done_in_phase: u32) -> f64 {
    let total = table.total_weight();
    if total <= 0.0 {
        return 0.0;
    }

    let phases = table.phases();
    let Some(current) = phases.get(phase_idx) else {
        return 100.0;
    };

    let completed: f64 = phases[..phase_idx].iter().map(|p| p.weight).sum();
    let fraction =
        f64::from(done_in_phase.min(current.sub_steps)) / f64::from(current.sub_steps);

    (100.0 * (completed + current.weight * fraction) / total).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::Phase;
    use proptest::prelude::*;

    fn phase(id: &str, weight: f64, sub_steps: u32) -> Phase {
        Phase {
            id: id.to_string(),
            label: id.to_string(),
            weight,
            sub_steps,
            fallback: None,
        }
    }

    fn two_phase_table() -> PhaseTable {
        PhaseTable::new(vec![phase("p0", 50.0, 2), phase("p1", 50.0, 2)])
    }

    #[test]
    fn test_zero_before_first_sub_step() {
        let table = two_phase_table();
        assert!(percent(&table, 0, 0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_two_phase_checkpoints() {
        let table = two_phase_table();
        assert!((percent(&table, 0, 1) - 25.0).abs() < f64::EPSILON);
        assert!((percent(&table, 0, 2) - 50.0).abs() < f64::EPSILON);
        assert!((percent(&table, 1, 1) - 75.0).abs() < f64::EPSILON);
        assert!((percent(&table, 1, 2) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_exactly_100_at_final_sub_step() {
        // Weights chosen so naive accumulation would drift
        let table = PhaseTable::new(vec![
            phase("a", 0.1, 3),
            phase("b", 0.2, 1),
            phase("c", 0.3, 7),
        ]);
        let last = table.len() - 1;
        let sub_steps = table.phases()[last].sub_steps;
        let result = percent(&table, last, sub_steps);
        assert!((result - 100.0).abs() < f64::EPSILON, "got {result}");
    }

    #[test]
    fn test_done_in_phase_clamped() {
        let table = two_phase_table();
        assert!((percent(&table, 0, 99) - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_past_the_end_is_complete() {
        let table = two_phase_table();
        assert!((percent(&table, 2, 0) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unequal_weights() {
        let table = PhaseTable::new(vec![phase("a", 80.0, 4), phase("b", 20.0, 1)]);
        assert!((percent(&table, 0, 1) - 20.0).abs() < 1e-9);
        assert!((percent(&table, 0, 3) - 60.0).abs() < 1e-9);
        assert!((percent(&table, 1, 0) - 80.0).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn progress_is_monotone_and_ends_at_100(
            shape in proptest::collection::vec((0.01f64..500.0, 1u32..8), 1..6)
        ) {
            let phases: Vec<Phase> = shape
                .iter()
                .enumerate()
                .map(|(i, &(weight, sub_steps))| phase(&format!("p{i}"), weight, sub_steps))
                .collect();
            let table = PhaseTable::new(phases);

            let mut previous = 0.0f64;
            for (idx, p) in table.phases().iter().enumerate() {
                for done in 1..=p.sub_steps {
                    let value = percent(&table, idx, done);
                    prop_assert!(value >= previous - 1e-12, "regressed: {value} < {previous}");
                    prop_assert!((0.0..=100.0).contains(&value));
                    previous = value;
                }
            }
            prop_assert!((previous - 100.0).abs() < f64::EPSILON);

            // 100 is reached only at the very last position
            let positions: Vec<(usize, u32)> = table
                .phases()
                .iter()
                .enumerate()
                .flat_map(|(idx, p)| (1..=p.sub_steps).map(move |d| (idx, d)))
                .collect();
            for &(idx, done) in &positions[..positions.len() - 1] {
                prop_assert!(percent(&table, idx, done) < 100.0);
            }
        }
    }
}
