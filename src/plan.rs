//! Phase descriptions and the ordered phase table.
//!
//! A [`PhaseTable`] is the static shape of a run: an ordered list of
//! weighted phases, each with a sub-step count. Tables are immutable once
//! an engine run starts; validation happens when the run is started.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A named, weighted segment of an execution run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase {
    /// Stable identifier (must be unique within a table)
    pub id: String,

    /// Human-readable label used in rendered output
    pub label: String,

    /// Relative weight of this phase in overall progress (must be > 0)
    pub weight: f64,

    /// Number of sub-steps in this phase (must be >= 1)
    pub sub_steps: u32,

    /// Static text substituted when the line source fails.
    /// When absent, a fixed template derived from the label is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}

impl Phase {
    /// Returns the deterministic fallback line for this phase.
    #[must_use]
    pub fn fallback_line(&self) -> String {
        self.fallback
            .clone()
            .unwrap_or_else(|| format!("{} in progress", self.label))
    }
}

/// Ordered, immutable collection of phases driving one run.
#[derive(Debug, Clone, Default)]
pub struct PhaseTable {
    phases: Vec<Phase>,
}

impl PhaseTable {
    /// Creates a table from an ordered list of phases.
    ///
    /// The table is not validated here; [`PhaseTable::validate`] runs when
    /// an engine is started so that configuration errors surface at the
    /// call that would consume them.
    #[must_use]
    pub const fn new(phases: Vec<Phase>) -> Self {
        Self { phases }
    }

    /// Checks the structural invariants of the table.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the table is empty, any weight is not
    /// strictly positive and finite, any phase has zero sub-steps, or two
    /// phases share an id.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.phases.is_empty() {
            return Err(ConfigError::EmptyPhaseTable);
        }

        let mut seen = HashSet::new();
        for phase in &self.phases {
            if !(phase.weight.is_finite() && phase.weight > 0.0) {
                return Err(ConfigError::NonPositiveWeight {
                    phase: phase.id.clone(),
                    weight: phase.weight,
                });
            }
            if phase.sub_steps == 0 {
                return Err(ConfigError::ZeroSubSteps {
                    phase: phase.id.clone(),
                });
            }
            if !seen.insert(phase.id.as_str()) {
                return Err(ConfigError::DuplicatePhaseId {
                    id: phase.id.clone(),
                });
            }
        }

        Ok(())
    }

    /// Returns the phases in execution order.
    #[must_use]
    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// Returns the phase at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Phase> {
        self.phases.get(index)
    }

    /// Returns the number of phases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.phases.len()
    }

    /// Returns whether the table has no phases.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// Returns the sum of all phase weights.
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.phases.iter().map(|p| p.weight).sum()
    }

    /// Returns the total number of sub-steps across all phases.
    #[must_use]
    pub fn total_sub_steps(&self) -> u64 {
        self.phases.iter().map(|p| u64::from(p.sub_steps)).sum()
    }
}
