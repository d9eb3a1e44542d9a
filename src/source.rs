//! Log line sources.
//!
//! The flavor text for each sub-step comes from an injected, fallible
//! [`LineSource`]. The engine treats failures as recoverable: the phase's
//! deterministic fallback line is substituted and the run continues, so a
//! flaky or absent external generator never interrupts a sequence.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::SourceError;

/// Produces one log line per sub-step.
#[async_trait]
pub trait LineSource: Send + Sync {
    /// Generates the line for `sub_step` of the phase with `phase_id`.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] when no line can be produced; the engine
    /// recovers with the phase fallback.
    async fn generate_line(&self, phase_id: &str, sub_step: u32) -> Result<String, SourceError>;
}

/// Fixed deterministic lines with no external dependency.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticSource;

#[async_trait]
impl LineSource for StaticSource {
    async fn generate_line(&self, phase_id: &str, sub_step: u32) -> Result<String, SourceError> {
        Ok(format!("{phase_id}: step {} underway", sub_step + 1))
    }
}

/// Selects lines from per-phase candidate lists using a seeded generator.
///
/// Selection order is fully determined by the seed, so runs are
/// reproducible without the external text service.
pub struct TemplateSource {
    lines: HashMap<String, Vec<String>>,
    rng: Mutex<StdRng>,
}

impl TemplateSource {
    /// Creates a source from per-phase candidate lines and a seed.
    #[must_use]
    pub fn new(lines: HashMap<String, Vec<String>>, seed: u64) -> Self {
        Self {
            lines,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

#[async_trait]
impl LineSource for TemplateSource {
    async fn generate_line(&self, phase_id: &str, _sub_step: u32) -> Result<String, SourceError> {
        let candidates = self
            .lines
            .get(phase_id)
            .filter(|lines| !lines.is_empty())
            .ok_or_else(|| SourceError::NoCandidates(phase_id.to_owned()))?;

        let index = self
            .rng
            .lock()
            .expect("template rng lock poisoned")
            .random_range(0..candidates.len());
        Ok(candidates[index].clone())
    }
}

impl std::fmt::Debug for TemplateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateSource")
            .field("phases", &self.lines.len())
            .finish_non_exhaustive()
    }
}
