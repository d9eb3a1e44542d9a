//! Sequence configuration.
//!
//! Loads and validates YAML sequence definitions and converts them into
//! the runtime pieces a run needs: a phase table, a delay schedule, and a
//! template line source.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::DEFAULT_LOG_CAPACITY;
use crate::error::{ConfigError, Severity, ValidationIssue};
use crate::plan::{Phase, PhaseTable};
use crate::schedule::{DEFAULT_SUB_STEP_DELAY, PerPhaseDelay};
use crate::source::TemplateSource;

const fn default_log_capacity() -> usize {
    DEFAULT_LOG_CAPACITY
}

/// A complete sequence definition as loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SequenceSpec {
    /// Display name of the sequence.
    pub name: String,

    /// Log stream capacity for the run.
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,

    /// Seed for flavor-line selection.
    #[serde(default)]
    pub seed: u64,

    /// Ordered phase definitions.
    pub phases: Vec<PhaseSpec>,
}

/// One phase of a sequence definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhaseSpec {
    /// Stable identifier (must be unique).
    pub id: String,

    /// Human-readable label.
    pub label: String,

    /// Relative progress weight (must be > 0).
    pub weight: f64,

    /// Number of sub-steps (must be >= 1).
    pub sub_steps: u32,

    /// Pause before each sub-step, as a human-readable duration
    /// (e.g. `250ms`, `1s`). Defaults to the engine-wide default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<String>,

    /// Candidate flavor lines for this phase.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<String>,

    /// Static text substituted when line generation fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}

/// Loads a sequence definition from a YAML file.
///
/// # Errors
///
/// Returns [`ConfigError::MissingFile`] if `path` does not exist, or
/// [`ConfigError::ParseError`] if the file cannot be read or parsed.
pub fn load(path: &Path) -> Result<SequenceSpec, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::MissingFile {
            path: path.to_path_buf(),
        });
    }
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    serde_yaml::from_str(&raw).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

impl SequenceSpec {
    /// Checks the definition and returns every issue found.
    ///
    /// Structural violations are errors; suspicious-but-runnable shapes
    /// (weights not summing to 100, a phase with no candidate lines) are
    /// warnings.
    #[must_use]
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if self.phases.is_empty() {
            issues.push(ValidationIssue {
                path: "phases".to_string(),
                message: "sequence has no phases".to_string(),
                severity: Severity::Error,
            });
            return issues;
        }

        let mut seen = std::collections::HashSet::new();
        for (i, phase) in self.phases.iter().enumerate() {
            if !(phase.weight.is_finite() && phase.weight > 0.0) {
                issues.push(ValidationIssue {
                    path: format!("phases[{i}].weight"),
                    message: format!("weight must be positive, got {}", phase.weight),
                    severity: Severity::Error,
                });
            }
            if phase.sub_steps == 0 {
                issues.push(ValidationIssue {
                    path: format!("phases[{i}].sub_steps"),
                    message: "phase must have at least one sub-step".to_string(),
                    severity: Severity::Error,
                });
            }
            if !seen.insert(phase.id.as_str()) {
                issues.push(ValidationIssue {
                    path: format!("phases[{i}].id"),
                    message: format!("duplicate phase id '{}'", phase.id),
                    severity: Severity::Error,
                });
            }
            if let Some(ref delay) = phase.delay {
                if let Err(e) = humantime::parse_duration(delay) {
                    issues.push(ValidationIssue {
                        path: format!("phases[{i}].delay"),
                        message: format!("invalid duration '{delay}': {e}"),
                        severity: Severity::Error,
                    });
                }
            }
            if phase.lines.is_empty() {
                issues.push(ValidationIssue {
                    path: format!("phases[{i}].lines"),
                    message: "no candidate lines; every sub-step will use the fallback"
                        .to_string(),
                    severity: Severity::Warning,
                });
            }
        }

        let total: f64 = self.phases.iter().map(|p| p.weight).sum();
        if total.is_finite() && (total - 100.0).abs() > 1e-6 {
            issues.push(ValidationIssue {
                path: "phases".to_string(),
                message: format!("weights sum to {total}, not 100"),
                severity: Severity::Warning,
            });
        }

        issues
    }

    /// Validates and fails on errors (or on warnings too, when `strict`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] carrying every issue when
    /// the definition is rejected.
    pub fn ensure_valid(&self, origin: &str, strict: bool) -> Result<(), ConfigError> {
        let issues = self.validate();
        let rejected = issues
            .iter()
            .any(|i| strict || i.severity == Severity::Error);
        if rejected {
            return Err(ConfigError::ValidationError {
                path: origin.to_string(),
                errors: issues,
            });
        }
        Ok(())
    }

    /// Builds the phase table for this sequence.
    #[must_use]
    pub fn to_phase_table(&self) -> PhaseTable {
        PhaseTable::new(
            self.phases
                .iter()
                .map(|p| Phase {
                    id: p.id.clone(),
                    label: p.label.clone(),
                    weight: p.weight,
                    sub_steps: p.sub_steps,
                    fallback: p.fallback.clone(),
                })
                .collect(),
        )
    }

    /// Builds the delay schedule for this sequence.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidDelay`] if a phase's delay string
    /// cannot be parsed.
    pub fn to_schedule(&self) -> Result<PerPhaseDelay, ConfigError> {
        let mut delays = Vec::with_capacity(self.phases.len());
        for phase in &self.phases {
            let delay = match phase.delay {
                Some(ref value) => {
                    Some(humantime::parse_duration(value).map_err(|e| {
                        ConfigError::InvalidDelay {
                            phase: phase.id.clone(),
                            value: value.clone(),
                            message: e.to_string(),
                        }
                    })?)
                }
                None => None,
            };
            delays.push(delay);
        }
        Ok(PerPhaseDelay::new(delays, DEFAULT_SUB_STEP_DELAY))
    }

    /// Builds the seeded template line source for this sequence.
    ///
    /// `seed_override` takes precedence over the configured seed.
    #[must_use]
    pub fn to_source(&self, seed_override: Option<u64>) -> TemplateSource {
        let lines: HashMap<String, Vec<String>> = self
            .phases
            .iter()
            .map(|p| (p.id.clone(), p.lines.clone()))
            .collect();
        TemplateSource::new(lines, seed_override.unwrap_or(self.seed))
    }

    /// Returns the parsed delay for the phase at `index`, if configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidDelay`] if the delay string cannot
    /// be parsed.
    pub fn phase_delay(&self, index: usize) -> Result<Option<Duration>, ConfigError> {
        let Some(phase) = self.phases.get(index) else {
            return Ok(None);
        };
        match phase.delay {
            Some(ref value) => humantime::parse_duration(value)
                .map(Some)
                .map_err(|e| ConfigError::InvalidDelay {
                    phase: phase.id.clone(),
                    value: value.clone(),
                    message: e.to_string(),
                }),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const GOOD_YAML: &str = r"
name: deploy-pipeline
log_capacity: 64
seed: 7
phases:
  - id: preflight
    label: Preflight checks
    weight: 40
    sub_steps: 2
    delay: 50ms
    lines:
      - Validating release manifest
  - id: rollout
    label: Progressive rollout
    weight: 60
    sub_steps: 3
    lines:
      - Shifting traffic to canary
    fallback: Rollout in progress
";

    fn parse(yaml: &str) -> SequenceSpec {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_parse_good_sequence() {
        let spec = parse(GOOD_YAML);
        assert_eq!(spec.name, "deploy-pipeline");
        assert_eq!(spec.log_capacity, 64);
        assert_eq!(spec.seed, 7);
        assert_eq!(spec.phases.len(), 2);
        assert_eq!(spec.phases[0].delay.as_deref(), Some("50ms"));
        assert!(spec.phases[1].delay.is_none());
    }

    #[test]
    fn test_defaults_applied() {
        let spec = parse(
            r"
name: minimal
phases:
  - id: only
    label: Only phase
    weight: 100
    sub_steps: 1
    lines: [one line]
",
        );
        assert_eq!(spec.log_capacity, DEFAULT_LOG_CAPACITY);
        assert_eq!(spec.seed, 0);
    }

    #[test]
    fn test_good_sequence_validates_clean() {
        let issues = parse(GOOD_YAML).validate();
        assert!(issues.is_empty(), "unexpected issues: {issues:?}");
    }

    #[test]
    fn test_zero_weight_is_error() {
        let mut spec = parse(GOOD_YAML);
        spec.phases[0].weight = 0.0;
        let issues = spec.validate();
        assert!(
            issues
                .iter()
                .any(|i| i.severity == Severity::Error && i.path == "phases[0].weight")
        );
    }

    #[test]
    fn test_zero_sub_steps_is_error() {
        let mut spec = parse(GOOD_YAML);
        spec.phases[1].sub_steps = 0;
        let issues = spec.validate();
        assert!(
            issues
                .iter()
                .any(|i| i.severity == Severity::Error && i.path == "phases[1].sub_steps")
        );
    }

    #[test]
    fn test_duplicate_id_is_error() {
        let mut spec = parse(GOOD_YAML);
        spec.phases[1].id = "preflight".to_string();
        let issues = spec.validate();
        assert!(
            issues
                .iter()
                .any(|i| i.severity == Severity::Error && i.message.contains("duplicate"))
        );
    }

    #[test]
    fn test_bad_delay_is_error() {
        let mut spec = parse(GOOD_YAML);
        spec.phases[0].delay = Some("soon".to_string());
        let issues = spec.validate();
        assert!(
            issues
                .iter()
                .any(|i| i.severity == Severity::Error && i.path == "phases[0].delay")
        );
        assert!(matches!(
            spec.to_schedule(),
            Err(ConfigError::InvalidDelay { .. })
        ));
    }

    #[test]
    fn test_empty_lines_is_warning() {
        let mut spec = parse(GOOD_YAML);
        spec.phases[0].lines.clear();
        let issues = spec.validate();
        assert!(
            issues
                .iter()
                .any(|i| i.severity == Severity::Warning && i.path == "phases[0].lines")
        );
    }

    #[test]
    fn test_weight_sum_warning() {
        let mut spec = parse(GOOD_YAML);
        spec.phases[0].weight = 10.0;
        let issues = spec.validate();
        assert!(
            issues
                .iter()
                .any(|i| i.severity == Severity::Warning && i.message.contains("sum"))
        );
    }

    #[test]
    fn test_empty_phases_is_error() {
        let spec: SequenceSpec = serde_yaml::from_str("name: hollow\nphases: []\n").unwrap();
        let issues = spec.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Error);
    }

    #[test]
    fn test_ensure_valid_strict_promotes_warnings() {
        let mut spec = parse(GOOD_YAML);
        spec.phases[0].weight = 10.0; // sum warning only
        assert!(spec.ensure_valid("test", false).is_ok());
        assert!(matches!(
            spec.ensure_valid("test", true),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_to_phase_table_round_trip() {
        let spec = parse(GOOD_YAML);
        let table = spec.to_phase_table();
        assert!(table.validate().is_ok());
        assert_eq!(table.len(), 2);
        assert_eq!(table.phases()[1].fallback.as_deref(), Some("Rollout in progress"));
        assert_eq!(table.total_sub_steps(), 5);
    }

    #[test]
    fn test_to_schedule_overrides_and_defaults() {
        use crate::schedule::DelaySchedule;

        let spec = parse(GOOD_YAML);
        let schedule = spec.to_schedule().unwrap();
        assert_eq!(schedule.delay(0, 0), Duration::from_millis(50));
        assert_eq!(schedule.delay(1, 0), DEFAULT_SUB_STEP_DELAY);
    }

    #[test]
    fn test_phase_delay_accessor() {
        let spec = parse(GOOD_YAML);
        assert_eq!(
            spec.phase_delay(0).unwrap(),
            Some(Duration::from_millis(50))
        );
        assert_eq!(spec.phase_delay(1).unwrap(), None);
        assert_eq!(spec.phase_delay(9).unwrap(), None);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load(Path::new("/nonexistent/sequence.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(GOOD_YAML.as_bytes()).unwrap();
        let spec = load(file.path()).unwrap();
        assert_eq!(spec.name, "deploy-pipeline");
    }

    #[test]
    fn test_load_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"name: [broken").unwrap();
        let err = load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<SequenceSpec, _> = serde_yaml::from_str(
            r"
name: extra
surprise: true
phases: []
",
        );
        assert!(result.is_err());
    }
}
