//! Error types for Stagecue
//!
//! Per-domain error enums aggregated into a single top-level type that
//! maps onto CLI exit codes.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `stagecue` CLI operations.
///
/// These codes follow Unix conventions.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Engine error (double start, invalid lifecycle use)
    pub const ENGINE_ERROR: i32 = 5;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for Stagecue operations.
///
/// Aggregates all domain-specific errors and provides a unified
/// interface for error handling and exit code mapping.
#[derive(Debug, Error)]
pub enum StagecueError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Engine lifecycle error
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Line source error
    #[error(transparent)]
    Source(#[from] SourceError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl StagecueError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Json(_) | Self::Yaml(_) => ExitCode::CONFIG_ERROR,
            Self::Engine(_) => ExitCode::ENGINE_ERROR,
            Self::Source(_) => ExitCode::ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
///
/// Covers both structural problems with a phase table (rejected before a
/// run can start) and file-level failures from the sequence loader.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Phase table has no phases
    #[error("phase table is empty")]
    EmptyPhaseTable,

    /// Phase weight is zero, negative, or not finite
    #[error("non-positive weight {weight} for phase '{phase}'")]
    NonPositiveWeight {
        /// Id of the offending phase
        phase: String,
        /// The weight that was provided
        weight: f64,
    },

    /// Phase declares no sub-steps
    #[error("phase '{phase}' has zero sub-steps")]
    ZeroSubSteps {
        /// Id of the offending phase
        phase: String,
    },

    /// Two phases share the same id
    #[error("duplicate phase id '{id}'")]
    DuplicatePhaseId {
        /// The repeated id
        id: String,
    },

    /// Per-phase delay string could not be parsed
    #[error("invalid delay '{value}' for phase '{phase}': {message}")]
    InvalidDelay {
        /// Id of the offending phase
        phase: String,
        /// The delay string that was provided
        value: String,
        /// Error message from the parser
        message: String,
    },

    /// YAML parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path to the sequence file
        path: PathBuf,
        /// Error message from the parser
        message: String,
    },

    /// Referenced sequence file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Sequence validation failed
    #[error("validation failed for {path}")]
    ValidationError {
        /// Origin of the sequence (file path or label)
        path: String,
        /// List of validation issues found
        errors: Vec<ValidationIssue>,
    },
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single validation issue found during sequence validation.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the problematic field (e.g., "phases[2].weight")
    pub path: String,
    /// Description of the validation issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Error - validation failure that prevents the sequence from running
    Error,
    /// Warning - potential issue that does not prevent the run
    Warning,
}

// ============================================================================
// Engine Errors
// ============================================================================

/// Engine lifecycle errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// `start` was called on an engine that already has a run.
    ///
    /// The second call is rejected; the original run is unaffected.
    #[error("engine already started; runs are single-shot")]
    DoubleStart,
}

// ============================================================================
// Line Source Errors
// ============================================================================

/// Line source errors.
///
/// These are absorbed by the engine (the phase fallback line is used
/// instead) and never interrupt a run.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The external generator rejected or was unreachable
    #[error("line source unavailable: {0}")]
    Unavailable(String),

    /// No candidate lines are configured for the phase
    #[error("no candidate lines for phase '{0}'")]
    NoCandidates(String),
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for Stagecue operations.
pub type Result<T> = std::result::Result<T, StagecueError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitCode::SUCCESS, 0);
        assert_eq!(ExitCode::ERROR, 1);
        assert_eq!(ExitCode::CONFIG_ERROR, 2);
        assert_eq!(ExitCode::IO_ERROR, 3);
        assert_eq!(ExitCode::ENGINE_ERROR, 5);
        assert_eq!(ExitCode::USAGE_ERROR, 64);
        assert_eq!(ExitCode::INTERRUPTED, 130);
        assert_eq!(ExitCode::TERMINATED, 143);
    }

    #[test]
    fn test_config_error_exit_code() {
        let err: StagecueError = ConfigError::EmptyPhaseTable.into();
        assert_eq!(err.exit_code(), ExitCode::CONFIG_ERROR);
    }

    #[test]
    fn test_engine_error_exit_code() {
        let err: StagecueError = EngineError::DoubleStart.into();
        assert_eq!(err.exit_code(), ExitCode::ENGINE_ERROR);
    }

    #[test]
    fn test_source_error_exit_code() {
        let err: StagecueError = SourceError::Unavailable("down".to_string()).into();
        assert_eq!(err.exit_code(), ExitCode::ERROR);
    }

    #[test]
    fn test_io_error_exit_code() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let err: StagecueError = io_err.into();
        assert_eq!(err.exit_code(), ExitCode::IO_ERROR);
    }

    #[test]
    fn test_non_positive_weight_display() {
        let err = ConfigError::NonPositiveWeight {
            phase: "rollout".to_string(),
            weight: -3.0,
        };
        assert!(err.to_string().contains("rollout"));
        assert!(err.to_string().contains("-3"));
    }

    #[test]
    fn test_invalid_delay_display() {
        let err = ConfigError::InvalidDelay {
            phase: "verify".to_string(),
            value: "soon".to_string(),
            message: "expected a duration".to_string(),
        };
        assert!(err.to_string().contains("soon"));
        assert!(err.to_string().contains("verify"));
    }

    #[test]
    fn test_validation_issue_display() {
        let issue = ValidationIssue {
            path: "phases[0].weight".to_string(),
            message: "weight must be positive".to_string(),
            severity: Severity::Error,
        };
        assert_eq!(
            issue.to_string(),
            "error: weight must be positive at phases[0].weight"
        );
    }

    #[test]
    fn test_validation_issue_warning_display() {
        let issue = ValidationIssue {
            path: "phases".to_string(),
            message: "weights sum to 90".to_string(),
            severity: Severity::Warning,
        };
        assert_eq!(issue.to_string(), "warning: weights sum to 90 at phases");
    }
}
