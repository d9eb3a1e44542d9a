//! Validate command handler
//!
//! Validates sequence files without running them.

use serde_json::json;

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::config;
use crate::error::{Severity, StagecueError};

/// Validate sequence files.
///
/// # Errors
///
/// Returns a configuration error for the first file that fails to load
/// or validate (with `--strict`, warnings also fail).
pub fn run(args: &ValidateArgs) -> Result<(), StagecueError> {
    for path in &args.files {
        tracing::info!(file = %path.display(), "validating sequence");
        let spec = config::load(path)?;
        let issues = spec.validate();

        match args.format {
            OutputFormat::Human => {
                for issue in &issues {
                    println!("{}: {issue}", path.display());
                }
                if issues.is_empty() {
                    println!("{}: ok", path.display());
                }
            }
            OutputFormat::Json => {
                let report = json!({
                    "file": path.display().to_string(),
                    "issues": issues
                        .iter()
                        .map(|i| {
                            json!({
                                "path": i.path,
                                "message": i.message,
                                "severity": match i.severity {
                                    Severity::Error => "error",
                                    Severity::Warning => "warning",
                                },
                            })
                        })
                        .collect::<Vec<_>>(),
                });
                println!("{report}");
            }
        }

        spec.ensure_valid(&path.display().to_string(), args.strict)?;
        tracing::info!(file = %path.display(), "sequence valid");
    }

    Ok(())
}
