//! Error types for the planner.

use std::fmt;
use std::path::PathBuf;

/// Errors loading a plan definition.
#[derive(Debug)]
pub enum PlannerError {
    /// The definition file could not be read.
    Read { path: PathBuf, reason: String },
    /// The definition file is not a valid plan document.
    Parse { path: PathBuf, reason: String },
    /// The trigger or backfill in the definition is invalid.
    Definition { reason: String },
}

impl fmt::Display for PlannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, reason } => {
                write!(f, "failed to read '{}': {reason}", path.display())
            }
            Self::Parse { path, reason } => {
                write!(f, "failed to parse '{}': {reason}", path.display())
            }
            Self::Definition { reason } => write!(f, "invalid definition: {reason}"),
        }
    }
}

impl std::error::Error for PlannerError {}
