use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::transform::ExprError;
use crate::validate::ValidationReport;

/// Everything that can stop a rename run
#[derive(Debug, Error)]
pub enum RenameError {
    /// The top level directory is missing or is not a directory
    #[error("invalid top level directory: {}", path.display())]
    InvalidTop { path: PathBuf },

    /// The primary or `nomatch` expression did not compile
    #[error("invalid {which} expression `{expression}`")]
    Pattern {
        which: &'static str,
        expression: String,
        #[source]
        source: regex::Error,
    },

    /// The function-mode expression did not parse
    #[error("invalid transform expression `{expression}`")]
    Transform {
        expression: String,
        #[source]
        source: ExprError,
    },

    #[error(transparent)]
    Walk(#[from] WalkError),

    /// One or more safety checks failed; nothing was moved
    #[error("invalid configuration: {0}")]
    Validation(ValidationReport),

    /// The move primitive failed partway through the plan
    #[error(
        "failed to move {} to {} ({completed} of {total} renames were applied)",
        old.display(),
        new.display()
    )]
    Execution {
        completed: usize,
        total: usize,
        old: PathBuf,
        new: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The walk root could not be listed
#[derive(Debug, Error)]
#[error("cannot list directory {}", path.display())]
pub struct WalkError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// A single name whose substitution template could not be expanded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: {reason}", path.display())]
pub struct SubstitutionError {
    pub path: PathBuf,
    pub reason: String,
}
