pub mod case;
pub mod error;
pub mod mover;
pub mod pipeline;
pub mod plan;
pub mod replacer;
pub mod scanner;
pub mod transform;
pub mod validate;

pub use error::{RenameError, SubstitutionError, WalkError};
pub use mover::{FsMover, GitMover, Mover};
pub use pipeline::{run, run_with, Options, Outcome};
pub use plan::{build_plan, PlanSummary, RenamePlan, RenameRecord};
pub use replacer::{try_match, MatchOptions, Rewrite, Rewriter};
pub use scanner::{walk, WalkEntry, WalkOptions};
pub use transform::{Expression, NameTransform};
pub use validate::{validate, ValidationReport, Violation};
