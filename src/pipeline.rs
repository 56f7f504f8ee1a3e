use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::RenameError;
use crate::mover::{execute, for_git, Mover};
use crate::plan::{build_plan, PlanSummary, RenamePlan};
use crate::replacer::{try_match, MatchOptions, Rewriter};
use crate::scanner::{walk, WalkOptions};
use crate::transform::Expression;
use crate::validate::validate;

/// Fully parsed options for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub pattern: String,
    pub replace: String,
    pub nomatch: Option<String>,
    pub exclude: Vec<String>,
    pub top: PathBuf,
    pub recursive: bool,
    pub dirs: bool,
    pub files: bool,
    pub force: bool,
    pub git: bool,
    pub ignore_case: bool,
    /// Read `replace` as a transform expression over `x`.
    pub func: bool,
}

impl Options {
    /// Options that rename files in `top`, without `--force`
    pub fn new(pattern: &str, replace: &str, top: impl Into<PathBuf>) -> Self {
        Self {
            pattern: pattern.to_string(),
            replace: replace.to_string(),
            nomatch: None,
            exclude: Vec::new(),
            top: top.into(),
            recursive: false,
            dirs: false,
            files: true,
            force: false,
            git: false,
            ignore_case: false,
            func: false,
        }
    }

    pub fn walk_options(&self) -> WalkOptions {
        WalkOptions {
            recursive: self.recursive,
            dirs: self.dirs,
            files: self.files,
        }
    }

    /// Compile the patterns and the rewriter
    pub fn match_options(&self) -> Result<MatchOptions, RenameError> {
        let rewriter = if self.func {
            let expression =
                Expression::parse(&self.replace).map_err(|source| RenameError::Transform {
                    expression: self.replace.clone(),
                    source,
                })?;
            Rewriter::Function(Box::new(expression))
        } else {
            Rewriter::Template(self.replace.clone())
        };

        MatchOptions::new(
            &self.pattern,
            self.nomatch.as_deref(),
            self.ignore_case,
            self.exclude.iter().cloned(),
            rewriter,
        )
    }
}

/// How a successful run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The plan was valid but `force` was off.
    DryRun { planned: usize },
    Renamed { count: usize },
}

/// Fail unless `top` is an existing directory
pub fn check_top(top: &Path) -> Result<(), RenameError> {
    if top.is_dir() {
        Ok(())
    } else {
        Err(RenameError::InvalidTop {
            path: top.to_path_buf(),
        })
    }
}

/// Walk `top` and collect every rename the options ask for
///
/// # Arguments
/// * `top` - Directory to walk
/// * `walk_options` - Entry kinds and depth
/// * `options` - Compiled patterns and rewriter
///
/// # Returns
/// * `Result<RenamePlan, RenameError>` - Every match, including failed substitutions
pub fn plan(top: &Path, walk_options: WalkOptions, options: &MatchOptions) -> Result<RenamePlan, RenameError> {
    let entries = walk(top, walk_options)?;
    Ok(build_plan(entries.filter_map(|entry| try_match(&entry, options))))
}

/// Plan and validate, then apply the plan with `mover` when `force` is set
///
/// # Arguments
/// * `options` - Options for this run
/// * `match_options` - Compiled patterns and rewriter
/// * `mover` - Move primitive used with `force`
///
/// # Returns
/// * `Result<Outcome, RenameError>` - Dry run or rename count
pub fn run_with(options: &Options, match_options: &MatchOptions, mover: &dyn Mover) -> Result<Outcome, RenameError> {
    check_top(&options.top)?;
    apply(options, match_options, mover)
}

/// Run with the patterns from `options` and the mover picked by `git`
///
/// A bad top directory is reported before bad patterns.
pub fn run(options: &Options) -> Result<Outcome, RenameError> {
    check_top(&options.top)?;
    let match_options = options.match_options()?;
    let mover = for_git(options.git);
    apply(options, &match_options, mover.as_ref())
}

fn apply(options: &Options, match_options: &MatchOptions, mover: &dyn Mover) -> Result<Outcome, RenameError> {
    let plan = plan(&options.top, options.walk_options(), match_options)?;
    PlanSummary::of(&plan).log();

    let report = validate(&plan);
    if !report.is_ok() {
        return Err(RenameError::Validation(report));
    }

    if !options.force {
        info!("This was a dry run, please use --force to perform renaming");
        return Ok(Outcome::DryRun {
            planned: plan.len(),
        });
    }

    let count = execute(&plan, mover)?;
    Ok(Outcome::Renamed { count })
}
