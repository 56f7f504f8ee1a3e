use std::fmt;
use std::path::{Path, PathBuf};

use tracing::error;

use crate::error::SubstitutionError;
use crate::plan::RenamePlan;

/// A single failed safety check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    NoOldPaths,
    NoNewPaths,
    OldPathsNotUnique,
    NewPathsNotUnique,
    SamePaths(Vec<PathBuf>),
    OldPathsMissing(Vec<PathBuf>),
    NewPathsExist(Vec<PathBuf>),
    /// Sources below a directory that the same plan renames first
    NestedOldPaths(Vec<PathBuf>),
    Substitution(Vec<SubstitutionError>),
}

impl Violation {
    fn summary(&self) -> &'static str {
        match self {
            Violation::NoOldPaths => "no old paths found",
            Violation::NoNewPaths => "no new paths found",
            Violation::OldPathsNotUnique => "old paths are not unique",
            Violation::NewPathsNotUnique => "new paths are not unique",
            Violation::SamePaths(_) => "some paths are the same",
            Violation::OldPathsMissing(_) => "some old paths do not exist",
            Violation::NewPathsExist(_) => "some new paths already exist",
            Violation::NestedOldPaths(_) => "some old paths are inside renamed directories",
            Violation::Substitution(_) => "some names could not be substituted",
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.summary())?;
        match self {
            Violation::SamePaths(paths)
            | Violation::OldPathsMissing(paths)
            | Violation::NewPathsExist(paths)
            | Violation::NestedOldPaths(paths) => {
                for path in paths {
                    write!(f, "\n\t{}", path.display())?;
                }
            }
            Violation::Substitution(errors) => {
                for error in errors {
                    write!(f, "\n\t{}", error)?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Outcome of [`validate`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }

    /// True when some violation has the given summary line
    pub fn contains(&self, summary: &str) -> bool {
        self.violations.iter().any(|v| v.summary() == summary)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", violation)?;
        }
        Ok(())
    }
}

/// Check a plan against the current filesystem
///
/// Every check runs and every failure is kept. Existence checks look at the
/// entries themselves, so a dangling symlink counts as existing
///
/// # Arguments
/// * `plan` - Plan to check
///
/// # Returns
/// * `ValidationReport` - All violations found, empty when the plan is safe
pub fn validate(plan: &RenamePlan) -> ValidationReport {
    let records = plan.records();
    let old_paths = plan.old_paths();
    let new_paths = plan.new_paths();
    let mut violations = Vec::new();

    if records.is_empty() {
        violations.push(Violation::NoOldPaths);
    }
    if new_paths.is_empty() {
        violations.push(Violation::NoNewPaths);
    }
    if old_paths.len() != records.len() {
        violations.push(Violation::OldPathsNotUnique);
    }
    if new_paths.len() != records.len() {
        violations.push(Violation::NewPathsNotUnique);
    }

    let same: Vec<PathBuf> = plan.collisions().into_iter().map(Path::to_path_buf).collect();
    if !same.is_empty() {
        violations.push(Violation::SamePaths(same));
    }

    let missing: Vec<PathBuf> = records
        .iter()
        .filter(|r| !exists(&r.old_path))
        .map(|r| r.old_path.clone())
        .collect();
    if !missing.is_empty() {
        violations.push(Violation::OldPathsMissing(missing));
    }

    let existing: Vec<PathBuf> = records
        .iter()
        .filter(|r| exists(&r.new_path))
        .map(|r| r.new_path.clone())
        .collect();
    if !existing.is_empty() {
        violations.push(Violation::NewPathsExist(existing));
    }

    let nested: Vec<PathBuf> = records
        .iter()
        .filter(|r| {
            r.old_path
                .ancestors()
                .skip(1)
                .any(|ancestor| old_paths.contains(ancestor))
        })
        .map(|r| r.old_path.clone())
        .collect();
    if !nested.is_empty() {
        violations.push(Violation::NestedOldPaths(nested));
    }

    if !plan.substitution_errors().is_empty() {
        violations.push(Violation::Substitution(plan.substitution_errors().to_vec()));
    }

    for violation in &violations {
        error!("{}", violation);
    }

    ValidationReport { violations }
}

fn exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}
