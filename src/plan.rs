use crate::error::SubstitutionError;
use crate::replacer::Rewrite;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::info;

/// One proposed rename inside a single directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameRecord {
    pub parent: PathBuf,
    pub old_name: String,
    pub new_name: String,
    pub old_path: PathBuf,
    pub new_path: PathBuf,
}

impl RenameRecord {
    pub fn new(parent: &Path, old_name: &str, new_name: &str) -> Self {
        Self {
            parent: parent.to_path_buf(),
            old_name: old_name.to_string(),
            new_name: new_name.to_string(),
            old_path: parent.join(old_name),
            new_path: parent.join(new_name),
        }
    }
}

/// Ordered renames for one run, plus any substitution failures seen while
/// building it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenamePlan {
    records: Vec<RenameRecord>,
    substitution_errors: Vec<SubstitutionError>,
}

impl RenamePlan {
    pub fn records(&self) -> &[RenameRecord] {
        &self.records
    }

    pub fn substitution_errors(&self) -> &[SubstitutionError] {
        &self.substitution_errors
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn old_paths(&self) -> BTreeSet<&Path> {
        self.records.iter().map(|r| r.old_path.as_path()).collect()
    }

    pub fn new_paths(&self) -> BTreeSet<&Path> {
        self.records.iter().map(|r| r.new_path.as_path()).collect()
    }

    /// Paths that are both a source and a destination
    pub fn collisions(&self) -> BTreeSet<&Path> {
        let old = self.old_paths();
        self.new_paths()
            .into_iter()
            .filter(|p| old.contains(p))
            .collect()
    }

    fn push(&mut self, rewrite: Rewrite) {
        if let Some(error) = rewrite.error {
            self.substitution_errors.push(error);
        }
        self.records.push(rewrite.record);
    }
}

/// Collect rewrites into a plan, keeping encounter order
///
/// # Arguments
/// * `rewrites` - Matches in walk order
///
/// # Returns
/// * `RenamePlan` - Records plus the substitution failures among them
pub fn build_plan(rewrites: impl IntoIterator<Item = Rewrite>) -> RenamePlan {
    let mut plan = RenamePlan::default();
    for rewrite in rewrites {
        plan.push(rewrite);
    }
    plan
}

/// Path counts reported before validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanSummary {
    pub old: usize,
    pub old_unique: usize,
    pub new: usize,
    pub new_unique: usize,
    pub same: usize,
}

impl PlanSummary {
    pub fn of(plan: &RenamePlan) -> Self {
        Self {
            old: plan.len(),
            old_unique: plan.old_paths().len(),
            new: plan.len(),
            new_unique: plan.new_paths().len(),
            same: plan.collisions().len(),
        }
    }

    pub fn log(&self) {
        info!("{} old", self.old);
        info!("{} old (unique)", self.old_unique);
        info!("{} new", self.new);
        info!("{} new (unique)", self.new_unique);
        info!("{} same", self.same);
    }
}
