use crate::error::RenameError;
use crate::plan::RenamePlan;
use std::fs;
use std::io;
use std::path::Path;
use std::process::Command;
use tracing::info;

/// Primitive that moves a single path
pub trait Mover {
    /// Short label used when logging each move
    fn label(&self) -> &str {
        "mv"
    }

    fn move_path(&self, old: &Path, new: &Path) -> io::Result<()>;
}

impl<F> Mover for F
where
    F: Fn(&Path, &Path) -> io::Result<()>,
{
    fn move_path(&self, old: &Path, new: &Path) -> io::Result<()> {
        self(old, new)
    }
}

/// Plain filesystem rename
#[derive(Debug, Clone, Copy, Default)]
pub struct FsMover;

impl Mover for FsMover {
    fn move_path(&self, old: &Path, new: &Path) -> io::Result<()> {
        fs::rename(old, new)
    }
}

/// Rename through `git mv`, run from the directory holding the old path
///
/// Both paths are passed relative to that directory, so relative plans
/// resolve once.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitMover;

impl Mover for GitMover {
    fn label(&self) -> &str {
        "git mv"
    }

    fn move_path(&self, old: &Path, new: &Path) -> io::Result<()> {
        let mut command = Command::new("git");
        command.arg("mv");
        match old.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                let old_name = old.file_name().ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("no file name in {}", old.display()),
                    )
                })?;
                let new_name = new.strip_prefix(parent).map_err(|_| {
                    io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("{} is not in {}", new.display(), parent.display()),
                    )
                })?;
                command.arg(old_name).arg(new_name).current_dir(parent);
            }
            None => {
                command.arg(old).arg(new);
            }
        }

        let output = command.output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(io::Error::other(format!("git mv failed: {}", stderr.trim())));
        }
        Ok(())
    }
}

/// Pick the move primitive
///
/// # Arguments
/// * `git` - Use `git mv` instead of a plain rename
pub fn for_git(git: bool) -> Box<dyn Mover> {
    if git {
        Box::new(GitMover)
    } else {
        Box::new(FsMover)
    }
}

/// Apply a validated plan in order
///
/// Stops at the first failure; earlier renames stay applied.
///
/// # Arguments
/// * `plan` - Plan that already passed validation
/// * `mover` - Move primitive
///
/// # Returns
/// * `Result<usize, RenameError>` - Number of renames applied
pub fn execute(plan: &RenamePlan, mover: &dyn Mover) -> Result<usize, RenameError> {
    info!("moving paths!");
    let total = plan.len();

    for (completed, record) in plan.records().iter().enumerate() {
        info!(
            "{} {} -> {}",
            mover.label(),
            record.old_path.display(),
            record.new_path.display()
        );
        mover
            .move_path(&record.old_path, &record.new_path)
            .map_err(|source| RenameError::Execution {
                completed,
                total,
                old: record.old_path.clone(),
                new: record.new_path.clone(),
                source,
            })?;
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{build_plan, RenameRecord};
    use crate::replacer::Rewrite;
    use std::cell::RefCell;
    use std::fs::File;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn plan(parent: &Path, pairs: &[(&str, &str)]) -> RenamePlan {
        build_plan(pairs.iter().map(|(old, new)| Rewrite {
            record: RenameRecord::new(parent, old, new),
            error: None,
        }))
    }

    #[test]
    fn test_fs_mover_applies_in_order() {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("a.txt")).unwrap();
        File::create(dir.path().join("b.txt")).unwrap();

        let plan = plan(dir.path(), &[("a.txt", "a.bak"), ("b.txt", "b.bak")]);
        assert_eq!(execute(&plan, &FsMover).unwrap(), 2);

        assert!(dir.path().join("a.bak").exists());
        assert!(dir.path().join("b.bak").exists());
        assert!(!dir.path().join("a.txt").exists());
        assert!(!dir.path().join("b.txt").exists());
    }

    #[test]
    fn test_closure_mover_sees_plan_order() {
        let seen = RefCell::new(Vec::new());
        let recorder = |old: &Path, new: &Path| -> io::Result<()> {
            seen.borrow_mut().push((old.to_path_buf(), new.to_path_buf()));
            Ok(())
        };
        let plan = plan(Path::new("/top"), &[("b", "c"), ("a", "d")]);
        execute(&plan, &recorder).unwrap();
        assert_eq!(
            seen.into_inner(),
            vec![
                (PathBuf::from("/top/b"), PathBuf::from("/top/c")),
                (PathBuf::from("/top/a"), PathBuf::from("/top/d")),
            ]
        );
    }

    #[test]
    fn test_failure_stops_immediately() {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("a")).unwrap();
        File::create(dir.path().join("c")).unwrap();

        // "b" does not exist, so the second rename fails
        let plan = plan(dir.path(), &[("a", "a2"), ("b", "b2"), ("c", "c2")]);
        let err = execute(&plan, &FsMover).unwrap_err();
        match err {
            RenameError::Execution {
                completed,
                total,
                old,
                new,
                ..
            } => {
                assert_eq!(completed, 1);
                assert_eq!(total, 3);
                assert_eq!(old, dir.path().join("b"));
                assert_eq!(new, dir.path().join("b2"));
            }
            other => panic!("unexpected error: {}", other),
        }

        assert!(dir.path().join("a2").exists());
        assert!(dir.path().join("c").exists());
        assert!(!dir.path().join("c2").exists());
    }

    #[test]
    fn test_labels() {
        assert_eq!(FsMover.label(), "mv");
        assert_eq!(GitMover.label(), "git mv");
        assert_eq!(for_git(true).label(), "git mv");
        assert_eq!(for_git(false).label(), "mv");
    }

    fn git(dir: &Path, args: &[&str]) -> bool {
        Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    #[test]
    fn test_git_mover_renames_nested_entries() {
        let dir = TempDir::new().unwrap();
        if !git(dir.path(), &["init", "-q"]) {
            // git is not installed
            return;
        }
        fs::create_dir(dir.path().join("sub")).unwrap();
        File::create(dir.path().join("sub/a.txt")).unwrap();
        assert!(git(dir.path(), &["add", "."]));

        let plan = plan(&dir.path().join("sub"), &[("a.txt", "a.bak")]);
        assert_eq!(execute(&plan, &GitMover).unwrap(), 1);
        assert!(dir.path().join("sub/a.bak").exists());
        assert!(!dir.path().join("sub/a.txt").exists());
    }

    #[test]
    fn test_git_mover_outside_repository_fails() {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("a")).unwrap();
        // Either git is missing or the directory is not a work tree
        assert!(GitMover
            .move_path(&dir.path().join("a"), &dir.path().join("b"))
            .is_err());
        assert!(dir.path().join("a").exists());
    }
}
