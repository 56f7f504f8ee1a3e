use crate::error::WalkError;
use ignore::WalkBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A candidate name found while scanning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// Directory containing the entry
    pub parent: PathBuf,

    /// Base name of the entry
    pub name: String,
}

/// Which entries a scan yields
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkOptions {
    /// Descend into subdirectories
    pub recursive: bool,

    /// Yield directories
    pub dirs: bool,

    /// Yield everything that is not a directory
    pub files: bool,
}

/// Lazy scan over the entries below a root
///
/// Symbolic links are never descended into. A link is reported as a directory
/// when its target is one, the same way it would be listed by `ls -F`.
pub struct Walk {
    inner: Option<ignore::Walk>,
    options: WalkOptions,
}

/// Start scanning `root`
///
/// # Arguments
/// * `root` - Directory to scan
/// * `options` - Recursion and entry kind selection
///
/// # Returns
/// * `Result<Walk, WalkError>` - The scan, or an error if `root` cannot be listed
pub fn walk(root: &Path, options: WalkOptions) -> Result<Walk, WalkError> {
    // The root must be listable; failures further down are only warned about
    fs::read_dir(root).map_err(|source| WalkError {
        path: root.to_path_buf(),
        source,
    })?;

    if !options.dirs && !options.files {
        return Ok(Walk { inner: None, options });
    }

    let mut builder = WalkBuilder::new(root);
    builder
        .standard_filters(false) // Rename hidden and ignored entries too
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b));
    if !options.recursive {
        builder.max_depth(Some(1));
    }

    Ok(Walk {
        inner: Some(builder.build()),
        options,
    })
}

impl Iterator for Walk {
    type Item = WalkEntry;

    fn next(&mut self) -> Option<WalkEntry> {
        let inner = self.inner.as_mut()?;

        loop {
            let entry = match inner.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "error walking directory");
                    continue;
                }
            };

            // Skip the root itself
            if entry.depth() == 0 {
                continue;
            }

            let is_dir = match entry.file_type() {
                Some(ft) if ft.is_symlink() => entry.path().is_dir(),
                Some(ft) => ft.is_dir(),
                None => false,
            };
            if (is_dir && !self.options.dirs) || (!is_dir && !self.options.files) {
                continue;
            }

            let Some(name) = entry.file_name().to_str() else {
                warn!(path = %entry.path().display(), "skipping name that is not valid UTF-8");
                continue;
            };
            let parent = entry.path().parent().unwrap_or(Path::new("")).to_path_buf();

            debug!(parent = %parent.display(), name, is_dir, "candidate");
            return Some(WalkEntry {
                parent,
                name: name.to_string(),
            });
        }
    }
}
