use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;

use crate::error::GrepAstError;

/// Per-directory ignore file, same syntax as `.gitignore`.
pub const AST_IGNORE_FILE: &str = ".astignore";

// Build output and dependency trees, never worth parsing.
pub(crate) const SKIP_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "target",
    "dist",
    "build",
    "__pycache__",
    "vendor",
    ".venv",
    "venv",
    "testdata",
    ".next",
    ".cache",
    ".tox",
    ".mypy_cache",
    ".pytest_cache",
    ".gradle",
    ".idea",
];

/// Compile `--exclude` globs. Each is matched against paths relative to the
/// walk root and against bare file names.
pub fn exclude_set(patterns: &[String]) -> Result<GlobSet, GrepAstError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Every file under `roots`, sorted by path within each root.
///
/// Honors `.gitignore` and `.astignore`, skips hidden entries and known junk
/// directories. A root that is itself a file is returned as given.
pub fn collect_files(roots: &[PathBuf], excludes: &GlobSet) -> Result<Vec<PathBuf>, GrepAstError> {
    let mut files = Vec::new();
    for root in roots {
        if root.is_file() {
            files.push(root.clone());
            continue;
        }
        if !root.exists() {
            return Err(GrepAstError::Io {
                path: root.clone(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }

        let walker = WalkBuilder::new(root)
            .hidden(true)
            .git_ignore(true)
            .git_global(false)
            .git_exclude(true)
            .require_git(false)
            .add_custom_ignore_filename(AST_IGNORE_FILE)
            .sort_by_file_name(std::cmp::Ord::cmp)
            .filter_entry(|entry| {
                if entry.file_type().is_some_and(|ft| ft.is_dir()) {
                    if let Some(name) = entry.file_name().to_str() {
                        return !SKIP_DIRS.contains(&name);
                    }
                }
                true
            })
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("skipping unreadable entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            if is_excluded(entry.path(), root, excludes) {
                continue;
            }
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn is_excluded(path: &Path, root: &Path, excludes: &GlobSet) -> bool {
    if excludes.is_empty() {
        return false;
    }
    let relative = path.strip_prefix(root).unwrap_or(path);
    excludes.is_match(relative) || path.file_name().is_some_and(|name| excludes.is_match(name))
}
