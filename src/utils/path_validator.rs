use crate::agents::package_locator::REPOSITORY_MARKER;
use crate::error::{CliError, Result};
use std::path::{Path, PathBuf};

const SYSTEM_DIRS: &[&str] = &["/etc", "/sys", "/proc", "/dev", "/boot"];

/// Path checks applied before touching a package directory on disk.
pub struct PathValidator;

impl PathValidator {
    /// Resolves `path` to the canonical root of a package repository.
    ///
    /// The directory must exist, carry a `.git` marker and sit outside the
    /// system trees a package never lives in.
    pub fn validate_repository_root(path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        let root = path.canonicalize().map_err(|e| {
            CliError::InvalidPath(format!("Cannot resolve '{}': {e}", path.display()))
        })?;

        if let Some(system_dir) = SYSTEM_DIRS.iter().map(Path::new).find(|dir| {
            root.starts_with(dir)
                || dir
                    .canonicalize()
                    .is_ok_and(|resolved| root.starts_with(resolved))
        }) {
            return Err(CliError::InvalidPath(format!(
                "'{}' is under system directory '{}'",
                root.display(),
                system_dir.display()
            )));
        }

        if !root.is_dir() {
            return Err(CliError::InvalidPath(format!(
                "'{}' is not a directory",
                root.display()
            )));
        }

        if !root.join(REPOSITORY_MARKER).exists() {
            return Err(CliError::InvalidPath(format!(
                "'{}' has no {REPOSITORY_MARKER} marker",
                root.display()
            )));
        }

        Ok(root)
    }

    /// Ensures a file that is about to be written lands inside `base_dir`.
    ///
    /// The file itself may not exist yet, so its parent is canonicalised instead.
    pub fn validate_output_path(
        file_path: impl AsRef<Path>,
        base_dir: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        let file_path = file_path.as_ref();
        let base_dir = base_dir.as_ref();

        let file_name = file_path.file_name().ok_or_else(|| {
            CliError::InvalidPath(format!("'{}' has no file name", file_path.display()))
        })?;
        let parent = file_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let canonical_parent = parent.canonicalize().map_err(|e| {
            CliError::InvalidPath(format!("Invalid directory '{}': {e}", parent.display()))
        })?;

        let canonical_base = base_dir.canonicalize().map_err(|e| {
            CliError::InvalidPath(format!(
                "Invalid base directory '{}': {e}",
                base_dir.display()
            ))
        })?;

        if !canonical_parent.starts_with(&canonical_base) {
            return Err(CliError::InvalidPath(
                "File path is outside the package directory".to_string(),
            ));
        }

        Ok(canonical_parent.join(file_name))
    }
}
