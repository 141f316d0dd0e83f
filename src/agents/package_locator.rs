use crate::cancel::Cancellation;
use crate::error::{CliError, RegistryError, Result};
use crate::registry::CommandRegistry;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory entry whose presence marks a repository root.
pub const REPOSITORY_MARKER: &str = ".git";

/// PackageLocator maps a command name to the repository that ships it.
pub struct PackageLocator<'a> {
    registry: &'a dyn CommandRegistry,
    self_name: String,
}

impl<'a> PackageLocator<'a> {
    pub fn new(registry: &'a dyn CommandRegistry, self_name: impl Into<String>) -> Self {
        Self {
            registry,
            self_name: self_name.into(),
        }
    }

    /// Resolve `name` to its executable chain.
    pub fn resolve_exec(&self, name: &str, cancel: &Cancellation) -> Result<Vec<PathBuf>> {
        if name.is_empty() {
            return Err(self.not_found(name));
        }

        match self.registry.find_exec(name, cancel) {
            Ok(exec) if !exec.is_empty() => Ok(exec),
            Ok(_) | Err(RegistryError::NotFound(_)) => Err(self.not_found(name)),
            Err(RegistryError::Cancelled) => Err(CliError::Cancelled),
            Err(err) => {
                debug!("Lookup of {name} failed: {err}");
                Err(self.not_found(name))
            }
        }
    }

    /// Resolve `name` all the way to its repository root.
    pub fn locate(&self, name: &str, cancel: &Cancellation) -> Result<PathBuf> {
        let exec = self.resolve_exec(name, cancel)?;
        Self::package_dir_for(&exec).ok_or_else(|| CliError::NotAPackageInstall {
            self_name: self.self_name.clone(),
        })
    }

    pub fn package_dir_for(exec: &[PathBuf]) -> Option<PathBuf> {
        Self::search_start(exec).and_then(find_package_dir)
    }

    /// Directory the repository search starts from: the parent of the last
    /// segment, so that a dispatcher or interpreter is skipped in favor of the script.
    pub fn search_start(exec: &[PathBuf]) -> Option<&Path> {
        exec.last().and_then(|target| target.parent())
    }

    fn not_found(&self, name: &str) -> CliError {
        CliError::CommandNotFound {
            name: name.to_string(),
            self_name: self.self_name.clone(),
        }
    }
}

/// Walks from `start` towards the filesystem root, returning the first
/// directory that contains a repository marker.
pub fn find_package_dir(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .filter(|dir| !dir.as_os_str().is_empty())
        .find(|dir| dir.join(REPOSITORY_MARKER).exists())
        .map(Path::to_path_buf)
}
