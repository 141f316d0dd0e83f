use super::report::{BatchMode, BatchReport, UpdateOutcome};
use crate::agents::dependency_installer::DependencyInstaller;
use crate::agents::package_locator::PackageLocator;
use crate::agents::status::StatusReporter;
use crate::agents::version_control::{RepositoryHandle, VcsBackend};
use crate::cancel::Cancellation;
use crate::error::{CliError, Result, VcsError};
use crate::registry::CommandRegistry;
use colored::Colorize;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, trace};

enum SyncResult {
    UpToDate,
    Updated(PathBuf),
}

/// Drives packages through locate, sync, classify and dependency reinstall.
pub struct PackageUpdater<'a> {
    registry: &'a dyn CommandRegistry,
    vcs: &'a dyn VcsBackend,
    installer: &'a dyn DependencyInstaller,
    reporter: &'a dyn StatusReporter,
    self_name: String,
    mode: BatchMode,
    cancel: Cancellation,
}

impl<'a> PackageUpdater<'a> {
    pub fn new(
        registry: &'a dyn CommandRegistry,
        vcs: &'a dyn VcsBackend,
        installer: &'a dyn DependencyInstaller,
        reporter: &'a dyn StatusReporter,
        self_name: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            vcs,
            installer,
            reporter,
            self_name: self_name.into(),
            mode: BatchMode::default(),
            cancel: Cancellation::new(),
        }
    }

    pub fn with_mode(mut self, mode: BatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_cancellation(mut self, cancel: Cancellation) -> Self {
        self.cancel = cancel;
        self
    }

    /// Update every installed command that does not shadow a built-in.
    pub fn update_all(&self, force_binary: bool) -> Result<BatchReport> {
        let builtins: HashSet<String> = self
            .registry
            .builtin_commands()
            .into_iter()
            .flat_map(|group| group.commands)
            .map(|command| command.name.to_lowercase())
            .collect();

        let names: Vec<String> = self
            .registry
            .commands()?
            .into_iter()
            .flat_map(|group| group.commands)
            .map(|command| command.name)
            .filter(|name| !builtins.contains(&name.to_lowercase()))
            .collect();

        debug!("Updating {} installed command(s)", names.len());
        self.update_names(names.iter().map(String::as_str), force_binary)
    }

    /// Update the given commands in order.
    pub fn update_selected<S: AsRef<str>>(
        &self,
        names: &[S],
        force_binary: bool,
    ) -> Result<BatchReport> {
        self.update_names(names.iter().map(AsRef::as_ref), force_binary)
    }

    fn update_names<'n>(
        &self,
        names: impl Iterator<Item = &'n str>,
        force_binary: bool,
    ) -> Result<BatchReport> {
        let mut report = BatchReport::default();
        for name in names {
            self.cancel.check()?;
            match self.update_package(name, force_binary) {
                Err(err) if self.mode == BatchMode::FailFast => return Err(err),
                result => report.push(name, result),
            }
        }
        Ok(report)
    }

    /// Update a single command's package.
    pub fn update_package(&self, name: &str, force_binary: bool) -> Result<UpdateOutcome> {
        let locator = PackageLocator::new(self.registry, self.self_name.as_str());
        let exec = locator.resolve_exec(name, &self.cancel)?;
        debug!(
            "Command found: {}",
            exec.iter()
                .map(|segment| segment.display().to_string())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let message = format!("Attempting to update \"{name}\" command");
        let done_message = format!("{message}... [{}]", "OK".cyan());
        let spinner = self.reporter.start_spinner(&message, &done_message);

        let repo_dir = match self.sync_package(&exec) {
            Ok(SyncResult::Updated(repo_dir)) => {
                self.reporter.stop_ok(spinner);
                repo_dir
            }
            Ok(SyncResult::UpToDate) => {
                self.reporter.stop_warn_ok(spinner);
                self.reporter
                    .info(&format!("command \"{name}\" already up-to-date"));
                return Ok(UpdateOutcome::UpToDate);
            }
            Err(err) => {
                self.reporter.stop_fail(spinner);
                return Err(err);
            }
        };

        if !self
            .installer
            .install_dependencies(&repo_dir, force_binary, &self.cancel)
        {
            trace!("Error updating dependencies");
            return Err(CliError::DependencyInstallFailure(name.to_string()));
        }

        Ok(UpdateOutcome::Updated)
    }

    fn sync_package(&self, exec: &[PathBuf]) -> Result<SyncResult> {
        debug!("Searching for package repo");
        let repo_dir = PackageLocator::package_dir_for(exec).ok_or_else(|| {
            CliError::NotAPackageInstall {
                self_name: self.self_name.clone(),
            }
        })?;
        debug!("Repo found: {}", repo_dir.display());

        let repo = self.vcs.open(&repo_dir, &self.cancel).map_err(|err| {
            debug!("Unable to open repo: {err}");
            match err {
                VcsError::Cancelled => CliError::Cancelled,
                err => CliError::BrokenPackageRepo(err),
            }
        })?;

        let before = repo.current_head(&self.cancel).map_err(fetch_error)?;

        match repo.sync_from_remote(&self.cancel) {
            Ok(()) => {}
            Err(err) if err.is_benign() => debug!("Sync reported \"{err}\", continuing"),
            Err(err) => return Err(fetch_error(err)),
        }

        let after = match repo.current_head(&self.cancel) {
            Ok(head) => head,
            Err(err) if err.is_benign() => {
                debug!("Head lookup after sync reported \"{err}\", keeping {before}");
                before.clone()
            }
            Err(err) => return Err(fetch_error(err)),
        };

        if before == after {
            debug!("HEAD is the same as the remote: {before} (old) vs {after} (new)");
            return Ok(SyncResult::UpToDate);
        }

        debug!("HEAD differs: {before} (old) vs {after} (new)");
        log_latest_commit(repo.as_ref(), &after, &self.cancel);
        debug!("Repo updated successfully");

        Ok(SyncResult::Updated(repo.root().to_path_buf()))
    }
}

fn fetch_error(err: VcsError) -> CliError {
    debug!("Fetch error: {err}");
    match err {
        VcsError::Cancelled => CliError::Cancelled,
        err => CliError::SyncFailure(err),
    }
}

fn log_latest_commit(repo: &dyn RepositoryHandle, hash: &str, cancel: &Cancellation) {
    match repo.resolve_commit(hash, cancel) {
        Ok(commit) => debug!("Latest commit: {commit}"),
        Err(err) => debug!("Unable to resolve commit {hash}: {err}"),
    }
}
