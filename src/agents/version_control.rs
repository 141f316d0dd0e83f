use crate::cancel::Cancellation;
use crate::error::VcsError;
use crate::utils::path_validator::PathValidator;
use crate::utils::process::run_cancellable;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::{debug, trace};

/// Metadata of a single commit, used for diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub hash: String,
    pub author: String,
    pub email: String,
    pub timestamp: i64,
    pub summary: String,
}

impl fmt::Display for CommitInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} <{}> @{}: {}",
            self.hash, self.author, self.email, self.timestamp, self.summary
        )
    }
}

pub trait VcsBackend {
    fn open(
        &self,
        dir: &Path,
        cancel: &Cancellation,
    ) -> Result<Box<dyn RepositoryHandle>, VcsError>;
}

/// Operations on one opened package repository.
pub trait RepositoryHandle {
    fn root(&self) -> &Path;

    fn current_head(&self, cancel: &Cancellation) -> Result<String, VcsError>;

    /// Fetch the default remote and fast-forward the working tree.
    ///
    /// Nothing to merge is reported as `VcsError::AlreadyUpToDate`.
    fn sync_from_remote(&self, cancel: &Cancellation) -> Result<(), VcsError>;

    fn resolve_commit(&self, hash: &str, cancel: &Cancellation) -> Result<CommitInfo, VcsError>;
}

/// VersionControlAgent drives the `git` executable for package repositories.
pub struct VersionControlAgent {
    program: String,
    remote: String,
}

impl VersionControlAgent {
    pub fn new(program: impl Into<String>, remote: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            remote: remote.into(),
        }
    }
}

impl VcsBackend for VersionControlAgent {
    fn open(
        &self,
        dir: &Path,
        cancel: &Cancellation,
    ) -> Result<Box<dyn RepositoryHandle>, VcsError> {
        let root = PathValidator::validate_repository_root(dir)
            .map_err(|err| VcsError::NotARepository(err.to_string()))?;

        let repo = GitRepository {
            root,
            program: self.program.clone(),
            remote: self.remote.clone(),
        };

        // Corrupted metadata fails here rather than halfway through a pull.
        let output = repo.run_git(&["rev-parse", "--show-toplevel"], cancel)?;
        if !output.status.success() {
            return Err(VcsError::NotARepository(stderr_of(&output)));
        }

        let toplevel = PathBuf::from(String::from_utf8_lossy(&output.stdout).trim());
        let toplevel = toplevel.canonicalize().unwrap_or(toplevel);
        if toplevel != repo.root {
            return Err(VcsError::NotARepository(format!(
                "{} is inside {}, not a repository root",
                repo.root.display(),
                toplevel.display()
            )));
        }

        debug!("Opened repository {}", repo.root.display());
        Ok(Box::new(repo))
    }
}

pub struct GitRepository {
    root: PathBuf,
    program: String,
    remote: String,
}

impl GitRepository {
    fn run_git(&self, args: &[&str], cancel: &Cancellation) -> Result<Output, VcsError> {
        if cancel.is_cancelled() {
            return Err(VcsError::Cancelled);
        }

        let mut command = Command::new(&self.program);
        command
            .current_dir(&self.root)
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("LC_ALL", "C");

        let output = run_cancellable(&mut command, cancel)
            .map_err(|e| {
                VcsError::Backend(format!(
                    "Failed to execute git command '{}': {e}",
                    args.join(" ")
                ))
            })?
            .ok_or(VcsError::Cancelled)?;

        trace!(
            "git {} -> {:?}\nstdout: {}\nstderr: {}",
            args.join(" "),
            output.status.code(),
            String::from_utf8_lossy(&output.stdout).trim(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
        Ok(output)
    }
}

impl RepositoryHandle for GitRepository {
    fn root(&self) -> &Path {
        &self.root
    }

    fn current_head(&self, cancel: &Cancellation) -> Result<String, VcsError> {
        let output = self.run_git(&["rev-parse", "--verify", "HEAD"], cancel)?;
        if !output.status.success() {
            return Err(classify_git_failure(&stderr_of(&output)));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn sync_from_remote(&self, cancel: &Cancellation) -> Result<(), VcsError> {
        debug!("Pulling from remote: {}", self.remote);
        let output = self.run_git(&["pull", "--ff-only", "--no-rebase", &self.remote], cancel)?;
        if !output.status.success() {
            return Err(classify_git_failure(&stderr_of(&output)));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.contains("Already up to date") || stdout.contains("Already up-to-date") {
            return Err(VcsError::AlreadyUpToDate);
        }
        Ok(())
    }

    fn resolve_commit(&self, hash: &str, cancel: &Cancellation) -> Result<CommitInfo, VcsError> {
        let output = self.run_git(
            &["show", "-s", "--format=%H%x00%an%x00%ae%x00%ct%x00%s", hash],
            cancel,
        )?;
        if !output.status.success() {
            return Err(classify_git_failure(&stderr_of(&output)));
        }

        parse_commit_line(&String::from_utf8_lossy(&output.stdout))
            .ok_or_else(|| VcsError::Backend(format!("Unexpected git show output for {hash}")))
    }
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

fn parse_commit_line(line: &str) -> Option<CommitInfo> {
    let mut fields = line.trim_end_matches('\n').splitn(5, '\0');
    Some(CommitInfo {
        hash: fields.next()?.to_string(),
        author: fields.next()?.to_string(),
        email: fields.next()?.to_string(),
        timestamp: fields.next()?.parse().ok()?,
        summary: fields.next()?.to_string(),
    })
}

/// Maps git's (C-locale) stderr onto the typed error set.
pub fn classify_git_failure(stderr: &str) -> VcsError {
    const NOT_FOUND: &[&str] = &[
        "couldn't find remote ref",
        "no such ref was fetched",
        "unknown revision",
        "Needed a single revision",
        "bad object",
        "does not have any commits yet",
    ];
    const AUTH: &[&str] = &[
        "Authentication failed",
        "Permission denied",
        "could not read Username",
        "could not read Password",
        "terminal prompts disabled",
    ];
    const TRANSPORT: &[&str] = &[
        "Could not resolve host",
        "unable to access",
        "Connection refused",
        "Connection timed out",
        "Could not read from remote repository",
        "does not appear to be a git repository",
        "early EOF",
    ];
    const MERGE: &[&str] = &[
        "Not possible to fast-forward",
        "not possible to fast-forward",
        "CONFLICT",
        "would be overwritten by merge",
        "diverging branches",
        "have diverged",
    ];
    const NOT_A_REPO: &[&str] = &["not a git repository"];

    let matches = |needles: &[&str]| needles.iter().any(|n| stderr.contains(n));
    let message = stderr.to_string();

    if matches(NOT_FOUND) {
        VcsError::ObjectNotFound
    } else if matches(AUTH) {
        VcsError::Authentication(message)
    } else if matches(TRANSPORT) {
        VcsError::Transport(message)
    } else if matches(MERGE) {
        VcsError::MergeConflict(message)
    } else if matches(NOT_A_REPO) {
        VcsError::NotARepository(message)
    } else {
        VcsError::Backend(message)
    }
}
