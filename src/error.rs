use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Command \"{name}\" not found. Try \"{self_name} help\".")]
    CommandNotFound { name: String, self_name: String },

    #[error("unable to update, was it installed using \"{self_name} install\"?")]
    NotAPackageInstall { self_name: String },

    #[error("unable to update, there is an issue with the package repo: {0}")]
    BrokenPackageRepo(VcsError),

    #[error("Unable to fetch updates ({0})")]
    SyncFailure(VcsError),

    #[error("Unable to update command \"{0}\"")]
    DependencyInstallFailure(String),

    #[error("Dependency installation failed: {0}")]
    Dependency(String),

    #[error("Update cancelled")]
    Cancelled,

    #[error("{failed} of {total} package update(s) failed")]
    BatchFailed { failed: usize, total: usize },

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;

/// Errors reported by a version-control backend.
///
/// `AlreadyUpToDate` and `ObjectNotFound` are benign: they describe a sync
/// that had nothing to apply rather than a failed one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VcsError {
    #[error("already up-to-date")]
    AlreadyUpToDate,

    #[error("object not found")]
    ObjectNotFound,

    #[error("repository does not exist: {0}")]
    NotARepository(String),

    #[error("{0}")]
    Transport(String),

    #[error("authentication required: {0}")]
    Authentication(String),

    #[error("non-fast-forward update: {0}")]
    MergeConflict(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("{0}")]
    Backend(String),
}

impl VcsError {
    pub fn is_benign(&self) -> bool {
        matches!(self, VcsError::AlreadyUpToDate | VcsError::ObjectNotFound)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("command \"{0}\" not found")]
    NotFound(String),

    #[error("invalid manifest {path}: {reason}")]
    Manifest { path: String, reason: String },

    #[error("unable to read packages directory {path}: {reason}")]
    Unreadable { path: String, reason: String },

    #[error("lookup cancelled")]
    Cancelled,
}
