use crate::error::{CliError, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_HOME_DIR: &str = ".akamai-cli";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpdateSettings {
    /// Continue with the remaining packages after a failure.
    pub keep_going: bool,
    /// Abort the whole run after this many seconds.
    pub deadline_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct GitSettings {
    pub program: String,
    pub remote: String,
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            program: "git".to_string(),
            remote: "origin".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegistrySettings {
    /// Prefix of package executables, e.g. `akamai-widget`.
    pub exec_prefix: String,
    /// Name of the host CLI, used in user-facing hints.
    pub self_name: String,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            exec_prefix: "akamai-".to_string(),
            self_name: "akamai".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
struct ConfigFile {
    update: UpdateSettings,
    git: GitSettings,
    registry: RegistrySettings,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub home: PathBuf,
    pub update: UpdateSettings,
    pub git: GitSettings,
    pub registry: RegistrySettings,
}

impl Config {
    /// Resolve the CLI home and read `config.toml` from it when present.
    pub fn load(home_override: Option<&Path>) -> Result<Self> {
        let home = match home_override {
            Some(path) => path.to_path_buf(),
            None => Self::default_home()?,
        };
        debug!("Using CLI home: {}", home.display());
        Self::load_from(home)
    }

    pub fn load_from(home: PathBuf) -> Result<Self> {
        let config_path = home.join(CONFIG_FILE_NAME);
        let file = if config_path.is_file() {
            debug!("Reading configuration from {}", config_path.display());
            let content = fs::read_to_string(&config_path)?;
            toml::from_str::<ConfigFile>(&content).map_err(|e| {
                CliError::Config(format!("Failed to parse {}: {e}", config_path.display()))
            })?
        } else {
            debug!("No configuration file at {}, using defaults", config_path.display());
            ConfigFile::default()
        };

        Ok(Self {
            home,
            update: file.update,
            git: file.git,
            registry: file.registry,
        })
    }

    fn default_home() -> Result<PathBuf> {
        for var in ["CLIPKG_HOME", "AKAMAI_CLI_HOME"] {
            if let Some(value) = env::var_os(var).filter(|v| !v.is_empty()) {
                debug!("{var} is set");
                return Ok(PathBuf::from(value));
            }
        }

        dirs::home_dir()
            .map(|home| home.join(DEFAULT_HOME_DIR))
            .ok_or_else(|| CliError::Config("Unable to determine the home directory".to_string()))
    }

    /// Directory holding one cloned repository per installed package.
    pub fn src_dir(&self) -> PathBuf {
        self.home.join("src")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load(Some(dir.path())).unwrap();
        assert_eq!(config.git, GitSettings::default());
        assert_eq!(config.registry.exec_prefix, "akamai-");
        assert!(!config.update.keep_going);
        assert_eq!(config.src_dir(), dir.path().join("src"));
    }

    #[test]
    fn partial_file_overrides_only_given_keys() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[update]\nkeep_going = true\ndeadline_secs = 30\n\n[git]\nremote = \"upstream\"\n",
        )
        .unwrap();

        let config = Config::load(Some(dir.path())).unwrap();
        assert!(config.update.keep_going);
        assert_eq!(config.update.deadline_secs, Some(30));
        assert_eq!(config.git.remote, "upstream");
        assert_eq!(config.git.program, "git");
        assert_eq!(config.registry.self_name, "akamai");
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "[update\nkeep_going = ").unwrap();
        let err = Config::load(Some(dir.path())).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }
}
