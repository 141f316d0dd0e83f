use crate::cancel::Cancellation;
use crate::error::{CliError, Result};
use crate::registry::PackageManifest;
use crate::registry::manifest::ManifestCommand;
use crate::utils::path_validator::PathValidator;
use crate::utils::process::{find_program, run_cancellable};
use reqwest::blocking::Client;
use std::env;
use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::Duration;
use tracing::{debug, warn};

pub trait DependencyInstaller {
    /// Reinstall the runtime dependencies of the package at `repo_dir`.
    fn install_dependencies(&self, repo_dir: &Path, force_binary: bool, cancel: &Cancellation)
    -> bool;
}

/// Installs dependencies according to the `requirements` of a package's `cli.json`.
pub struct ManifestInstaller {
    exec_prefix: String,
}

impl ManifestInstaller {
    pub fn new(exec_prefix: impl Into<String>) -> Self {
        Self {
            exec_prefix: exec_prefix.into(),
        }
    }

    fn install(&self, repo_dir: &Path, force_binary: bool, cancel: &Cancellation) -> Result<()> {
        let Some(manifest) = PackageManifest::load(repo_dir)? else {
            debug!("No manifest in {}, nothing to install", repo_dir.display());
            return Ok(());
        };

        let requirements = &manifest.requirements;
        if requirements.is_empty() {
            debug!("Package declares no requirements");
            return Ok(());
        }

        if requirements.go.is_some() {
            self.install_go(repo_dir, &manifest, force_binary, cancel)?;
        }

        if requirements.node.is_some() && repo_dir.join("package.json").is_file() {
            run_step(repo_dir, "npm", &["install"], cancel)?;
        }

        if requirements.python.is_some() && repo_dir.join("requirements.txt").is_file() {
            let pip = if find_program("pip3").is_some() { "pip3" } else { "pip" };
            run_step(
                repo_dir,
                pip,
                &["install", "--user", "--ignore-installed", "-r", "requirements.txt"],
                cancel,
            )?;
        }

        if requirements.ruby.is_some() && repo_dir.join("Gemfile").is_file() {
            run_step(repo_dir, "bundle", &["install"], cancel)?;
        }

        if requirements.php.is_some() && repo_dir.join("composer.json").is_file() {
            run_step(repo_dir, "composer", &["install"], cancel)?;
        }

        Ok(())
    }

    fn install_go(
        &self,
        repo_dir: &Path,
        manifest: &PackageManifest,
        force_binary: bool,
        cancel: &Cancellation,
    ) -> Result<()> {
        let go_available = find_program("go").is_some();
        let downloadable: Vec<&ManifestCommand> =
            manifest.commands.iter().filter(|c| c.bin.is_some()).collect();

        if (force_binary || !go_available) && !downloadable.is_empty() {
            let client = build_client()?;
            for command in downloadable {
                self.download_binary(&client, repo_dir, command, cancel)?;
            }
            return Ok(());
        }

        if !go_available {
            return Err(CliError::Dependency(
                "Go is required to build this package and no prebuilt binary is available"
                    .to_string(),
            ));
        }

        for command in &manifest.commands {
            let output = format!("{}{}", self.exec_prefix, command.name);
            let package = if manifest.commands.len() > 1 {
                format!("./cmd/{}", command.name)
            } else {
                ".".to_string()
            };
            run_step(repo_dir, "go", &["build", "-o", &output, &package], cancel)?;
        }
        Ok(())
    }

    fn download_binary(
        &self,
        client: &Client,
        repo_dir: &Path,
        command: &ManifestCommand,
        cancel: &Cancellation,
    ) -> Result<()> {
        cancel.check()?;
        let Some(template) = command.bin.as_deref() else {
            return Ok(());
        };

        let url = expand_bin_template(template, &command.name, &command.version);
        debug!("Downloading binary for {}: {url}", command.name);

        let bytes = client.get(&url).send()?.error_for_status()?.bytes()?;
        cancel.check()?;

        let file_name = format!("{}{}{}", self.exec_prefix, command.name, bin_suffix());
        let target = PathValidator::validate_output_path(repo_dir.join(file_name), repo_dir)?;
        fs::write(&target, &bytes)?;
        make_executable(&target)?;

        debug!("Wrote {} bytes to {}", bytes.len(), target.display());
        Ok(())
    }
}

impl DependencyInstaller for ManifestInstaller {
    fn install_dependencies(
        &self,
        repo_dir: &Path,
        force_binary: bool,
        cancel: &Cancellation,
    ) -> bool {
        match self.install(repo_dir, force_binary, cancel) {
            Ok(()) => true,
            Err(err) => {
                warn!("Error installing dependencies in {}: {err}", repo_dir.display());
                false
            }
        }
    }
}

fn run_step(repo_dir: &Path, program: &str, args: &[&str], cancel: &Cancellation) -> Result<()> {
    cancel.check()?;
    if find_program(program).is_none() {
        return Err(CliError::Dependency(format!(
            "{program} is required but was not found on PATH"
        )));
    }

    debug!("Running {program} {} in {}", args.join(" "), repo_dir.display());
    let mut command = Command::new(program);
    command.current_dir(repo_dir).args(args);

    let output = run_cancellable(&mut command, cancel)
        .map_err(|e| CliError::Dependency(format!("Failed to spawn {program}: {e}")))?
        .ok_or(CliError::Cancelled)?;

    if !output.status.success() {
        return Err(CliError::Dependency(format!(
            "`{program} {}` failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}

fn build_client() -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(120))
        .user_agent(concat!("clipkg/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Fills in `{{.Name}}`, `{{.Version}}`, `{{.OS}}`, `{{.Arch}}` and `{{.BinSuffix}}`.
pub fn expand_bin_template(template: &str, name: &str, version: &str) -> String {
    template
        .replace("{{.Name}}", name)
        .replace("{{.Version}}", version)
        .replace("{{.OS}}", target_os())
        .replace("{{.Arch}}", target_arch())
        .replace("{{.BinSuffix}}", bin_suffix())
}

fn target_os() -> &'static str {
    match env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

fn target_arch() -> &'static str {
    match env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        other => other,
    }
}

fn bin_suffix() -> &'static str {
    env::consts::EXE_SUFFIX
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn package_without_manifest_needs_nothing() {
        let dir = tempdir().unwrap();
        let installer = ManifestInstaller::new("akamai-");
        assert!(installer.install_dependencies(dir.path(), false, &Cancellation::new()));
    }

    #[test]
    fn package_without_requirements_needs_nothing() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("cli.json"),
            r#"{"commands":[{"name":"widget"}]}"#,
        )
        .unwrap();
        let installer = ManifestInstaller::new("akamai-");
        assert!(installer.install_dependencies(dir.path(), true, &Cancellation::new()));
    }

    #[test]
    fn missing_language_files_are_skipped() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("cli.json"),
            r#"{"requirements":{"node":"7.0","python":"3.0"},"commands":[{"name":"widget"}]}"#,
        )
        .unwrap();
        let installer = ManifestInstaller::new("akamai-");
        assert!(installer.install_dependencies(dir.path(), false, &Cancellation::new()));
    }

    #[test]
    fn cancellation_fails_pending_install() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("cli.json"),
            r#"{"requirements":{"node":"7.0"},"commands":[{"name":"widget"}]}"#,
        )
        .unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();

        let cancel = Cancellation::new();
        cancel.cancel();
        let installer = ManifestInstaller::new("akamai-");
        assert!(!installer.install_dependencies(dir.path(), false, &cancel));
    }

    #[test]
    fn broken_manifest_fails_install() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("cli.json"), "{").unwrap();
        let installer = ManifestInstaller::new("akamai-");
        assert!(!installer.install_dependencies(dir.path(), false, &Cancellation::new()));
    }

    #[cfg(unix)]
    #[test]
    fn failing_step_reports_stderr() {
        let dir = tempdir().unwrap();
        let err = run_step(
            dir.path(),
            "sh",
            &["-c", "echo boom 1>&2; exit 3"],
            &Cancellation::new(),
        )
        .unwrap_err();
        assert!(matches!(&err, CliError::Dependency(msg) if msg.contains("boom")));
    }

    #[test]
    fn expands_binary_url_template() {
        let url = expand_bin_template(
            "https://example.com/{{.Name}}/v{{.Version}}/{{.Name}}-{{.OS}}{{.Arch}}{{.BinSuffix}}",
            "widget",
            "1.2.0",
        );
        assert!(url.starts_with("https://example.com/widget/v1.2.0/widget-"));
        assert!(!url.contains("{{"));
        assert!(url.contains(target_os()));
        assert!(url.contains(target_arch()));
    }
}
