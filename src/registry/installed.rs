use super::manifest::PackageManifest;
use super::{CommandGroup, CommandRegistry, builtin_groups};
use crate::cancel::Cancellation;
use crate::error::RegistryError;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

const PACKAGE_DIR_PREFIX: &str = "cli-";
const SHEBANG_READ_LIMIT: u64 = 512;

/// Registry backed by the packages cloned under `<home>/src`.
pub struct InstalledCommands {
    src_dir: PathBuf,
    exec_prefix: String,
}

impl InstalledCommands {
    pub fn new<P: AsRef<Path>>(src_dir: P, exec_prefix: impl Into<String>) -> Self {
        Self {
            src_dir: src_dir.as_ref().to_path_buf(),
            exec_prefix: exec_prefix.into(),
        }
    }

    /// Package directories in sorted order; a missing `src` dir means nothing is installed.
    fn package_dirs(&self) -> Result<Vec<PathBuf>, RegistryError> {
        if !self.src_dir.is_dir() {
            debug!("Packages directory {} does not exist", self.src_dir.display());
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.src_dir).map_err(|e| RegistryError::Unreadable {
            path: self.src_dir.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut dirs: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| !n.starts_with('.'))
            })
            .collect();
        dirs.sort();
        Ok(dirs)
    }

    /// A package's manifest. A malformed `cli.json` is logged and the package
    /// is treated as if it had none.
    fn manifest_of(package_dir: &Path) -> Option<PackageManifest> {
        PackageManifest::load(package_dir).unwrap_or_else(|err| {
            warn!("Ignoring manifest of {}: {err}", package_dir.display());
            None
        })
    }

    fn command_names(package_dir: &Path) -> Vec<String> {
        let declared: Vec<String> = Self::manifest_of(package_dir)
            .map(|manifest| manifest.commands)
            .unwrap_or_default()
            .into_iter()
            .map(|command| command.name)
            .filter(|name| !name.is_empty())
            .collect();

        if !declared.is_empty() {
            return declared;
        }

        let dir_name = package_dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let name = dir_name.strip_prefix(PACKAGE_DIR_PREFIX).unwrap_or(dir_name);
        vec![name.to_string()]
    }

    /// Maps an alias to the command name it stands for, if this package declares it.
    fn canonical_name(package_dir: &Path, name: &str) -> Option<String> {
        Self::manifest_of(package_dir)?
            .commands
            .into_iter()
            .find(|command| command.answers_to(name))
            .map(|command| command.name)
    }

    fn executable_in(&self, package_dir: &Path, name: &str) -> Option<PathBuf> {
        let prefixed = format!("{}{}", self.exec_prefix, name);
        [
            package_dir.join(&prefixed),
            package_dir.join("bin").join(&prefixed),
            package_dir.join("bin").join(name),
        ]
        .into_iter()
        .find(|candidate| candidate.is_file())
    }
}

impl CommandRegistry for InstalledCommands {
    fn builtin_commands(&self) -> Vec<CommandGroup> {
        builtin_groups()
    }

    fn commands(&self) -> Result<Vec<CommandGroup>, RegistryError> {
        Ok(self
            .package_dirs()?
            .iter()
            .map(|dir| CommandGroup::new(Self::command_names(dir)))
            .collect())
    }

    fn find_exec(&self, name: &str, cancel: &Cancellation) -> Result<Vec<PathBuf>, RegistryError> {
        if cancel.is_cancelled() {
            return Err(RegistryError::Cancelled);
        }
        if name.is_empty() {
            return Err(RegistryError::NotFound(name.to_string()));
        }

        let packages = self.package_dirs()?;

        let declared = packages.iter().find_map(|dir| {
            let canonical = Self::canonical_name(dir, name)?;
            self.executable_in(dir, &canonical)
        });
        let found = declared.or_else(|| {
            packages
                .iter()
                .find_map(|dir| self.executable_in(dir, name))
        });

        match found {
            Some(path) => {
                trace!("Executable for {name}: {}", path.display());
                Ok(exec_chain(path))
            }
            None => Err(RegistryError::NotFound(name.to_string())),
        }
    }
}

/// Expands a script with a `#!` line into `[interpreter, args..., script]`.
fn exec_chain(path: PathBuf) -> Vec<PathBuf> {
    let Some(interpreter) = read_shebang(&path) else {
        return vec![path];
    };

    let mut chain: Vec<PathBuf> = interpreter.split_whitespace().map(PathBuf::from).collect();
    chain.push(path);
    chain
}

fn read_shebang(path: &Path) -> Option<String> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file.take(SHEBANG_READ_LIMIT));
    let mut first_line = Vec::new();
    reader.read_until(b'\n', &mut first_line).ok()?;

    let line = String::from_utf8(first_line).ok()?;
    let interpreter = line.strip_prefix("#!")?.trim();
    (!interpreter.is_empty()).then(|| interpreter.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_file(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn commands_follow_sorted_package_order() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        write_file(
            &src.join("cli-zeta").join("cli.json"),
            r#"{"commands":[{"name":"zeta"},{"name":"zeta-extra"}]}"#,
        );
        fs::create_dir_all(src.join("cli-alpha")).unwrap();

        let registry = InstalledCommands::new(&src, "akamai-");
        let groups = registry.commands().unwrap();
        assert_eq!(
            groups,
            vec![
                CommandGroup::new(["alpha"]),
                CommandGroup::new(["zeta", "zeta-extra"]),
            ]
        );
    }

    #[test]
    fn malformed_manifest_falls_back_to_directory_name() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        write_file(&src.join("cli-broken").join("cli.json"), "{ not json");
        let binary = src.join("cli-broken").join("akamai-broken");
        write_file(&binary, "bin");
        fs::create_dir_all(src.join("cli-healthy")).unwrap();

        let registry = InstalledCommands::new(&src, "akamai-");
        assert_eq!(
            registry.commands().unwrap(),
            vec![
                CommandGroup::new(["broken"]),
                CommandGroup::new(["healthy"]),
            ]
        );
        assert_eq!(
            registry.find_exec("broken", &Cancellation::new()).unwrap(),
            vec![binary]
        );
    }

    #[test]
    fn missing_src_dir_means_no_commands() {
        let dir = tempdir().unwrap();
        let registry = InstalledCommands::new(dir.path().join("src"), "akamai-");
        assert!(registry.commands().unwrap().is_empty());
    }

    #[test]
    fn finds_binary_as_single_segment() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let binary = src.join("cli-widget").join("bin").join("akamai-widget");
        write_file(&binary, "\u{7f}ELF");

        let registry = InstalledCommands::new(&src, "akamai-");
        let chain = registry.find_exec("widget", &Cancellation::new()).unwrap();
        assert_eq!(chain, vec![binary]);
    }

    #[test]
    fn expands_script_interpreter() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let script = src.join("cli-purge").join("bin").join("akamai-purge");
        write_file(&script, "#!/usr/bin/env node\nconsole.log('hi')\n");

        let registry = InstalledCommands::new(&src, "akamai-");
        let chain = registry.find_exec("purge", &Cancellation::new()).unwrap();
        assert_eq!(
            chain,
            vec![
                PathBuf::from("/usr/bin/env"),
                PathBuf::from("node"),
                script
            ]
        );
    }

    #[test]
    fn resolves_alias_through_manifest() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let package = src.join("cli-property");
        write_file(
            &package.join("cli.json"),
            r#"{"commands":[{"name":"property","aliases":["prop"]}]}"#,
        );
        let binary = package.join("akamai-property");
        write_file(&binary, "bin");

        let registry = InstalledCommands::new(&src, "akamai-");
        assert_eq!(
            registry.find_exec("prop", &Cancellation::new()).unwrap(),
            vec![binary]
        );
    }

    #[test]
    fn unknown_command_is_not_found() {
        let dir = tempdir().unwrap();
        let registry = InstalledCommands::new(dir.path(), "akamai-");
        let err = registry.find_exec("nope", &Cancellation::new()).unwrap_err();
        assert_eq!(err, RegistryError::NotFound("nope".into()));
    }

    #[test]
    fn builtins_are_single_command_groups() {
        let registry = InstalledCommands::new("/nonexistent", "akamai-");
        let builtins = registry.builtin_commands();
        assert!(builtins.iter().all(|g| g.commands.len() == 1));
        assert!(builtins.iter().any(|g| g.commands[0].name == "help"));
    }
}
