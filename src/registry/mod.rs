use crate::cancel::Cancellation;
use crate::error::RegistryError;
use std::path::PathBuf;

pub mod installed;
pub mod manifest;

pub use installed::InstalledCommands;
pub use manifest::PackageManifest;

/// Commands shipped with the host CLI itself. They are never updated.
pub const BUILTIN_COMMANDS: &[&str] = &[
    "config",
    "help",
    "install",
    "list",
    "search",
    "uninstall",
    "update",
    "upgrade",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEntry {
    pub name: String,
}

/// A set of commands provided by one source: a built-in or an installed package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandGroup {
    pub commands: Vec<CommandEntry>,
}

impl CommandGroup {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            commands: names
                .into_iter()
                .map(|name| CommandEntry { name: name.into() })
                .collect(),
        }
    }
}

pub trait CommandRegistry {
    fn builtin_commands(&self) -> Vec<CommandGroup>;

    /// Installed commands, in a stable enumeration order.
    fn commands(&self) -> Result<Vec<CommandGroup>, RegistryError>;

    /// Resolve `name` to its executable chain, e.g. `[interpreter, script]`.
    fn find_exec(&self, name: &str, cancel: &Cancellation) -> Result<Vec<PathBuf>, RegistryError>;
}

pub fn builtin_groups() -> Vec<CommandGroup> {
    BUILTIN_COMMANDS
        .iter()
        .map(|name| CommandGroup::new([*name]))
        .collect()
}
