use crate::error::RegistryError;
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const MANIFEST_FILE_NAME: &str = "cli.json";

/// Contents of a package's `cli.json`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PackageManifest {
    #[serde(default)]
    pub requirements: Requirements,
    #[serde(default)]
    pub commands: Vec<ManifestCommand>,
}

/// Minimum runtime versions a package declares. Only presence drives installation.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Requirements {
    pub go: Option<String>,
    pub node: Option<String>,
    pub python: Option<String>,
    pub ruby: Option<String>,
    pub php: Option<String>,
}

impl Requirements {
    pub fn is_empty(&self) -> bool {
        self.go.is_none()
            && self.node.is_none()
            && self.python.is_none()
            && self.ruby.is_none()
            && self.php.is_none()
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ManifestCommand {
    pub name: String,
    #[serde(default)]
    pub version: String,
    /// Download URL template for a prebuilt binary.
    #[serde(default)]
    pub bin: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl ManifestCommand {
    pub fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|alias| alias == name)
    }
}

impl PackageManifest {
    /// Reads `cli.json` from `package_dir`; `Ok(None)` when the package has none.
    pub fn load(package_dir: &Path) -> Result<Option<Self>, RegistryError> {
        let path = package_dir.join(MANIFEST_FILE_NAME);
        if !path.is_file() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|e| RegistryError::Manifest {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| RegistryError::Manifest {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
    }
}
