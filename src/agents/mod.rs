pub mod dependency_installer;
pub mod package_locator;
pub mod status;
pub mod version_control;

pub mod update;

pub use dependency_installer::ManifestInstaller;
pub use package_locator::PackageLocator;
pub use status::SpinnerReporter;
pub use version_control::VersionControlAgent;
