// Package update orchestration.
//
// - PackageUpdater: runs one package through locate, sync, classify and
//   dependency reinstall, and drives batches of packages.
// - BatchReport: per-package results of a batch.
pub mod report;
pub mod updater;

pub use report::{BatchMode, BatchReport, UpdateOutcome};
pub use updater::PackageUpdater;
