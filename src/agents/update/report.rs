use crate::error::{CliError, Result};

/// How a single package update ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    UpToDate,
    Updated,
    NotFound,
    SyncFailed,
    DependencyInstallFailed,
}

impl CliError {
    /// The outcome a per-package failure corresponds to.
    pub fn outcome(&self) -> UpdateOutcome {
        match self {
            CliError::CommandNotFound { .. }
            | CliError::NotAPackageInstall { .. }
            | CliError::BrokenPackageRepo(_) => UpdateOutcome::NotFound,
            CliError::DependencyInstallFailure(_) | CliError::Dependency(_) => {
                UpdateOutcome::DependencyInstallFailed
            }
            _ => UpdateOutcome::SyncFailed,
        }
    }
}

/// What to do with the rest of a batch after a package fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchMode {
    #[default]
    FailFast,
    KeepGoing,
}

#[derive(Debug)]
pub struct PackageReport {
    pub name: String,
    pub result: Result<UpdateOutcome>,
}

/// Per-package results of a batch, in processing order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub entries: Vec<PackageReport>,
}

impl BatchReport {
    pub fn push(&mut self, name: impl Into<String>, result: Result<UpdateOutcome>) {
        self.entries.push(PackageReport {
            name: name.into(),
            result,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, outcome: UpdateOutcome) -> usize {
        self.entries
            .iter()
            .filter(|entry| match &entry.result {
                Ok(o) => *o == outcome,
                Err(e) => e.outcome() == outcome,
            })
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &CliError)> {
        self.entries
            .iter()
            .filter_map(|entry| entry.result.as_ref().err().map(|e| (entry.name.as_str(), e)))
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    /// Turn collected failures into a single error.
    pub fn into_result(self) -> Result<Self> {
        let failed = self.failure_count();
        if failed == 0 {
            Ok(self)
        } else {
            Err(CliError::BatchFailed {
                failed,
                total: self.len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VcsError;

    #[test]
    fn counts_outcomes_including_failures() {
        let mut report = BatchReport::default();
        report.push("a", Ok(UpdateOutcome::Updated));
        report.push("b", Ok(UpdateOutcome::UpToDate));
        report.push(
            "c",
            Err(CliError::SyncFailure(VcsError::Transport("offline".into()))),
        );
        report.push("d", Err(CliError::DependencyInstallFailure("d".into())));

        assert_eq!(report.count(UpdateOutcome::Updated), 1);
        assert_eq!(report.count(UpdateOutcome::UpToDate), 1);
        assert_eq!(report.count(UpdateOutcome::SyncFailed), 1);
        assert_eq!(report.count(UpdateOutcome::DependencyInstallFailed), 1);
        assert_eq!(
            report.failures().map(|(n, _)| n).collect::<Vec<_>>(),
            vec!["c", "d"]
        );

        match report.into_result() {
            Err(CliError::BatchFailed { failed, total }) => {
                assert_eq!((failed, total), (2, 4));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn clean_report_passes_through() {
        let mut report = BatchReport::default();
        report.push("a", Ok(UpdateOutcome::UpToDate));
        assert_eq!(report.into_result().unwrap().len(), 1);
    }

    #[test]
    fn failure_kinds_map_to_outcomes() {
        let not_found = CliError::CommandNotFound {
            name: "x".into(),
            self_name: "akamai".into(),
        };
        assert_eq!(not_found.outcome(), UpdateOutcome::NotFound);
        assert_eq!(
            CliError::NotAPackageInstall {
                self_name: "akamai".into()
            }
            .outcome(),
            UpdateOutcome::NotFound
        );
        assert_eq!(
            CliError::SyncFailure(VcsError::Authentication("denied".into())).outcome(),
            UpdateOutcome::SyncFailed
        );
    }
}
