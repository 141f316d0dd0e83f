use crate::agents::update::{BatchMode, BatchReport, PackageUpdater, UpdateOutcome};
use crate::agents::{
    ManifestInstaller, PackageLocator, SpinnerReporter, VersionControlAgent,
};
use crate::cancel::Cancellation;
use crate::config::Config;
use crate::error::Result;
use crate::registry::{CommandRegistry, InstalledCommands};
use colored::Colorize;
use std::collections::HashSet;
use std::io::{self, IsTerminal};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Options of the `update` command.
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    pub commands: Vec<String>,
    pub force_binary: bool,
    pub keep_going: bool,
    pub deadline_secs: Option<u64>,
    pub no_spinner: bool,
}

/// Execute the update workflow
pub fn execute_update(home: Option<&Path>, options: UpdateOptions) -> Result<()> {
    let config = Config::load(home)?;

    let registry = InstalledCommands::new(config.src_dir(), config.registry.exec_prefix.as_str());
    let vcs = VersionControlAgent::new(config.git.program.as_str(), config.git.remote.as_str());
    let installer = ManifestInstaller::new(config.registry.exec_prefix.as_str());
    let reporter = SpinnerReporter::new(options.no_spinner || !io::stdout().is_terminal());

    let mode = if options.keep_going || config.update.keep_going {
        BatchMode::KeepGoing
    } else {
        BatchMode::FailFast
    };

    let mut cancel = Cancellation::new().cancel_on_interrupt();
    if let Some(secs) = options.deadline_secs.or(config.update.deadline_secs) {
        debug!("Update deadline: {secs}s");
        cancel = cancel.with_deadline(Duration::from_secs(secs));
    }

    let updater = PackageUpdater::new(
        &registry,
        &vcs,
        &installer,
        &reporter,
        config.registry.self_name.as_str(),
    )
    .with_mode(mode)
    .with_cancellation(cancel);

    let report = if options.commands.is_empty() {
        updater.update_all(options.force_binary)?
    } else {
        updater.update_selected(&options.commands, options.force_binary)?
    };

    if mode == BatchMode::KeepGoing || report.len() > 1 {
        print_batch_summary(&report);
    }

    report.into_result().map(|_| ())
}

fn print_batch_summary(report: &BatchReport) {
    if report.is_empty() {
        println!("\n{}", "No installed commands to update".yellow());
        return;
    }

    println!("\n{}", "Update Summary:".cyan().bold());
    println!(
        "  {} updated, {} already up-to-date, {} failed",
        report.count(UpdateOutcome::Updated).to_string().green(),
        report.count(UpdateOutcome::UpToDate).to_string().cyan(),
        report.failure_count().to_string().red()
    );

    for (name, err) in report.failures() {
        println!("  • {} {}", name.white().bold(), err.to_string().red());
    }
}

/// Execute the list workflow - show each installed command and its package
pub fn execute_list(home: Option<&Path>) -> Result<()> {
    let config = Config::load(home)?;
    let registry = InstalledCommands::new(config.src_dir(), config.registry.exec_prefix.as_str());
    let locator = PackageLocator::new(&registry, config.registry.self_name.as_str());
    let cancel = Cancellation::new();

    let builtins: HashSet<String> = registry
        .builtin_commands()
        .into_iter()
        .flat_map(|group| group.commands)
        .map(|command| command.name.to_lowercase())
        .collect();

    println!("{}", "Installed commands:".cyan().bold());
    let mut count = 0;
    for group in registry.commands()? {
        for command in group.commands {
            if builtins.contains(&command.name.to_lowercase()) {
                continue;
            }
            count += 1;
            match locator.locate(&command.name, &cancel) {
                Ok(dir) => println!(
                    "  {} {}",
                    command.name.white().bold(),
                    dir.display().to_string().dimmed()
                ),
                Err(err) => println!(
                    "  {} {}",
                    command.name.white().bold(),
                    err.to_string().yellow()
                ),
            }
        }
    }

    if count == 0 {
        println!("  {}", "(none)".dimmed());
    }
    Ok(())
}
