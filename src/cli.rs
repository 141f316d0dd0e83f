use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "clipkg",
    about = "Keep git-installed CLI command packages up to date",
    version,
    author
)]
pub struct Cli {
    /// CLI home directory (defaults to $CLIPKG_HOME, $AKAMAI_CLI_HOME or ~/.akamai-cli)
    #[arg(long, global = true, value_name = "DIR")]
    pub home: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Update one or more installed commands (all of them when none are given)
    Update {
        /// Names of the commands to update
        #[arg(value_name = "COMMAND")]
        commands: Vec<String>,

        /// Force binary dependencies to be downloaded instead of built
        #[arg(short, long)]
        force: bool,

        /// Continue with the remaining commands after a failure
        #[arg(long)]
        keep_going: bool,

        /// Give up after this many seconds
        #[arg(long, value_name = "SECS")]
        deadline: Option<u64>,

        /// Do not draw progress spinners
        #[arg(long)]
        no_spinner: bool,
    },

    /// List installed commands and the package repository that provides each
    List,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_without_names_means_all() {
        let cli = Cli::try_parse_from(["clipkg", "update"]).unwrap();
        match cli.command {
            Commands::Update {
                commands, force, ..
            } => {
                assert!(commands.is_empty());
                assert!(!force);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn update_accepts_names_and_flags() {
        let cli = Cli::try_parse_from([
            "clipkg",
            "-vv",
            "update",
            "widget",
            "purge",
            "--force",
            "--keep-going",
            "--deadline",
            "30",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Update {
                commands,
                force,
                keep_going,
                deadline,
                no_spinner,
            } => {
                assert_eq!(commands, vec!["widget", "purge"]);
                assert!(force);
                assert!(keep_going);
                assert_eq!(deadline, Some(30));
                assert!(!no_spinner);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
