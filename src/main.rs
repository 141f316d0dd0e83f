mod agents;
mod cancel;
mod cli;
mod config;
mod error;
mod registry;
mod utils;
mod workflow;

use clap::Parser;
use cli::{Cli, Commands};
use colored::Colorize;
use std::process;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use workflow::UpdateOptions;

fn init_logging(verbose: u8) {
    let level_filter = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .with_env_var("CLIPKG_LOG")
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .without_time()
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let home = cli.home.as_deref();
    let result = match cli.command {
        Commands::Update {
            commands,
            force,
            keep_going,
            deadline,
            no_spinner,
        } => workflow::execute_update(
            home,
            UpdateOptions {
                commands,
                force_binary: force,
                keep_going,
                deadline_secs: deadline,
                no_spinner,
            },
        ),
        Commands::List => workflow::execute_list(home),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e.to_string().red());
        process::exit(1);
    }
}
