//! mailq - query a local mailbox from the command line
//!
//! This is the main entry point for the mailq binary.

use std::process::ExitCode;

use clap::Parser;
use log::error;
use mail::{EngineSettings, ErrorCategory, QueryError};

mod cli;
mod commands;
mod output;

use cli::{Cli, Command};

fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    // Bootstrap config directory
    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let store = commands::open_store(cli.db.as_deref())?;

    match cli.command {
        Command::Folders => commands::folders(store.as_ref()),
        Command::Read {
            folder,
            filters,
            view,
        } => {
            let settings = EngineSettings::load()?;
            commands::query(store, settings, "read", filters.into_args(vec![folder]), view)
        }
        Command::Find {
            folders,
            filters,
            view,
        } => {
            let settings = EngineSettings::load()?;
            commands::query(store, settings, "find", filters.into_args(folders), view)
        }
        Command::Open { id } => commands::open(store, &id),
        Command::Move { ids, to } => commands::move_messages(store, &ids, &to),
    }
}

/// Print an error with its recovery hint and pick the exit code
fn report(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<QueryError>() {
        Some(query_error) => {
            eprintln!("Error: {}", query_error);
            if let Some(hint) = query_error.suggestion() {
                eprintln!("Suggestion: {}", hint);
            }
            match query_error.category() {
                ErrorCategory::UserInput => ExitCode::from(2),
                ErrorCategory::ResourceLimit | ErrorCategory::Upstream => ExitCode::FAILURE,
            }
        }
        None => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
