mod cli;
mod commands;
mod error;
mod logging;

use crate::cli::{Cli, Command};
use clap::Parser;
use std::process::ExitCode;
use time::OffsetDateTime;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let started = OffsetDateTime::now_utc();
    let log_file = match &cli.command {
        Command::Import(args) => Some(commands::import::log_path(args, started)),
        Command::Update(args) => Some(commands::update::log_path(args, started)),
        _ => None,
    };
    if let Err(e) = logging::init(cli.debug, log_file.as_deref()) {
        eprintln!("{e:?}");
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Command::Import(args) => commands::import::run(args, started).await,
        Command::Update(args) => commands::update::run(args, started).await,
        Command::Analyze { manifest } => commands::manifest::analyze(&manifest),
        Command::Merge { output, indent, manifests } => commands::manifest::merge(&manifests, &output, indent),
        Command::Find { manifest, name } => commands::manifest::find(&manifest, &name),
        Command::GenerateDb { directory } => commands::hashdb::generate(&directory).await,
        Command::Verify => commands::hashdb::verify_all().await,
    };
    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = ?e, "Command failed");
            ExitCode::FAILURE
        },
    }
}
