pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "kudos",
    about = "Kudos bot operator CLI",
    long_about = "Inspect configuration, check readiness, prepare the grant ledger, and wipe it when a reset is needed.",
    after_help = "Examples:\n  kudos doctor --json\n  kudos config\n  kudos migrate\n  kudos wipe --yes"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, Slack token readiness, and grant ledger connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Create the grant ledger schema and indexes if they are missing")]
    Migrate,
    #[command(about = "Delete every stored grant (requires --yes)")]
    Wipe {
        #[arg(long, help = "Confirm that every stored grant should be deleted")]
        yes: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Migrate => commands::migrate::run(),
        Command::Wipe { yes } => commands::wipe::run(yes),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
