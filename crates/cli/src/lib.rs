pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use wayfare_core::config::{AppConfig, LoadOptions};

#[derive(Debug, Parser)]
#[command(
    name = "wayfare",
    about = "Wayfare travel backend CLI",
    long_about = "Operate the Wayfare travel database, rebook tickets, and manage the airline policy index.",
    after_help = "Examples:\n  wayfare migrate\n  wayfare seed\n  wayfare rebook --ticket N3J2LG --flight 19251 --passenger \"3442 587242\"\n  wayfare doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the demo travel dataset and verify it")]
    Seed,
    #[command(about = "Overwrite the working database with the configured backup copy")]
    Reset,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, embeddings key, DB connectivity, and schema state")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Move a ticket and its boarding pass to another flight")]
    Rebook {
        #[arg(long, help = "Ticket number, e.g. N3J2LG")]
        ticket: String,
        #[arg(long, help = "Target flight ID")]
        flight: i64,
        #[arg(long, help = "Passenger ID of the ticket owner")]
        passenger: Option<String>,
    },
    #[command(name = "ingest-policies", about = "Embed a markdown policy document into the policy index")]
    IngestPolicies {
        #[arg(long, help = "Path to the markdown policy document")]
        file: PathBuf,
    },
    #[command(name = "lookup-policy", about = "Search the policy index")]
    LookupPolicy {
        #[arg(long, help = "Free-text question")]
        query: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let logging = AppConfig::load(LoadOptions::default())
        .map(|config| config.logging)
        .unwrap_or_else(|_| AppConfig::default().logging);
    logging::init(&logging);

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Reset => commands::reset::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Rebook { ticket, flight, passenger } => {
            commands::rebook::run(&ticket, flight, passenger.as_deref())
        }
        Command::IngestPolicies { file } => commands::ingest::run(&file),
        Command::LookupPolicy { query } => commands::lookup::run(&query),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
