// SPDX-FileCopyrightText: 2026 Regroup Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Regroup - resumable batch migration of authorized members into a guild.
//!
//! This is the binary entry point for the Regroup CLI.

mod migrate;
mod progress;
mod status;

use clap::{Parser, Subcommand};

/// Regroup - migrate previously authorized members into a target guild.
#[derive(Parser, Debug)]
#[command(name = "regroup", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run (or resume) the migration for a target guild.
    Migrate {
        /// Target guild id to migrate members into.
        target_id: String,

        /// Who is running this migration, recorded on the run.
        #[arg(long, default_value = "cli")]
        initiator: String,
    },
    /// Show recorded migration runs and their outcomes.
    Status {
        /// Only show runs for this target guild id.
        #[arg(long)]
        target: Option<String>,

        /// Show full detail, including failed members, for one run id.
        #[arg(long)]
        run: Option<String>,
    },
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("regroup=info,warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing();

    let config = match regroup_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            regroup_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Migrate {
            target_id,
            initiator,
        } => migrate::run_migrate(&config, &target_id, &initiator).await,
        Commands::Status { target, run } => {
            status::run_status(&config, target.as_deref(), run.as_deref()).await
        }
    };

    if let Err(e) = result {
        eprintln!("regroup: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn migrate_parses_target_and_initiator() {
        let cli = Cli::parse_from(["regroup", "migrate", "guild-1", "--initiator", "alice"]);
        match cli.command {
            Commands::Migrate {
                target_id,
                initiator,
            } => {
                assert_eq!(target_id, "guild-1");
                assert_eq!(initiator, "alice");
            }
            _ => panic!("expected migrate subcommand"),
        }
    }

    #[test]
    fn status_filters_are_optional() {
        let cli = Cli::parse_from(["regroup", "status"]);
        match cli.command {
            Commands::Status { target, run } => {
                assert!(target.is_none());
                assert!(run.is_none());
            }
            _ => panic!("expected status subcommand"),
        }
    }
}
