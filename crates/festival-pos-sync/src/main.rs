// SPDX-License-Identifier: AGPL-3.0
// Festival POS Sync - Headless host
//
// Runs checkout and catalog operations from the command line and keeps
// undelivered sales flowing to the vendor backend in the background.

mod commands;
mod state;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

/// Festival POS command-line interface
#[derive(Parser)]
#[command(name = "festival-pos-sync")]
#[command(about = "Festival point-of-sale host with offline sale delivery")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file. Defaults to the platform config directory.
    #[arg(long, global = true, env = "FESTIVAL_POS_SETTINGS")]
    settings: Option<PathBuf>,

    /// Directory for the local storage slots, overriding settings
    #[arg(long, global = true, env = "FESTIVAL_POS_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Retry queued sales periodically until interrupted
    Run {
        /// Minutes between retry passes (1 to 1440), overriding settings
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..=1440))]
        interval: Option<u64>,
        /// Run the first pass right away
        #[arg(long)]
        now: bool,
    },
    /// Run a single retry pass
    Retry,
    /// List queued sales
    Status,
    /// Queue a sale from a JSON file for later delivery
    Enqueue {
        file: PathBuf,
        #[arg(long)]
        endpoint: String,
    },
    /// Sell products from the cached catalog, one id per unit
    Sell {
        #[arg(required = true)]
        products: Vec<String>,
        /// Cash handed over, to compute change
        #[arg(long)]
        cash: Option<f64>,
    },
    /// Manage the cached POS profile
    Pos {
        #[command(subcommand)]
        command: PosCommands,
    },
}

#[derive(Subcommand)]
enum PosCommands {
    /// Point the client at a new POS profile URL and fetch it
    SetUrl { url: String },
    /// Fetch the catalog again from the saved URL
    Refresh,
    /// Print the cached profile
    Show,
    /// Forget the cached profile
    Logout,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("festival_pos_sync=info".parse().unwrap())
                .add_directive("festival_pos_core=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    tracing::info!("Starting Festival POS Sync v{}", env!("CARGO_PKG_VERSION"));

    let state = match state::AppState::new(cli.settings, cli.data_dir) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Failed to initialize: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Run { interval, now } => commands::run(&state, interval, now).await,
        Commands::Retry => commands::retry(&state).await,
        Commands::Status => commands::status(&state).await,
        Commands::Enqueue { file, endpoint } => commands::enqueue(&state, &file, &endpoint).await,
        Commands::Sell { products, cash } => commands::sell(&state, &products, cash).await,
        Commands::Pos { command } => match command {
            PosCommands::SetUrl { url } => commands::pos_set_url(&state, &url).await,
            PosCommands::Refresh => commands::pos_refresh(&state).await,
            PosCommands::Show => commands::pos_show(&state),
            PosCommands::Logout => commands::pos_logout(&state),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
