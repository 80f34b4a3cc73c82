mod commands;
mod completion_tracker;
mod config;
mod context;
mod link;
mod logging;
mod ports;
mod safe_filename;
mod services;
mod shell;
mod snapshot;
mod string_list;
#[cfg(test)]
mod test_utils;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};

use crate::{
    commands::SessionCommand, config::Config, context::SessionContext, logging::setup_logging,
    snapshot::SnapshotSession,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The config file to use
    #[arg(short, long, env = "SPOT_EXPORT_CONFIG")]
    config: Option<PathBuf>,

    /// Console log level (default: off)
    #[arg(long, default_value = "off", global = true, env = "LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// File log level (default: debug)
    #[arg(long, default_value = "debug", global = true)]
    log_file_level: log::LevelFilter,

    /// Path to log file
    #[arg(long, env = "SPOT_EXPORT_LOG_FILE", global = true)]
    log_file: Option<PathBuf>,

    /// Library snapshot to open instead of the one in the config
    #[arg(long, env = "SPOT_EXPORT_SNAPSHOT", global = true)]
    snapshot: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(flatten)]
    Session(SessionCommand),
    /// Read commands interactively from stdin
    Shell,
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Create a default config file, if it doesn't exist
    CreateDefault,
    /// Print the path to the config file
    Path,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    setup_logging(args.log_level, args.log_file.clone(), args.log_file_level)?;

    log::debug!("spot-export starting");

    let config = {
        if let Some(config) = &args.config {
            Config::from_file(config)
        } else {
            Config::load()
        }
    }
    .with_context(|| "Failed to load spot-export config")?;

    match args.command {
        Commands::Config(config_commands) => match config_commands {
            ConfigCommands::CreateDefault => {
                let path = Config::create_default()?;
                log::info!("Default config available at {}", path.display());
            }
            ConfigCommands::Path => match Config::config_path() {
                Some(path) => println!("{}", path.display()),
                None => println!("No default config path found"),
            },
        },
        Commands::Session(command) => {
            let ctx = open_session(args.snapshot, &config).await?;
            commands::dispatch(&ctx, &config, command, config.logout_after_save).await?;
        }
        Commands::Shell => {
            let ctx = open_session(args.snapshot, &config).await?;
            shell::run(&ctx, &config).await?;
        }
    }

    log::debug!("spot-export finished");
    Ok(())
}

async fn open_session(snapshot: Option<PathBuf>, config: &Config) -> Result<SessionContext> {
    let snapshot = snapshot.or_else(|| config.snapshot_path()).ok_or_else(|| {
        eyre!("No library snapshot given. Pass --snapshot or set `snapshot` in the config")
    })?;
    log::debug!("Opening library snapshot at: {}", snapshot.display());
    let session = SnapshotSession::open(&snapshot, config.load_mode()).await?;
    Ok(SessionContext::new(session, config))
}
