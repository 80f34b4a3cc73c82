use std::path::PathBuf;

use clap::Subcommand;
use color_eyre::Result;

use crate::config::Config;
use crate::context::SessionContext;
use crate::services::{inspect, save};

/// Commands that act on an open session, shared by the CLI and the shell.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Export every playlist as JSON, mirroring the folder tree
    Save {
        /// Output directory (default: `output_directory` from the config)
        directory: Option<PathBuf>,
    },
    /// Export the published playlists of other users
    SavePublished {
        /// Canonical user names
        #[arg(required = true)]
        users: Vec<String>,

        /// Output directory, one subdirectory per user
        #[arg(short, long)]
        directory: Option<PathBuf>,
    },
    /// Print the tracks of the playlist at a container index
    Load {
        /// Position in the playlist container, starting at 0
        index: usize,
    },
    /// List the playlist container
    Ls,
}

/// Run one session command. `logout` ends the session once a save converges.
pub async fn dispatch(
    ctx: &SessionContext,
    config: &Config,
    command: SessionCommand,
    logout: bool,
) -> Result<()> {
    match command {
        SessionCommand::Save { directory } => {
            let directory = directory.unwrap_or_else(|| config.output_directory_path());
            let report = save::save(ctx, directory, logout).await?;
            println!(
                "Exported {} playlists to {}",
                report.exported,
                report.output_root.display()
            );
        }
        SessionCommand::SavePublished { users, directory } => {
            let directory = directory.unwrap_or_else(|| config.output_directory_path());
            let reports =
                save::save_published(ctx, &users, directory, logout).await?;
            for report in reports {
                println!(
                    "Exported {} playlists of {} to {}",
                    report.exported,
                    report.label,
                    report.output_root.display()
                );
            }
        }
        SessionCommand::Load { index } => {
            let listing = inspect::load_playlist(ctx, index).await?;
            print!("{listing}");
        }
        SessionCommand::Ls => {
            println!("{}", inspect::list_container(ctx).await);
        }
    }
    Ok(())
}
