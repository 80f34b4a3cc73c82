use clap::{Parser, Subcommand};
use color_eyre::Result;
use color_eyre::eyre::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::commands::{self, SessionCommand};
use crate::config::Config;
use crate::context::SessionContext;

#[derive(Parser, Debug, PartialEq, Eq)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum ShellCommand {
    #[command(flatten)]
    Session(SessionCommand),
    /// Log out and leave the shell
    Logout,
    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

fn parse_line(line: &str) -> Result<ShellLine, clap::Error> {
    ShellLine::try_parse_from(line.split_whitespace())
}

/// Run one parsed line. Returns `false` when the shell should stop.
///
/// Saves started here keep the session open; only `logout` ends it.
async fn handle(ctx: &SessionContext, config: &Config, command: ShellCommand) -> bool {
    match command {
        ShellCommand::Session(command) => {
            if let Err(e) = commands::dispatch(ctx, config, command, false).await {
                log::error!("{:#}", e);
                println!("Error: {e}");
            }
            true
        }
        ShellCommand::Logout => {
            ctx.session.logout();
            false
        }
        ShellCommand::Quit => false,
    }
}

/// Read commands from stdin until `quit`, `logout` or end of input.
pub async fn run(ctx: &SessionContext, config: &Config) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    println!(
        "Logged in as {}. Type `help` for commands.",
        ctx.session.user_name()
    );
    loop {
        if ctx.session.is_logged_out() {
            log::info!("Session logged out, leaving shell");
            break;
        }

        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await.wrap_err("Failed to read stdin")? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match parse_line(&line) {
            Ok(parsed) => parsed.command,
            Err(e) => {
                // Help and usage errors are both printed and the shell continues
                let _ = e.print();
                continue;
            }
        };

        if !handle(ctx, config, command).await {
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::ports::session::Session;
    use crate::snapshot::{LoadMode, SnapshotSession};
    use crate::test_utils::{library, playlist_entry, snapshot_context};

    fn parsed(line: &str) -> ShellCommand {
        parse_line(line).unwrap().command
    }

    #[test]
    fn test_parse_session_commands() {
        assert_eq!(
            parsed("save"),
            ShellCommand::Session(SessionCommand::Save { directory: None })
        );
        assert_eq!(
            parsed("  save   backup/dir "),
            ShellCommand::Session(SessionCommand::Save {
                directory: Some(PathBuf::from("backup/dir"))
            })
        );
        assert_eq!(
            parsed("load 3"),
            ShellCommand::Session(SessionCommand::Load { index: 3 })
        );
        assert_eq!(
            parsed("save-published alice bob -d out"),
            ShellCommand::Session(SessionCommand::SavePublished {
                users: vec!["alice".into(), "bob".into()],
                directory: Some(PathBuf::from("out")),
            })
        );
        assert_eq!(parsed("ls"), ShellCommand::Session(SessionCommand::Ls));
    }

    #[test]
    fn test_parse_shell_commands() {
        assert_eq!(parsed("quit"), ShellCommand::Quit);
        assert_eq!(parsed("exit"), ShellCommand::Quit);
        assert_eq!(parsed("logout"), ShellCommand::Logout);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse_line("load").is_err());
        assert!(parse_line("load -1").is_err());
        assert!(parse_line("load abc").is_err());
        assert!(parse_line("save-published").is_err());
        assert!(parse_line("dance").is_err());
    }

    #[tokio::test]
    async fn test_save_keeps_session_logged_in() {
        let dir = tempfile::tempdir().unwrap();
        let session = SnapshotSession::from_library(
            library(vec![playlist_entry("Kept", "spotify:playlist:kept")]),
            LoadMode::Immediate,
        );
        let ctx = snapshot_context(session.clone());
        let config = Config::default();
        assert!(config.logout_after_save);

        let line = format!("save {}", dir.path().display());
        let keep_going = handle(&ctx, &config, parsed(&line)).await;

        assert!(keep_going);
        assert!(!session.is_logged_out());
        assert!(dir.path().join("001--Kept--spotify_playlist_kept.json").is_file());
    }

    #[tokio::test]
    async fn test_logout_and_quit_stop_the_shell() {
        let session = SnapshotSession::from_library(library(vec![]), LoadMode::Immediate);
        let ctx = snapshot_context(session.clone());
        let config = Config::default();

        assert!(!handle(&ctx, &config, ShellCommand::Quit).await);
        assert!(!session.is_logged_out());

        assert!(!handle(&ctx, &config, ShellCommand::Logout).await);
        assert!(session.is_logged_out());
    }
}
