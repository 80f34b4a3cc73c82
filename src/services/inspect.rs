use std::fmt;

use crate::context::SessionContext;
use crate::ports::session::{ContainerEntry, Playlist, PlaylistContainer, TrackInfo};

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum InspectError {
    #[error("invalid index {index}, the container has {count} entries")]
    InvalidIndex { index: usize, count: usize },

    #[error("entry {index} is not a playlist")]
    NotAPlaylist { index: usize },
}

/// Read-only view of one playlist, printed by `load`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistListing {
    pub name: String,
    pub owner: String,
    pub collaborative: bool,
    pub pending_changes: bool,
    pub tracks: Vec<TrackInfo>,
}

impl PlaylistListing {
    fn from_playlist(playlist: &dyn Playlist) -> Self {
        Self {
            name: playlist.name(),
            owner: playlist.owner_display_name(),
            collaborative: playlist.is_collaborative(),
            pending_changes: playlist.has_pending_changes(),
            tracks: playlist.tracks(),
        }
    }
}

impl fmt::Display for PlaylistListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Playlist {} by {}{}{}",
            self.name,
            self.owner,
            if self.collaborative {
                " (collaborative)"
            } else {
                ""
            },
            if self.pending_changes {
                " with pending changes"
            } else {
                ""
            }
        )?;
        for (index, track) in self.tracks.iter().enumerate() {
            writeln!(
                f,
                "{}. {} {}{} {}",
                index,
                if track.is_starred { '*' } else { ' ' },
                if track.is_local { "local" } else { "     " },
                if track.is_autolinked {
                    "autolinked"
                } else {
                    "          "
                },
                track.name
            )?;
        }
        Ok(())
    }
}

async fn loaded_container(ctx: &SessionContext) -> std::sync::Arc<dyn PlaylistContainer> {
    let container = ctx.session.playlist_container();
    if !container.is_loaded() {
        tracing::debug!("Waiting for playlist container to load");
        container.loaded().await;
    }
    container
}

/// Show the playlist at `index` of the session's container.
///
/// Starts no tracked calls; an index outside the container is reported as
/// an error before anything is loaded.
pub async fn load_playlist(
    ctx: &SessionContext,
    index: usize,
) -> Result<PlaylistListing, InspectError> {
    let container = loaded_container(ctx).await;
    let entries = container.entries();

    let entry = entries.get(index).ok_or(InspectError::InvalidIndex {
        index,
        count: entries.len(),
    })?;
    let ContainerEntry::Playlist(playlist) = entry else {
        return Err(InspectError::NotAPlaylist { index });
    };

    if !playlist.is_loaded() {
        playlist.loaded().await;
    }
    Ok(PlaylistListing::from_playlist(playlist.as_ref()))
}

/// Render the container as an indented tree.
pub async fn list_container(ctx: &SessionContext) -> String {
    let container = loaded_container(ctx).await;
    let mut level = 0usize;
    let mut lines = Vec::new();

    for (index, entry) in container.entries().iter().enumerate() {
        match entry {
            ContainerEntry::Playlist(playlist) => {
                let mut line = format!("{}. {}{}", index, "\t".repeat(level), playlist.name());
                if ctx.show_subscribers {
                    line.push_str(&format!(" ({} subscribers)", playlist.num_subscribers()));
                }
                lines.push(line);
            }
            ContainerEntry::FolderStart { name, id } => {
                lines.push(format!(
                    "{}. {}Folder: {} with id {}",
                    index,
                    "\t".repeat(level),
                    name,
                    id
                ));
                level += 1;
            }
            ContainerEntry::FolderEnd { id } => {
                level = level.saturating_sub(1);
                lines.push(format!(
                    "{}. {}End folder with id {}",
                    index,
                    "\t".repeat(level),
                    id
                ));
            }
            ContainerEntry::Placeholder => lines.push(format!("{}. Placeholder", index)),
        }
    }

    lines.join("\n")
}
