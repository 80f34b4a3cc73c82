use std::fmt;
use std::sync::Arc;

use crate::link::Link;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("No published playlists known for user `{user}`")]
    UnknownUser { user: String },

    #[error("Session is logged out")]
    LoggedOut,
}

/// Album metadata attached to a track. `is_loaded` is false until the
/// session has fetched the album itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumInfo {
    pub name: String,
    pub is_loaded: bool,
}

/// Decoupled representation of a track inside a loaded playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub name: String,
    pub duration_ms: u32,
    pub is_starred: bool,
    pub is_local: bool,
    pub is_autolinked: bool,
    pub link: Option<Link>,
    pub album: Option<AlbumInfo>,
    pub artists: Vec<String>,
}

/// One slot of a playlist container. Folders are flattened into start/end
/// markers around the entries they contain.
#[derive(Clone)]
pub enum ContainerEntry {
    Playlist(Arc<dyn Playlist>),
    FolderStart { name: String, id: u64 },
    FolderEnd { id: u64 },
    Placeholder,
}

impl fmt::Debug for ContainerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerEntry::Playlist(playlist) => {
                f.debug_tuple("Playlist").field(&playlist.name()).finish()
            }
            ContainerEntry::FolderStart { name, id } => f
                .debug_struct("FolderStart")
                .field("name", name)
                .field("id", id)
                .finish(),
            ContainerEntry::FolderEnd { id } => {
                f.debug_struct("FolderEnd").field("id", id).finish()
            }
            ContainerEntry::Placeholder => f.write_str("Placeholder"),
        }
    }
}

/// Port trait wrapping a playlist handle of the streaming session.
///
/// Metadata accessors may return defaults until the playlist is loaded;
/// `loaded` resolves once it is. Dropping the `loaded` future unsubscribes.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Playlist: Send + Sync {
    fn name(&self) -> String;
    fn owner_display_name(&self) -> String;
    fn is_collaborative(&self) -> bool;
    fn has_pending_changes(&self) -> bool;
    fn num_subscribers(&self) -> u32;
    fn link(&self) -> Option<Link>;
    fn is_loaded(&self) -> bool;
    async fn loaded(&self);
    fn tracks(&self) -> Vec<TrackInfo>;
}

/// Port trait wrapping the ordered tree of playlists and folder markers.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PlaylistContainer: Send + Sync {
    fn is_loaded(&self) -> bool;
    async fn loaded(&self);
    fn entries(&self) -> Vec<ContainerEntry>;
}

/// Port trait wrapping a logged-in session.
///
/// Implementations live in `snapshot` (file backed) or test mocks.
#[cfg_attr(test, mockall::automock)]
pub trait Session: Send + Sync {
    fn user_name(&self) -> String;
    fn playlist_container(&self) -> Arc<dyn PlaylistContainer>;
    fn published_container(&self, user: &str)
    -> Result<Arc<dyn PlaylistContainer>, SessionError>;
    fn logout(&self);
    fn is_logged_out(&self) -> bool;
}
