use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// On-disk snapshot of a user's library
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibrarySnapshot {
    pub user: String,
    #[serde(default)]
    pub container: ContainerSnapshot,
    /// Published containers of other users, keyed by canonical user name
    #[serde(default)]
    pub published: BTreeMap<String, ContainerSnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerSnapshot {
    #[serde(default)]
    pub entries: Vec<EntrySnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntrySnapshot {
    Playlist(PlaylistSnapshot),
    FolderStart { name: String, id: u64 },
    FolderEnd { id: u64 },
    Placeholder,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaylistSnapshot {
    pub name: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub collaborative: bool,
    #[serde(default)]
    pub pending_changes: bool,
    #[serde(default)]
    pub subscribers: u32,
    pub uri: Option<String>,
    #[serde(default)]
    pub tracks: Vec<TrackSnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackSnapshot {
    pub name: String,
    #[serde(default)]
    pub duration_ms: u32,
    pub uri: Option<String>,
    #[serde(default)]
    pub starred: bool,
    #[serde(default)]
    pub local: bool,
    #[serde(default)]
    pub autolinked: bool,
    pub album: Option<AlbumSnapshot>,
    #[serde(default)]
    pub artists: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlbumSnapshot {
    pub name: String,
    #[serde(default = "default_true")]
    pub loaded: bool,
}

fn default_true() -> bool {
    true
}
