use std::sync::Arc;

use crate::context::SessionContext;
use crate::link::DEFAULT_LINK_BASE_URL;
use crate::ports::session::{MockSession, Session};
use crate::snapshot::SnapshotSession;
use crate::snapshot::types::{
    AlbumSnapshot, ContainerSnapshot, EntrySnapshot, LibrarySnapshot, PlaylistSnapshot,
    TrackSnapshot,
};

pub fn track(name: &str) -> TrackSnapshot {
    TrackSnapshot {
        name: name.to_string(),
        duration_ms: 180_000,
        uri: Some(format!("spotify:track:{name}")),
        album: Some(AlbumSnapshot {
            name: format!("{name} (single)"),
            loaded: true,
        }),
        artists: vec!["Someone".to_string()],
        ..Default::default()
    }
}

pub fn playlist(name: &str, uri: &str, tracks: Vec<TrackSnapshot>) -> PlaylistSnapshot {
    PlaylistSnapshot {
        name: name.to_string(),
        owner: "tester".to_string(),
        uri: Some(uri.to_string()),
        tracks,
        ..Default::default()
    }
}

pub fn playlist_entry(name: &str, uri: &str) -> EntrySnapshot {
    EntrySnapshot::Playlist(playlist(name, uri, vec![track(&format!("{name} song"))]))
}

pub fn folder_start(name: &str, id: u64) -> EntrySnapshot {
    EntrySnapshot::FolderStart {
        name: name.to_string(),
        id,
    }
}

pub fn folder_end(id: u64) -> EntrySnapshot {
    EntrySnapshot::FolderEnd { id }
}

pub fn library(entries: Vec<EntrySnapshot>) -> LibrarySnapshot {
    LibrarySnapshot {
        user: "tester".to_string(),
        container: ContainerSnapshot { entries },
        ..Default::default()
    }
}

pub fn context_for(session: Arc<dyn Session>) -> SessionContext {
    SessionContext {
        session,
        show_subscribers: false,
        link_base_url: DEFAULT_LINK_BASE_URL.to_string(),
    }
}

pub fn snapshot_context(session: Arc<SnapshotSession>) -> SessionContext {
    context_for(session)
}

/// Context over a session with no expectations, for code that never touches it.
pub fn mock_context() -> SessionContext {
    context_for(Arc::new(MockSession::new()))
}
