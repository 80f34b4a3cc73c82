use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use color_eyre::eyre::{Result, WrapErr};
use tokio::sync::watch;

use crate::completion_tracker::Subscription;
use crate::link::Link;
use crate::ports::session::{
    AlbumInfo, ContainerEntry, Playlist, PlaylistContainer, Session, SessionError, TrackInfo,
};
use crate::snapshot::types::{
    ContainerSnapshot, EntrySnapshot, LibrarySnapshot, PlaylistSnapshot, TrackSnapshot,
};

/// How load notifications are delivered for a snapshot session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Everything is loaded when the session opens
    Immediate,
    /// The container, then each of its playlists, loads one delay apart
    Delayed(Duration),
    /// Nothing loads until `mark_loaded` is called
    #[cfg(test)]
    Manual,
}

impl From<&TrackSnapshot> for TrackInfo {
    fn from(track: &TrackSnapshot) -> Self {
        TrackInfo {
            name: track.name.clone(),
            duration_ms: track.duration_ms,
            is_starred: track.starred,
            is_local: track.local,
            is_autolinked: track.autolinked,
            link: track.uri.clone().map(Link::new),
            album: track.album.as_ref().map(|album| AlbumInfo {
                name: album.name.clone(),
                is_loaded: album.loaded,
            }),
            artists: track.artists.clone(),
        }
    }
}

async fn wait_until_loaded(loaded: &watch::Sender<bool>, what: &str) {
    let mut receiver = loaded.subscribe();
    let ok = receiver.wait_for(|loaded| *loaded).await.is_ok();
    if !ok {
        tracing::warn!("Load notification source for {} went away", what);
    }
}

pub struct SnapshotPlaylist {
    data: PlaylistSnapshot,
    loaded: watch::Sender<bool>,
}

impl SnapshotPlaylist {
    pub fn new(data: PlaylistSnapshot, loaded: bool) -> Arc<Self> {
        let (loaded, _) = watch::channel(loaded);
        Arc::new(Self { data, loaded })
    }

    pub fn mark_loaded(&self) {
        if !self.loaded.send_replace(true) {
            tracing::debug!("Playlist '{}' loaded", self.data.name);
        }
    }
}

#[async_trait::async_trait]
impl Playlist for SnapshotPlaylist {
    fn name(&self) -> String {
        self.data.name.clone()
    }

    fn owner_display_name(&self) -> String {
        self.data.owner.clone()
    }

    fn is_collaborative(&self) -> bool {
        self.data.collaborative
    }

    fn has_pending_changes(&self) -> bool {
        self.data.pending_changes
    }

    fn num_subscribers(&self) -> u32 {
        self.data.subscribers
    }

    fn link(&self) -> Option<Link> {
        self.data.uri.clone().map(Link::new)
    }

    fn is_loaded(&self) -> bool {
        *self.loaded.borrow()
    }

    async fn loaded(&self) {
        wait_until_loaded(&self.loaded, &self.data.name).await;
    }

    fn tracks(&self) -> Vec<TrackInfo> {
        if !self.is_loaded() {
            return Vec::new();
        }
        self.data.tracks.iter().map(TrackInfo::from).collect()
    }
}

pub struct SnapshotContainer {
    entries: Vec<ContainerEntry>,
    playlists: Vec<Arc<SnapshotPlaylist>>,
    loaded: watch::Sender<bool>,
}

impl SnapshotContainer {
    pub fn from_snapshot(snapshot: ContainerSnapshot, loaded: bool) -> Arc<Self> {
        let mut entries = Vec::with_capacity(snapshot.entries.len());
        let mut playlists = Vec::new();

        for entry in snapshot.entries {
            entries.push(match entry {
                EntrySnapshot::Playlist(data) => {
                    let playlist = SnapshotPlaylist::new(data, loaded);
                    playlists.push(Arc::clone(&playlist));
                    ContainerEntry::Playlist(playlist)
                }
                EntrySnapshot::FolderStart { name, id } => ContainerEntry::FolderStart { name, id },
                EntrySnapshot::FolderEnd { id } => ContainerEntry::FolderEnd { id },
                EntrySnapshot::Placeholder => ContainerEntry::Placeholder,
            });
        }

        let (loaded, _) = watch::channel(loaded);
        Arc::new(Self {
            entries,
            playlists,
            loaded,
        })
    }

    /// Playlists in container order, for driving their load notifications.
    pub fn playlists(&self) -> &[Arc<SnapshotPlaylist>] {
        &self.playlists
    }

    pub fn mark_loaded(&self) {
        if !self.loaded.send_replace(true) {
            tracing::debug!("Playlist container loaded ({} entries)", self.entries.len());
        }
    }

    /// Mark the container and then every playlist in it as loaded.
    #[cfg(test)]
    pub fn mark_all_loaded(&self) {
        self.mark_loaded();
        for playlist in &self.playlists {
            playlist.mark_loaded();
        }
    }
}

#[async_trait::async_trait]
impl PlaylistContainer for SnapshotContainer {
    fn is_loaded(&self) -> bool {
        *self.loaded.borrow()
    }

    async fn loaded(&self) {
        wait_until_loaded(&self.loaded, "playlist container").await;
    }

    fn entries(&self) -> Vec<ContainerEntry> {
        if !self.is_loaded() {
            return Vec::new();
        }
        self.entries.clone()
    }
}

pub struct SnapshotSession {
    user: String,
    container: Arc<SnapshotContainer>,
    published: BTreeMap<String, Arc<SnapshotContainer>>,
    logged_out: AtomicBool,
    _event_pump: Option<Subscription>,
}

impl SnapshotSession {
    /// Open a session from a JSON library snapshot on disk.
    pub async fn open(path: &Path, mode: LoadMode) -> Result<Arc<Self>> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .wrap_err_with(|| format!("Failed to read library snapshot: {}", path.display()))?;
        let library: LibrarySnapshot = serde_json::from_str(&contents)
            .wrap_err_with(|| format!("Failed to parse library snapshot: {}", path.display()))?;

        tracing::info!(
            "Opened library snapshot for '{}' from {}",
            library.user,
            path.display()
        );
        Ok(Self::from_library(library, mode))
    }

    /// Build a session from an in-memory snapshot.
    ///
    /// [`LoadMode::Delayed`] spawns the notification pump on the current
    /// tokio runtime; it is stopped when the session is dropped.
    pub fn from_library(library: LibrarySnapshot, mode: LoadMode) -> Arc<Self> {
        let loaded = mode == LoadMode::Immediate;
        let container = SnapshotContainer::from_snapshot(library.container, loaded);
        let published: BTreeMap<_, _> = library
            .published
            .into_iter()
            .map(|(user, snapshot)| (user, SnapshotContainer::from_snapshot(snapshot, loaded)))
            .collect();

        let event_pump = match mode {
            LoadMode::Delayed(delay) => {
                let containers: Vec<_> = std::iter::once(Arc::clone(&container))
                    .chain(published.values().cloned())
                    .collect();
                let handle = tokio::spawn(pump_load_events(containers, delay));
                Some(Subscription::new(handle.abort_handle()))
            }
            LoadMode::Immediate => None,
            #[cfg(test)]
            LoadMode::Manual => None,
        };

        Arc::new(Self {
            user: library.user,
            container,
            published,
            logged_out: AtomicBool::new(false),
            _event_pump: event_pump,
        })
    }

    #[cfg(test)]
    pub fn container_handle(&self) -> &Arc<SnapshotContainer> {
        &self.container
    }
}

async fn pump_load_events(containers: Vec<Arc<SnapshotContainer>>, delay: Duration) {
    for container in containers {
        tokio::time::sleep(delay).await;
        container.mark_loaded();
        for playlist in container.playlists() {
            tokio::time::sleep(delay).await;
            playlist.mark_loaded();
        }
    }
}

impl Session for SnapshotSession {
    fn user_name(&self) -> String {
        self.user.clone()
    }

    fn playlist_container(&self) -> Arc<dyn PlaylistContainer> {
        self.container.clone()
    }

    fn published_container(
        &self,
        user: &str,
    ) -> Result<Arc<dyn PlaylistContainer>, SessionError> {
        if self.is_logged_out() {
            return Err(SessionError::LoggedOut);
        }
        self.published
            .get(user)
            .map(|container| Arc::clone(container) as Arc<dyn PlaylistContainer>)
            .ok_or_else(|| SessionError::UnknownUser {
                user: user.to_string(),
            })
    }

    fn logout(&self) {
        if !self.logged_out.swap(true, Ordering::SeqCst) {
            tracing::info!("Logged out {}", self.user);
        }
    }

    fn is_logged_out(&self) -> bool {
        self.logged_out.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{library, playlist, track};

    fn two_playlists() -> LibrarySnapshot {
        let mut library = library(vec![
            EntrySnapshot::Playlist(playlist("One", "spotify:playlist:1", vec![track("a")])),
            EntrySnapshot::Playlist(playlist("Two", "spotify:playlist:2", vec![])),
        ]);
        library
            .published
            .insert("bob".into(), ContainerSnapshot::default());
        library
    }

    #[tokio::test]
    async fn test_immediate_mode_is_loaded() {
        let session = SnapshotSession::from_library(two_playlists(), LoadMode::Immediate);
        let container = session.playlist_container();

        assert!(container.is_loaded());
        let entries = container.entries();
        assert_eq!(entries.len(), 2);
        let ContainerEntry::Playlist(first) = &entries[0] else {
            panic!("expected playlist");
        };
        assert!(first.is_loaded());
        assert_eq!(first.tracks().len(), 1);
        assert_eq!(first.link(), Some(Link::new("spotify:playlist:1")));
    }

    #[tokio::test]
    async fn test_manual_mode_waits_for_mark() {
        let session = SnapshotSession::from_library(two_playlists(), LoadMode::Manual);
        let container = session.playlist_container();
        assert!(!container.is_loaded());
        assert!(container.entries().is_empty());

        let waiter = {
            let container = container.clone();
            tokio::spawn(async move { container.loaded().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        session.container_handle().mark_loaded();
        waiter.await.unwrap();
        assert_eq!(container.entries().len(), 2);

        let playlist = &session.container_handle().playlists()[0];
        assert!(playlist.tracks().is_empty());
        playlist.mark_loaded();
        playlist.loaded().await;
        assert_eq!(playlist.tracks().len(), 1);
    }

    #[tokio::test]
    async fn test_delayed_mode_loads_everything() {
        let session = SnapshotSession::from_library(
            two_playlists(),
            LoadMode::Delayed(Duration::from_millis(1)),
        );
        let container = session.playlist_container();

        tokio::time::timeout(Duration::from_secs(5), async {
            container.loaded().await;
            for playlist in session.container_handle().playlists() {
                playlist.loaded().await;
            }
        })
        .await
        .unwrap();

        assert!(
            session
                .container_handle()
                .playlists()
                .iter()
                .all(|playlist| playlist.is_loaded())
        );
    }

    #[tokio::test]
    async fn test_published_container_lookup() {
        let session = SnapshotSession::from_library(two_playlists(), LoadMode::Immediate);

        assert!(session.published_container("bob").is_ok());
        assert_eq!(
            session.published_container("eve").err(),
            Some(SessionError::UnknownUser {
                user: "eve".into()
            })
        );

        session.logout();
        assert!(session.is_logged_out());
        assert_eq!(
            session.published_container("bob").err(),
            Some(SessionError::LoggedOut)
        );
    }

    #[tokio::test]
    async fn test_open_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("library.json");
        std::fs::write(&path, serde_json::to_string(&two_playlists()).unwrap()).unwrap();

        let session = SnapshotSession::open(&path, LoadMode::Immediate)
            .await
            .unwrap();
        assert_eq!(session.user_name(), "tester");
        assert_eq!(session.playlist_container().entries().len(), 2);

        assert!(
            SnapshotSession::open(&dir.path().join("missing.json"), LoadMode::Immediate)
                .await
                .is_err()
        );
    }
}
