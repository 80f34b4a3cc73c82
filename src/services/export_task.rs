use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use color_eyre::eyre::{Result, WrapErr};
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::context::SessionContext;
use crate::link::{Link, LinkError};
use crate::ports::session::{Playlist, TrackInfo};
use crate::safe_filename::safe_filename;

/// Album name written while the album metadata has not arrived yet.
pub const UNKNOWN_ALBUM: &str = "Dunno yet.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SongRecord {
    pub name: String,
    pub artists: Vec<String>,
    pub album: String,
    pub duration: u32,
    pub link: String,
}

/// The JSON document written for one playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaylistRecord {
    pub playlist_name: String,
    pub http_link: String,
    pub spotify_link: String,
    pub songs: Vec<SongRecord>,
}

#[derive(Debug)]
pub enum ExportState {
    /// Waiting for the playlist's load notification
    Pending(JoinHandle<()>),
    /// Output written (or writing failed) and completion reported
    Done,
}

/// Render a link, degrading to an empty string when it is missing or does not render.
fn render_link(
    link: Option<&Link>,
    what: &str,
    render: impl FnOnce(&Link) -> Result<String, LinkError>,
) -> String {
    let Some(link) = link else {
        tracing::warn!("No link available for {}", what);
        return String::new();
    };
    render(link).unwrap_or_else(|e| {
        tracing::warn!("Rendering link for {} failed: {}", what, e);
        String::new()
    })
}

impl From<&TrackInfo> for SongRecord {
    fn from(track: &TrackInfo) -> Self {
        let album = match &track.album {
            Some(album) if album.is_loaded => album.name.clone(),
            _ => UNKNOWN_ALBUM.to_string(),
        };
        SongRecord {
            name: track.name.clone(),
            artists: track.artists.clone(),
            album,
            duration: track.duration_ms,
            link: render_link(track.link.as_ref(), &track.name, |link| {
                link.as_uri().map(str::to_string)
            }),
        }
    }
}

/// Exports one playlist to `<directory>/<NNN>--<name>--<link>.json` once it is loaded.
pub struct ExportTask {
    playlist: Arc<dyn Playlist>,
    directory: PathBuf,
    sequence: u32,
    link_base_url: String,
}

impl ExportTask {
    pub fn new(
        ctx: &SessionContext,
        playlist: Arc<dyn Playlist>,
        directory: impl Into<PathBuf>,
        sequence: u32,
    ) -> Self {
        Self {
            playlist,
            directory: directory.into(),
            sequence,
            link_base_url: ctx.link_base_url.clone(),
        }
    }

    pub fn output_path(&self) -> PathBuf {
        let name = self.playlist.name();
        let link = self.playlist.link();
        let safe_link = render_link(link.as_ref(), &name, Link::to_safe_string);
        self.directory.join(format!(
            "{:03}--{}--{}.json",
            self.sequence,
            safe_filename(&name),
            safe_link
        ))
    }

    /// Export the playlist and call `on_done` exactly once afterwards.
    ///
    /// An already loaded playlist is exported before this returns. Otherwise
    /// the export waits on a tokio task for the load notification; aborting
    /// that task drops `on_done` without calling it.
    pub fn spawn(self, on_done: impl FnOnce() + Send + 'static) -> ExportState {
        if self.playlist.is_loaded() {
            self.run(on_done);
            return ExportState::Done;
        }

        tracing::debug!("Waiting for playlist '{}' to load", self.playlist.name());
        let handle = tokio::spawn(async move {
            self.playlist.loaded().await;
            self.run(on_done);
        });
        ExportState::Pending(handle)
    }

    fn run(self, on_done: impl FnOnce()) {
        tracing::info!("Playlist '{}' ready.", self.playlist.name());
        let path = self.output_path();
        match self.write(&path) {
            Ok(()) => tracing::info!("Saved {}", path.display()),
            Err(e) => tracing::error!("{} is not writable: {:#}", path.display(), e),
        }
        on_done();
    }

    pub fn record(&self) -> PlaylistRecord {
        let name = self.playlist.name();
        let link = self.playlist.link();

        PlaylistRecord {
            http_link: render_link(link.as_ref(), &name, |link| {
                link.to_http_url(&self.link_base_url)
            }),
            spotify_link: render_link(link.as_ref(), &name, |link| {
                link.as_uri().map(str::to_string)
            }),
            songs: self.playlist.tracks().iter().map(SongRecord::from).collect(),
            playlist_name: name,
        }
    }

    fn write(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .wrap_err_with(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.record())
            .wrap_err("Failed to serialize playlist")?;
        writer.write_all(b"\n")?;
        writer.flush().wrap_err("Failed to flush playlist file")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::ports::session::{AlbumInfo, MockPlaylist};
    use crate::test_utils::mock_context;

    fn sample_tracks() -> Vec<TrackInfo> {
        vec![
            TrackInfo {
                name: "Intro".into(),
                duration_ms: 61_000,
                is_starred: false,
                is_local: false,
                is_autolinked: false,
                link: Some(Link::new("spotify:track:aaa")),
                album: Some(AlbumInfo {
                    name: "Debut".into(),
                    is_loaded: true,
                }),
                artists: vec!["First".into(), "Second".into()],
            },
            TrackInfo {
                name: "Outro".into(),
                duration_ms: 120_500,
                is_starred: true,
                is_local: false,
                is_autolinked: false,
                link: None,
                album: Some(AlbumInfo {
                    name: "Not here yet".into(),
                    is_loaded: false,
                }),
                artists: vec![],
            },
        ]
    }

    fn mock_playlist(loaded: bool) -> MockPlaylist {
        let mut playlist = MockPlaylist::new();
        playlist
            .expect_name()
            .returning(|| "Road Trip. Vol 2".to_string());
        playlist
            .expect_link()
            .returning(|| Some(Link::new("spotify:user:me:playlist:xyz")));
        playlist.expect_is_loaded().return_const(loaded);
        playlist.expect_loaded().returning(|| ());
        playlist.expect_tracks().returning(sample_tracks);
        playlist
    }

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        (calls, move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_output_path() {
        let ctx = mock_context();
        let task = ExportTask::new(&ctx, Arc::new(mock_playlist(true)), "/out/Rock", 7);

        assert_eq!(
            task.output_path(),
            PathBuf::from("/out/Rock/007--Road_Trip__Vol_2--spotify_user_me_playlist_xyz.json")
        );
    }

    #[test]
    fn test_record() {
        let ctx = mock_context();
        let task = ExportTask::new(&ctx, Arc::new(mock_playlist(true)), "/out", 1);
        let record = task.record();

        assert_eq!(record.playlist_name, "Road Trip. Vol 2");
        assert_eq!(record.spotify_link, "spotify:user:me:playlist:xyz");
        assert_eq!(
            record.http_link,
            "http://open.spotify.com/user/me/playlist/xyz"
        );
        assert_eq!(
            record.songs[0],
            SongRecord {
                name: "Intro".into(),
                artists: vec!["First".into(), "Second".into()],
                album: "Debut".into(),
                duration: 61_000,
                link: "spotify:track:aaa".into(),
            }
        );
        assert_eq!(record.songs[1].album, UNKNOWN_ALBUM);
        assert!(record.songs[1].artists.is_empty());
        assert_eq!(record.songs[1].link, "");
    }

    #[test]
    fn test_missing_playlist_link_degrades() {
        let ctx = mock_context();
        let mut playlist = MockPlaylist::new();
        playlist.expect_name().returning(|| "Nameless".to_string());
        playlist.expect_link().returning(|| None);
        playlist.expect_tracks().returning(Vec::new);
        let task = ExportTask::new(&ctx, Arc::new(playlist), "/out", 3);

        let record = task.record();
        assert_eq!(record.http_link, "");
        assert_eq!(record.spotify_link, "");
        assert_eq!(task.output_path(), PathBuf::from("/out/003--Nameless--.json"));
    }

    #[tokio::test]
    async fn test_loaded_playlist_exports_before_returning() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = mock_context();
        let task = ExportTask::new(&ctx, Arc::new(mock_playlist(true)), dir.path(), 1);
        let path = task.output_path();
        let (calls, on_done) = counter();

        let state = task.spawn(on_done);

        assert!(matches!(state, ExportState::Done));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["playlist_name"], "Road Trip. Vol 2");
        assert_eq!(json["songs"].as_array().unwrap().len(), 2);
        assert_eq!(json["songs"][0]["duration"], 61_000);
        assert_eq!(json["songs"][1]["artists"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_pending_playlist_exports_after_load() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = mock_context();
        let task = ExportTask::new(&ctx, Arc::new(mock_playlist(false)), dir.path(), 2);
        let path = task.output_path();
        let (calls, on_done) = counter();

        let ExportState::Pending(handle) = task.spawn(on_done) else {
            panic!("unloaded playlist should be pending");
        };
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        handle.await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_unwritable_directory_still_reports_done() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does").join("not").join("exist");
        let ctx = mock_context();
        let task = ExportTask::new(&ctx, Arc::new(mock_playlist(true)), &missing, 1);
        let (calls, on_done) = counter();

        task.spawn(on_done);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!missing.exists());
    }

    #[tokio::test]
    async fn test_rerun_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = mock_context();

        for _ in 0..2 {
            let task = ExportTask::new(&ctx, Arc::new(mock_playlist(true)), dir.path(), 1);
            task.spawn(|| {});
        }

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }
}
