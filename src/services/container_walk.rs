use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::completion_tracker::{CompletionTracker, Subscription, TrackedCall};
use crate::context::SessionContext;
use crate::ports::session::{ContainerEntry, PlaylistContainer};
use crate::safe_filename::safe_filename;
use crate::services::export_task::ExportTask;
use crate::string_list::StringList;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkSummary {
    pub playlists: usize,
    pub folders: usize,
    pub placeholders: usize,
}

/// Start walking `container` as one tracked call on `tracker`.
///
/// A loaded container is walked before this returns. Otherwise the walk runs
/// from the container's load notification; the wait is bound to the tracker
/// so releasing the tracker unsubscribes it.
pub fn dispatch(
    ctx: &SessionContext,
    container: Arc<dyn PlaylistContainer>,
    output_root: PathBuf,
    tracker: &Arc<CompletionTracker>,
) {
    let walk_call = tracker.track();

    if container.is_loaded() {
        walk(ctx, container.as_ref(), &output_root, tracker, walk_call);
        return;
    }

    tracing::debug!("{}: waiting for playlist container to load", tracker.label());
    let ctx = ctx.clone();
    let walk_tracker = Arc::clone(tracker);
    let handle = tokio::spawn(async move {
        container.loaded().await;
        walk(
            &ctx,
            container.as_ref(),
            &output_root,
            &walk_tracker,
            walk_call,
        );
    });
    tracker.bind(Subscription::new(handle.abort_handle()));
}

/// Create `directory` unless this walk already did.
fn ensure_directory(directory: &Path, created: &mut StringList) {
    if !created.add_to_set(directory.to_string_lossy()) {
        return;
    }
    if let Err(e) = std::fs::create_dir_all(directory) {
        tracing::warn!("mkdir(\"{}\") failed: {}", directory.display(), e);
    }
}

fn folder_segment(name: &str, id: u64) -> String {
    let segment = safe_filename(name);
    if segment.is_empty() {
        format!("folder-{id}")
    } else {
        segment
    }
}

/// Walk the entries of a loaded container, spawning one export per playlist.
///
/// Each folder level numbers its playlists from 1 in discovery order.
/// `walk_call` is finished once every entry has been dispatched.
pub fn walk(
    ctx: &SessionContext,
    container: &dyn PlaylistContainer,
    output_root: &Path,
    tracker: &Arc<CompletionTracker>,
    walk_call: TrackedCall,
) -> WalkSummary {
    let entries = container.entries();
    let mut summary = WalkSummary::default();
    let mut path = StringList::new();
    let mut sequences: Vec<u32> = vec![0];
    let mut created = StringList::new();

    tracing::info!(
        "{}: path = {}, {} entries in the container",
        tracker.label(),
        output_root.display(),
        entries.len()
    );
    ensure_directory(output_root, &mut created);

    for (index, entry) in entries.into_iter().enumerate() {
        let indent = "\t".repeat(path.len());
        let directory = path
            .iter()
            .fold(output_root.to_path_buf(), |directory, segment| directory.join(segment));

        match entry {
            ContainerEntry::Playlist(playlist) => {
                let name = playlist.name();
                if ctx.show_subscribers {
                    tracing::info!(
                        "{}. {}{} ({} subscribers)",
                        index,
                        indent,
                        name,
                        playlist.num_subscribers()
                    );
                } else {
                    tracing::info!("{}. {}{}", index, indent, name);
                }

                ensure_directory(&directory, &mut created);
                let sequence = match sequences.last_mut() {
                    Some(sequence) => {
                        *sequence += 1;
                        *sequence
                    }
                    None => 1,
                };
                let call = tracker.track();
                ExportTask::new(ctx, playlist, directory, sequence).spawn(move || call.finish());
                summary.playlists += 1;
            }
            ContainerEntry::FolderStart { name, id } => {
                tracing::info!("{}. {}Folder: {} with id {}", index, indent, name, id);
                let segment = folder_segment(&name, id);
                ensure_directory(&directory.join(&segment), &mut created);
                path.append(segment);
                sequences.push(0);
                summary.folders += 1;
            }
            ContainerEntry::FolderEnd { id } => {
                if path.remove_last().is_none() {
                    tracing::warn!("{}. End of folder {} without a matching start", index, id);
                    continue;
                }
                sequences.pop();
                let indent = "\t".repeat(path.len());
                tracing::info!("{}. {}End folder with id {}", index, indent, id);
            }
            ContainerEntry::Placeholder => {
                tracing::info!("{}. Placeholder", index);
                summary.placeholders += 1;
            }
        }
    }

    if !path.is_empty() {
        tracing::warn!(
            "{}: container ended inside folder {}",
            tracker.label(),
            path.join("/")
        );
    }
    path.release();

    tracing::info!(
        "{}: Made {} async calls.",
        tracker.label(),
        summary.playlists
    );
    walk_call.finish();
    summary
}
