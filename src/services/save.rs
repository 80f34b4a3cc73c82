use std::path::PathBuf;
use std::sync::Arc;

use color_eyre::eyre::{Result, WrapErr};
use tokio::sync::{mpsc, oneshot};

use crate::completion_tracker::CompletionTracker;
use crate::context::SessionContext;
use crate::ports::session::PlaylistContainer;
use crate::safe_filename::safe_filename;
use crate::services::container_walk;

/// Outcome of one converged container export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub label: String,
    pub output_root: PathBuf,
    pub exported: usize,
}

/// Export every playlist in `container` below `output_root`.
///
/// `on_complete` runs exactly once, after the walk and every export it
/// started have finished, and the tracker is released right before it.
pub fn save_container(
    ctx: &SessionContext,
    container: Arc<dyn PlaylistContainer>,
    output_root: PathBuf,
    label: impl Into<String>,
    on_complete: impl FnOnce(SaveReport) + Send + 'static,
) -> Arc<CompletionTracker> {
    let tracker = CompletionTracker::new(label);
    container_walk::dispatch(ctx, container, output_root.clone(), &tracker);

    let finalizer_tracker = Arc::clone(&tracker);
    tracker.attach_finalizer(move || {
        let counts = finalizer_tracker.counts();
        if let Err(e) = finalizer_tracker.release() {
            tracing::warn!("{}", e);
        }
        on_complete(SaveReport {
            label: finalizer_tracker.label().to_string(),
            output_root,
            // The walk itself is one of the calls
            exported: counts.started.saturating_sub(1),
        });
    });

    tracker
}

/// Export the session's own playlist container and wait for it to converge.
pub async fn save(ctx: &SessionContext, output_root: PathBuf, logout: bool) -> Result<SaveReport> {
    let (done_tx, done_rx) = oneshot::channel();
    let session = Arc::clone(&ctx.session);

    tracing::info!("Saving playlists to {}", output_root.display());
    save_container(
        ctx,
        session.playlist_container(),
        output_root,
        "save",
        move |report| {
            if logout {
                session.logout();
            }
            let _ = done_tx.send(report);
        },
    );

    done_rx
        .await
        .wrap_err("Save finished without reporting back")
}

/// Export the published containers of `users`, one subdirectory per user.
///
/// Each user's container converges on its own tracker; those trackers in turn
/// are the calls of one outer tracker. Users the session does not know are
/// skipped without starting a call.
pub async fn save_published(
    ctx: &SessionContext,
    users: &[String],
    output_root: PathBuf,
    logout: bool,
) -> Result<Vec<SaveReport>> {
    let outer = CompletionTracker::new("published");
    let (report_tx, mut report_rx) = mpsc::unbounded_channel();

    tracing::info!("Saving playlists for {} users", users.len());
    for user in users {
        let container = match ctx.session.published_container(user) {
            Ok(container) => container,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", user, e);
                continue;
            }
        };

        tracing::info!("Saving playlists for {}", user);
        let call = outer.track();
        let report_tx = report_tx.clone();
        save_container(
            ctx,
            container,
            output_root.join(safe_filename(user)),
            user.clone(),
            move |report| {
                let _ = report_tx.send(report);
                call.finish();
            },
        );
    }
    drop(report_tx);

    let (done_tx, done_rx) = oneshot::channel();
    let session = Arc::clone(&ctx.session);
    let finalizer_tracker = Arc::clone(&outer);
    outer.attach_finalizer(move || {
        if let Err(e) = finalizer_tracker.release() {
            tracing::warn!("{}", e);
        }
        if logout {
            session.logout();
        }
        let _ = done_tx.send(());
    });
    done_rx
        .await
        .wrap_err("Published save finished without reporting back")?;

    let mut reports = Vec::new();
    while let Some(report) = report_rx.recv().await {
        reports.push(report);
    }
    Ok(reports)
}
