//! Producer loop: catalog path → file listing → one queued task per file.

use anyhow::Result;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use crate::engine::progress::set_bar_total;
use crate::engine::tools::{is_safe_file_name, is_safe_relative_path};
use crate::{DownloadTask, QueueItem, RemoteFile};

use super::context::ProducerContext;
use super::queue::TaskQueue;

/// `<namespace>/<type_tag>/<path>/<filename>`
pub fn build_remote_key(namespace: &str, type_tag: &str, path: &str, filename: &str) -> String {
    format!("{namespace}/{type_tag}/{path}/{filename}")
}

/// Task for one listed file, or `None` when the listing entry has no usable name (empty, or one
/// that would escape its directory).
pub fn task_for(ctx: &ProducerContext<'_>, path: &str, file: RemoteFile) -> Option<DownloadTask> {
    if !is_safe_file_name(&file.name) {
        return None;
    }
    Some(DownloadTask {
        remote_key: build_remote_key(ctx.namespace, ctx.type_tag, path, &file.name),
        destination_dir: destination_dir(&ctx.download_root, path),
        filename: file.name,
        size: file.size,
    })
}

/// Local directory for a catalog path under the download root.
pub fn destination_dir(root: &Path, path: &str) -> PathBuf {
    root.join(path)
}

/// List each path in order and enqueue its files. Listing failures and empty listings skip the
/// path. Stops early (without error) once cancellation is requested, between paths or between
/// files of one path. Returns tasks enqueued.
pub fn run_producer_loop(
    queue: &TaskQueue,
    ctx: &ProducerContext<'_>,
    paths: &[&str],
) -> Result<usize> {
    let mut enqueued = 0_usize;
    let total_paths = paths.len();
    'paths: for (i, path) in paths.iter().enumerate() {
        if ctx.is_cancelled() {
            warn!("Cancellation requested; not queueing remaining {} path(s)", total_paths - i);
            break;
        }
        if !is_safe_relative_path(path) {
            warn!("Skipping path {path}: not a plain relative path");
            continue;
        }
        info!("Processing path {}/{}: {}", i + 1, total_paths, path);
        let files = match ctx.lister.list(ctx.table, path) {
            Ok(files) => files,
            Err(e) => {
                warn!("Skipping path {path}: {e:#}");
                continue;
            }
        };
        if files.is_empty() {
            info!("No files found in path: {path}");
            continue;
        }
        let listed = files.len();
        let mut queued_here = 0_usize;
        for file in files {
            if ctx.is_cancelled() {
                warn!(
                    "Cancellation requested; stopped queueing {path} after {queued_here} of {listed} file(s)"
                );
                break 'paths;
            }
            let Some(task) = task_for(ctx, path, file) else {
                debug!("Ignoring listing entry without a usable name under {path}");
                continue;
            };
            queue.put(QueueItem::Task(task))?;
            enqueued += 1;
            queued_here += 1;
            if let Some(bar) = ctx.bar {
                set_bar_total(bar, enqueued);
            }
        }
        info!(
            "Queued {queued_here} of {listed} file(s) from {path}. Total tasks queued so far: {enqueued}"
        );
    }
    info!("All {enqueued} download tasks have been added to the queue");
    Ok(enqueued)
}

/// Enqueue one shutdown sentinel per worker. Only call after the last real task.
pub fn enqueue_shutdown(queue: &TaskQueue, num_workers: usize) -> Result<()> {
    debug!("Sending {num_workers} shutdown signal(s) to workers");
    for _ in 0..num_workers {
        queue.put(QueueItem::Shutdown)?;
    }
    Ok(())
}
