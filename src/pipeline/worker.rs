//! Download workers: dequeue → transport → completion log → counter → report → throttle.

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread::{self, JoinHandle};

use crate::engine::progress::update_progress_bar;
use crate::{DownloadTask, QueueItem};

use super::context::WorkerContext;
use super::producer::enqueue_shutdown;

/// Result of one task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Fetched; carries the global success total right after this download.
    Succeeded { total: usize },
    Failed,
    /// Not attempted because the run was cancelled.
    Skipped,
}

/// Process one task. Only a failed fetch fails the task; log and report failures are logged.
pub fn process_task(ctx: &WorkerContext, task: &DownloadTask) -> TaskOutcome {
    debug!("Starting download for {}", task.filename);
    if let Err(e) = ctx
        .transport
        .fetch(&task.remote_key, &task.filename, &task.destination_dir)
    {
        warn!("Failed to download {}: {e:#}", task.filename);
        return TaskOutcome::Failed;
    }

    if let Err(e) = ctx.progress_log.append(&task.remote_key) {
        warn!("Could not record {} in the progress log: {e:#}", task.filename);
    }
    let total = ctx.counter.increment();

    if let Err(e) = ctx
        .transport
        .report(&task.remote_key, &task.filename, task.size)
    {
        warn!(
            "Failed to record download information for {}: {e:#}",
            task.filename
        );
    }

    if ctx.throttle.should_pause(total) {
        info!(
            "Pausing for {:?} after {total} total downloads",
            ctx.throttle.interval
        );
        ctx.sleeper.sleep(ctx.throttle.interval);
    }
    TaskOutcome::Succeeded { total }
}

/// Process a task, turning a panic inside a collaborator into a failed task.
fn process_task_isolated(ctx: &WorkerContext, task: &DownloadTask) -> TaskOutcome {
    if ctx.is_cancelled() {
        debug!("Cancelled; skipping {}", task.filename);
        return TaskOutcome::Skipped;
    }
    catch_unwind(AssertUnwindSafe(|| process_task(ctx, task))).unwrap_or_else(|_| {
        error!("Download of {} panicked; counting it as failed", task.filename);
        TaskOutcome::Failed
    })
}

/// Single worker: handle tasks one at a time until a shutdown sentinel arrives. Every dequeued
/// item is marked processed, sentinel included.
fn download_worker_loop(ctx: WorkerContext) {
    while let Some(item) = ctx.queue.get() {
        let _processed = ctx.queue.done_on_drop();
        match item {
            QueueItem::Shutdown => break,
            QueueItem::Task(task) => {
                let outcome = process_task_isolated(&ctx, &task);
                if outcome != TaskOutcome::Skipped
                    && let Some(bar) = &ctx.bar
                {
                    update_progress_bar(bar, 1);
                }
            }
        }
    }
    debug!("Worker exiting");
}

/// Spawn `num_workers` named worker threads. If a spawn fails, the workers already running are
/// shut down and joined before the error is returned.
pub fn spawn_download_workers(
    ctx: &WorkerContext,
    num_workers: usize,
) -> Result<Vec<JoinHandle<()>>> {
    let mut handles = Vec::with_capacity(num_workers);
    for i in 0..num_workers {
        let worker_ctx = ctx.clone();
        let spawned = thread::Builder::new()
            .name(format!("download-worker-{i}"))
            .spawn(move || download_worker_loop(worker_ctx))
            .with_context(|| format!("spawn download worker {i}"));
        match spawned {
            Ok(h) => handles.push(h),
            Err(e) => {
                let running = handles.len();
                if enqueue_shutdown(&ctx.queue, running).is_ok() {
                    for h in handles {
                        let _ = h.join();
                    }
                }
                return Err(e);
            }
        }
    }
    Ok(handles)
}
