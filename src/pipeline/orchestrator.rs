use anyhow::{Result, anyhow};
use log::{debug, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use crate::engine::progress::create_download_bar;
use crate::engine::tools::filter_catalog_paths;
use crate::remote::{FileLister, FileTransport};
use crate::{CatalogSnapshot, CoordinatorOpts, RunStats};

use super::context::{PipelineTuning, ProducerContext, WorkerContext};
use super::producer::{enqueue_shutdown, run_producer_loop};
use super::progress_log::ProgressLog;
use super::queue::TaskQueue;
use super::throttle::{ProgressCounter, Sleeper, ThreadSleeper, ThrottlePolicy};
use super::worker::spawn_download_workers;

/// Shut the pool down: one sentinel per worker, wait for the queue to drain, then join threads.
pub fn shutdown_pipeline(queue: &TaskQueue, worker_handles: Vec<JoinHandle<()>>) -> Result<()> {
    enqueue_shutdown(queue, worker_handles.len())?;
    debug!("Waiting for all queued items to be processed (including shutdown signals)");
    queue.join();
    debug!("Waiting for worker threads to terminate");
    let mut panicked = 0_usize;
    for h in worker_handles {
        if h.join().is_err() {
            panicked += 1;
        }
    }
    if panicked > 0 {
        return Err(anyhow!("{panicked} download worker(s) panicked"));
    }
    debug!("All worker threads have terminated");
    Ok(())
}

/// Owns one download run: filters the catalog, feeds the bounded queue, supervises the workers
/// and returns the totals.
pub struct Coordinator {
    lister: Arc<dyn FileLister>,
    transport: Arc<dyn FileTransport>,
    progress_log: Arc<ProgressLog>,
    sleeper: Arc<dyn Sleeper>,
    cancel: Arc<AtomicBool>,
    opts: CoordinatorOpts,
}

impl Coordinator {
    pub fn new(
        lister: Arc<dyn FileLister>,
        transport: Arc<dyn FileTransport>,
        progress_log: Arc<ProgressLog>,
        opts: CoordinatorOpts,
    ) -> Self {
        Self {
            lister,
            transport,
            progress_log,
            sleeper: Arc::new(ThreadSleeper),
            cancel: Arc::new(AtomicBool::new(false)),
            opts,
        }
    }

    /// Replace the throttle sleeper (tests record pauses instead of sleeping).
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Share an externally owned cancel flag (e.g. set from a Ctrl+C handler).
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn opts(&self) -> &CoordinatorOpts {
        &self.opts
    }

    /// Run the whole pipeline for `catalog`. Per-path and per-file failures are logged and
    /// skipped; only thread spawn failures and worker panics surface as errors.
    pub fn run(&self, catalog: &CatalogSnapshot, prefix_filter: Option<&str>) -> Result<RunStats> {
        let retained = filter_catalog_paths(&catalog.paths, prefix_filter);
        match prefix_filter.map(str::trim).filter(|f| !f.is_empty()) {
            Some(f) if retained.is_empty() => warn!(
                "No paths in the catalog match the sub-path filter '{f}'. No files will be downloaded."
            ),
            Some(f) => info!(
                "Filtered catalog by '{f}': {} of {} paths",
                retained.len(),
                catalog.paths.len()
            ),
            None => info!(
                "No sub-path filter set. Processing all {} catalog paths.",
                catalog.paths.len()
            ),
        }

        let tuning = PipelineTuning::for_workers(self.opts.num_workers);
        info!(
            "Processing {} paths using up to {} threads (table: {}, type: {})",
            retained.len(),
            tuning.num_workers,
            catalog.table,
            catalog.type_tag
        );

        if let Err(e) = self.progress_log.initialize() {
            warn!("{e:#}");
        }

        let queue = Arc::new(TaskQueue::bounded(tuning.queue_capacity));
        let counter = Arc::new(ProgressCounter::default());
        let bar = self.opts.progress.then(create_download_bar);

        let worker_ctx = WorkerContext {
            queue: Arc::clone(&queue),
            transport: Arc::clone(&self.transport),
            progress_log: Arc::clone(&self.progress_log),
            counter: Arc::clone(&counter),
            sleeper: Arc::clone(&self.sleeper),
            throttle: ThrottlePolicy {
                every: self.opts.sleep_after_files,
                interval: self.opts.sleep_interval,
            },
            cancel: Arc::clone(&self.cancel),
            bar: bar.clone(),
        };
        let worker_handles = spawn_download_workers(&worker_ctx, tuning.num_workers)?;
        drop(worker_ctx);

        let producer_ctx = ProducerContext {
            lister: self.lister.as_ref(),
            table: &catalog.table,
            type_tag: &catalog.type_tag,
            namespace: &self.opts.namespace,
            download_root: self.opts.download_root.clone(),
            cancel: &self.cancel,
            bar: bar.as_ref(),
        };
        let produced = run_producer_loop(&queue, &producer_ctx, &retained);

        // Shut down even when production failed so no worker is left blocked on the queue.
        let shutdown = shutdown_pipeline(&queue, worker_handles);
        let tasks_enqueued = produced?;
        shutdown?;

        Ok(RunStats {
            tasks_enqueued,
            tasks_succeeded: counter.get(),
            cancelled: self.cancel.load(Ordering::Relaxed),
        })
    }
}
