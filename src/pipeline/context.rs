//! Pipeline context and tuning: shared state handed to the producer and every worker.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::engine::progress::ProgressBar;
use crate::remote::{FileLister, FileTransport};
use crate::utils::config::QUEUE_CAPACITY_FACTOR;

use super::progress_log::ProgressLog;
use super::queue::TaskQueue;
use super::throttle::{ProgressCounter, Sleeper, ThrottlePolicy};

/// Worker count and the queue capacity derived from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineTuning {
    pub num_workers: usize,
    /// `QUEUE_CAPACITY_FACTOR × num_workers`: keeps workers fed while the producer's blocking
    /// `put` holds catalog expansion back.
    pub queue_capacity: usize,
}

impl PipelineTuning {
    pub fn for_workers(num_workers: usize) -> Self {
        let num_workers = num_workers.max(1);
        Self {
            num_workers,
            queue_capacity: num_workers * QUEUE_CAPACITY_FACTOR,
        }
    }
}

/// Everything a worker touches. Cloned once per worker; all shared parts are behind `Arc`.
#[derive(Clone)]
pub struct WorkerContext {
    pub queue: Arc<TaskQueue>,
    pub transport: Arc<dyn FileTransport>,
    pub progress_log: Arc<ProgressLog>,
    pub counter: Arc<ProgressCounter>,
    pub sleeper: Arc<dyn Sleeper>,
    pub throttle: ThrottlePolicy,
    pub cancel: Arc<AtomicBool>,
    pub bar: Option<ProgressBar>,
}

impl WorkerContext {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}

/// What the producer needs to turn catalog paths into tasks.
pub struct ProducerContext<'a> {
    pub lister: &'a dyn FileLister,
    pub table: &'a str,
    pub type_tag: &'a str,
    pub namespace: &'a str,
    pub download_root: PathBuf,
    pub cancel: &'a AtomicBool,
    pub bar: Option<&'a ProgressBar>,
}

impl ProducerContext<'_> {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}
