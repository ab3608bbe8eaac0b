//! Download pipeline: bounded queue, single producer, fixed worker pool.

pub mod context;
pub mod orchestrator;
pub mod producer;
pub mod progress_log;
pub mod queue;
pub mod report;
pub mod throttle;
pub mod worker;

pub use context::{PipelineTuning, ProducerContext, WorkerContext};
pub use orchestrator::{Coordinator, shutdown_pipeline};
pub use producer::{build_remote_key, enqueue_shutdown, run_producer_loop};
pub use progress_log::{ProgressLog, strip_log_prefix};
pub use queue::TaskQueue;
pub use report::{format_success_rate, print_report};
pub use throttle::{ProgressCounter, Sleeper, ThreadSleeper, ThrottlePolicy};
pub use worker::{TaskOutcome, process_task, spawn_download_workers};
