//! Public and internal types for the iearth API and download pipeline.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

use crate::utils::config::{
    CATALOG_FILE_PATTERN, DEFAULT_MAX_THREADS, DEFAULT_NAMESPACE, DEFAULT_RESOURCE_ID,
    DOWNLOAD_CHUNK_SIZE, FINISHED_LOG_FILE_PATTERN, ThrottleConsts, expand_id_pattern,
};

/// Flattened catalog for one dataset: leaf paths plus the table and type tag the API needs.
///
/// Same shape as the snapshot file written under the download root (`{"path": [...], "table": ..., "type": ...}`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    /// Leaf paths in catalog order, `/`-separated.
    #[serde(rename = "path", default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub table: String,
    /// Dataset type tag; second segment of every remote key.
    #[serde(rename = "type", default)]
    pub type_tag: String,
}

/// One file returned by a listing call. A missing or `null` name becomes empty (the entry is
/// then ignored); a missing, `null` or unparsable size becomes 0.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RemoteFile {
    #[serde(rename = "file", default, deserialize_with = "lenient_name")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_size")]
    pub size: u64,
}

fn lenient_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => s,
        _ => String::new(),
    })
}

fn lenient_size<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map(|f| f as u64)
            })
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

/// A single file to download. Built by the producer, consumed by exactly one worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadTask {
    /// `<namespace>/<type_tag>/<path>/<filename>`
    pub remote_key: String,
    pub filename: String,
    pub destination_dir: PathBuf,
    pub size: u64,
}

/// What travels through the task queue. Each worker receives exactly one `Shutdown`.
#[derive(Debug)]
pub enum QueueItem {
    Task(DownloadTask),
    Shutdown,
}

/// Totals for one coordinator run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub tasks_enqueued: usize,
    pub tasks_succeeded: usize,
    /// Set when the run was interrupted; remaining tasks were drained without fetching.
    pub cancelled: bool,
}

impl RunStats {
    /// Success percentage, or `None` when nothing was scheduled.
    pub fn success_rate(&self) -> Option<f64> {
        (self.tasks_enqueued > 0)
            .then(|| self.tasks_succeeded as f64 / self.tasks_enqueued as f64 * 100.0)
    }
}

/// Coordinator tuning. Built from [`Settings`] for the CLI; tests construct it directly.
#[derive(Clone, Debug)]
pub struct CoordinatorOpts {
    /// Root under which each catalog path becomes a directory.
    pub download_root: PathBuf,
    /// Worker thread count (clamped to at least 1).
    pub num_workers: usize,
    /// Pause after every N-th successful download across all workers. 0 disables throttling.
    pub sleep_after_files: u64,
    pub sleep_interval: Duration,
    /// First segment of every remote key.
    pub namespace: String,
    /// Show a kdam progress bar.
    pub progress: bool,
}

impl Default for CoordinatorOpts {
    fn default() -> Self {
        Self {
            download_root: PathBuf::from("."),
            num_workers: DEFAULT_MAX_THREADS,
            sleep_after_files: ThrottleConsts::SLEEP_AFTER_FILES,
            sleep_interval: Duration::from_secs(ThrottleConsts::SLEEP_INTERVAL_SECS),
            namespace: DEFAULT_NAMESPACE.to_string(),
            progress: false,
        }
    }
}

/// Remote endpoints. All must be set before a real run.
#[derive(Clone, Debug, Default)]
pub struct ApiEndpoints {
    pub catalog: String,
    pub file_list: String,
    pub download: String,
    pub record: String,
    pub login: String,
}

/// Full settings (CLI + file + defaults). Built once at startup and passed down.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Absolute download root.
    pub download_root: PathBuf,
    pub max_threads: usize,
    pub resource_id: u32,
    /// Optional catalog path prefix; blank means everything.
    pub target_sub_path: Option<String>,
    pub sleep_interval: Duration,
    pub sleep_after_files: u64,
    /// Read buffer size for streaming a download to disk (bytes).
    pub chunk_size: usize,
    pub namespace: String,
    pub catalog_file_pattern: String,
    pub finished_log_file_pattern: String,
    pub api: ApiEndpoints,
    pub verbose: bool,
    pub progress: bool,
    /// Skip the confirmation prompt.
    pub assume_yes: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            download_root: PathBuf::from("."),
            max_threads: DEFAULT_MAX_THREADS,
            resource_id: DEFAULT_RESOURCE_ID,
            target_sub_path: None,
            sleep_interval: Duration::from_secs(ThrottleConsts::SLEEP_INTERVAL_SECS),
            sleep_after_files: ThrottleConsts::SLEEP_AFTER_FILES,
            chunk_size: DOWNLOAD_CHUNK_SIZE,
            namespace: DEFAULT_NAMESPACE.to_string(),
            catalog_file_pattern: CATALOG_FILE_PATTERN.to_string(),
            finished_log_file_pattern: FINISHED_LOG_FILE_PATTERN.to_string(),
            api: ApiEndpoints::default(),
            verbose: false,
            progress: false,
            assume_yes: false,
        }
    }
}

impl Settings {
    /// Snapshot file path for the configured resource.
    pub fn catalog_file(&self) -> PathBuf {
        self.download_root
            .join(expand_id_pattern(&self.catalog_file_pattern, self.resource_id))
    }

    /// Completion log path for the configured resource.
    pub fn finished_log_file(&self) -> PathBuf {
        self.download_root
            .join(expand_id_pattern(&self.finished_log_file_pattern, self.resource_id))
    }
}

impl From<&Settings> for CoordinatorOpts {
    fn from(s: &Settings) -> Self {
        CoordinatorOpts {
            download_root: s.download_root.clone(),
            num_workers: s.max_threads.max(1),
            sleep_after_files: s.sleep_after_files,
            sleep_interval: s.sleep_interval,
            namespace: s.namespace.clone(),
            progress: s.progress,
        }
    }
}
