//! Application configuration constants.
//! Defaults and thresholds in one place.

use std::sync::OnceLock;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    config_filename: String,
    env_prefix: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                config_filename: format!("{pkg}.toml"),
                env_prefix: pkg.to_uppercase(),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Settings file looked up in the working directory when `--config` is not given.
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    /// Environment variable name for `key`, e.g. `IEARTH_ACCOUNT`.
    pub fn env_var(&self, key: &str) -> String {
        format!("{}_{}", self.env_prefix, key)
    }
}

// ---- Workers ----

/// Default worker thread count.
pub const DEFAULT_MAX_THREADS: usize = 5;

/// Above this the remote service tends to reject requests; we warn but do not clamp.
pub const RECOMMENDED_MAX_THREADS: usize = 10;

/// Queue capacity is this multiple of the worker count.
pub const QUEUE_CAPACITY_FACTOR: usize = 2;

// ---- Dataset ----

/// Dataset downloaded when no resource id is configured.
pub const DEFAULT_RESOURCE_ID: u32 = 9;

/// Storage namespace; first segment of every remote key.
pub const DEFAULT_NAMESPACE: &str = "shared-dataset";

/// Leading remote-key segments dropped when writing the completion log (namespace + type tag).
pub const LOG_STRIP_SEGMENTS: usize = 2;

// ---- Throttling / transfer ----

/// Pacing for the remote service.
pub struct ThrottleConsts;

impl ThrottleConsts {
    /// Pause after every N-th successful download (process-wide count).
    pub const SLEEP_AFTER_FILES: u64 = 50;
    /// Pause length in seconds.
    pub const SLEEP_INTERVAL_SECS: u64 = 5;
}

/// Streaming read chunk for downloads (bytes). 8 KB.
pub const DOWNLOAD_CHUNK_SIZE: usize = 8 * 1024;

// ---- Remote API ----

/// Files requested per listing call; the service returns everything in one page at this size.
pub const FILE_LIST_PAGE_SIZE: u64 = 100_000;

/// Interactive login attempts before giving up.
pub const MAX_LOGIN_ATTEMPTS: usize = 3;

// ---- Artifacts ----

/// Snapshot file name; `{id}` is replaced by the resource id.
pub const CATALOG_FILE_PATTERN: &str = "catalog_{id}.json";

/// Completion log file name; `{id}` is replaced by the resource id.
pub const FINISHED_LOG_FILE_PATTERN: &str = "finished_{id}.log";

/// Substitute `{id}` in a file name pattern.
pub fn expand_id_pattern(pattern: &str, resource_id: u32) -> String {
    pattern.replace("{id}", &resource_id.to_string())
}

// ---- HTTP ----

/// Connect timeout for every request (seconds). Transfers themselves have no overall timeout.
pub const HTTP_CONNECT_TIMEOUT_SECS: u64 = 30;
