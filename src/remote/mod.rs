//! Remote collaborators the download pipeline talks to, and their HTTP implementation.
//!
//! The pipeline only sees the traits below; [`http::ApiClient`] implements all three against the
//! iEarth API. Tests substitute in-memory stubs.

pub mod auth;
pub mod catalog;
pub mod http;
pub mod seal;

use anyhow::Result;
use std::path::Path;

use crate::{CatalogSnapshot, RemoteFile};

pub use auth::{Session, login};
pub use catalog::{flatten_catalog, load_snapshot, save_snapshot};
pub use http::ApiClient;

/// Produces the flattened catalog for a dataset.
pub trait CatalogSource: Send + Sync {
    fn fetch(&self, resource_id: u32) -> Result<CatalogSnapshot>;
}

/// Lists the files under one catalog path. An empty list means "nothing here", not an error.
pub trait FileLister: Send + Sync {
    fn list(&self, table: &str, path: &str) -> Result<Vec<RemoteFile>>;
}

/// Moves bytes for one remote key to disk, and reports finished transfers to the service.
pub trait FileTransport: Send + Sync {
    /// Download `remote_key` into `dest_dir/filename`.
    fn fetch(&self, remote_key: &str, filename: &str, dest_dir: &Path) -> Result<()>;
    /// Record a completed download with the remote accounting endpoint.
    fn report(&self, remote_key: &str, filename: &str, size: u64) -> Result<()>;
}

/// Current session values. Absent token makes every fetch/report fail immediately.
pub trait AuthProvider: Send + Sync {
    fn token(&self) -> Option<String>;
    fn account(&self) -> Option<String>;
}
