//! iearth: bulk downloader for iEarth datasets.
//!
//! A single producer walks the dataset catalog and queues one task per remote file; a fixed pool
//! of worker threads drains the bounded queue, downloading, logging and throttling as they go.

pub mod download;
pub mod engine;
pub mod pipeline;
pub mod remote;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

pub use download::download_dataset;
pub use pipeline::Coordinator;

/// Result alias used by public iearth API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;
