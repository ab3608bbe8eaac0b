//! Full download run: fetch and persist the catalog, then hand it to the coordinator.

use anyhow::{Context, Result};
use log::{info, warn};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::pipeline::{Coordinator, ProgressLog, print_report};
use crate::remote::{CatalogSource, FileLister, FileTransport, load_snapshot, save_snapshot};
use crate::{CoordinatorOpts, RunStats, Settings};

/// Download everything `settings` selects.
///
/// 1. Fetch the catalog from `source` and write the snapshot file under the download root.
/// 2. Reload the snapshot from disk and run the coordinator over it with the configured filter.
///
/// A catalog fetch or snapshot failure aborts before any download starts. `cancel` may be set
/// from another thread (e.g. Ctrl+C); the run then drains and returns with `cancelled` set.
pub fn download_dataset(
    settings: &Settings,
    source: &dyn CatalogSource,
    lister: Arc<dyn FileLister>,
    transport: Arc<dyn FileTransport>,
    cancel: Arc<AtomicBool>,
) -> Result<RunStats> {
    std::fs::create_dir_all(&settings.download_root).with_context(|| {
        format!(
            "create download directory {}",
            settings.download_root.display()
        )
    })?;

    info!("=== Step 1: Fetching catalog data ===");
    let catalog_file = settings.catalog_file();
    let fetched = source
        .fetch(settings.resource_id)
        .with_context(|| format!("fetch catalog for resource {}", settings.resource_id))?;
    save_snapshot(&catalog_file, &fetched)?;
    info!(
        "Wrote {} paths to {} (table: {}, type: {})",
        fetched.paths.len(),
        catalog_file.display(),
        fetched.table,
        fetched.type_tag
    );

    info!("=== Step 2: Processing paths and downloading files ===");
    let catalog = load_snapshot(&catalog_file)?;
    if catalog.paths.is_empty() {
        warn!("No paths found in catalog data");
    }

    let progress_log = Arc::new(ProgressLog::new(settings.finished_log_file()));
    let coordinator = Coordinator::new(
        lister,
        transport,
        progress_log,
        CoordinatorOpts::from(settings),
    )
    .with_cancel_flag(cancel);
    let stats = coordinator.run(&catalog, settings.target_sub_path.as_deref())?;
    print_report(&stats, &settings.download_root);
    Ok(stats)
}
