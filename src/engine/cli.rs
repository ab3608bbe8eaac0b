//! CLI command handler: settings → login → confirmation → catalog → download.

use anyhow::{Context, Result, anyhow, bail};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::download::download_dataset;
use crate::engine::arg_parser::Cli;
use crate::remote::{ApiClient, FileLister, FileTransport, Session, login};
use crate::utils::config::{
    HTTP_CONNECT_TIMEOUT_SECS, MAX_LOGIN_ATTEMPTS, PackagePaths, RECOMMENDED_MAX_THREADS,
};
use crate::utils::{
    CredentialSource, apply_file_to_settings, confirm, get_credentials, load_settings_toml,
    setup_logging,
};
use crate::{ApiEndpoints, Settings};

/// Apply CLI flags over settings (CLI wins over file and defaults).
pub fn apply_cli_to_settings(cli: &Cli, settings: &mut Settings) {
    if let Some(ref p) = cli.download_path {
        settings.download_root = p.clone();
    }
    if let Some(n) = cli.max_threads {
        settings.max_threads = usize::from(n);
    }
    if let Some(id) = cli.resource_id {
        settings.resource_id = id;
    }
    if let Some(ref sp) = cli.target_sub_path {
        settings.target_sub_path = Some(sp.clone());
    }
    if let Some(v) = cli.verbose {
        settings.verbose = v;
    }
    if let Some(p) = cli.progress {
        settings.progress = p;
    }
    settings.assume_yes = cli.yes;
}

/// Absolute download root: absolute paths as given, relative ones joined to the working directory.
pub fn resolve_download_root(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("determine current directory")?;
    Ok(cwd.join(path))
}

/// Every endpoint must be configured before anything is requested.
pub fn validate_endpoints(api: &ApiEndpoints) -> Result<()> {
    let missing: Vec<&str> = [
        ("api.catalog", &api.catalog),
        ("api.file_list", &api.file_list),
        ("api.download", &api.download),
        ("api.record", &api.record),
        ("api.login", &api.login),
    ]
    .into_iter()
    .filter(|(_, url)| url.trim().is_empty())
    .map(|(key, _)| key)
    .collect();
    if !missing.is_empty() {
        bail!(
            "missing API endpoint(s) in {}: {}",
            PackagePaths::get().config_filename(),
            missing.join(", ")
        );
    }
    Ok(())
}

/// Defaults → settings file → CLI flags.
pub fn setup_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = Settings::default();
    let (path, required) = match &cli.config {
        Some(p) => (p.clone(), true),
        None => (PathBuf::from(PackagePaths::get().config_filename()), false),
    };
    if let Some(file) = load_settings_toml(&path, required)? {
        apply_file_to_settings(&file, &mut settings);
    }
    apply_cli_to_settings(cli, &mut settings);
    settings.max_threads = settings.max_threads.max(1);
    settings.download_root = resolve_download_root(&settings.download_root)?;
    Ok(settings)
}

fn log_settings(settings: &Settings) {
    info!("Configuration being used:");
    info!("  - Resource ID: {}", settings.resource_id);
    info!("  - Max Threads: {}", settings.max_threads);
    info!(
        "  - Target Sub Path: '{}' (empty means process all)",
        settings.target_sub_path.as_deref().unwrap_or_default()
    );
    info!("  - Download Path: {}", settings.download_root.display());
    info!("  - Catalog File: {}", settings.catalog_file().display());
    info!("  - Log File: {}", settings.finished_log_file().display());
}

fn build_http_client() -> Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
        .timeout(None::<Duration>)
        .build()
        .context("build HTTP client")
}

/// Log in, re-prompting on failure when the credentials were typed in.
fn authenticate(client: &reqwest::blocking::Client, endpoint: &str) -> Result<Session> {
    let cwd = std::env::current_dir().context("determine current directory")?;
    let mut attempt = 1;
    loop {
        let (credentials, source) = get_credentials(&cwd)?;
        match login(client, endpoint, &credentials) {
            Ok(session) => return Ok(session),
            Err(e) if source == CredentialSource::Prompt && attempt < MAX_LOGIN_ATTEMPTS => {
                warn!("{e:#} (attempt {attempt}/{MAX_LOGIN_ATTEMPTS})");
                attempt += 1;
            }
            Err(e) => return Err(e.context("authentication failed, unable to continue")),
        }
    }
}

/// Run the full download flow for the parsed CLI.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let settings = setup_settings(cli)?;
    setup_logging(settings.verbose);
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        settings
    );
    validate_endpoints(&settings.api)?;
    if settings.max_threads > RECOMMENDED_MAX_THREADS {
        warn!(
            "{} threads requested; more than {RECOMMENDED_MAX_THREADS} may get requests rejected",
            settings.max_threads
        );
    }
    log_settings(&settings);

    let client = build_http_client()?;
    info!("=== User authentication ===");
    let session = authenticate(&client, &settings.api.login)?;

    if !settings.assume_yes && !confirm("Start the download task now?")? {
        info!("Operation canceled");
        return Ok(());
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_handler = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        cancel_handler.store(true, Ordering::Relaxed);
    })
    .context("set Ctrl+C handler")?;

    let api = Arc::new(ApiClient::new(
        client,
        settings.api.clone(),
        settings.resource_id,
        settings.chunk_size,
        Arc::new(session),
    ));
    let lister: Arc<dyn FileLister> = api.clone();
    let transport: Arc<dyn FileTransport> = api.clone();

    info!("=== Start download task ===");
    let stats = download_dataset(&settings, api.as_ref(), lister, transport, cancel)?;

    info!("Files generated:");
    info!("- {}: catalog structure and paths", settings.catalog_file().display());
    info!("- {}: downloaded file log", settings.finished_log_file().display());
    info!(
        "- Downloaded files: organized in subdirectories under {}",
        settings.download_root.display()
    );
    if stats.cancelled {
        return Err(anyhow!(
            "Download cancelled by user; {} of {} queued files were downloaded",
            stats.tasks_succeeded,
            stats.tasks_enqueued
        ));
    }
    Ok(())
}
