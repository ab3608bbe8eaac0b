//! Load `iearth.toml` (CLI only). Library callers build [`Settings`] themselves.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::Settings;

#[derive(Debug, Default, Deserialize)]
pub struct SettingsToml {
    #[serde(default)]
    settings: RunSection,
    #[serde(default)]
    download: DownloadSection,
    #[serde(default)]
    api: ApiSection,
}

#[derive(Debug, Default, Deserialize)]
struct RunSection {
    download_path: Option<PathBuf>,
    max_threads: Option<usize>,
    resource_id: Option<u32>,
    target_sub_path: Option<String>,
    verbose: Option<bool>,
    progress: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct DownloadSection {
    sleep_interval: Option<u64>,
    sleep_after_files: Option<u64>,
    chunk_size: Option<usize>,
    namespace: Option<String>,
    catalog_file_pattern: Option<String>,
    finished_log_file_pattern: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiSection {
    catalog: Option<String>,
    file_list: Option<String>,
    download: Option<String>,
    record: Option<String>,
    login: Option<String>,
}

/// Parse settings from a TOML string.
pub fn parse_settings_toml(s: &str) -> Result<SettingsToml> {
    toml::from_str(s).context("parse settings file")
}

/// Load settings from `path`. An explicit path must exist; the default one may be absent.
pub fn load_settings_toml(path: &Path, required: bool) -> Result<Option<SettingsToml>> {
    if !path.is_file() {
        if required {
            anyhow::bail!("settings file not found: {}", path.display());
        }
        log::debug!("No settings file at {}; using defaults", path.display());
        return Ok(None);
    }
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("read settings file {}", path.display()))?;
    parse_settings_toml(&s)
        .with_context(|| format!("in {}", path.display()))
        .map(Some)
}

/// Overwrite settings field from file when present.
macro_rules! apply_file_opt {
    ($sec:expr, $settings:expr, $sec_field:ident => $settings_field:ident) => {
        if let Some(v) = $sec.$sec_field.clone() {
            $settings.$settings_field = v;
        }
    };
}

/// Apply file config to settings (only fields present in the file). Call before applying CLI.
/// `download_path` is resolved later together with the CLI value.
pub fn apply_file_to_settings(file: &SettingsToml, settings: &mut Settings) {
    let run = &file.settings;
    if let Some(ref p) = run.download_path {
        settings.download_root = p.clone();
    }
    apply_file_opt!(run, settings, max_threads => max_threads);
    apply_file_opt!(run, settings, resource_id => resource_id);
    if let Some(ref p) = run.target_sub_path {
        settings.target_sub_path = Some(p.clone());
    }
    apply_file_opt!(run, settings, verbose => verbose);
    apply_file_opt!(run, settings, progress => progress);

    let dl = &file.download;
    if let Some(secs) = dl.sleep_interval {
        settings.sleep_interval = Duration::from_secs(secs);
    }
    apply_file_opt!(dl, settings, sleep_after_files => sleep_after_files);
    apply_file_opt!(dl, settings, chunk_size => chunk_size);
    apply_file_opt!(dl, settings, namespace => namespace);
    apply_file_opt!(dl, settings, catalog_file_pattern => catalog_file_pattern);
    apply_file_opt!(dl, settings, finished_log_file_pattern => finished_log_file_pattern);

    let api = &file.api;
    apply_file_opt!(api, settings.api, catalog => catalog);
    apply_file_opt!(api, settings.api, file_list => file_list);
    apply_file_opt!(api, settings.api, download => download);
    apply_file_opt!(api, settings.api, record => record);
    apply_file_opt!(api, settings.api, login => login);
}
