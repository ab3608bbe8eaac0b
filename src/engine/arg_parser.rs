use clap::Parser;
use std::path::PathBuf;

/// Bulk downloader for iEarth datasets.
#[derive(Clone, Debug, Parser)]
#[command(name = "iearth")]
#[command(
    about = "Download an iEarth dataset: fetch its catalog, list files per path, download them concurrently."
)]
pub struct Cli {
    /// Download directory (absolute or relative). Default: current directory.
    #[arg(long, short = 'p', value_name = "DIR")]
    pub download_path: Option<PathBuf>,

    /// Number of concurrent download threads (recommended: at most 10).
    #[arg(long, short = 'm', value_parser = clap::value_parser!(u16).range(1..))]
    pub max_threads: Option<u16>,

    /// Resource id of the dataset to download.
    #[arg(long, short = 'i')]
    pub resource_id: Option<u32>,

    /// Only download catalog paths starting with this prefix, e.g. "MODISwater2001-2022/2008".
    #[arg(long, short = 's', value_name = "PREFIX")]
    pub target_sub_path: Option<String>,

    /// Settings file. Default: `iearth.toml` in the current directory, if present.
    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Start downloading without asking for confirmation.
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Verbose output.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,

    /// Show a progress bar.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub progress: Option<bool>,
}
