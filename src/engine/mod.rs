//! Engine module: CLI surface, filtering and progress display

pub mod arg_parser;
pub mod cli;
pub mod progress;
pub mod tools;

// Re-export commonly used functions
pub use arg_parser::Cli;
pub use cli::{
    apply_cli_to_settings, handle_run, resolve_download_root, setup_settings, validate_endpoints,
};
pub use tools::{
    filter_catalog_paths, is_safe_file_name, is_safe_relative_path, normalize_filter,
    normalize_separators, path_matches_filter,
};
