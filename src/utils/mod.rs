pub mod config;
pub mod credentials;
pub mod logger;
pub mod settings_toml;
pub mod tempfiles;

pub use config::*;
pub use credentials::{CredentialSource, Credentials, confirm, get_credentials};
pub use logger::setup_logging;
pub use settings_toml::{apply_file_to_settings, load_settings_toml, parse_settings_toml};
