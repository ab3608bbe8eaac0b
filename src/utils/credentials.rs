//! Login credentials: env vars → .env in the working directory → interactive prompt.

use anyhow::{Context, Result};
use colored::Colorize;
use log::info;
use std::io::{BufRead, Write};
use std::path::Path;

use crate::utils::config::PackagePaths;

/// Account name and password for the login handshake.
#[derive(Clone)]
pub struct Credentials {
    pub account: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("account", &self.account)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Where the credentials came from. Prompted credentials may be retried; env ones may not.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialSource {
    Environment,
    Prompt,
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn try_env(paths: &PackagePaths) -> Option<Credentials> {
    let account = non_empty_env(&paths.env_var("ACCOUNT"))?;
    let password = non_empty_env(&paths.env_var("PASSWORD"))?;
    Some(Credentials { account, password })
}

fn try_env_then_dotenv(dir: &Path) -> Option<Credentials> {
    let paths = PackagePaths::get();
    if let Some(c) = try_env(paths) {
        return Some(c);
    }
    let env_path = dir.join(".env");
    if env_path.is_file() {
        let _ = dotenvy::from_path(&env_path);
        return try_env(paths);
    }
    None
}

fn prompt_label() -> colored::ColoredString {
    format!("[{}]", PackagePaths::get().pkg_name()).cyan().bold()
}

fn prompt_line(prompt: &str) -> Result<String> {
    print!("{} {}", prompt_label(), prompt);
    std::io::stdout().flush().context("flush stdout")?;
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read from stdin")?;
    Ok(line.trim().to_string())
}

/// Prompt for account and password (password is not echoed).
pub fn prompt_credentials() -> Result<Credentials> {
    let account = prompt_line("Account: ")?;
    let password = rpassword::prompt_password(format!("{} Password: ", prompt_label()))
        .context("read password")?;
    Ok(Credentials {
        account,
        password: password.trim().to_string(),
    })
}

/// Read credentials: env (`IEARTH_ACCOUNT` / `IEARTH_PASSWORD`) → .env in `dir` → prompt.
pub fn get_credentials(dir: &Path) -> Result<(Credentials, CredentialSource)> {
    if let Some(c) = try_env_then_dotenv(dir) {
        info!("Credentials found in environment");
        return Ok((c, CredentialSource::Environment));
    }
    Ok((prompt_credentials()?, CredentialSource::Prompt))
}

/// Ask a yes/no question; empty answer means yes. Only "n"/"no" decline.
pub fn confirm(question: &str) -> Result<bool> {
    let answer = prompt_line(&format!("{question} ([y]/n): "))?;
    Ok(!matches!(answer.to_lowercase().as_str(), "n" | "no"))
}
