//! Login handshake and the session it produces.

use anyhow::{Context, Result, bail};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::remote::AuthProvider;
use crate::remote::seal::seal_json;
use crate::utils::Credentials;

/// Authenticated session. Owned by the caller and shared read-only with the transport.
#[derive(Clone, Debug, Default)]
pub struct Session {
    pub username: Option<String>,
    /// Account identifier the API expects (the user's email).
    pub account: Option<String>,
    pub token: Option<String>,
}

impl AuthProvider for Session {
    fn token(&self) -> Option<String> {
        self.token.clone()
    }

    fn account(&self) -> Option<String> {
        self.account.clone()
    }
}

#[derive(Serialize)]
struct LoginPayload<'a> {
    account: &'a str,
    password: &'a str,
    #[serde(rename = "rememberMe")]
    remember_me: bool,
}

#[derive(Serialize)]
struct LoginRequest {
    key: String,
}

#[derive(Debug, Default, Deserialize)]
struct LoginData {
    #[serde(rename = "userName")]
    user_name: Option<String>,
    email: Option<String>,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<LoginData>,
    #[serde(rename = "failReason")]
    fail_reason: Option<String>,
}

/// Turn a decoded login response into a session, or an error carrying the server's reason.
pub(crate) fn session_from_response(resp: LoginResponse) -> Result<Session> {
    if !resp.success {
        bail!(
            "login failed: {}",
            resp.fail_reason.as_deref().unwrap_or("Unknown error")
        );
    }
    let data = resp.data.unwrap_or_default();
    if data.token.is_none() {
        bail!("login succeeded but the response carried no token");
    }
    Ok(Session {
        username: data.user_name,
        account: data.email,
        token: data.token,
    })
}

/// Parse a raw login response body.
pub fn parse_login_response(body: &str) -> Result<Session> {
    let resp: LoginResponse = serde_json::from_str(body).context("parse login response")?;
    session_from_response(resp)
}

/// One-shot login: seal the credentials, post them, return the session.
pub fn login(
    client: &reqwest::blocking::Client,
    endpoint: &str,
    credentials: &Credentials,
) -> Result<Session> {
    let key = seal_json(&LoginPayload {
        account: &credentials.account,
        password: &credentials.password,
        remember_me: true,
    })
    .context("seal login payload")?;
    debug!("Sending login request to {endpoint}");
    let body = client
        .post(endpoint)
        .json(&LoginRequest { key })
        .send()
        .context("send login request")?
        .error_for_status()
        .context("login request rejected")?
        .text()
        .context("read login response")?;
    let session = parse_login_response(&body)?;
    info!(
        "Logged in as {} ({})",
        session.username.as_deref().unwrap_or("<unknown>"),
        session.account.as_deref().unwrap_or("<no email>")
    );
    Ok(session)
}
