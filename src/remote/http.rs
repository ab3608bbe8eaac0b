//! Blocking HTTP client for the iEarth API. Implements every collaborator trait the pipeline uses.

use anyhow::{Context, Result, anyhow, bail};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;

use crate::remote::catalog::{CatalogNode, flatten_catalog};
use crate::engine::tools::is_safe_file_name;
use crate::remote::{AuthProvider, CatalogSource, FileLister, FileTransport};
use crate::utils::config::FILE_LIST_PAGE_SIZE;
use crate::utils::tempfiles::{part_path_for, remove_part_file, rename_part_to_final};
use crate::{ApiEndpoints, CatalogSnapshot, RemoteFile};

const RESOURCE_TYPE: &str = "REMOTE_SENSING";
const DOWNLOAD_COUNTRY: &str = "Japan";
const RECORD_COUNTRY: &str = "China";

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    #[serde(default)]
    catalog: Vec<CatalogNode>,
    #[serde(default)]
    table: String,
    #[serde(rename = "type", default)]
    type_tag: String,
}

#[derive(Serialize)]
struct FileListParams<'a> {
    table: &'a str,
    path: &'a str,
    page: u32,
    #[serde(rename = "enableSpatialQuery")]
    enable_spatial_query: bool,
    count: u64,
}

#[derive(Serialize)]
struct FileListRequest<'a> {
    params: FileListParams<'a>,
}

#[derive(Debug, Deserialize)]
struct FileListResponse {
    #[serde(default)]
    response: Vec<RemoteFile>,
}

#[derive(Serialize)]
struct SignedUrlRequest<'a> {
    #[serde(rename = "objectKey")]
    object_key: &'a str,
    #[serde(rename = "resourceId")]
    resource_id: String,
    #[serde(rename = "userAccount")]
    user_account: Option<String>,
    #[serde(rename = "resourceType")]
    resource_type: &'a str,
    country: &'a str,
}

#[derive(Debug, Deserialize)]
struct SignedUrlResponse {
    #[serde(rename = "signedUrl")]
    signed_url: String,
}

#[derive(Serialize)]
struct RecordRequest<'a> {
    resource_id: String,
    #[serde(rename = "objectKey")]
    object_key: &'a str,
    token: &'a str,
    #[serde(rename = "userAccount")]
    user_account: &'a str,
    country: &'a str,
    file_size: u64,
    file_name: &'a str,
    resource_type: &'a str,
}

/// Rebuild a signed URL so it points at `remote_key` on the signing host (port dropped, https),
/// keep its query string, then percent-decode the whole URL.
pub fn rewrite_signed_url(signed_url: &str, remote_key: &str) -> Result<String> {
    let after_scheme = signed_url
        .split_once("://")
        .map(|(_, rest)| rest)
        .ok_or_else(|| anyhow!("signed URL has no scheme: {signed_url}"))?;
    let authority = after_scheme
        .split(['/', '?'])
        .next()
        .unwrap_or_default();
    let host = authority.split(':').next().unwrap_or_default();
    if host.is_empty() {
        bail!("signed URL has no host: {signed_url}");
    }
    let (_, query) = signed_url
        .split_once('?')
        .ok_or_else(|| anyhow!("signed URL has no query string: {signed_url}"))?;
    let rebuilt = format!("https://{host}/{remote_key}?{query}");
    let decoded = urlencoding::decode(&rebuilt).context("percent-decode signed URL")?;
    Ok(decoded.into_owned())
}

/// iEarth API client. Cheap to share across workers (`reqwest` clients are internally pooled).
pub struct ApiClient {
    client: reqwest::blocking::Client,
    endpoints: ApiEndpoints,
    resource_id: u32,
    chunk_size: usize,
    auth: Arc<dyn AuthProvider>,
}

impl ApiClient {
    pub fn new(
        client: reqwest::blocking::Client,
        endpoints: ApiEndpoints,
        resource_id: u32,
        chunk_size: usize,
        auth: Arc<dyn AuthProvider>,
    ) -> Self {
        Self {
            client,
            endpoints,
            resource_id,
            chunk_size: chunk_size.max(1),
            auth,
        }
    }

    fn require_token(&self) -> Result<String> {
        self.auth
            .token()
            .ok_or_else(|| anyhow!("not authenticated: no session token"))
    }

    fn signed_url_for(&self, remote_key: &str, token: &str) -> Result<String> {
        let resp: SignedUrlResponse = self
            .client
            .post(&self.endpoints.download)
            .bearer_auth(token)
            .json(&SignedUrlRequest {
                object_key: remote_key,
                resource_id: self.resource_id.to_string(),
                user_account: self.auth.account(),
                resource_type: RESOURCE_TYPE,
                country: DOWNLOAD_COUNTRY,
            })
            .send()
            .context("request signed URL")?
            .error_for_status()
            .context("signed URL request rejected")?
            .json()
            .context("parse signed URL response")?;
        rewrite_signed_url(&resp.signed_url, remote_key)
    }

    fn stream_to_file(&self, url: &str, part_path: &Path) -> Result<u64> {
        let mut resp = self
            .client
            .get(url)
            .send()
            .context("start download")?
            .error_for_status()
            .context("download rejected")?;
        let file = File::create(part_path)
            .with_context(|| format!("create {}", part_path.display()))?;
        let mut writer = BufWriter::new(file);
        let mut buf = vec![0u8; self.chunk_size];
        let mut written = 0_u64;
        loop {
            let n = resp.read(&mut buf).context("read download body")?;
            if n == 0 {
                break;
            }
            writer
                .write_all(&buf[..n])
                .with_context(|| format!("write {}", part_path.display()))?;
            written += n as u64;
        }
        writer
            .flush()
            .with_context(|| format!("flush {}", part_path.display()))?;
        Ok(written)
    }
}

impl CatalogSource for ApiClient {
    fn fetch(&self, resource_id: u32) -> Result<CatalogSnapshot> {
        debug!("Fetching catalog for resource {resource_id}");
        let resp: CatalogResponse = self
            .client
            .get(&self.endpoints.catalog)
            .query(&[("id", resource_id)])
            .send()
            .context("fetch catalog")?
            .error_for_status()
            .context("catalog request rejected")?
            .json()
            .context("parse catalog response")?;
        Ok(CatalogSnapshot {
            paths: flatten_catalog(&resp.catalog),
            table: resp.table,
            type_tag: resp.type_tag,
        })
    }
}

impl FileLister for ApiClient {
    fn list(&self, table: &str, path: &str) -> Result<Vec<RemoteFile>> {
        debug!("Fetching file list for path: {path}");
        let resp: FileListResponse = self
            .client
            .post(&self.endpoints.file_list)
            .json(&FileListRequest {
                params: FileListParams {
                    table,
                    path,
                    page: 1,
                    enable_spatial_query: false,
                    count: FILE_LIST_PAGE_SIZE,
                },
            })
            .send()
            .with_context(|| format!("list files under {path}"))?
            .error_for_status()
            .with_context(|| format!("file list request rejected for {path}"))?
            .json()
            .with_context(|| format!("parse file list for {path}"))?;
        Ok(resp.response)
    }
}

impl FileTransport for ApiClient {
    fn fetch(&self, remote_key: &str, filename: &str, dest_dir: &Path) -> Result<()> {
        let token = self.require_token()?;
        if !is_safe_file_name(filename) {
            bail!("refusing to write unsafe file name {filename:?}");
        }
        std::fs::create_dir_all(dest_dir)
            .with_context(|| format!("create directory {}", dest_dir.display()))?;
        let url = self.signed_url_for(remote_key, &token)?;

        let final_path = dest_dir.join(filename);
        let part_path = part_path_for(&final_path);
        match self.stream_to_file(&url, &part_path) {
            Ok(bytes) => {
                rename_part_to_final(&part_path, &final_path)?;
                debug!("Downloaded {} ({bytes} bytes)", final_path.display());
                Ok(())
            }
            Err(e) => {
                remove_part_file(&part_path);
                Err(e)
            }
        }
    }

    fn report(&self, remote_key: &str, filename: &str, size: u64) -> Result<()> {
        let token = self.require_token()?;
        let account = self
            .auth
            .account()
            .ok_or_else(|| anyhow!("not authenticated: no user account"))?;
        self.client
            .post(&self.endpoints.record)
            .json(&RecordRequest {
                resource_id: self.resource_id.to_string(),
                object_key: remote_key,
                token: &token,
                user_account: &account,
                country: RECORD_COUNTRY,
                file_size: size,
                file_name: filename,
                resource_type: RESOURCE_TYPE,
            })
            .send()
            .context("send download record")?
            .error_for_status()
            .context("download record rejected")?;
        Ok(())
    }
}
