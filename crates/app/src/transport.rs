//! Storage backends reachable from the CLI
//!
//! Uploads go to an IPFS HTTP API; downloads go through public gateways.
//! A local directory store mirrors every upload and is read before the
//! network. Without an upload endpoint the local store is the only target.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use common::prelude::Cid;
use common::storage::{locator_for, FallbackStorage, Storage, TransportError, RAW_CODEC};
use serde::Deserialize;
use url::Url;

use crate::state::{AppConfig, CID_PLACEHOLDER};

/// Build the stores described by `config`.
pub fn storage_from_config(config: &AppConfig, http: &reqwest::Client) -> MirroredStorage {
    let remote = config
        .upload_url
        .as_ref()
        .map(|endpoint| Arc::new(IpfsApi::new(http.clone(), endpoint.clone())) as Arc<dyn Storage>);
    let gateways = config
        .gateways
        .iter()
        .map(|template| HttpGateway::new(http.clone(), template.clone()))
        .collect();
    MirroredStorage::new(config.local_store.clone().map(DirStorage::new), remote, gateways)
}

/// Network store with an optional local mirror
///
/// Uploads go to `remote` and are then copied into `local`; a failed copy
/// only logs. A failed remote upload is an error even when a local store
/// exists, so a link is never issued for bytes only this machine holds.
/// Downloads try `local`, then `remote`, then the gateways.
#[derive(Clone)]
pub struct MirroredStorage {
    local: Option<DirStorage>,
    remote: Option<Arc<dyn Storage>>,
    fetch: FallbackStorage,
}

impl std::fmt::Debug for MirroredStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirroredStorage")
            .field("local", &self.local)
            .field("remote", &self.remote.is_some())
            .field("fetch", &self.fetch)
            .finish()
    }
}

impl MirroredStorage {
    pub fn new(
        local: Option<DirStorage>,
        remote: Option<Arc<dyn Storage>>,
        gateways: Vec<HttpGateway>,
    ) -> Self {
        let mut fetch = FallbackStorage::new();
        if let Some(local) = &local {
            fetch.push(Arc::new(local.clone()));
        }
        if let Some(remote) = &remote {
            fetch.push(remote.clone());
        }
        for gateway in gateways {
            fetch.push(Arc::new(gateway));
        }
        Self {
            local,
            remote,
            fetch,
        }
    }

    /// Number of stores a download may try
    pub fn len(&self) -> usize {
        self.fetch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fetch.is_empty()
    }
}

#[async_trait::async_trait]
impl Storage for MirroredStorage {
    async fn upload(&self, bytes: Bytes, name: &str) -> Result<Cid, TransportError> {
        match (&self.remote, &self.local) {
            (Some(remote), local) => {
                let locator = remote.upload(bytes.clone(), name).await?;
                if let Some(local) = local {
                    if let Err(e) = local.put(&locator, &bytes).await {
                        tracing::warn!(%locator, "local mirror failed: {}", e);
                    }
                }
                Ok(locator)
            }
            (None, Some(local)) => {
                tracing::warn!("no upload endpoint configured; ciphertext stays local");
                local.upload(bytes, name).await
            }
            (None, None) => Err(TransportError::Request(
                "no upload endpoint or local store configured".to_string(),
            )),
        }
    }

    async fn download(&self, locator: &Cid) -> Result<Bytes, TransportError> {
        self.fetch.download(locator).await
    }
}

/// Reject bytes that do not hash to a raw locator.
///
/// Other codecs wrap the content and cannot be checked this way.
fn check_content(locator: &Cid, bytes: &[u8]) -> Result<(), TransportError> {
    if locator.codec() == RAW_CODEC && locator_for(bytes) != *locator {
        return Err(TransportError::Request(
            "content does not match locator".to_string(),
        ));
    }
    Ok(())
}

/// Read-only HTTP gateway, addressed by a URL template
#[derive(Debug, Clone)]
pub struct HttpGateway {
    http: reqwest::Client,
    template: String,
}

impl HttpGateway {
    pub fn new(http: reqwest::Client, template: String) -> Self {
        Self { http, template }
    }

    pub fn url_for(&self, locator: &Cid) -> String {
        self.template
            .replace(CID_PLACEHOLDER, &locator.to_string())
    }
}

#[async_trait::async_trait]
impl Storage for HttpGateway {
    async fn upload(&self, _bytes: Bytes, _name: &str) -> Result<Cid, TransportError> {
        Err(TransportError::Request("gateways are read-only".to_string()))
    }

    async fn download(&self, locator: &Cid) -> Result<Bytes, TransportError> {
        let url = self.url_for(locator);
        tracing::debug!(%url, "fetching from gateway");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        if !response.status().is_success() {
            return Err(TransportError::Request(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        check_content(locator, &bytes)?;
        Ok(bytes)
    }
}

/// IPFS HTTP API (`/api/v0/add` and `/api/v0/cat`)
#[derive(Debug, Clone)]
pub struct IpfsApi {
    http: reqwest::Client,
    add_url: Url,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AddResponse {
    hash: String,
}

/// Locator from the body of an `add` call
pub fn parse_add_response(body: &str) -> Result<Cid, TransportError> {
    // one JSON object per line; the last one describes the upload
    let line = body
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| TransportError::Request("empty add response".to_string()))?;
    let response: AddResponse =
        serde_json::from_str(line).map_err(|e| TransportError::Request(e.to_string()))?;
    Cid::try_from(response.hash.as_str()).map_err(|e| TransportError::Request(e.to_string()))
}

impl IpfsApi {
    pub fn new(http: reqwest::Client, add_url: Url) -> Self {
        Self { http, add_url }
    }

    fn cat_url(&self, locator: &Cid) -> Url {
        let mut url = self.add_url.clone();
        let path = url.path().trim_end_matches("/add").to_string();
        url.set_path(&format!("{}/cat", path));
        url.query_pairs_mut()
            .clear()
            .append_pair("arg", &locator.to_string());
        url
    }
}

#[async_trait::async_trait]
impl Storage for IpfsApi {
    async fn upload(&self, bytes: Bytes, name: &str) -> Result<Cid, TransportError> {
        let mut url = self.add_url.clone();
        url.query_pairs_mut()
            .append_pair("cid-version", "1")
            .append_pair("raw-leaves", "true");

        let part = reqwest::multipart::Part::bytes(bytes.to_vec()).file_name(name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        let response = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        if !response.status().is_success() {
            return Err(TransportError::Request(format!(
                "upload returned {}",
                response.status()
            )));
        }
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        parse_add_response(&body)
    }

    async fn download(&self, locator: &Cid) -> Result<Bytes, TransportError> {
        let response = self
            .http
            .post(self.cat_url(locator))
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        if !response.status().is_success() {
            return Err(TransportError::NotFound(*locator));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        check_content(locator, &bytes)?;
        Ok(bytes)
    }
}

/// Content-addressed files in a local directory, one file per locator
#[derive(Debug, Clone)]
pub struct DirStorage {
    dir: PathBuf,
}

impl DirStorage {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Store `bytes` under a locator another store assigned.
    pub async fn put(&self, locator: &Cid, bytes: &[u8]) -> Result<(), TransportError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        tokio::fs::write(self.dir.join(locator.to_string()), bytes)
            .await
            .map_err(|e| TransportError::Request(e.to_string()))
    }
}

#[async_trait::async_trait]
impl Storage for DirStorage {
    async fn upload(&self, bytes: Bytes, name: &str) -> Result<Cid, TransportError> {
        let locator = locator_for(&bytes);
        self.put(&locator, &bytes).await?;
        tracing::debug!(%locator, name, dir = %self.dir.display(), "stored locally");
        Ok(locator)
    }

    async fn download(&self, locator: &Cid) -> Result<Bytes, TransportError> {
        match tokio::fs::read(self.dir.join(locator.to_string())).await {
            Ok(bytes) => {
                check_content(locator, &bytes)?;
                Ok(Bytes::from(bytes))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(TransportError::NotFound(*locator))
            }
            Err(e) => Err(TransportError::Request(e.to_string())),
        }
    }
}
