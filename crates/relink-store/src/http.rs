use async_trait::async_trait;
use bytes::Bytes;
use relink_types::ContentRef;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::chunk::Chunk;
use crate::error::{StoreError, StoreResult};
use crate::traits::{ChunkStore, PutOptions};

const PIN_HEADER: &str = "swarm-pin";
const ENCRYPT_HEADER: &str = "swarm-encrypt";

/// Location of a node's HTTP API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    /// Use `https` instead of `http`.
    pub ssl: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 1633,
            ssl: false,
        }
    }
}

impl ApiConfig {
    /// Base URL of the API, without a trailing slash.
    pub fn base_url(&self) -> String {
        let scheme = if self.ssl { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }
}

#[derive(Deserialize)]
struct ReferenceResponse {
    reference: String,
}

/// Chunk store backed by a remote node's `/chunks` endpoint.
#[derive(Clone, Debug)]
pub struct HttpChunkStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpChunkStore {
    /// Build a client for the given API location.
    pub fn new(config: &ApiConfig) -> StoreResult<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            base_url: config.base_url(),
        })
    }

    fn chunk_url(&self, address: &ContentRef) -> String {
        format!("{}/chunks/{}", self.base_url, address.to_hex())
    }

    fn upload_url(&self) -> String {
        format!("{}/chunks", self.base_url)
    }
}

#[async_trait]
impl ChunkStore for HttpChunkStore {
    async fn get(&self, address: &ContentRef) -> StoreResult<Chunk> {
        let url = self.chunk_url(address);
        trace!(%url, "fetching chunk");
        let response = self.client.get(&url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => return Err(StoreError::NotFound(*address)),
            status if !status.is_success() => {
                return Err(StoreError::Remote(format!("GET {url} returned {status}")))
            }
            _ => {}
        }
        let body: Bytes = response.bytes().await?;
        Chunk::from_parts(*address, body.to_vec())
    }

    async fn put(&self, options: PutOptions, chunk: &Chunk) -> StoreResult<ContentRef> {
        let url = self.upload_url();
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .header(PIN_HEADER, options.pin.to_string())
            .header(ENCRYPT_HEADER, options.encrypt.to_string())
            .body(chunk.data().to_vec())
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Remote(format!("POST {url} returned {status}")));
        }
        let body: ReferenceResponse = response.json().await?;
        let address = ContentRef::from_hex(&body.reference)
            .map_err(|e| StoreError::Remote(format!("bad reference in upload response: {e}")))?;
        // Encrypted uploads are addressed by the node, plain ones must match ours.
        if !options.encrypt && address != chunk.address() {
            return Err(StoreError::Remote(format!(
                "node stored chunk {} under {}",
                chunk.address(),
                address
            )));
        }
        trace!(%address, pin = options.pin, "uploaded chunk");
        Ok(address)
    }

    async fn has(&self, address: &ContentRef) -> StoreResult<bool> {
        let url = self.chunk_url(address);
        let response = self.client.head(&url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(StoreError::Remote(format!("HEAD {url} returned {status}"))),
        }
    }
}
