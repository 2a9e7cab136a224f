use crate::core::constants::USER_AGENT;
use crate::core::geo::TileCoord;
use crate::runtime;
use crate::{MapError, Result};
use async_trait::async_trait;
use crossbeam_channel::{Receiver, Sender};
use futures::FutureExt;
use once_cell::sync::Lazy;
use reqwest::Client;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Shared HTTP client with a custom User-Agent so that public tile servers
/// (e.g. OpenStreetMap) don't reject the request. Building the client once
/// avoids the cost of TLS and connection pool setup for every tile.
pub(crate) static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|e| {
            log::warn!("falling back to default http client: {}", e);
            Client::new()
        })
});

/// Retrieves the raw bytes behind a URL or path
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Fetches `http(s)://` URLs with reqwest
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpFetcher;

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = HTTP_CLIENT.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MapError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// Reads local files; `file://` prefixes are stripped
#[derive(Debug, Default, Clone, Copy)]
pub struct FileFetcher;

#[async_trait]
impl Fetcher for FileFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let path = url.strip_prefix("file://").unwrap_or(url);
        Ok(tokio::fs::read(path).await?)
    }
}

/// Picks the HTTP or file fetcher from the URL scheme
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultFetcher;

impl DefaultFetcher {
    pub fn is_remote(url: &str) -> bool {
        url.starts_with("http://") || url.starts_with("https://")
    }
}

#[async_trait]
impl Fetcher for DefaultFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        if Self::is_remote(url) {
            HttpFetcher.fetch(url).await
        } else {
            FileFetcher.fetch(url).await
        }
    }
}

/// Runs a fetch, turning a panic inside the fetcher into an error so the
/// map still hears back about the request
async fn guarded_fetch(fetcher: &dyn Fetcher, url: &str) -> Result<Vec<u8>> {
    AssertUnwindSafe(fetcher.fetch(url))
        .catch_unwind()
        .await
        .unwrap_or_else(|_| Err(MapError::Runtime(format!("fetch of {} panicked", url))))
}

/// Outcome of a background fetch, delivered back to the map thread
#[derive(Debug)]
pub enum FetchResult {
    Tile {
        layer_id: String,
        coord: TileCoord,
        result: Result<Vec<u8>>,
    },
    Resource {
        layer_id: String,
        url: String,
        result: Result<Vec<u8>>,
    },
}

/// Loader that fetches tiles and layer data on the async runtime and sends
/// the outcome back over a crossbeam channel.
///
/// Failed requests are reported once and never retried.
pub struct TileLoader {
    fetcher: Arc<dyn Fetcher>,
    tx: Sender<FetchResult>,
    rx: Receiver<FetchResult>,
}

impl TileLoader {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { fetcher, tx, rx }
    }

    /// Start downloading a tile; the result arrives through [`TileLoader::drain`]
    pub fn request_tile(&self, layer_id: &str, coord: TileCoord, url: String) -> Result<()> {
        let fetcher = Arc::clone(&self.fetcher);
        let tx = self.tx.clone();
        let layer_id = layer_id.to_string();

        runtime::spawn(async move {
            log::debug!("fetch tile {} {} from {}", layer_id, coord, url);
            let result = guarded_fetch(fetcher.as_ref(), &url).await;
            if let Err(e) = &result {
                log::debug!("tile {} {} failed: {}", layer_id, coord, e);
            }
            let _ = tx.send(FetchResult::Tile {
                layer_id,
                coord,
                result,
            });
        })
    }

    /// Start downloading a layer resource such as a GeoJSON document
    pub fn request_resource(&self, layer_id: &str, url: String) -> Result<()> {
        let fetcher = Arc::clone(&self.fetcher);
        let tx = self.tx.clone();
        let layer_id = layer_id.to_string();

        runtime::spawn(async move {
            log::debug!("fetch {} data from {}", layer_id, url);
            let result = guarded_fetch(fetcher.as_ref(), &url).await;
            let _ = tx.send(FetchResult::Resource {
                layer_id,
                url,
                result,
            });
        })
    }

    /// Completed fetches since the last call, without blocking
    pub fn drain(&self) -> Vec<FetchResult> {
        self.rx.try_iter().collect()
    }
}
