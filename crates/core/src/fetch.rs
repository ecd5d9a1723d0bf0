//! Retrieval of artifact bytes from remote and local sources.

use reqwest::Client;
use reqwest::header::{CACHE_CONTROL, HeaderMap, HeaderValue, PRAGMA};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::log::DebugLog;
use crate::source::Descriptor;
use crate::{Error, Result};

const USER_AGENT: &str = "nuro";

/// Downloads or copies artifact bytes.
///
/// Never writes to the cache itself; callers check the cache first and store
/// what this returns.
pub struct Fetcher {
    client: Client,
    timeout: Duration,
    log: Arc<dyn DebugLog>,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Fetcher {
    /// Create a fetcher whose downloads give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error if the HTTP client cannot be built
    /// (TLS backend initialisation failure).
    pub fn new(timeout: Duration, log: Arc<dyn DebugLog>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::configuration(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout,
            log,
        })
    }

    /// Per-request timeout for downloads.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Retrieve the bytes a descriptor points at.
    ///
    /// # Errors
    ///
    /// Returns `Retrieval` when a local file is missing or unreadable, when a
    /// request fails below HTTP (`unreachable` is set), or when the server
    /// answers with a non-success status.
    pub async fn fetch(&self, descriptor: &Descriptor) -> Result<Vec<u8>> {
        match descriptor {
            Descriptor::Local { path } => {
                self.log
                    .record(&format!("Copying from local source: {}", path.display()));
                tokio::fs::read(path)
                    .await
                    .map_err(|e| Error::retrieval(path.display().to_string(), e.to_string()))
            }
            Descriptor::Remote { url } => {
                self.log.record(&format!("Fetching from URL: {url}"));
                debug!(%url, "Downloading artifact");

                let response = self
                    .client
                    .get(url)
                    .timeout(self.timeout)
                    .send()
                    .await
                    .map_err(|e| Error::unreachable(url.clone(), e.to_string()))?;

                let status = response.status();
                if !status.is_success() {
                    return Err(Error::retrieval(url.clone(), format!("HTTP {status}")));
                }

                response
                    .bytes()
                    .await
                    .map(|b| b.to_vec())
                    .map_err(|e| Error::retrieval(url.clone(), format!("failed to read body: {e}")))
            }
        }
    }

    /// GET a JSON document with a caller-chosen timeout.
    ///
    /// # Errors
    ///
    /// Returns `Retrieval` on transport failure, non-success status, or an
    /// undecodable body.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str, timeout: Duration) -> Result<T> {
        self.log.record(&format!("GET {url}"));
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Error::unreachable(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::retrieval(url, format!("HTTP {status}")));
        }

        response
            .json()
            .await
            .map_err(|e| Error::retrieval(url, format!("invalid JSON: {e}")))
    }
}
