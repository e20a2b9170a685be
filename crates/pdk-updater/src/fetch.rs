//! HTTP transport seam.
//!
//! All network access goes through the [`HttpFetcher`] trait so the
//! check/download pipeline can be driven by a scripted transport in tests.
//! The production implementation wraps a shared `reqwest` client configured
//! with the redirect cap and timeouts from [`NetworkConfig`].

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;

use crate::config::NetworkConfig;
use crate::error::UpdateError;

/// Maximum redirect hops before a fetch is abandoned.
pub const MAX_REDIRECTS: usize = 5;

/// Streaming response body.
pub type ByteStream = BoxStream<'static, Result<Bytes, UpdateError>>;

/// A decoded HTTP response with a lazily consumed body.
pub struct FetchResponse {
    /// HTTP status code.
    pub status: u16,
    /// Value of the `Content-Length` header, when the server sent one.
    pub content_length: Option<u64>,
    /// Response body as a stream of chunks.
    pub body: ByteStream,
}

impl FetchResponse {
    /// Fail with [`UpdateError::HttpStatus`] unless the status is 2xx.
    pub fn ensure_success(&self) -> Result<(), UpdateError> {
        if (200..300).contains(&self.status) {
            Ok(())
        } else {
            Err(UpdateError::HttpStatus {
                status: self.status,
            })
        }
    }

    /// Drain the body into memory. Only suitable for small documents
    /// such as manifests.
    pub async fn into_bytes(self) -> Result<Vec<u8>, UpdateError> {
        let mut body = self.body;
        let mut buf = Vec::new();
        while let Some(chunk) = body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf)
    }
}

/// Abstraction over the HTTP transport used for manifests and artifacts.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    /// Perform a GET request, following redirects up to [`MAX_REDIRECTS`].
    async fn get(&self, url: &str) -> Result<FetchResponse, UpdateError>;
}

/// Production fetcher backed by `reqwest`.
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    /// Build a client with the configured timeouts, redirect cap, and
    /// user agent.
    pub fn new(config: &NetworkConfig) -> Result<Self, UpdateError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .connect_timeout(Duration::from_secs(config.fetch_timeout_secs))
            .read_timeout(Duration::from_secs(config.stall_timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| UpdateError::ConfigError(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn get(&self, url: &str) -> Result<FetchResponse, UpdateError> {
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let content_length = response.content_length();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(UpdateError::from))
            .boxed();
        Ok(FetchResponse {
            status,
            content_length,
            body,
        })
    }
}
