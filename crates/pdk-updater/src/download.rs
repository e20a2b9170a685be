//! Artifact download engine.
//!
//! Downloads stream to disk through the [`HttpFetcher`] seam. Every
//! download starts from scratch: any pre-existing file at the
//! destination is deleted first, and nothing partial is ever left
//! behind on failure. A per-chunk activity deadline catches transfers
//! that keep the connection open but stop delivering data.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::{NetworkConfig, StorageConfig};
use crate::error::UpdateError;
use crate::fetch::HttpFetcher;

/// Callback invoked as download progress changes.
pub type ProgressCallback = Arc<dyn Fn(DownloadProgress) + Send + Sync>;

/// Progress of an active download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    /// Bytes written so far.
    pub bytes_received: u64,
    /// Expected total, when known. The server's Content-Length wins
    /// over the manifest's advisory size.
    pub total_bytes: Option<u64>,
}

impl DownloadProgress {
    /// Completion percentage, when the total is known.
    pub fn percent(&self) -> Option<f64> {
        match self.total_bytes {
            Some(total) if total > 0 => Some((self.bytes_received as f64 / total as f64) * 100.0),
            _ => None,
        }
    }

    /// Bytes still expected, when the total is known.
    pub fn remaining(&self) -> Option<u64> {
        self.total_bytes
            .map(|total| total.saturating_sub(self.bytes_received))
    }
}

impl fmt::Display for DownloadProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.total_bytes, self.percent()) {
            (Some(total), Some(percent)) => write!(
                f,
                "{}/{} bytes ({:.1}%)",
                self.bytes_received, total, percent
            ),
            _ => write!(f, "{} bytes", self.bytes_received),
        }
    }
}

/// Streams release artifacts to disk.
pub struct Downloader {
    fetcher: Arc<dyn HttpFetcher>,
    stall_timeout: Duration,
    artifact_prefix: String,
    stale_age: Duration,
    progress_callback: Option<ProgressCallback>,
}

impl Downloader {
    pub fn new(
        fetcher: Arc<dyn HttpFetcher>,
        storage: &StorageConfig,
        network: &NetworkConfig,
    ) -> Self {
        Self {
            fetcher,
            stall_timeout: Duration::from_secs(network.stall_timeout_secs),
            artifact_prefix: storage.artifact_prefix.clone(),
            stale_age: Duration::from_secs(storage.stale_age_hours * 3600),
            progress_callback: None,
        }
    }

    /// Set a callback invoked on every progress change.
    pub fn set_progress_callback<F>(&mut self, callback: F)
    where
        F: Fn(DownloadProgress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
    }

    pub fn clear_progress_callback(&mut self) {
        self.progress_callback = None;
    }

    /// Download `url` to `dest`, replacing any existing file there.
    ///
    /// `size_hint` is the manifest's advisory size, used for progress
    /// totals when the server omits Content-Length; zero means unknown.
    pub async fn download(
        &self,
        url: &str,
        dest: &Path,
        size_hint: u64,
    ) -> Result<(), UpdateError> {
        info!("downloading {} to {:?}", url, dest);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
            self.purge_stale(parent);
        }

        // resuming a partial transfer is never attempted
        match tokio::fs::remove_file(dest).await {
            Ok(()) => debug!("removed pre-existing file at {:?}", dest),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let result = self.stream_to_file(url, dest, size_hint).await;
        if result.is_err() {
            let _ = tokio::fs::remove_file(dest).await;
        }
        result
    }

    async fn stream_to_file(
        &self,
        url: &str,
        dest: &Path,
        size_hint: u64,
    ) -> Result<(), UpdateError> {
        let response = self.fetcher.get(url).await?;
        response.ensure_success()?;

        let total_bytes = response
            .content_length
            .or((size_hint > 0).then_some(size_hint));
        let mut stream = response.body;
        let mut file = tokio::fs::File::create(dest).await?;
        let mut bytes_received = 0u64;
        self.report_progress(bytes_received, total_bytes);

        loop {
            let chunk = match tokio::time::timeout(self.stall_timeout, stream.next()).await {
                Err(_) => {
                    warn!(
                        "no data received for {}s, abandoning download",
                        self.stall_timeout.as_secs()
                    );
                    return Err(UpdateError::DownloadStalled {
                        seconds: self.stall_timeout.as_secs(),
                    });
                }
                Ok(None) => break,
                Ok(Some(chunk)) => chunk?,
            };
            file.write_all(&chunk).await?;
            bytes_received += chunk.len() as u64;
            self.report_progress(bytes_received, total_bytes);
        }

        file.flush().await?;
        file.sync_all().await?;
        info!("download complete: {} bytes to {:?}", bytes_received, dest);
        Ok(())
    }

    fn report_progress(&self, bytes_received: u64, total_bytes: Option<u64>) {
        if let Some(callback) = &self.progress_callback {
            callback(DownloadProgress {
                bytes_received,
                total_bytes,
            });
        }
    }

    /// Delete leftover artifacts from earlier runs.
    ///
    /// Only files carrying the configured artifact prefix are touched,
    /// and only once they are older than the stale age. Files that
    /// cannot be deleted (for instance a still-running installer) are
    /// skipped. Returns the number of files removed.
    pub fn purge_stale(&self, dir: &Path) -> usize {
        let Ok(max_age) = chrono::Duration::from_std(self.stale_age) else {
            return 0;
        };
        let cutoff = Utc::now() - max_age;
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => return 0,
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.starts_with(&self.artifact_prefix) {
                continue;
            }
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let Ok(modified) = metadata.modified() else {
                continue;
            };
            if DateTime::<Utc>::from(modified) >= cutoff {
                continue;
            }
            match std::fs::remove_file(entry.path()) {
                Ok(()) => {
                    debug!("purged stale artifact {:?}", entry.path());
                    removed += 1;
                }
                Err(e) => debug!("leaving {:?} in place: {}", entry.path(), e),
            }
        }
        removed
    }
}
