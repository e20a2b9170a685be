//! Update orchestration.
//!
//! [`UpdateManager`] drives the full pipeline: manifest check, artifact
//! download with retries, digest verification, and installer hand-off.
//! It owns the observable [`UpdateState`] and the pending update handle
//! that links a successful check to a later download.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::channel::{SettingsFn, UpdateChannel};
use crate::config::UpdaterConfig;
use crate::download::{DownloadProgress, Downloader};
use crate::error::UpdateError;
use crate::fetch::{HttpFetcher, ReqwestFetcher};
use crate::install::InstallerLauncher;
use crate::manifest::UpdateManifest;
use crate::notify::{EventCallback, UpdateEvent};
use crate::verify::ChecksumVerifier;
use crate::version;

/// Where the pipeline currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateState {
    /// Nothing in flight.
    Idle,
    /// Fetching and validating the channel manifest.
    Checking,
    /// The running version is current.
    UpToDate,
    /// A newer release is pending download.
    UpdateAvailable,
    /// Artifact transfer in progress.
    Downloading,
    /// Digest verification in progress.
    Verifying,
    /// Verified artifact staged on disk.
    ReadyToInstall,
    /// Installer spawned, shutdown requested.
    Installing,
    /// Last operation failed.
    Failed(String),
}

impl Default for UpdateState {
    fn default() -> Self {
        UpdateState::Idle
    }
}

/// Outcome of a manifest check. Failures are captured here rather than
/// raised, so a background check can never take the host down.
#[derive(Debug)]
pub struct UpdateCheckResult {
    /// Whether the feed carries something newer than the running version.
    pub update_available: bool,
    /// Version the application is running.
    pub current_version: String,
    /// Version the feed advertises, when the check got that far.
    pub latest_version: Option<String>,
    /// Full manifest, populated only when an update is available.
    pub manifest: Option<UpdateManifest>,
    /// What went wrong, if anything.
    pub error: Option<UpdateError>,
}

/// Orchestrates checking, downloading, verifying, and installing.
pub struct UpdateManager {
    config: UpdaterConfig,
    current_version: String,
    fetcher: Arc<dyn HttpFetcher>,
    downloader: Downloader,
    verifier: ChecksumVerifier,
    launcher: InstallerLauncher,
    state: Arc<RwLock<UpdateState>>,
    pending_update: Arc<RwLock<Option<UpdateManifest>>>,
    event_callback: Option<EventCallback>,
}

impl UpdateManager {
    /// Create a manager backed by the production HTTP client.
    pub fn new(
        config: UpdaterConfig,
        current_version: impl Into<String>,
    ) -> Result<Self, UpdateError> {
        let fetcher: Arc<dyn HttpFetcher> = Arc::new(ReqwestFetcher::new(&config.network)?);
        Ok(Self::with_fetcher(config, current_version, fetcher))
    }

    /// Create a manager on an explicit transport.
    pub fn with_fetcher(
        config: UpdaterConfig,
        current_version: impl Into<String>,
        fetcher: Arc<dyn HttpFetcher>,
    ) -> Self {
        let downloader = Downloader::new(Arc::clone(&fetcher), &config.storage, &config.network);
        let launcher = InstallerLauncher::new(&config.install);
        Self {
            config,
            current_version: current_version.into(),
            fetcher,
            downloader,
            verifier: ChecksumVerifier::new(),
            launcher,
            state: Arc::new(RwLock::new(UpdateState::Idle)),
            pending_update: Arc::new(RwLock::new(None)),
            event_callback: None,
        }
    }

    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    /// Directory downloads are staged in.
    pub fn download_dir(&self) -> PathBuf {
        self.config.storage.download_dir()
    }

    pub async fn state(&self) -> UpdateState {
        self.state.read().await.clone()
    }

    /// Manifest of the update found by the last successful check.
    pub async fn pending_update(&self) -> Option<UpdateManifest> {
        self.pending_update.read().await.clone()
    }

    pub async fn clear_pending_update(&self) {
        *self.pending_update.write().await = None;
    }

    /// Return to [`UpdateState::Idle`], typically after a failure has
    /// been acknowledged.
    pub async fn reset(&self) {
        self.set_state(UpdateState::Idle).await;
    }

    /// Register the host's event callback. Download progress is
    /// forwarded through it as [`UpdateEvent::DownloadProgress`].
    pub fn set_event_callback<F>(&mut self, callback: F)
    where
        F: Fn(UpdateEvent) + Send + Sync + 'static,
    {
        let callback: EventCallback = Arc::new(callback);
        let forward = Arc::clone(&callback);
        self.downloader
            .set_progress_callback(move |progress| forward(UpdateEvent::DownloadProgress(progress)));
        self.event_callback = Some(callback);
    }

    /// Register a raw progress callback instead of receiving progress
    /// through the event callback. The later registration wins.
    pub fn set_progress_callback<F>(&mut self, callback: F)
    where
        F: Fn(DownloadProgress) + Send + Sync + 'static,
    {
        self.downloader.set_progress_callback(callback);
    }

    /// Register the closure invoked to shut the host down after the
    /// installer starts.
    pub fn set_shutdown_handler<F>(&mut self, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.launcher.set_shutdown_handler(handler);
    }

    /// Check the channel feed for a newer release.
    ///
    /// Never fails: network, HTTP, and manifest problems all land in
    /// the result's `error` field. A success either arms the pending
    /// update handle (newer version found) or clears it.
    pub async fn check_for_updates(&self, channel: UpdateChannel) -> UpdateCheckResult {
        info!(
            "checking for updates on the {} channel (current version {})",
            channel, self.current_version
        );
        self.set_state(UpdateState::Checking).await;

        let manifest_url = self.config.manifest_url(channel);
        let manifest = match self.fetch_manifest(&manifest_url).await {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!("update check failed: {}", e);
                self.set_state(UpdateState::Failed(e.to_string())).await;
                return UpdateCheckResult {
                    update_available: false,
                    current_version: self.current_version.clone(),
                    latest_version: None,
                    manifest: None,
                    error: Some(e),
                };
            }
        };

        if version::is_newer(&self.current_version, &manifest.version) {
            info!(
                "update available: {} -> {}",
                self.current_version, manifest.version
            );
            *self.pending_update.write().await = Some(manifest.clone());
            self.set_state(UpdateState::UpdateAvailable).await;
            self.emit(UpdateEvent::UpdateAvailable {
                version: manifest.version.clone(),
                file_name: manifest.file_name.clone(),
                size: manifest.size,
            });
            UpdateCheckResult {
                update_available: true,
                current_version: self.current_version.clone(),
                latest_version: Some(manifest.version.clone()),
                manifest: Some(manifest),
                error: None,
            }
        } else {
            info!(
                "no update available (current {}, feed has {})",
                self.current_version, manifest.version
            );
            *self.pending_update.write().await = None;
            self.set_state(UpdateState::UpToDate).await;
            self.emit(UpdateEvent::UpToDate {
                version: self.current_version.clone(),
            });
            UpdateCheckResult {
                update_available: false,
                current_version: self.current_version.clone(),
                latest_version: Some(manifest.version.clone()),
                manifest: None,
                error: None,
            }
        }
    }

    async fn fetch_manifest(&self, url: &str) -> Result<UpdateManifest, UpdateError> {
        debug!("fetching manifest from {}", url);
        let deadline = Duration::from_secs(self.config.network.fetch_timeout_secs);
        let bytes = tokio::time::timeout(deadline, async {
            let response = self.fetcher.get(url).await?;
            response.ensure_success()?;
            response.into_bytes().await
        })
        .await
        .map_err(|_| UpdateError::NetworkTimeout)??;

        let text = String::from_utf8(bytes)
            .map_err(|_| UpdateError::InvalidManifest("manifest is not valid UTF-8".to_string()))?;
        UpdateManifest::parse(&text)
    }

    /// Download and verify the pending update, retrying transient
    /// failures with doubling delays up to the configured attempt cap.
    ///
    /// Returns the path of the verified artifact.
    pub async fn download_update(&self) -> Result<PathBuf, UpdateError> {
        let manifest = self
            .pending_update
            .read()
            .await
            .clone()
            .ok_or(UpdateError::NoPendingUpdate)?;

        let url = self
            .config
            .artifact_url(&manifest.version, &manifest.file_name);
        let dest = self.download_dir().join(&manifest.file_name);
        info!("downloading update {} from {}", manifest.version, url);

        let max_attempts = self.config.network.max_attempts.max(1);
        let mut delay = Duration::from_secs(self.config.network.initial_backoff_secs);
        let mut attempt = 1u32;
        loop {
            self.set_state(UpdateState::Downloading).await;
            match self.download_and_verify(&url, &dest, &manifest).await {
                Ok(()) => break,
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    warn!(
                        "download attempt {}/{} failed: {}, retrying in {:?}",
                        attempt, max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                    attempt += 1;
                }
                Err(e) => {
                    error!("update download failed: {}", e);
                    self.set_state(UpdateState::Failed(e.to_string())).await;
                    self.emit(UpdateEvent::failed(&e));
                    return Err(e);
                }
            }
        }

        self.set_state(UpdateState::ReadyToInstall).await;
        self.emit(UpdateEvent::ReadyToInstall { path: dest.clone() });
        Ok(dest)
    }

    async fn download_and_verify(
        &self,
        url: &str,
        dest: &Path,
        manifest: &UpdateManifest,
    ) -> Result<(), UpdateError> {
        self.downloader.download(url, dest, manifest.size).await?;

        self.set_state(UpdateState::Verifying).await;
        self.emit(UpdateEvent::VerificationStarted);
        match self.verifier.ensure_matches(dest, &manifest.sha512) {
            Ok(()) => {
                self.emit(UpdateEvent::VerificationFinished { ok: true });
                Ok(())
            }
            Err(e) => {
                if matches!(e, UpdateError::ChecksumMismatch { .. }) {
                    self.emit(UpdateEvent::VerificationFinished { ok: false });
                    // a corrupt artifact must never survive to be installed
                    let _ = tokio::fs::remove_file(dest).await;
                }
                Err(e)
            }
        }
    }

    /// Hand a verified artifact to the platform installer.
    pub async fn install_update(&self, installer: &Path) -> Result<(), UpdateError> {
        info!("installing update from {:?}", installer);
        self.set_state(UpdateState::Installing).await;
        match self.launcher.launch(installer).await {
            Ok(()) => {
                *self.pending_update.write().await = None;
                Ok(())
            }
            Err(e) => {
                error!("install failed: {}", e);
                self.set_state(UpdateState::Failed(e.to_string())).await;
                self.emit(UpdateEvent::failed(&e));
                Err(e)
            }
        }
    }

    /// Arm a one-shot background check that runs `delay` after `ready`
    /// resolves. Settings are read when the timer fires, so a user
    /// disabling automatic checks during the delay is honored.
    pub fn schedule_check<R>(
        self: Arc<Self>,
        ready: R,
        get_settings: SettingsFn,
        delay: Duration,
    ) -> JoinHandle<()>
    where
        R: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(async move {
            ready.await;
            tokio::time::sleep(delay).await;
            let settings = get_settings();
            if !settings.auto_check {
                debug!("automatic update checks are disabled, skipping scheduled check");
                return;
            }
            info!(
                "running scheduled update check on the {} channel",
                settings.channel
            );
            let result = self.check_for_updates(settings.channel).await;
            if let Some(error) = result.error {
                debug!("scheduled update check failed quietly: {}", error);
            }
        })
    }

    async fn set_state(&self, new_state: UpdateState) {
        let mut state = self.state.write().await;
        debug!("update state: {:?} -> {:?}", *state, new_state);
        *state = new_state;
    }

    fn emit(&self, event: UpdateEvent) {
        if let Some(callback) = &self.event_callback {
            callback(event);
        }
    }
}
