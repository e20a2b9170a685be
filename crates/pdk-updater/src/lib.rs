//! # pdk-updater
//!
//! Update-distribution client for the PaperDeck desktop application.
//!
//! The pipeline mirrors how desktop release feeds actually work: a
//! small channel manifest names the latest release, the artifact is
//! downloaded and verified, and a platform installer is handed the
//! rest.
//!
//! ## Features
//!
//! - **Channel manifests**: line-oriented `latest.yml`/`beta.yml`/
//!   `nightly.yml` documents, validated before use
//! - **Version comparison**: lenient ordering with prerelease ranks
//!   (`dev` < `alpha` < `beta` < `rc`) and ignored build metadata
//! - **Robust downloads**: streaming transfer with progress reporting,
//!   stall detection, automatic retries, and stale artifact cleanup
//! - **Integrity**: streaming SHA-512 verification against the
//!   manifest digest before anything is installed
//! - **Hand-off**: detached installer launch followed by a coordinated
//!   application shutdown
//!
//! ## Quick start
//!
//! ```no_run
//! use pdk_updater::{UpdateChannel, UpdateManager, UpdaterConfig};
//!
//! # async fn run() -> Result<(), pdk_updater::UpdateError> {
//! let manager = UpdateManager::new(UpdaterConfig::default(), "1.2.3")?;
//! let result = manager.check_for_updates(UpdateChannel::Stable).await;
//! if result.update_available {
//!     let artifact = manager.download_update().await?;
//!     manager.install_update(&artifact).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod config;
pub mod download;
pub mod error;
pub mod fetch;
pub mod install;
pub mod manager;
pub mod manifest;
pub mod notify;
pub mod verify;
pub mod version;

#[cfg(test)]
mod proptests;

pub use channel::{SettingsFn, SettingsStore, UpdateChannel, UpdaterSettings};
pub use config::{InstallConfig, NetworkConfig, StorageConfig, UpdaterConfig};
pub use download::{DownloadProgress, Downloader, ProgressCallback};
pub use error::UpdateError;
pub use fetch::{ByteStream, FetchResponse, HttpFetcher, ReqwestFetcher, MAX_REDIRECTS};
pub use install::InstallerLauncher;
pub use manager::{UpdateCheckResult, UpdateManager, UpdateState};
pub use manifest::UpdateManifest;
pub use notify::{EventCallback, UpdateEvent};
pub use verify::ChecksumVerifier;
