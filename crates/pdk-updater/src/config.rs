//! Updater configuration.
//!
//! Deployments override individual fields in a TOML file; every field
//! has a default so a missing or partial file still yields a working
//! configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::channel::UpdateChannel;
use crate::error::UpdateError;

/// Directory under the system temp dir where artifacts are staged when
/// no explicit download directory is configured.
const DEFAULT_DOWNLOAD_SUBDIR: &str = "paperdeck-updates";

/// Top-level configuration for the update pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// Base URL under which channel manifests are published.
    #[serde(default = "default_channel_base_url")]
    pub channel_base_url: String,

    /// Base URL under which versioned release artifacts are published.
    #[serde(default = "default_releases_base_url")]
    pub releases_base_url: String,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub install: InstallConfig,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            channel_base_url: default_channel_base_url(),
            releases_base_url: default_releases_base_url(),
            network: NetworkConfig::default(),
            storage: StorageConfig::default(),
            install: InstallConfig::default(),
        }
    }
}

impl UpdaterConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, UpdateError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| UpdateError::ConfigError(format!("failed to read config: {}", e)))?;
        toml::from_str(&content)
            .map_err(|e| UpdateError::ConfigError(format!("failed to parse config: {}", e)))
    }

    /// Save configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), UpdateError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| UpdateError::ConfigError(format!("failed to serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// URL of the manifest for a channel:
    /// `{channel_base_url}/{latest|beta|nightly}.yml`.
    pub fn manifest_url(&self, channel: UpdateChannel) -> String {
        format!(
            "{}/{}",
            self.channel_base_url.trim_end_matches('/'),
            channel.manifest_file_name()
        )
    }

    /// URL of a release artifact:
    /// `{releases_base_url}/v{version}/{file_name}`.
    pub fn artifact_url(&self, version: &str, file_name: &str) -> String {
        format!(
            "{}/v{}/{}",
            self.releases_base_url.trim_end_matches('/'),
            version,
            file_name
        )
    }
}

/// Timeouts, retry policy, and client identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Overall deadline for a manifest fetch, in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// How long a download may go without receiving data before it is
    /// abandoned, in seconds.
    #[serde(default = "default_stall_timeout")]
    pub stall_timeout_secs: u64,

    /// Total download attempts, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry, in seconds. Doubles per retry.
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_secs: u64,

    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: default_fetch_timeout(),
            stall_timeout_secs: default_stall_timeout(),
            max_attempts: default_max_attempts(),
            initial_backoff_secs: default_initial_backoff(),
            user_agent: default_user_agent(),
        }
    }
}

/// Where artifacts are staged and how long stale ones survive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for downloaded artifacts. Defaults to a subdirectory
    /// of the system temp dir when unset.
    #[serde(default)]
    pub download_dir: Option<PathBuf>,

    /// File name prefix identifying this application's artifacts, used
    /// when purging leftovers from earlier runs.
    #[serde(default = "default_artifact_prefix")]
    pub artifact_prefix: String,

    /// Age in hours past which a leftover artifact is purged.
    #[serde(default = "default_stale_age_hours")]
    pub stale_age_hours: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            download_dir: None,
            artifact_prefix: default_artifact_prefix(),
            stale_age_hours: default_stale_age_hours(),
        }
    }
}

impl StorageConfig {
    /// Resolved download directory.
    pub fn download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DOWNLOAD_SUBDIR))
    }
}

/// Installer hand-off behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallConfig {
    /// Arguments passed to the installer for an unattended run.
    #[serde(default = "default_silent_args")]
    pub silent_args: Vec<String>,

    /// Pause between spawning the installer and requesting application
    /// shutdown, in milliseconds.
    #[serde(default = "default_shutdown_delay_ms")]
    pub shutdown_delay_ms: u64,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            silent_args: default_silent_args(),
            shutdown_delay_ms: default_shutdown_delay_ms(),
        }
    }
}

fn default_channel_base_url() -> String {
    "https://updates.paperdeck.app/channels".to_string()
}

fn default_releases_base_url() -> String {
    "https://updates.paperdeck.app/releases".to_string()
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_stall_timeout() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff() -> u64 {
    1
}

fn default_user_agent() -> String {
    format!("pdk-updater/{}", env!("CARGO_PKG_VERSION"))
}

fn default_artifact_prefix() -> String {
    "PaperDeck-Setup-".to_string()
}

fn default_stale_age_hours() -> u64 {
    24
}

fn default_silent_args() -> Vec<String> {
    vec!["/S".to_string()]
}

fn default_shutdown_delay_ms() -> u64 {
    500
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = UpdaterConfig::default();
        assert_eq!(config.network.fetch_timeout_secs, 30);
        assert_eq!(config.network.stall_timeout_secs, 60);
        assert_eq!(config.network.max_attempts, 3);
        assert_eq!(config.network.initial_backoff_secs, 1);
        assert!(config.network.user_agent.starts_with("pdk-updater/"));
        assert_eq!(config.storage.artifact_prefix, "PaperDeck-Setup-");
        assert_eq!(config.storage.stale_age_hours, 24);
        assert_eq!(config.install.silent_args, vec!["/S".to_string()]);
        assert_eq!(config.install.shutdown_delay_ms, 500);
    }

    #[test]
    fn test_default_download_dir_under_temp() {
        let config = UpdaterConfig::default();
        let dir = config.storage.download_dir();
        assert!(dir.starts_with(std::env::temp_dir()));
        assert!(dir.ends_with(DEFAULT_DOWNLOAD_SUBDIR));
    }

    #[test]
    fn test_explicit_download_dir_wins() {
        let mut config = UpdaterConfig::default();
        config.storage.download_dir = Some(PathBuf::from("/var/cache/paperdeck"));
        assert_eq!(
            config.storage.download_dir(),
            PathBuf::from("/var/cache/paperdeck")
        );
    }

    #[test]
    fn test_manifest_url_per_channel() {
        let config = UpdaterConfig::default();
        assert_eq!(
            config.manifest_url(UpdateChannel::Stable),
            "https://updates.paperdeck.app/channels/latest.yml"
        );
        assert_eq!(
            config.manifest_url(UpdateChannel::Beta),
            "https://updates.paperdeck.app/channels/beta.yml"
        );
        assert_eq!(
            config.manifest_url(UpdateChannel::Nightly),
            "https://updates.paperdeck.app/channels/nightly.yml"
        );
    }

    #[test]
    fn test_artifact_url_includes_version_prefix() {
        let config = UpdaterConfig::default();
        assert_eq!(
            config.artifact_url("1.2.4", "PaperDeck-Setup-1.2.4.exe"),
            "https://updates.paperdeck.app/releases/v1.2.4/PaperDeck-Setup-1.2.4.exe"
        );
    }

    #[test]
    fn test_trailing_slash_normalized() {
        let mut config = UpdaterConfig::default();
        config.channel_base_url = "https://example.com/channels/".to_string();
        config.releases_base_url = "https://example.com/releases/".to_string();
        assert_eq!(
            config.manifest_url(UpdateChannel::Stable),
            "https://example.com/channels/latest.yml"
        );
        assert_eq!(
            config.artifact_url("2.0.0", "a.exe"),
            "https://example.com/releases/v2.0.0/a.exe"
        );
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: UpdaterConfig = toml::from_str(
            "channel_base_url = \"https://mirror.example.com/channels\"\n\
             [network]\n\
             max_attempts = 5\n",
        )
        .unwrap();
        assert_eq!(
            config.channel_base_url,
            "https://mirror.example.com/channels"
        );
        assert_eq!(config.network.max_attempts, 5);
        assert_eq!(config.network.fetch_timeout_secs, 30);
        assert_eq!(config.storage.stale_age_hours, 24);
    }

    #[test]
    fn test_config_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("updater.toml");

        let mut config = UpdaterConfig::default();
        config.network.max_attempts = 7;
        config.storage.artifact_prefix = "Custom-".to_string();
        config.save_to_file(&path).unwrap();

        let loaded = UpdaterConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.network.max_attempts, 7);
        assert_eq!(loaded.storage.artifact_prefix, "Custom-");
    }

    #[test]
    fn test_load_missing_file_fails() {
        let err = UpdaterConfig::load_from_file(Path::new("/nonexistent/updater.toml"))
            .unwrap_err();
        assert!(matches!(err, UpdateError::ConfigError(_)));
    }
}
