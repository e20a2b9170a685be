//! Release channels and persisted updater settings.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::UpdateError;

/// File extension of channel manifests on the feed.
const MANIFEST_EXT: &str = "yml";

/// Release channel the application follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateChannel {
    /// Production releases only.
    Stable,
    /// Pre-release builds for early adopters.
    Beta,
    /// Builds cut from the development branch.
    Nightly,
}

impl UpdateChannel {
    /// Numeric stability level, higher is more stable.
    pub fn stability_level(&self) -> u8 {
        match self {
            UpdateChannel::Stable => 2,
            UpdateChannel::Beta => 1,
            UpdateChannel::Nightly => 0,
        }
    }

    /// Check whether this channel is more stable than another.
    pub fn is_more_stable_than(&self, other: &UpdateChannel) -> bool {
        self.stability_level() > other.stability_level()
    }

    /// Name of this channel's manifest file on the feed. The stable
    /// channel publishes under `latest` rather than its own name.
    pub fn manifest_file_name(&self) -> String {
        match self {
            UpdateChannel::Stable => format!("latest.{}", MANIFEST_EXT),
            other => format!("{}.{}", other, MANIFEST_EXT),
        }
    }
}

impl Default for UpdateChannel {
    fn default() -> Self {
        UpdateChannel::Stable
    }
}

impl fmt::Display for UpdateChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UpdateChannel::Stable => "stable",
            UpdateChannel::Beta => "beta",
            UpdateChannel::Nightly => "nightly",
        };
        write!(f, "{}", name)
    }
}

/// User preferences consulted by scheduled checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdaterSettings {
    /// Whether automatic checks run at all.
    #[serde(default = "default_auto_check")]
    pub auto_check: bool,
    /// Channel to check against.
    #[serde(default)]
    pub channel: UpdateChannel,
}

impl Default for UpdaterSettings {
    fn default() -> Self {
        Self {
            auto_check: true,
            channel: UpdateChannel::Stable,
        }
    }
}

fn default_auto_check() -> bool {
    true
}

/// Provider of the current settings, read at the moment a scheduled
/// check fires rather than when it is armed.
pub type SettingsFn = Arc<dyn Fn() -> UpdaterSettings + Send + Sync>;

/// Loads and persists [`UpdaterSettings`] as JSON.
pub struct SettingsStore {
    settings: UpdaterSettings,
    config_path: PathBuf,
}

impl SettingsStore {
    /// Create a store with default settings.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            settings: UpdaterSettings::default(),
            config_path: config_path.into(),
        }
    }

    /// Load settings from disk, falling back to defaults when the file
    /// does not exist yet.
    pub fn load(config_path: impl Into<PathBuf>) -> Result<Self, UpdateError> {
        let config_path = config_path.into();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: UpdaterSettings = serde_json::from_str(&content)?;
            debug!(
                "loaded updater settings from {:?}: channel={}, auto_check={}",
                config_path, settings.channel, settings.auto_check
            );
            Ok(Self {
                settings,
                config_path,
            })
        } else {
            debug!("no settings file at {:?}, using defaults", config_path);
            Ok(Self::new(config_path))
        }
    }

    pub fn settings(&self) -> UpdaterSettings {
        self.settings
    }

    pub fn channel(&self) -> UpdateChannel {
        self.settings.channel
    }

    pub fn auto_check(&self) -> bool {
        self.settings.auto_check
    }

    /// Switch channels and persist the choice.
    pub fn set_channel(&mut self, channel: UpdateChannel) -> Result<(), UpdateError> {
        if self.settings.channel.is_more_stable_than(&channel) {
            warn!(
                "switching from {} to less stable channel {}",
                self.settings.channel, channel
            );
        } else {
            info!("switching update channel to {}", channel);
        }
        self.settings.channel = channel;
        self.save()
    }

    /// Enable or disable automatic checks and persist the choice.
    pub fn set_auto_check(&mut self, enabled: bool) -> Result<(), UpdateError> {
        info!(
            "automatic update checks {}",
            if enabled { "enabled" } else { "disabled" }
        );
        self.settings.auto_check = enabled;
        self.save()
    }

    fn save(&self) -> Result<(), UpdateError> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.settings)?;
        std::fs::write(&self.config_path, content)?;
        Ok(())
    }
}
