//! Host notification events.
//!
//! The embedding application registers a single callback and receives
//! one event per pipeline milestone, which it can translate into
//! badges, dialogs, or tray notifications as it sees fit.

use std::path::PathBuf;
use std::sync::Arc;

use crate::download::DownloadProgress;
use crate::error::UpdateError;

/// Callback invoked on pipeline milestones.
pub type EventCallback = Arc<dyn Fn(UpdateEvent) + Send + Sync>;

/// Milestones emitted while checking, downloading, and installing.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateEvent {
    /// A newer release was found on the feed.
    UpdateAvailable {
        version: String,
        file_name: String,
        size: u64,
    },
    /// The feed has nothing newer than the running version.
    UpToDate { version: String },
    /// Bytes arrived on an active download.
    DownloadProgress(DownloadProgress),
    /// Digest verification of a finished download began.
    VerificationStarted,
    /// Digest verification finished.
    VerificationFinished { ok: bool },
    /// A verified artifact is staged and ready to install.
    ReadyToInstall { path: PathBuf },
    /// An operation failed. Carries the stable error code and a
    /// message fit for direct display.
    Failed {
        code: &'static str,
        message: String,
    },
}

impl UpdateEvent {
    /// Build a [`UpdateEvent::Failed`] from an error.
    pub fn failed(err: &UpdateError) -> Self {
        UpdateEvent::Failed {
            code: err.code(),
            message: err.user_message(),
        }
    }
}
