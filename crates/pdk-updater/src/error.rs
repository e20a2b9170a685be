//! Error types for the update pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while checking for, downloading, verifying, or
/// installing an update.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// The local host has no route to the update server.
    #[error("network unreachable, the device appears to be offline")]
    NetworkOffline,

    /// Connection-level failure (DNS, TLS handshake, connection reset).
    #[error("connection failed: {0}")]
    NetworkConnection(String),

    /// The server did not respond within the configured deadline.
    #[error("request timed out")]
    NetworkTimeout,

    /// The server answered with a non-success HTTP status.
    #[error("server returned HTTP {status}")]
    HttpStatus { status: u16 },

    /// Redirect chain exceeded the hop limit.
    #[error("too many redirects while fetching {0}")]
    RedirectLoop(String),

    /// The manifest was fetched but failed structural validation.
    #[error("invalid update manifest: {0}")]
    InvalidManifest(String),

    /// No bytes arrived on the transfer for the configured window.
    #[error("download stalled: no data received for {seconds}s")]
    DownloadStalled { seconds: u64 },

    /// The downloaded artifact's digest does not match the manifest.
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// The installer file was missing when launch was requested.
    #[error("installer not found at {path:?}")]
    InstallerNotFound { path: PathBuf },

    /// A download was requested without a prior successful check.
    #[error("no pending update, run a check first")]
    NoPendingUpdate,

    /// Configuration load or validation failure.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Settings (de)serialization failure.
    #[error("settings serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Filesystem operation failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl UpdateError {
    /// Stable machine-readable code for log correlation and host dispatch.
    pub fn code(&self) -> &'static str {
        match self {
            UpdateError::NetworkOffline => "network-offline",
            UpdateError::NetworkConnection(_) => "network-connection",
            UpdateError::NetworkTimeout => "network-timeout",
            UpdateError::HttpStatus { .. } => "http-status",
            UpdateError::RedirectLoop(_) => "redirect-loop",
            UpdateError::InvalidManifest(_) => "invalid-manifest",
            UpdateError::DownloadStalled { .. } => "download-stalled",
            UpdateError::ChecksumMismatch { .. } => "checksum-mismatch",
            UpdateError::InstallerNotFound { .. } => "installer-not-found",
            UpdateError::NoPendingUpdate => "no-pending-update",
            UpdateError::ConfigError(_) => "config",
            UpdateError::JsonError(_) => "config",
            UpdateError::IoError(_) => "io",
        }
    }

    /// Whether retrying the same operation could plausibly succeed.
    ///
    /// Server errors (5xx) are considered transient, client errors (4xx)
    /// are not. A checksum mismatch aborts immediately; only an explicit
    /// new download request may try again, and that restarts from byte
    /// zero.
    pub fn is_retryable(&self) -> bool {
        match self {
            UpdateError::NetworkOffline
            | UpdateError::NetworkConnection(_)
            | UpdateError::NetworkTimeout
            | UpdateError::DownloadStalled { .. } => true,
            UpdateError::HttpStatus { status } => *status >= 500,
            _ => false,
        }
    }

    /// Short message suitable for display to an end user.
    pub fn user_message(&self) -> String {
        match self {
            UpdateError::NetworkOffline | UpdateError::NetworkConnection(_) => {
                "Could not reach the update server. Check your internet connection and try again."
                    .to_string()
            }
            UpdateError::NetworkTimeout => {
                "The update server took too long to respond. Please try again.".to_string()
            }
            UpdateError::HttpStatus { status } if *status >= 500 => {
                "The update server is having trouble right now. Please try again later."
                    .to_string()
            }
            UpdateError::HttpStatus { .. } => {
                "No update information was found for this channel.".to_string()
            }
            UpdateError::RedirectLoop(_) => {
                "The update server configuration appears to be broken.".to_string()
            }
            UpdateError::InvalidManifest(_) => {
                "The update information could not be read.".to_string()
            }
            UpdateError::DownloadStalled { .. } => {
                "The download stopped making progress and was cancelled.".to_string()
            }
            UpdateError::ChecksumMismatch { .. } => {
                "The downloaded update failed its integrity check. Please try downloading again."
                    .to_string()
            }
            UpdateError::InstallerNotFound { .. } => {
                "The installer file is missing. Please download the update again.".to_string()
            }
            UpdateError::NoPendingUpdate => {
                "No update is ready to download. Check for updates first.".to_string()
            }
            UpdateError::ConfigError(_) | UpdateError::JsonError(_) => {
                "The updater configuration is invalid.".to_string()
            }
            UpdateError::IoError(_) => {
                "A file operation failed while preparing the update.".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for UpdateError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return UpdateError::NetworkTimeout;
        }
        if err.is_redirect() {
            let url = err.url().map(|u| u.to_string()).unwrap_or_default();
            return UpdateError::RedirectLoop(url);
        }
        if err.is_connect() && has_unreachable_cause(&err) {
            return UpdateError::NetworkOffline;
        }
        UpdateError::NetworkConnection(err.to_string())
    }
}

/// Walk the error's source chain looking for an OS-level "no route"
/// condition, which distinguishes a dead network from a dead server.
fn has_unreachable_cause(err: &(dyn std::error::Error + 'static)) -> bool {
    use std::io::ErrorKind;

    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                ErrorKind::NetworkUnreachable | ErrorKind::NetworkDown | ErrorKind::HostUnreachable
            ) {
                return true;
            }
        }
        source = cause.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(UpdateError::NetworkOffline.is_retryable());
        assert!(UpdateError::NetworkConnection("reset".to_string()).is_retryable());
        assert!(UpdateError::NetworkTimeout.is_retryable());
        assert!(UpdateError::DownloadStalled { seconds: 60 }.is_retryable());
        assert!(UpdateError::HttpStatus { status: 500 }.is_retryable());
        assert!(UpdateError::HttpStatus { status: 503 }.is_retryable());

        assert!(!UpdateError::HttpStatus { status: 404 }.is_retryable());
        assert!(!UpdateError::HttpStatus { status: 403 }.is_retryable());
        assert!(!UpdateError::RedirectLoop("https://example.com".to_string()).is_retryable());
        assert!(!UpdateError::InvalidManifest("bad".to_string()).is_retryable());
        // a digest failure must abort the attempt loop, not burn through it
        assert!(!UpdateError::ChecksumMismatch {
            expected: "a".to_string(),
            actual: "b".to_string(),
        }
        .is_retryable());
        assert!(!UpdateError::InstallerNotFound {
            path: PathBuf::from("/tmp/missing.exe"),
        }
        .is_retryable());
        assert!(!UpdateError::NoPendingUpdate.is_retryable());
    }

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(UpdateError::NetworkOffline.code(), "network-offline");
        assert_eq!(UpdateError::NetworkTimeout.code(), "network-timeout");
        assert_eq!(UpdateError::HttpStatus { status: 503 }.code(), "http-status");
        assert_eq!(
            UpdateError::RedirectLoop(String::new()).code(),
            "redirect-loop"
        );
        assert_eq!(
            UpdateError::InvalidManifest(String::new()).code(),
            "invalid-manifest"
        );
        assert_eq!(
            UpdateError::DownloadStalled { seconds: 60 }.code(),
            "download-stalled"
        );
        assert_eq!(
            UpdateError::ChecksumMismatch {
                expected: String::new(),
                actual: String::new(),
            }
            .code(),
            "checksum-mismatch"
        );
        assert_eq!(
            UpdateError::InstallerNotFound {
                path: PathBuf::new(),
            }
            .code(),
            "installer-not-found"
        );
        assert_eq!(UpdateError::NoPendingUpdate.code(), "no-pending-update");
    }

    #[test]
    fn test_user_messages_differ_by_status_class() {
        let server = UpdateError::HttpStatus { status: 502 };
        let client = UpdateError::HttpStatus { status: 404 };
        assert_ne!(server.user_message(), client.user_message());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: UpdateError = io.into();
        assert_eq!(err.code(), "io");
        assert!(!err.is_retryable());
    }
}
