//! Installer hand-off.
//!
//! The updater never applies an update itself. It spawns the platform
//! installer detached, with silent arguments, then asks the host
//! application to shut down so the installer can replace its files.

use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::InstallConfig;
use crate::error::UpdateError;

/// Spawns a downloaded installer and coordinates application shutdown.
pub struct InstallerLauncher {
    silent_args: Vec<String>,
    shutdown_delay: Duration,
    shutdown_handler: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl InstallerLauncher {
    pub fn new(config: &InstallConfig) -> Self {
        Self {
            silent_args: config.silent_args.clone(),
            shutdown_delay: Duration::from_millis(config.shutdown_delay_ms),
            shutdown_handler: None,
        }
    }

    /// Register the closure invoked to request application shutdown
    /// once the installer is running.
    pub fn set_shutdown_handler<F>(&mut self, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.shutdown_handler = Some(Arc::new(handler));
    }

    /// Launch the installer at `installer` detached from this process,
    /// wait briefly, then request shutdown.
    ///
    /// Fails without spawning anything when the file is missing.
    pub async fn launch(&self, installer: &Path) -> Result<(), UpdateError> {
        if !installer.is_file() {
            return Err(UpdateError::InstallerNotFound {
                path: installer.to_path_buf(),
            });
        }

        info!("launching installer {:?}", installer);
        let mut command = Command::new(installer);
        command
            .args(&self.silent_args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        detach(&mut command);

        let child = command.spawn()?;
        debug!("installer started with pid {}", child.id());
        // the installer must outlive this process; never wait on it
        drop(child);

        tokio::time::sleep(self.shutdown_delay).await;
        if let Some(handler) = &self.shutdown_handler {
            info!("requesting application shutdown for update");
            handler();
        } else {
            warn!("no shutdown handler registered, host must exit on its own");
        }
        Ok(())
    }
}

#[cfg(windows)]
fn detach(command: &mut Command) {
    use std::os::windows::process::CommandExt;

    const DETACHED_PROCESS: u32 = 0x0000_0008;
    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
    command.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
}

#[cfg(unix)]
fn detach(command: &mut Command) {
    use std::os::unix::process::CommandExt;

    command.process_group(0);
}

#[cfg(not(any(windows, unix)))]
fn detach(_command: &mut Command) {}
