//! Artifact integrity verification.
//!
//! Downloaded installers are verified against the base64-encoded
//! SHA-512 digest published in the release manifest before they are
//! handed to the platform installer.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::error::UpdateError;

/// Read buffer size for hashing.
const HASH_BUFFER_SIZE: usize = 8192;

/// Computes and checks artifact digests.
#[derive(Debug, Default)]
pub struct ChecksumVerifier;

impl ChecksumVerifier {
    pub fn new() -> Self {
        Self
    }

    /// Check a file against an expected base64 SHA-512 digest.
    ///
    /// Returns `Ok(false)` on mismatch. The file is left in place; the
    /// caller decides whether to delete it.
    pub fn verify(&self, path: &Path, expected_base64: &str) -> Result<bool, UpdateError> {
        match self.ensure_matches(path, expected_base64) {
            Ok(()) => Ok(true),
            Err(UpdateError::ChecksumMismatch { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Like [`verify`](Self::verify), but surfaces the mismatch as a
    /// typed error carrying both digests.
    pub fn ensure_matches(&self, path: &Path, expected_base64: &str) -> Result<(), UpdateError> {
        let actual = self.compute_digest_base64(path)?;
        // exact string equality, compared without early exit
        let matches: bool = actual.as_bytes().ct_eq(expected_base64.as_bytes()).into();
        if matches {
            debug!("digest verified for {:?}", path);
            Ok(())
        } else {
            warn!(
                expected = %expected_base64,
                actual = %actual,
                "digest mismatch for {:?}",
                path
            );
            Err(UpdateError::ChecksumMismatch {
                expected: expected_base64.to_string(),
                actual,
            })
        }
    }

    /// Stream a file through SHA-512 and return the digest as base64.
    pub fn compute_digest_base64(&self, path: &Path) -> Result<String, UpdateError> {
        let mut file = File::open(path)?;
        let mut hasher = Sha512::new();
        let mut buffer = [0u8; HASH_BUFFER_SIZE];
        loop {
            let n = file.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }
        Ok(BASE64.encode(hasher.finalize()))
    }
}
