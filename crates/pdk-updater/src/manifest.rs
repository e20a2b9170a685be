//! Release manifest parsing and validation.
//!
//! Channel manifests are small line-oriented documents of `key: value`
//! pairs with one nested `files:` list, as published by common desktop
//! release tooling. The scan is deliberately forgiving, the validation
//! afterwards is not: a manifest missing any required field is rejected
//! wholesale.

use chrono::{DateTime, FixedOffset};

use crate::error::UpdateError;

/// Shortest plausible base64 SHA-512 digest. The canonical unpadded
/// form is 86 characters, padded is 88; anything far outside that band
/// is a truncated or corrupted manifest.
pub const MIN_DIGEST_LEN: usize = 80;
/// Longest plausible base64 SHA-512 digest.
pub const MAX_DIGEST_LEN: usize = 100;

/// A validated release manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateManifest {
    /// Version of the published release.
    pub version: String,
    /// Bare file name of the installer artifact, no path components.
    pub file_name: String,
    /// Base64-encoded SHA-512 digest of the artifact.
    pub sha512: String,
    /// Advisory artifact size in bytes, zero when the feed omits it.
    pub size: u64,
    /// Publication timestamp as written in the feed, if any.
    pub release_date: Option<String>,
}

impl UpdateManifest {
    /// Parse and validate a manifest document.
    pub fn parse(text: &str) -> Result<Self, UpdateError> {
        RawManifest::scan(text).validate()
    }

    /// Publication time, when the feed carried a well-formed RFC 3339
    /// timestamp. Malformed dates are advisory only and yield `None`.
    pub fn release_datetime(&self) -> Option<DateTime<FixedOffset>> {
        self.release_date
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
    }
}

/// Fields as they appeared in the document, before validation.
#[derive(Debug, Default)]
struct RawManifest {
    version: Option<String>,
    path: Option<String>,
    sha512: Option<String>,
    release_date: Option<String>,
    files: Vec<RawFileEntry>,
}

#[derive(Debug, Default)]
struct RawFileEntry {
    url: Option<String>,
    sha512: Option<String>,
    size: Option<String>,
}

impl RawManifest {
    fn scan(text: &str) -> Self {
        let mut raw = RawManifest::default();
        let mut in_files = false;

        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix('-') {
                if in_files {
                    raw.files.push(RawFileEntry::default());
                    if let Some((key, value)) = split_key_value(rest.trim_start()) {
                        raw.assign_file_field(key, value);
                    }
                }
                continue;
            }

            let indented = line.starts_with(' ') || line.starts_with('\t');
            if let Some((key, value)) = split_key_value(trimmed) {
                if !indented {
                    in_files = false;
                    match key {
                        "version" => raw.version = Some(value),
                        "path" => raw.path = Some(value),
                        "sha512" => raw.sha512 = Some(value),
                        "releaseDate" => raw.release_date = Some(value),
                        "files" => in_files = true,
                        _ => {}
                    }
                } else if in_files {
                    raw.assign_file_field(key, value);
                }
            }
        }
        raw
    }

    fn assign_file_field(&mut self, key: &str, value: String) {
        if let Some(entry) = self.files.last_mut() {
            match key {
                "url" => entry.url = Some(value),
                "sha512" => entry.sha512 = Some(value),
                "size" => entry.size = Some(value),
                _ => {}
            }
        }
    }

    /// Validation order is fixed so the first problem reported is the
    /// most fundamental one: version, then digest, then file name.
    fn validate(self) -> Result<UpdateManifest, UpdateError> {
        let version = self
            .version
            .filter(|v| !v.is_empty())
            .ok_or_else(|| UpdateError::InvalidManifest("missing version".to_string()))?;
        if !starts_with_release_triple(&version) {
            return Err(UpdateError::InvalidManifest(format!(
                "malformed version: {}",
                version
            )));
        }

        let entry = self.files.first();

        // Every digest the document offers must be plausible, whichever
        // one ends up being used.
        for digest in [
            entry.and_then(|f| f.sha512.as_deref()),
            self.sha512.as_deref(),
        ]
        .into_iter()
        .flatten()
        {
            if !(MIN_DIGEST_LEN..=MAX_DIGEST_LEN).contains(&digest.len()) {
                return Err(UpdateError::InvalidManifest(format!(
                    "sha512 digest has implausible length {}",
                    digest.len()
                )));
            }
        }
        let sha512 = entry
            .and_then(|f| f.sha512.clone())
            .or(self.sha512)
            .ok_or_else(|| UpdateError::InvalidManifest("missing sha512 digest".to_string()))?;

        // Both name fields are validated when present, whichever one
        // ends up authoritative.
        for name in [entry.and_then(|f| f.url.as_deref()), self.path.as_deref()]
            .into_iter()
            .flatten()
        {
            if name.contains('/') || name.contains('\\') {
                return Err(UpdateError::InvalidManifest(format!(
                    "artifact file name contains a path separator: {}",
                    name
                )));
            }
        }
        let file_name = entry
            .and_then(|f| f.url.clone())
            .or(self.path)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                UpdateError::InvalidManifest("missing or empty artifact file name".to_string())
            })?;

        // Size is an advisory hint only; absent means unknown.
        let size = match entry.and_then(|f| f.size.as_deref()) {
            Some(s) => s.parse::<u64>().map_err(|_| {
                UpdateError::InvalidManifest(format!("non-numeric size: {}", s))
            })?,
            None => 0,
        };

        Ok(UpdateManifest {
            version,
            file_name,
            sha512,
            size,
            release_date: self.release_date,
        })
    }
}

/// Split at the first colon, trimming whitespace and surrounding quotes
/// from the value.
fn split_key_value(line: &str) -> Option<(&str, String)> {
    let (key, value) = line.split_once(':')?;
    let value = value.trim().trim_matches(|c| c == '\'' || c == '"');
    Some((key.trim(), value.to_string()))
}

/// True when the string opens with `digits.digits.digits`.
fn starts_with_release_triple(version: &str) -> bool {
    let mut rest = version;
    for i in 0..3 {
        let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits == 0 {
            return false;
        }
        rest = &rest[digits..];
        if i < 2 {
            match rest.strip_prefix('.') {
                Some(r) => rest = r,
                None => return false,
            }
        }
    }
    true
}
