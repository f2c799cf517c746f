use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{CacheError, CacheResult};
use crate::model::ProviderMap;

/// Bumped whenever the serialized provider layout changes.
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// Artifact name used when no explicit location is configured.
pub const DEFAULT_CACHE_FILE: &str = "providers.cache";

/// On-disk snapshot of a whole provider aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEnvelope {
    pub format_version: u32,
    pub crate_version: String,
    pub created_at: DateTime<Utc>,
    pub providers: ProviderMap,
}

impl CacheEnvelope {
    pub fn new(providers: ProviderMap) -> Self {
        Self {
            format_version: CACHE_FORMAT_VERSION,
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: Utc::now(),
            providers,
        }
    }
}

#[derive(Deserialize)]
struct EnvelopeHeader {
    format_version: u32,
}

/// Whole-aggregate cache keyed on source modification times.
#[derive(Debug, Clone)]
pub struct ProviderCache {
    path: PathBuf,
    enabled: bool,
}

impl ProviderCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            enabled: true,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// True when the artifact is strictly newer than every source file.
    pub fn is_fresh(&self, sources: &BTreeMap<String, PathBuf>) -> bool {
        let Some(newest) = newest_modification(sources) else {
            return false;
        };

        match std::fs::metadata(&self.path).and_then(|metadata| metadata.modified()) {
            Ok(cached) => cached > newest,
            Err(_) => false,
        }
    }

    /// The cached aggregate, if caching is enabled and the artifact is fresh
    /// and readable. Every failure is logged and reported as a miss.
    pub fn load_if_fresh(&self, sources: &BTreeMap<String, PathBuf>) -> Option<ProviderMap> {
        if !self.enabled {
            return None;
        }
        if !self.is_fresh(sources) {
            debug!(path = %self.path.display(), "provider cache missing or stale");
            return None;
        }

        match self.read() {
            Ok(envelope) => {
                debug!(
                    path = %self.path.display(),
                    providers = envelope.providers.len(),
                    created_at = %envelope.created_at,
                    "loaded providers from cache"
                );
                Some(envelope.providers)
            }
            Err(e) => {
                warn!(error = %e, "ignoring unreadable provider cache");
                None
            }
        }
    }

    /// Deserialize the artifact without any freshness check.
    pub fn read(&self) -> CacheResult<CacheEnvelope> {
        let bytes = std::fs::read(&self.path).map_err(|source| CacheError::Read {
            path: self.path.clone(),
            source,
        })?;

        let header: EnvelopeHeader =
            serde_json::from_slice(&bytes).map_err(|e| self.corruption(e))?;
        if header.format_version != CACHE_FORMAT_VERSION {
            return Err(CacheError::VersionMismatch {
                found: header.format_version,
                expected: CACHE_FORMAT_VERSION,
            });
        }

        serde_json::from_slice(&bytes).map_err(|e| self.corruption(e))
    }

    /// Write a snapshot of `providers`. A disabled cache writes nothing.
    ///
    /// The data goes to a sibling temporary file first and is renamed over
    /// the artifact, so readers see either the old or the new snapshot.
    pub fn store(&self, providers: &ProviderMap) -> CacheResult<()> {
        if !self.enabled {
            return Ok(());
        }

        let envelope = CacheEnvelope::new(providers.clone());
        let bytes = serde_json::to_vec(&envelope).map_err(|e| self.write_error(e))?;

        // Unique per writer; dropped (and removed) on any failure below.
        let mut temporary = self.temporary_file().map_err(|e| self.write_error(e))?;
        temporary
            .write_all(&bytes)
            .map_err(|e| self.write_error(e))?;
        temporary
            .persist(&self.path)
            .map_err(|e| self.write_error(e.error))?;

        debug!(
            path = %self.path.display(),
            providers = providers.len(),
            "provider cache written"
        );
        Ok(())
    }

    /// Delete the artifact. Returns whether there was one to delete.
    pub fn invalidate(&self) -> CacheResult<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(CacheError::Remove {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn temporary_file(&self) -> io::Result<NamedTempFile> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut prefix = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| DEFAULT_CACHE_FILE.into());
        prefix.push(".");

        tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".tmp")
            .tempfile_in(dir)
    }

    fn corruption(&self, e: serde_json::Error) -> CacheError {
        CacheError::Corruption {
            path: self.path.clone(),
            details: e.to_string(),
        }
    }

    fn write_error(&self, e: impl std::fmt::Display) -> CacheError {
        CacheError::Write {
            path: self.path.clone(),
            details: e.to_string(),
        }
    }
}

/// Latest modification time among `sources`; the epoch when there are none.
///
/// `None` when any source cannot be inspected, which forces a rebuild.
fn newest_modification(sources: &BTreeMap<String, PathBuf>) -> Option<SystemTime> {
    sources
        .values()
        .try_fold(SystemTime::UNIX_EPOCH, |newest, path| {
            match std::fs::metadata(path).and_then(|metadata| metadata.modified()) {
                Ok(modified) => Some(newest.max(modified)),
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "cannot read modification time");
                    None
                }
            }
        })
}
