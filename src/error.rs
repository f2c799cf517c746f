use std::path::PathBuf;

use thiserror::Error;

/// Failure modes of loading provider definitions.
///
/// None of these abort a load: the repository logs them and carries on
/// without the affected file.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Cannot open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("XML parse error ({path}): {details}")]
    XmlSyntax { path: PathBuf, details: String },

    #[error("Incomplete provider definition {path}: missing {}", missing.join(", "))]
    Incomplete {
        path: PathBuf,
        missing: Vec<&'static str>,
    },

    #[error("Cannot read provider directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

impl ProviderError {
    /// The definition file or directory the error refers to, if any.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            ProviderError::Io { path, .. }
            | ProviderError::XmlSyntax { path, .. }
            | ProviderError::Incomplete { path, .. }
            | ProviderError::Directory { path, .. } => Some(path),
            ProviderError::Cache(_) => None,
        }
    }
}

/// Cache-specific error types
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache read error: {path} - {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache write error: {path} - {details}")]
    Write { path: PathBuf, details: String },

    #[error("Cache corruption detected: {path} - {details}")]
    Corruption { path: PathBuf, details: String },

    #[error("Cache format version {found} does not match expected {expected}")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("Cache removal failed: {path} - {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A single attribute that could not be decoded while building a record.
///
/// The enclosing item (transponder, configuration, section, channel) is
/// dropped; the rest of the provider is still built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldIssue {
    #[error("<{element}> attribute {attribute}=\"{value}\" is not a valid {expected} number")]
    InvalidNumber {
        element: &'static str,
        attribute: String,
        value: String,
        expected: &'static str,
    },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Cache result type alias
pub type CacheResult<T> = std::result::Result<T, CacheError>;
