use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ProviderError, Result};

const DEFINITION_SUFFIX: &str = ".xml";

/// Merges the built-in and user provider directories into one
/// filename → path map.
#[derive(Debug, Clone)]
pub struct PathResolver {
    builtin_dir: PathBuf,
    /// Definitions here replace built-in files with the same name
    user_dir: Option<PathBuf>,
}

impl PathResolver {
    pub fn new(builtin_dir: impl Into<PathBuf>) -> Self {
        Self {
            builtin_dir: builtin_dir.into(),
            user_dir: None,
        }
    }

    /// Set the user override directory
    pub fn with_user_dir(mut self, user_dir: Option<PathBuf>) -> Self {
        self.user_dir = user_dir;
        self
    }

    pub fn builtin_dir(&self) -> &Path {
        &self.builtin_dir
    }

    pub fn user_dir(&self) -> Option<&Path> {
        self.user_dir.as_deref()
    }

    /// Resolve both directories.
    ///
    /// An unreadable built-in directory is returned alongside whatever the
    /// user directory provided, so the caller can report it and continue.
    pub fn resolve(&self) -> (BTreeMap<String, PathBuf>, Option<ProviderError>) {
        let mut files = BTreeMap::new();
        let mut failure = None;

        if let Err(e) = scan_directory(&self.builtin_dir, &mut files) {
            failure = Some(e);
        }

        if let Some(user_dir) = &self.user_dir {
            match scan_directory(user_dir, &mut files) {
                Ok(()) => {}
                Err(ProviderError::Directory { source, .. })
                    if source.kind() == io::ErrorKind::NotFound =>
                {
                    debug!(path = %user_dir.display(), "no user provider directory");
                }
                Err(e) => {
                    failure.get_or_insert(e);
                }
            }
        }

        (files, failure)
    }

    /// Whether `<name>.xml` is present in either directory.
    pub fn provider_file_exists(&self, name: &str) -> bool {
        let (files, _) = self.resolve();
        files.contains_key(&format!("{name}{DEFINITION_SUFFIX}"))
    }
}

/// Add every `*.xml` file directly inside `dir`, replacing same-named entries.
fn scan_directory(dir: &Path, files: &mut BTreeMap<String, PathBuf>) -> Result<()> {
    let directory_error = |source| ProviderError::Directory {
        path: dir.to_path_buf(),
        source,
    };

    for entry in std::fs::read_dir(dir).map_err(directory_error)? {
        let entry = entry.map_err(directory_error)?;
        let Ok(file_name) = entry.file_name().into_string() else {
            continue;
        };
        if !file_name.ends_with(DEFINITION_SUFFIX) {
            continue;
        }

        let path = entry.path();
        if path.is_file() {
            files.insert(file_name, path);
        }
    }

    Ok(())
}

/// Provider key of a definition file: its name without the `.xml` suffix.
pub fn provider_key(file_name: &str) -> &str {
    file_name
        .strip_suffix(DEFINITION_SUFFIX)
        .unwrap_or(file_name)
}
