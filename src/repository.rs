//! The top-level load: resolve files, consult the cache, otherwise parse
//! build and validate every definition and refresh the cache.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::builder::build_provider;
use crate::cache::{DEFAULT_CACHE_FILE, ProviderCache};
use crate::error::{CacheResult, FieldIssue, ProviderError};
use crate::model::{Provider, ProviderMap};
use crate::path_resolver::{PathResolver, provider_key};
use crate::validator::validate;
use crate::xml::load_document;

/// Where the definitions live and how to load them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryConfig {
    pub builtin_dir: PathBuf,
    pub user_dir: Option<PathBuf>,
    /// Defaults to `providers.cache` inside `builtin_dir`
    pub cache_file: Option<PathBuf>,
    pub cache_enabled: bool,
    /// 0 = one per CPU, 1 = sequential
    pub parse_threads: usize,
}

impl RepositoryConfig {
    pub fn new(builtin_dir: impl Into<PathBuf>) -> Self {
        Self {
            builtin_dir: builtin_dir.into(),
            user_dir: None,
            cache_file: None,
            cache_enabled: true,
            parse_threads: 0,
        }
    }

    pub fn with_user_dir(mut self, user_dir: impl Into<PathBuf>) -> Self {
        self.user_dir = Some(user_dir.into());
        self
    }

    pub fn with_cache_file(mut self, cache_file: impl Into<PathBuf>) -> Self {
        self.cache_file = Some(cache_file.into());
        self
    }

    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn with_parse_threads(mut self, threads: usize) -> Self {
        self.parse_threads = threads;
        self
    }

    pub fn cache_path(&self) -> PathBuf {
        self.cache_file
            .clone()
            .unwrap_or_else(|| self.builtin_dir.join(DEFAULT_CACHE_FILE))
    }

    fn effective_threads(&self) -> usize {
        match self.parse_threads {
            0 => num_cpus::get(),
            threads => threads,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOrigin {
    /// Rehydrated from a fresh cache artifact
    Cache,
    /// Built from the XML definitions
    Rebuilt,
}

/// Result of one load cycle.
#[derive(Debug)]
pub struct LoadReport {
    pub providers: ProviderMap,
    pub origin: LoadOrigin,
    /// Files (or directories) that contributed no provider.
    pub rejected: Vec<ProviderError>,
    /// Attribute values dropped while building, per definition file.
    pub issues: Vec<(PathBuf, FieldIssue)>,
    /// Number of definition files considered
    pub files: usize,
}

struct FileOutcome {
    path: PathBuf,
    provider: Result<Provider, ProviderError>,
    issues: Vec<FieldIssue>,
}

/// Read, build and validate one definition file.
fn process_file(file_name: &str, path: &Path) -> FileOutcome {
    let document = match load_document(path) {
        Ok(document) => document,
        Err(e) => {
            return FileOutcome {
                path: path.to_path_buf(),
                provider: Err(e),
                issues: Vec::new(),
            };
        }
    };

    let output = build_provider(provider_key(file_name), &document);
    for issue in &output.issues {
        warn!(path = %path.display(), issue = %issue, "dropping malformed item");
    }

    let provider = validate(output.draft, path);
    if let Err(e) = &provider {
        warn!(path = %path.display(), error = %e, "rejecting provider");
    }

    FileOutcome {
        path: path.to_path_buf(),
        provider,
        issues: output.issues,
    }
}

/// Loads the provider aggregate from the configured directories.
#[derive(Debug, Clone)]
pub struct ProviderRepository {
    config: RepositoryConfig,
    resolver: PathResolver,
    cache: ProviderCache,
}

impl ProviderRepository {
    pub fn new(config: RepositoryConfig) -> Self {
        let resolver =
            PathResolver::new(&config.builtin_dir).with_user_dir(config.user_dir.clone());
        let cache = ProviderCache::new(config.cache_path()).with_enabled(config.cache_enabled);

        Self {
            config,
            resolver,
            cache,
        }
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn cache(&self) -> &ProviderCache {
        &self.cache
    }

    /// Every accepted provider, keyed by provider key.
    pub fn read(&self) -> ProviderMap {
        self.load().providers
    }

    /// Like [`ProviderRepository::read`], also reporting where the aggregate
    /// came from and what was left out.
    pub fn load(&self) -> LoadReport {
        let (files, directory_error) = self.resolver.resolve();
        // A partial source set neither reads nor refreshes the cache.
        let complete = directory_error.is_none();
        let mut rejected = Vec::new();
        if let Some(e) = directory_error {
            warn!(error = %e, "provider directory unavailable");
            rejected.push(e);
        }

        if let Some(providers) = complete.then(|| self.cache.load_if_fresh(&files)).flatten() {
            return LoadReport {
                providers,
                origin: LoadOrigin::Cache,
                rejected,
                issues: Vec::new(),
                files: files.len(),
            };
        }

        let mut providers = ProviderMap::new();
        let mut issues = Vec::new();
        for outcome in self.process_all(&files) {
            issues.extend(
                outcome
                    .issues
                    .into_iter()
                    .map(|issue| (outcome.path.clone(), issue)),
            );
            match outcome.provider {
                Ok(provider) => {
                    providers.insert(provider.key.clone(), provider);
                }
                Err(e) => rejected.push(e),
            }
        }

        info!(
            files = files.len(),
            providers = providers.len(),
            rejected = rejected.len(),
            "providers rebuilt from definitions"
        );

        if !complete {
            debug!("not caching providers from an incomplete directory scan");
        } else if let Err(e) = self.cache.store(&providers) {
            warn!(error = %e, "could not write provider cache");
        }

        LoadReport {
            providers,
            origin: LoadOrigin::Rebuilt,
            rejected,
            issues,
            files: files.len(),
        }
    }

    /// Outcomes in filename order, whichever way the work was scheduled.
    fn process_all(&self, files: &BTreeMap<String, PathBuf>) -> Vec<FileOutcome> {
        let entries: Vec<(&String, &PathBuf)> = files.iter().collect();
        let threads = self.config.effective_threads();

        if threads > 1 && entries.len() > 1 {
            match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
                Ok(pool) => {
                    debug!(threads, files = entries.len(), "parsing definitions in parallel");
                    return pool.install(|| {
                        entries
                            .par_iter()
                            .map(|(name, path)| process_file(name, path))
                            .collect()
                    });
                }
                Err(e) => warn!(error = %e, "parse pool unavailable, loading sequentially"),
            }
        }

        entries
            .into_iter()
            .map(|(name, path)| process_file(name, path))
            .collect()
    }

    /// Whether `<name>.xml` exists in the built-in or user directory.
    pub fn provider_file_exists(&self, name: &str) -> bool {
        self.resolver.provider_file_exists(name)
    }

    /// Delete the cache artifact so the next load rebuilds.
    pub fn invalidate_cache(&self) -> CacheResult<bool> {
        self.cache.invalidate()
    }
}
