use crate::cli::{Cli, OutputFormat, VerbosityLevel};
use crate::repository::RepositoryConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Where the receiver image installs the plugin's bundled definitions.
pub const DEFAULT_BUILTIN_DIR: &str =
    "/usr/lib/enigma2/python/Plugins/SystemPlugins/AutoBouquetsMaker/providers";

/// Upper bound for `loading.parse_threads`.
pub const MAX_PARSE_THREADS: usize = 256;

/// Trait for abstracting environment variable access
#[cfg_attr(test, mockall::automock)]
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub cache: CacheConfig,
    pub loading: LoadingConfig,
    pub output: OutputConfig,
}

/// Definition directories and the cache location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    pub builtin_dir: PathBuf,
    pub user_dir: Option<PathBuf>,
    /// Defaults to `providers.cache` inside `builtin_dir`
    pub cache_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct LoadingConfig {
    /// 0 = one thread per CPU, 1 = sequential
    pub parse_threads: usize,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormatConfig,
    pub verbose: bool,
    /// Trace-level logging
    pub debug: bool,
    /// Warnings and errors only
    pub quiet: bool,
}

/// Output format configuration (serializable version of CLI OutputFormat)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormatConfig {
    #[default]
    Human,
    Json,
    Summary,
}

impl From<OutputFormat> for OutputFormatConfig {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Human => OutputFormatConfig::Human,
            OutputFormat::Json => OutputFormatConfig::Json,
            OutputFormat::Summary => OutputFormatConfig::Summary,
        }
    }
}

impl From<OutputFormatConfig> for OutputFormat {
    fn from(format: OutputFormatConfig) -> Self {
        match format {
            OutputFormatConfig::Human => OutputFormat::Human,
            OutputFormatConfig::Json => OutputFormat::Json,
            OutputFormatConfig::Summary => OutputFormat::Summary,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            builtin_dir: PathBuf::from(DEFAULT_BUILTIN_DIR),
            user_dir: dirs::config_dir()
                .map(|dir| dir.join("AutoBouquetsMaker").join("providers")),
            cache_file: None,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    /// Settings for [`crate::ProviderRepository`]
    pub fn repository_config(&self) -> RepositoryConfig {
        RepositoryConfig {
            builtin_dir: self.paths.builtin_dir.clone(),
            user_dir: self.paths.user_dir.clone(),
            cache_file: self.paths.cache_file.clone(),
            cache_enabled: self.cache.enabled,
            parse_threads: self.loading.parse_threads,
        }
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        if self.output.quiet {
            VerbosityLevel::Quiet
        } else if self.output.debug {
            VerbosityLevel::Debug
        } else if self.output.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: file -> environment -> CLI
    pub async fn load_config(cli: &Cli) -> Result<Config> {
        Self::load_config_with(cli, &SystemEnvProvider).await
    }

    pub async fn load_config_with(cli: &Cli, env: &impl EnvProvider) -> Result<Config> {
        let mut config = Config::default();

        if let Some(config_path) = &cli.config {
            let file_config = Self::load_from_file(config_path).await?;
            config = Self::merge_configs(config, file_config);
        } else if let Some(found_config) = Self::find_config_file().await? {
            config = Self::merge_configs(config, found_config);
        }

        config = Self::apply_environment_overrides_with(env, config)?;
        config = Self::merge_with_cli(config, cli);

        Self::validate_config(&config)?;

        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub async fn load_from_file(path: &Path) -> Result<Config> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // Try to parse as TOML first, then JSON
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Find configuration file in standard locations
    pub async fn find_config_file() -> Result<Option<Config>> {
        let config_names = [
            "abm-providers.toml",
            "abm-providers.json",
            ".abm-providers.toml",
            ".abm-providers.json",
        ];

        let mut directories = vec![PathBuf::new()];
        if let Some(config_dir) = dirs::config_dir() {
            directories.push(config_dir.join("abm-providers"));
        }

        for directory in &directories {
            for name in &config_names {
                let path = directory.join(name);
                if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                    return Ok(Some(Self::load_from_file(&path).await?));
                }
            }
        }

        Ok(None)
    }

    /// Apply environment variable overrides using the system environment
    pub fn apply_environment_overrides(config: Config) -> Result<Config> {
        Self::apply_environment_overrides_with(&SystemEnvProvider, config)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        if let Some(dir) = env.get("ABM_PROVIDERS_DIR") {
            config.paths.builtin_dir = PathBuf::from(dir);
        }

        if let Some(dir) = env.get("ABM_USER_PROVIDERS_DIR") {
            config.paths.user_dir = Some(PathBuf::from(dir));
        }

        if let Some(file) = env.get("ABM_CACHE_FILE") {
            config.paths.cache_file = Some(PathBuf::from(file));
        }

        if let Some(enabled) = env.get("ABM_CACHE_ENABLED") {
            config.cache.enabled = parse_env("ABM_CACHE_ENABLED", &enabled)?;
        }

        if let Some(threads) = env.get("ABM_PARSE_THREADS") {
            config.loading.parse_threads = parse_env("ABM_PARSE_THREADS", &threads)?;
        }

        if let Some(verbose) = env.get("ABM_VERBOSE") {
            config.output.verbose = parse_env("ABM_VERBOSE", &verbose)?;
        }

        if let Some(quiet) = env.get("ABM_QUIET") {
            config.output.quiet = parse_env("ABM_QUIET", &quiet)?;
        }

        if let Some(format) = env.get("ABM_FORMAT") {
            config.output.format = match format.to_lowercase().as_str() {
                "human" => OutputFormatConfig::Human,
                "json" => OutputFormatConfig::Json,
                "summary" => OutputFormatConfig::Summary,
                _ => {
                    return Err(ConfigError::Environment(format!(
                        "Invalid ABM_FORMAT value: {}",
                        format
                    )));
                }
            };
        }

        Ok(config)
    }

    /// Merge CLI arguments with configuration (CLI takes precedence)
    ///
    /// Only flags that were actually given override the configuration.
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Config {
        if let Some(dir) = &cli.providers_dir {
            config.paths.builtin_dir = dir.clone();
        }
        if let Some(dir) = &cli.user_dir {
            config.paths.user_dir = Some(dir.clone());
        }
        if let Some(file) = &cli.cache_file {
            config.paths.cache_file = Some(file.clone());
        }
        if cli.no_cache {
            config.cache.enabled = false;
        }

        if let Some(threads) = cli.threads {
            config.loading.parse_threads = threads;
        }

        if let Some(format) = cli.format {
            config.output.format = format.into();
        }
        if cli.verbose || cli.debug {
            config.output.verbose = cli.verbose;
            config.output.debug = cli.debug;
            config.output.quiet = false;
        }
        if cli.quiet {
            config.output.quiet = true;
            config.output.verbose = false;
            config.output.debug = false;
        }

        config
    }

    /// Merge two configurations (second takes precedence)
    pub fn merge_configs(mut base: Config, override_config: Config) -> Config {
        base.paths.builtin_dir = override_config.paths.builtin_dir;
        if override_config.paths.user_dir.is_some() {
            base.paths.user_dir = override_config.paths.user_dir;
        }
        if override_config.paths.cache_file.is_some() {
            base.paths.cache_file = override_config.paths.cache_file;
        }

        base.cache.enabled = override_config.cache.enabled;
        base.loading.parse_threads = override_config.loading.parse_threads;

        base.output.format = override_config.output.format;
        base.output.verbose = override_config.output.verbose;
        base.output.debug = override_config.output.debug;
        base.output.quiet = override_config.output.quiet;

        base
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        if config.loading.parse_threads > MAX_PARSE_THREADS {
            return Err(ConfigError::Validation(format!(
                "Number of parse threads cannot exceed {}",
                MAX_PARSE_THREADS
            )));
        }

        if config.paths.builtin_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "Built-in provider directory must not be empty".to_string(),
            ));
        }

        if (config.output.verbose || config.output.debug) && config.output.quiet {
            return Err(ConfigError::Validation(
                "Cannot enable both verbose and quiet modes".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Environment(format!("Invalid {} value: {}", name, value)))
}
