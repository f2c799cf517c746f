//! # abm-providers Library
//!
//! Loads AutoBouquetsMaker broadcast provider definitions from XML files,
//! validates them into typed records and keeps a staleness-aware snapshot of
//! the whole set on disk.
//!
//! ```no_run
//! use abm_providers::{ProviderRepository, RepositoryConfig};
//!
//! let repository = ProviderRepository::new(
//!     RepositoryConfig::new("/usr/share/abm/providers").with_user_dir("/etc/abm/providers"),
//! );
//! for (key, provider) in repository.read() {
//!     println!("{key}: {} ({} bouquets)", provider.name, provider.bouquets.len());
//! }
//! ```

pub mod builder;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod output;
pub mod path_resolver;
pub mod repository;
pub mod validator;
pub mod xml;

pub use builder::{BuildOutput, ProviderDraft, build_provider};
pub use cache::{CACHE_FORMAT_VERSION, CacheEnvelope, DEFAULT_CACHE_FILE, ProviderCache};
pub use cli::{Cli, Command, OutputFormat, VerbosityLevel};
pub use config::{Config, ConfigError, ConfigManager};
pub use error::{CacheError, FieldIssue, ProviderError};
pub use model::{
    BouquetConfig, CableBouquet, Protocol, Provider, ProviderMap, SatelliteBouquet,
    SatelliteTransponder, SwapChannel, TableIds, TerrestrialBouquet, Transponder,
};
pub use output::Output;
pub use path_resolver::PathResolver;
pub use repository::{LoadOrigin, LoadReport, ProviderRepository, RepositoryConfig};
pub use validator::validate;
pub use xml::{Document, Element, Node, load_document};
