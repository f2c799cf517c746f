use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only show warnings and errors
    Quiet,
    /// Show standard information
    #[default]
    Normal,
    /// Show per-provider details and debug logs
    Verbose,
    /// Show everything, including trace logs
    Debug,
}

/// How listed providers are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    Summary,
}

/// Inspect AutoBouquetsMaker provider definitions
#[derive(Parser, Debug, Clone)]
#[command(name = "abm-providers")]
#[command(about = "Load, validate and cache AutoBouquetsMaker provider definitions")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Directory holding the built-in provider definitions
    #[arg(long = "providers-dir", global = true)]
    pub providers_dir: Option<PathBuf>,

    /// Directory whose definitions override built-in ones
    #[arg(long = "user-dir", global = true)]
    pub user_dir: Option<PathBuf>,

    /// Location of the provider cache artifact
    #[arg(long = "cache-file", global = true)]
    pub cache_file: Option<PathBuf>,

    /// Neither read nor write the provider cache
    #[arg(long = "no-cache", global = true)]
    pub no_cache: bool,

    /// Number of parsing threads (0 = one per CPU, 1 = sequential)
    #[arg(short = 't', long = "threads", global = true)]
    pub threads: Option<usize>,

    #[arg(short = 'f', long = "format", value_enum, global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Enable trace-level logging
    #[arg(long = "debug", global = true, conflicts_with = "quiet")]
    pub debug: bool,

    /// Quiet mode (warnings and errors only)
    #[arg(short = 'q', long = "quiet", global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file (TOML or JSON)
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Load every provider and print them
    List,
    /// Print one provider as JSON
    Show {
        /// Provider key (definition file name without .xml)
        key: String,
    },
    /// Exit successfully when <name>.xml exists in either directory
    Exists { name: String },
    /// Delete the provider cache artifact
    ClearCache,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The requested subcommand, `list` when none was given
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::List)
    }
}
