use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{debug, error};

use abm_providers::cli::{Cli, Command};
use abm_providers::config::{Config, ConfigManager};
use abm_providers::logging::init_logging;
use abm_providers::output::Output;
use abm_providers::repository::ProviderRepository;

/// Exit status for configuration errors that prevent a load.
const EXIT_CONFIG_ERROR: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();

    let config = match ConfigManager::load_config(&cli).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    init_logging(config.verbosity());
    debug!(?config, "configuration loaded");

    match run(cli.command(), config).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: Config) -> Result<ExitCode> {
    let repository = ProviderRepository::new(config.repository_config());
    let output = Output::new(config.verbosity());

    match command {
        Command::List => {
            let started = Instant::now();
            let report = load_blocking(repository).await?;
            let formatted = output
                .format_report(&report, config.output.format.into(), started.elapsed())
                .context("Failed to format providers")?;
            print!("{}", formatted);
            Ok(ExitCode::SUCCESS)
        }
        Command::Show { key } => {
            let mut report = load_blocking(repository).await?;
            match report.providers.remove(&key) {
                Some(provider) => {
                    let formatted = output
                        .format_provider(&provider)
                        .context("Failed to format provider")?;
                    println!("{}", formatted);
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    eprintln!("No provider named '{}'", key);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Exists { name } => {
            if repository.provider_file_exists(&name) {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Command::ClearCache => {
            let removed = repository.invalidate_cache().with_context(|| {
                format!(
                    "Failed to remove {}",
                    repository.cache().path().display()
                )
            })?;
            if removed {
                println!("Removed {}", repository.cache().path().display());
            } else {
                println!("No cache at {}", repository.cache().path().display());
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Loading is synchronous file work; keep it off the async worker threads.
async fn load_blocking(
    repository: ProviderRepository,
) -> Result<abm_providers::repository::LoadReport> {
    tokio::task::spawn_blocking(move || repository.load())
        .await
        .context("Provider loading task failed")
}
