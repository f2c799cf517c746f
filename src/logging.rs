use std::io;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::cli::VerbosityLevel;

/// Default filter directive for a verbosity level.
pub fn default_directive(verbosity: VerbosityLevel) -> &'static str {
    match verbosity {
        VerbosityLevel::Quiet => "warn",
        VerbosityLevel::Normal => "info",
        VerbosityLevel::Verbose => "debug",
        VerbosityLevel::Debug => "trace",
    }
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` takes precedence over `verbosity`. Calling this again once a
/// subscriber is installed does nothing.
pub fn init_logging(verbosity: VerbosityLevel) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_ansi(atty::is(atty::Stream::Stderr)),
        )
        .try_init();
}
