//! Tracing subscriber setup
//!
//! `RUST_LOG` takes precedence over the configured level. Output goes to
//! stderr so that stdout stays free for machine-readable results.
//!
//! The configured level is only known once the config file is loaded, so
//! [`with_bootstrap_logging`] covers that step with a scoped subscriber at the
//! default level.

use crate::config::LoggingConfig;
use crate::{Error, Result};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the filter used by [`init_tracing`]
pub fn build_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Install the global tracing subscriber
///
/// # Errors
/// Returns `Error::Config` if a global subscriber was already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    tracing_subscriber::registry()
        .with(build_filter(config))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))
}

/// Run `f` with a scoped stderr subscriber at the default level
///
/// For work that logs before [`init_tracing`] can run, such as
/// `ConfigResolver::load`. The global subscriber is left untouched.
pub fn with_bootstrap_logging<T>(f: impl FnOnce() -> T) -> T {
    scoped_logging(
        build_filter(&LoggingConfig::default()),
        std::io::stderr,
        f,
    )
}

fn scoped_logging<W, T>(filter: EnvFilter, writer: W, f: impl FnOnce() -> T) -> T
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(writer));
    tracing::subscriber::with_default(subscriber, f)
}
