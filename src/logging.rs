use crate::error::{ErrorKind, Result};
use comicglass_config::LogConfig;
use exn::ResultExt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// `RUST_LOG` when set, the configured level otherwise.
fn filter(config: &LogConfig) -> Result<EnvFilter> {
    let directives = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.trim().is_empty() => directives,
        _ => config.level.trim().to_string(),
    };
    EnvFilter::try_new(directives).or_raise(|| ErrorKind::Logging)
}

/// Installs the global `tracing` subscriber. Logs go to stderr.
pub fn init(config: &LogConfig) -> Result<()> {
    let registry = tracing_subscriber::registry().with(filter(config)?);
    match config.json {
        true => registry.with(fmt::layer().json().with_writer(std::io::stderr)).try_init(),
        false => registry.with(fmt::layer().with_writer(std::io::stderr)).try_init(),
    }
    .or_raise(|| ErrorKind::Logging)
}
