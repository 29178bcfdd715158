use tracing_subscriber::EnvFilter;

use crate::{
    config::{LogFormat, LoggingConfig},
    error::{ChaindError, Result},
};

/// Install the global `fmt` subscriber.
///
/// `RUST_LOG` wins when it parses; otherwise `config.level` is used. Fails
/// instead of panicking when a global subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| ChaindError::Logging(e.to_string()))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match config.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| ChaindError::Logging(e.to_string()))?;

    tracing::debug!(level = %config.level, format = ?config.format, "tracing initialised");
    Ok(())
}
