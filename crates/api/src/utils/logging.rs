use opcal_domain::{LoggingConfig, OpCalError};
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins over `config.level`. Calling this twice is an error
/// reported by `tracing_subscriber`, which callers in tests may ignore.
pub fn init_tracing(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if config.json {
        builder.json().try_init().map_err(|err| anyhow::anyhow!(err))?;
    } else {
        builder.try_init().map_err(|err| anyhow::anyhow!(err))?;
    }
    Ok(())
}

/// Convert an `OpCalError` into a stable label suitable for logging.
#[inline]
pub fn error_label(error: &OpCalError) -> &'static str {
    match error {
        OpCalError::Database(_) => "database",
        OpCalError::Config(_) => "config",
        OpCalError::Network(_) => "network",
        OpCalError::Auth(_) => "auth",
        OpCalError::PermissionDenied(_) => "permission_denied",
        OpCalError::NotFound(_) => "not_found",
        OpCalError::Conflict(_) => "conflict",
        OpCalError::InvalidInput(_) => "invalid_input",
        OpCalError::Internal(_) => "internal",
    }
}
