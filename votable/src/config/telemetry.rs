use crate::errors::ConfigurationError;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs a JSON tracing subscriber filtered by `RUST_LOG`, `votable=info` when unset.
pub fn init_tracing() -> Result<(), ConfigurationError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("votable=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json().with_target(true))
        .try_init()
        .map_err(|e| ConfigurationError::Telemetry(e.to_string()))?;

    info!(
        service_name = "votable",
        service_version = env!("CARGO_PKG_VERSION"),
        "Tracing initialized with JSON format"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_initialization_is_an_error() {
        let _ = init_tracing();
        assert!(matches!(init_tracing(), Err(ConfigurationError::Telemetry(_))));
    }
}
