use crate::config::TelemetryConfig;
use tracing_subscriber::EnvFilter;

/// Failures while wiring up the tracing subscriber.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("'{0}' is not a valid tracing filter")]
    InvalidFilter(String),
    #[error("tracing subscriber already installed: {0}")]
    AlreadyInitialized(String),
}

/// Install the global subscriber. A `RUST_LOG` directive set in the
/// environment wins over the configured level, so operators can raise
/// verbosity without touching configuration.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let directives = std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone());
    let filter = parse_filter(&directives)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_ansi(false)
        .try_init()
        .map_err(|err| TelemetryError::AlreadyInitialized(err.to_string()))
}

fn parse_filter(directives: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(directives).map_err(|_| TelemetryError::InvalidFilter(directives.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_level_and_directive_filters() {
        assert!(parse_filter("info").is_ok());
        assert!(parse_filter("warn,expediente=debug").is_ok());
    }

    #[test]
    fn rejects_malformed_directives() {
        match parse_filter("expediente=debug=extra") {
            Err(TelemetryError::InvalidFilter(value)) => {
                assert_eq!(value, "expediente=debug=extra")
            }
            other => panic!("expected invalid-filter error, got {other:?}"),
        }
    }
}
