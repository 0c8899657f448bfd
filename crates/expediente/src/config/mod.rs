use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub intake: IntakeConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let intake = IntakeConfig {
            max_pdf_bytes: env::var("MAX_PDF_SIZE_BYTES")
                .unwrap_or_else(|_| IntakeConfig::DEFAULT_MAX_PDF_BYTES.to_string())
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidSizeLimit)?,
            portal_secret: env::var("PORTAL_SECRET")
                .unwrap_or_else(|_| "portal-secret-change-me".to_string()),
            portal_ttl_seconds: env::var("PORTAL_TOKEN_TTL_SECS")
                .unwrap_or_else(|_| IntakeConfig::DEFAULT_PORTAL_TTL_SECS.to_string())
                .parse::<i64>()
                .map_err(|_| ConfigError::InvalidTtl)?,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            intake,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Knobs for document intake and the client portal.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    pub max_pdf_bytes: usize,
    pub portal_secret: String,
    pub portal_ttl_seconds: i64,
}

impl IntakeConfig {
    pub const DEFAULT_MAX_PDF_BYTES: usize = 10 * 1024 * 1024;
    pub const DEFAULT_PORTAL_TTL_SECS: i64 = 3600;
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            max_pdf_bytes: Self::DEFAULT_MAX_PDF_BYTES,
            portal_secret: "portal-secret-change-me".to_string(),
            portal_ttl_seconds: Self::DEFAULT_PORTAL_TTL_SECS,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidSizeLimit,
    InvalidTtl,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidSizeLimit => {
                write!(f, "MAX_PDF_SIZE_BYTES must be a positive byte count")
            }
            ConfigError::InvalidTtl => {
                write!(f, "PORTAL_TOKEN_TTL_SECS must be a number of seconds")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("MAX_PDF_SIZE_BYTES");
        env::remove_var("PORTAL_SECRET");
        env::remove_var("PORTAL_TOKEN_TTL_SECS");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(
            config.intake.max_pdf_bytes,
            IntakeConfig::DEFAULT_MAX_PDF_BYTES
        );
        assert_eq!(
            config.intake.portal_ttl_seconds,
            IntakeConfig::DEFAULT_PORTAL_TTL_SECS
        );
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn rejects_non_numeric_size_limit() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("MAX_PDF_SIZE_BYTES", "ten-megabytes");
        match AppConfig::load() {
            Err(ConfigError::InvalidSizeLimit) => {}
            other => panic!("expected size limit error, got {other:?}"),
        }
        reset_env();
    }
}
