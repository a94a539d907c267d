use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::workflows::rfq::currency::normalize_currency_code;
use crate::workflows::rfq::ScoringConfig;

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
    pub sourcing: SourcingConfig,
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
        let format = LogFormat::from_str(
            &env::var("APP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string()),
        );

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, format },
            sourcing: SourcingConfig::from_env()?,
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Compact,
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

const DEFAULT_PUBLIC_FORM_URL: &str = "http://127.0.0.1:3000/quote";

/// Sourcing policy knobs plus the locations of operator-maintained inputs.
#[derive(Debug, Clone)]
pub struct SourcingConfig {
    pub base_currency: String,
    pub payment_terms_cap_days: u32,
    pub default_quality_score: f64,
    pub public_form_url: String,
    pub rates_csv: Option<PathBuf>,
    pub catalog_json: Option<PathBuf>,
}

impl Default for SourcingConfig {
    fn default() -> Self {
        Self {
            base_currency: "TRY".to_string(),
            payment_terms_cap_days: ScoringConfig::DEFAULT_PAYMENT_TERMS_CAP_DAYS,
            default_quality_score: ScoringConfig::DEFAULT_QUALITY_SCORE,
            public_form_url: DEFAULT_PUBLIC_FORM_URL.to_string(),
            rates_csv: None,
            catalog_json: None,
        }
    }
}

impl SourcingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw_currency = env::var("SOURCING_BASE_CURRENCY").unwrap_or_else(|_| "TRY".to_string());
        let base_currency = normalize_currency_code(&raw_currency)
            .ok_or(ConfigError::InvalidCurrency { value: raw_currency })?;

        let payment_terms_cap_days = match env::var("SOURCING_PAYMENT_TERMS_CAP_DAYS") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|days| *days > 0)
                .ok_or(ConfigError::InvalidNumber {
                    variable: "SOURCING_PAYMENT_TERMS_CAP_DAYS",
                })?,
            Err(_) => ScoringConfig::DEFAULT_PAYMENT_TERMS_CAP_DAYS,
        };

        let default_quality_score = match env::var("SOURCING_DEFAULT_QUALITY_SCORE") {
            Ok(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|score| (0.0..=ScoringConfig::QUALITY_MAX).contains(score))
                .ok_or(ConfigError::InvalidNumber {
                    variable: "SOURCING_DEFAULT_QUALITY_SCORE",
                })?,
            Err(_) => ScoringConfig::DEFAULT_QUALITY_SCORE,
        };

        let public_form_url = env::var("SOURCING_PUBLIC_FORM_URL")
            .unwrap_or_else(|_| DEFAULT_PUBLIC_FORM_URL.to_string());

        Ok(Self {
            base_currency,
            payment_terms_cap_days,
            default_quality_score,
            public_form_url,
            rates_csv: env::var_os("SOURCING_RATES_CSV").map(PathBuf::from),
            catalog_json: env::var_os("SOURCING_CATALOG_JSON").map(PathBuf::from),
        })
    }

    pub fn scoring(&self) -> ScoringConfig {
        ScoringConfig {
            payment_terms_cap_days: self.payment_terms_cap_days,
            default_quality_score: self.default_quality_score,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidCurrency { value: String },
    InvalidNumber { variable: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidCurrency { value } => {
                write!(f, "SOURCING_BASE_CURRENCY '{value}' is not a three-letter code")
            }
            ConfigError::InvalidNumber { variable } => {
                write!(f, "{variable} is missing a valid numeric value")
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
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_LOG_FORMAT",
            "SOURCING_BASE_CURRENCY",
            "SOURCING_PAYMENT_TERMS_CAP_DAYS",
            "SOURCING_DEFAULT_QUALITY_SCORE",
            "SOURCING_PUBLIC_FORM_URL",
            "SOURCING_RATES_CSV",
            "SOURCING_CATALOG_JSON",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.format, LogFormat::Compact);
        assert_eq!(config.sourcing.base_currency, "TRY");
        assert_eq!(config.sourcing.payment_terms_cap_days, 90);
        assert_eq!(config.sourcing.default_quality_score, 15.0);
        assert!(config.sourcing.rates_csv.is_none());
    }

    #[test]
    fn sourcing_overrides_are_validated() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("SOURCING_BASE_CURRENCY", "usd");
        env::set_var("SOURCING_PAYMENT_TERMS_CAP_DAYS", "60");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.sourcing.base_currency, "USD");
        assert_eq!(config.sourcing.scoring().payment_terms_cap_days, 60);

        env::set_var("SOURCING_DEFAULT_QUALITY_SCORE", "45");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidNumber {
                variable: "SOURCING_DEFAULT_QUALITY_SCORE"
            })
        ));
        reset_env();
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }
}
