//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `MINHPHAT_HOST` - Bind address (default: 127.0.0.1)
//! - `MINHPHAT_PORT` - Listen port (default: 3000)
//! - `MINHPHAT_BASE_URL` - Public URL; `https` turns on `Secure` cookies
//!   (default: <http://localhost:3000>)
//! - `MINHPHAT_STORE` - `memory` or `sqlite` (default: memory)
//! - `MINHPHAT_DATABASE_URL` - SQLite URL, falls back to `DATABASE_URL`
//!   (default: `sqlite://data/minhphat.sqlite?mode=rwc`)
//! - `MINHPHAT_SESSION_TTL_MINUTES` - Server session lifetime (default: 1440)
//! - `MINHPHAT_IDLE_TIMEOUT_MINUTES` - Client idle window (default: 15)
//! - `MINHPHAT_IDLE_WARNING_SECONDS` - Warning lead before idle logout (default: 120)
//! - `MINHPHAT_SWEEP_INTERVAL_SECONDS` - Expired-session sweep period (default: 300)
//! - `MINHPHAT_SEED` - Seed an empty store at startup (default: true)
//! - `MINHPHAT_ADMIN_PASSWORD` - Password for the seeded `admin` (default: admin123)
//! - `MINHPHAT_CLIENT_DIR` - Static client bundle served as the fallback
//! - `MINHPHAT_LOG_FORMAT` - `json` for JSON logs, anything else for text
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Traces sample rate (default: 0.1)

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use chrono::TimeDelta;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use minh_phat_core::idle::{DEFAULT_IDLE_TIMEOUT, DEFAULT_WARNING_LEAD, IdlePolicy};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/minhphat.sqlite?mode=rwc";
const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);
const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Which [`crate::db::Store`] backend to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    #[default]
    Memory,
    Sqlite,
}

impl StoreKind {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Some(Self::Memory),
            "sqlite" => Some(Self::Sqlite),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Sqlite => "sqlite",
        }
    }
}

/// Server application configuration.
///
/// Implements `Debug` manually to redact the database URL and admin password.
#[derive(Clone)]
pub struct ServerConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL
    pub base_url: String,
    /// Store backend
    pub store: StoreKind,
    /// SQLite connection URL
    pub database_url: SecretString,
    /// Lifetime of a server-side admin session
    pub session_ttl: Duration,
    /// Client idle window and warning lead, reported by `/api/auth/verify`
    pub idle: IdlePolicy,
    /// How often expired sessions are swept
    pub sweep_interval: Duration,
    /// Seed an empty store at startup
    pub seed: bool,
    /// Password for the seeded `admin` user
    pub admin_password: SecretString,
    /// Directory with the built web client, served for non-API paths
    pub client_dir: Option<PathBuf>,
    /// Emit JSON logs instead of text
    pub log_json: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("base_url", &self.base_url)
            .field("store", &self.store)
            .field("database_url", &"[REDACTED]")
            .field("session_ttl", &self.session_ttl)
            .field("idle", &self.idle)
            .field("sweep_interval", &self.sweep_interval)
            .field("seed", &self.seed)
            .field("admin_password", &"[REDACTED]")
            .field("client_dir", &self.client_dir)
            .field("log_json", &self.log_json)
            .field("sentry_dsn", &self.sentry_dsn.as_ref().map(|_| "[REDACTED]"))
            .field("sentry_environment", &self.sentry_environment)
            .finish_non_exhaustive()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            store: StoreKind::Memory,
            database_url: SecretString::from(DEFAULT_DATABASE_URL),
            session_ttl: DEFAULT_SESSION_TTL,
            idle: IdlePolicy::default(),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            seed: true,
            admin_password: SecretString::from(DEFAULT_ADMIN_PASSWORD),
            client_dir: None,
            log_json: false,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.1,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is malformed or the idle window
    /// does not fit inside the session lifetime.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_source(&|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`ServerConfig::from_env`].
    pub fn from_source(env: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(env);

        let host = vars.parse_or("MINHPHAT_HOST", "127.0.0.1", str::parse::<IpAddr>)?;
        let port = vars.parse_or("MINHPHAT_PORT", "3000", str::parse::<u16>)?;
        let base_url = vars.get_or("MINHPHAT_BASE_URL", "http://localhost:3000");
        Url::parse(&base_url).map_err(|e| invalid("MINHPHAT_BASE_URL", e))?;
        let store = vars.parse_or("MINHPHAT_STORE", "memory", |s| {
            StoreKind::parse(s).ok_or("expected 'memory' or 'sqlite'")
        })?;
        let database_url = vars.database_url("MINHPHAT_DATABASE_URL");

        let session_ttl = minutes(vars.parse_or(
            "MINHPHAT_SESSION_TTL_MINUTES",
            "1440",
            str::parse::<u64>,
        )?);
        let idle_timeout = vars.parse_opt("MINHPHAT_IDLE_TIMEOUT_MINUTES", str::parse::<u64>)?
            .map_or(DEFAULT_IDLE_TIMEOUT, minutes);
        let warning_lead = vars
            .parse_opt("MINHPHAT_IDLE_WARNING_SECONDS", str::parse::<u64>)?
            .map_or(DEFAULT_WARNING_LEAD, Duration::from_secs);
        let sweep_interval = Duration::from_secs(vars.parse_or(
            "MINHPHAT_SWEEP_INTERVAL_SECONDS",
            "300",
            str::parse::<u64>,
        )?);

        if session_ttl.is_zero() {
            return Err(invalid("MINHPHAT_SESSION_TTL_MINUTES", "must be positive"));
        }
        if sweep_interval.is_zero() {
            return Err(invalid("MINHPHAT_SWEEP_INTERVAL_SECONDS", "must be positive"));
        }
        let idle =
            IdlePolicy::new(idle_timeout, warning_lead).map_err(|e| invalid("MINHPHAT_IDLE_*", e))?;
        if idle.idle_timeout() > session_ttl {
            return Err(invalid(
                "MINHPHAT_IDLE_TIMEOUT_MINUTES",
                "idle window cannot outlast the session TTL",
            ));
        }

        let seed = vars.parse_or("MINHPHAT_SEED", "true", parse_bool)?;
        let admin_password =
            SecretString::from(vars.get_or("MINHPHAT_ADMIN_PASSWORD", DEFAULT_ADMIN_PASSWORD));
        let client_dir = vars.get("MINHPHAT_CLIENT_DIR").map(PathBuf::from);
        let log_json = vars
            .get("MINHPHAT_LOG_FORMAT")
            .is_some_and(|f| f.eq_ignore_ascii_case("json"));

        let sentry_dsn = vars.get("SENTRY_DSN").filter(|s| !s.is_empty());
        let sentry_environment = vars.get("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = vars
            .get("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = vars
            .get("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);

        Ok(Self {
            host,
            port,
            base_url,
            store,
            database_url,
            session_ttl,
            idle,
            sweep_interval,
            seed,
            admin_password,
            client_dir,
            log_json,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether session cookies carry the `Secure` attribute.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// Session lifetime as a chrono delta, saturating on absurd values.
    #[must_use]
    pub fn session_ttl_delta(&self) -> TimeDelta {
        TimeDelta::from_std(self.session_ttl).unwrap_or(TimeDelta::MAX)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Vars<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Vars<'_> {
    /// Get an optional variable. Empty values count as unset.
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn parse_or<T, E: std::fmt::Display>(
        &self,
        key: &str,
        default: &str,
        parse: impl Fn(&str) -> Result<T, E>,
    ) -> Result<T, ConfigError> {
        parse(self.get_or(key, default).trim()).map_err(|e| invalid(key, e))
    }

    fn parse_opt<T, E: std::fmt::Display>(
        &self,
        key: &str,
        parse: impl Fn(&str) -> Result<T, E>,
    ) -> Result<Option<T>, ConfigError> {
        self.get(key)
            .map(|v| parse(v.trim()).map_err(|e| invalid(key, e)))
            .transpose()
    }

    /// Get database URL with fallback to generic `DATABASE_URL`.
    fn database_url(&self, primary_key: &str) -> SecretString {
        let url = self
            .get(primary_key)
            .or_else(|| self.get("DATABASE_URL"))
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        SecretString::from(url)
    }
}

fn invalid(key: &str, e: impl std::fmt::Display) -> ConfigError {
    ConfigError::InvalidEnvVar(key.to_string(), e.to_string())
}

const fn minutes(n: u64) -> Duration {
    Duration::from_secs(n.saturating_mul(60))
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(format!("expected a boolean, got '{other}'")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServerConfig::from_source(&move |key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(config.store, StoreKind::Memory);
        assert_eq!(config.session_ttl, Duration::from_secs(86_400));
        assert_eq!(config.idle, IdlePolicy::default());
        assert!(config.seed);
        assert!(!config.secure_cookies());
        assert_eq!(config.database_url.expose_secret(), DEFAULT_DATABASE_URL);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("MINHPHAT_PORT", "8080"),
            ("MINHPHAT_STORE", "SQLite"),
            ("MINHPHAT_BASE_URL", "https://minhphat.com"),
            ("MINHPHAT_SEED", "false"),
            ("MINHPHAT_IDLE_TIMEOUT_MINUTES", "5"),
            ("MINHPHAT_IDLE_WARNING_SECONDS", "30"),
            ("MINHPHAT_LOG_FORMAT", "json"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.store, StoreKind::Sqlite);
        assert!(config.secure_cookies());
        assert!(!config.seed);
        assert_eq!(config.idle.idle_timeout(), Duration::from_secs(300));
        assert_eq!(config.idle.warning_lead(), Duration::from_secs(30));
        assert!(config.log_json);
    }

    #[test]
    fn test_database_url_falls_back() {
        let config = load(&[("DATABASE_URL", "sqlite::memory:")]).unwrap();
        assert_eq!(config.database_url.expose_secret(), "sqlite::memory:");

        let config = load(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("MINHPHAT_DATABASE_URL", "sqlite://x.db"),
        ])
        .unwrap();
        assert_eq!(config.database_url.expose_secret(), "sqlite://x.db");
    }

    #[test]
    fn test_idle_window_must_fit_in_ttl() {
        let err = load(&[
            ("MINHPHAT_SESSION_TTL_MINUTES", "10"),
            ("MINHPHAT_IDLE_TIMEOUT_MINUTES", "15"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "MINHPHAT_IDLE_TIMEOUT_MINUTES"));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(load(&[("MINHPHAT_PORT", "eighty")]).is_err());
        assert!(load(&[("MINHPHAT_STORE", "postgres")]).is_err());
        assert!(load(&[("MINHPHAT_SEED", "maybe")]).is_err());
        assert!(load(&[("MINHPHAT_BASE_URL", "not a url")]).is_err());
        assert!(load(&[("MINHPHAT_SESSION_TTL_MINUTES", "0")]).is_err());
        assert!(load(&[("MINHPHAT_IDLE_WARNING_SECONDS", "900")]).is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = load(&[("MINHPHAT_ADMIN_PASSWORD", "hunter2-but-longer")]).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }
}
