//! Configuration Management
//!
//! Handles configuration from environment variables and an optional TOML
//! file. Development gets working defaults; production refuses to start
//! without explicit signing secrets.

use crate::token::TokenSecrets;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Access-token signing secret used only when `APP_ENV=development`.
pub const DEV_ACCESS_SECRET: &str = "development-access-secret-change-in-production";
/// Refresh-token signing secret used only when `APP_ENV=development`.
pub const DEV_REFRESH_SECRET: &str = "development-refresh-secret-change-in-production";
/// Bootstrap admin password used only when `APP_ENV=development`.
pub const DEV_ADMIN_PASSWORD: &str = "development-admin-password";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Deployment environment
    pub environment: Environment,

    /// Server configuration
    pub server: ServerConfig,

    /// Token secrets and admin bootstrap
    pub auth: AuthConfig,

    /// User store connection
    pub database: DatabaseConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_lookup(lookup)?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        Self::from_toml_str(&content).map_err(|message| ConfigError::ParseError { path, message })
    }

    fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load the file named by `ESCAPE_CONFIG` (if any), then apply env overrides
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var("ESCAPE_CONFIG") {
            Ok(path) => Self::from_file(path)?.with_env_override(),
            Err(_) => Self::from_env(),
        }
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        self.apply_lookup(|key| std::env::var(key).ok())?;
        Ok(self)
    }

    fn apply_lookup<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(env) = lookup("APP_ENV") {
            self.environment = env.parse()?;
        }

        // Server
        if let Some(host) = lookup("API_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PORT".to_string(),
                value: port,
            })?;
        }
        if let Some(origins) = lookup("ALLOWED_ORIGINS") {
            self.server.allowed_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Auth
        if let Some(secret) = lookup("JWT_SECRET") {
            self.auth.access_secret = Some(secret);
        }
        if let Some(secret) = lookup("JWT_REFRESH_SECRET") {
            self.auth.refresh_secret = Some(secret);
        }
        if let Some(password) = lookup("ADMIN_DEFAULT_PASSWORD") {
            self.auth.admin_password = Some(password);
        }

        // Database
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = Some(url);
        }

        // Logging
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            self.logging.json_format = format.eq_ignore_ascii_case("json");
        }

        Ok(())
    }

    /// Resolve the two signing secrets for the configured environment
    pub fn token_secrets(&self) -> Result<TokenSecrets, ConfigError> {
        let access = resolve_secret(
            "JWT_SECRET",
            self.auth.access_secret.as_deref(),
            DEV_ACCESS_SECRET,
            self.environment,
        )?;
        let refresh = resolve_secret(
            "JWT_REFRESH_SECRET",
            self.auth.refresh_secret.as_deref(),
            DEV_REFRESH_SECRET,
            self.environment,
        )?;

        TokenSecrets::new(access, refresh)
    }

    /// Resolve the password given to the bootstrap admin account
    pub fn admin_bootstrap_password(&self) -> Result<String, ConfigError> {
        resolve_secret(
            "ADMIN_DEFAULT_PASSWORD",
            self.auth.admin_password.as_deref(),
            DEV_ADMIN_PASSWORD,
            self.environment,
        )
    }
}

fn resolve_secret(
    key: &str,
    configured: Option<&str>,
    fallback: &str,
    environment: Environment,
) -> Result<String, ConfigError> {
    match configured.filter(|value| !value.trim().is_empty()) {
        Some(value) => Ok(value.to_string()),
        None if environment.is_production() => Err(ConfigError::MissingRequired(key.to_string())),
        None => {
            tracing::warn!(key, "not set, using the development fallback (unsafe for production)");
            Ok(fallback.to_string())
        }
    }
}

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

impl std::str::FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(ConfigError::InvalidValue {
                key: "APP_ENV".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Allowed origins for CORS (any origin is accepted in development)
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            allowed_origins: vec![
                "http://localhost:3001".to_string(),
                "http://localhost:5173".to_string(),
            ],
        }
    }
}

/// Signing secrets and admin bootstrap settings
///
/// All three values are optional here; [`AppConfig::token_secrets`] and
/// [`AppConfig::admin_bootstrap_password`] decide whether a missing value is
/// an error or gets the development fallback.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    #[serde(skip_serializing)]
    pub access_secret: Option<String>,

    #[serde(skip_serializing)]
    pub refresh_secret: Option<String>,

    /// Username of the account provisioned on first start
    pub admin_username: String,

    #[serde(skip_serializing)]
    pub admin_password: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_secret: None,
            refresh_secret: None,
            admin_username: "admin".to_string(),
            admin_password: None,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");
        f.debug_struct("AuthConfig")
            .field("access_secret", &redact(&self.access_secret))
            .field("refresh_secret", &redact(&self.refresh_secret))
            .field("admin_username", &self.admin_username)
            .field("admin_password", &redact(&self.admin_password))
            .finish()
    }
}

/// User store connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL; the in-memory store is used when unset
    #[serde(skip_serializing)]
    pub url: Option<String>,

    /// PostgreSQL connection pool size
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            pool_size: 5,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.auth.admin_username, "admin");
        assert!(config.database.url.is_none());
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!(
            "production".parse::<Environment>().unwrap(),
            Environment::Production
        );
        assert_eq!("DEV".parse::<Environment>().unwrap(), Environment::Development);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_lookup_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("PORT", "8081"),
            ("ALLOWED_ORIGINS", "https://admin.example.com, ,https://cms.example.com"),
            ("LOG_FORMAT", "JSON"),
            ("DATABASE_URL", "postgres://localhost/escape"),
        ]))
        .unwrap();

        assert_eq!(config.server.port, 8081);
        assert_eq!(
            config.server.allowed_origins,
            vec!["https://admin.example.com", "https://cms.example.com"]
        );
        assert!(config.logging.json_format);
        assert_eq!(
            config.database.url.as_deref(),
            Some("postgres://localhost/escape")
        );
    }

    #[test]
    fn test_invalid_port_rejected() {
        let result = AppConfig::from_lookup(lookup_from(&[("PORT", "eighty")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { key, .. }) if key == "PORT"));
    }

    #[test]
    fn test_development_falls_back_to_dev_secrets() {
        let config = AppConfig::default();
        let secrets = config.token_secrets().unwrap();
        assert_eq!(secrets.access(), DEV_ACCESS_SECRET);
        assert_eq!(secrets.refresh(), DEV_REFRESH_SECRET);
        assert_eq!(config.admin_bootstrap_password().unwrap(), DEV_ADMIN_PASSWORD);
    }

    #[test]
    fn test_production_requires_secrets() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("APP_ENV", "production"),
            ("JWT_SECRET", "prod-access"),
        ]))
        .unwrap();

        let result = config.token_secrets();
        assert!(
            matches!(result, Err(ConfigError::MissingRequired(key)) if key == "JWT_REFRESH_SECRET")
        );
        assert!(config.admin_bootstrap_password().is_err());
    }

    #[test]
    fn test_blank_secret_counts_as_missing() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("APP_ENV", "production"),
            ("JWT_SECRET", "   "),
            ("JWT_REFRESH_SECRET", "prod-refresh"),
        ]))
        .unwrap();

        assert!(matches!(
            config.token_secrets(),
            Err(ConfigError::MissingRequired(key)) if key == "JWT_SECRET"
        ));
    }

    #[test]
    fn test_production_with_explicit_secrets() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("APP_ENV", "production"),
            ("JWT_SECRET", "prod-access"),
            ("JWT_REFRESH_SECRET", "prod-refresh"),
        ]))
        .unwrap();

        let secrets = config.token_secrets().unwrap();
        assert_eq!(secrets.access(), "prod-access");
        assert_eq!(secrets.refresh(), "prod-refresh");
    }

    #[test]
    fn test_identical_secrets_rejected() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("JWT_SECRET", "shared"),
            ("JWT_REFRESH_SECRET", "shared"),
        ]))
        .unwrap();

        assert!(matches!(
            config.token_secrets(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_toml_layering() {
        let config = AppConfig::from_toml_str(
            r#"
            environment = "production"

            [server]
            port = 9000

            [auth]
            admin_username = "root"
            "#,
        )
        .unwrap();

        assert!(config.environment.is_production());
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.auth.admin_username, "root");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = AppConfig::from_lookup(lookup_from(&[("JWT_SECRET", "super-secret")])).unwrap();
        let debug = format!("{:?}", config.auth);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
