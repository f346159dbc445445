//! Escape Core - configuration and the stateless token core
//!
//! This crate holds everything the admin API needs that has no HTTP in it:
//! - Configuration management (environment, TOML, secret resolution)
//! - Base64url codec and HMAC-SHA256 signer
//! - Token codec, issuance and verification for the access and refresh domains

pub mod config;
pub mod token;

pub use config::{AppConfig, AuthConfig, ConfigError, Environment, LoggingConfig, ServerConfig};
pub use token::{
    current_epoch_seconds, decode_unverified, AccessClaims, DecodedToken, RefreshClaims,
    TokenError, TokenSecrets, TokenService, ACCESS_TOKEN_TTL_SECS, REFRESH_TOKEN_TTL_SECS,
};

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Token(#[from] TokenError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
