//! Stateless signed bearer tokens
//!
//! Tokens use the familiar `header.payload.signature` layout with HMAC-SHA256
//! signatures, built and checked here without a JWT library:
//! - Access tokens carry username, subject and roles, valid for 24 hours
//! - Refresh tokens carry username and subject, valid for 7 days
//!
//! The two kinds live in separate signature domains: each is signed with its
//! own secret and never verifies under the other one.

pub mod base64url;
pub mod codec;
pub mod signer;

pub use base64url::DecodeError;
pub use codec::{build_token, decode_segment, parse_token, TokenParts};

use crate::config::{AppConfig, ConfigError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Access token lifetime (24 hours)
pub const ACCESS_TOKEN_TTL_SECS: u64 = 24 * 60 * 60;

/// Refresh token lifetime (7 days)
pub const REFRESH_TOKEN_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Value of the `type` claim in refresh tokens
pub const REFRESH_TOKEN_TYPE: &str = "refresh";

/// Token creation and verification errors
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Invalid token format")]
    MalformedToken,

    #[error("Invalid token signature")]
    SignatureMismatch,

    #[error("Token expired")]
    TokenExpired,

    #[error("Signing key rejected")]
    InvalidKey,

    #[error("Issue time {0} is too large to carry an expiry")]
    ExpiryOverflow(u64),

    #[error("Failed to encode token: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("System time error: {0}")]
    Clock(#[from] std::time::SystemTimeError),
}

impl TokenError {
    /// Whether this is a verdict on the presented token rather than a server fault
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            TokenError::MalformedToken | TokenError::SignatureMismatch | TokenError::TokenExpired
        )
    }
}

/// Fixed token header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    pub alg: String,
    pub typ: String,
}

impl Default for TokenHeader {
    fn default() -> Self {
        Self {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        }
    }
}

/// Claims carried by an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub username: String,
    /// Subject - user ID
    pub sub: String,
    pub roles: Vec<String>,
    /// Issued at (Unix seconds)
    pub iat: u64,
    /// Expiration (Unix seconds)
    pub exp: u64,
}

/// Claims carried by a refresh token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub username: String,
    pub sub: String,
    #[serde(rename = "type")]
    pub token_type: String,
    pub iat: u64,
    pub exp: u64,
}

/// Header and payload of a token, decoded without any verification
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedToken {
    pub header: Value,
    pub payload: Value,
}

/// The two signing secrets, fixed for the life of the process
#[derive(Clone)]
pub struct TokenSecrets {
    access: String,
    refresh: String,
}

impl TokenSecrets {
    /// Both secrets must be non-empty and distinct from each other.
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Result<Self, ConfigError> {
        let access = access.into();
        let refresh = refresh.into();

        if access.is_empty() {
            return Err(ConfigError::MissingRequired("JWT_SECRET".to_string()));
        }
        if refresh.is_empty() {
            return Err(ConfigError::MissingRequired("JWT_REFRESH_SECRET".to_string()));
        }
        if access == refresh {
            return Err(ConfigError::InvalidValue {
                key: "JWT_REFRESH_SECRET".to_string(),
                value: "<same as JWT_SECRET>".to_string(),
            });
        }

        Ok(Self { access, refresh })
    }

    pub fn access(&self) -> &str {
        &self.access
    }

    pub fn refresh(&self) -> &str {
        &self.refresh
    }
}

impl std::fmt::Debug for TokenSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSecrets")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

/// Current wall-clock time in whole seconds since the Unix epoch
pub fn current_epoch_seconds() -> Result<u64, TokenError> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

/// Issues and verifies access and refresh tokens
///
/// Holds nothing but the two secrets, so a single instance can be shared
/// across any number of concurrent requests.
#[derive(Debug, Clone)]
pub struct TokenService {
    secrets: TokenSecrets,
}

impl TokenService {
    pub fn new(secrets: TokenSecrets) -> Self {
        Self { secrets }
    }

    /// Build from configuration, resolving secrets for its environment
    pub fn from_config(config: &AppConfig) -> crate::Result<Self> {
        Ok(Self::new(config.token_secrets()?))
    }

    /// Issue an access token valid for [`ACCESS_TOKEN_TTL_SECS`]
    pub fn create_access_token(
        &self,
        username: &str,
        user_id: &str,
        roles: &[String],
    ) -> Result<String, TokenError> {
        self.create_access_token_at(username, user_id, roles, current_epoch_seconds()?)
    }

    pub fn create_access_token_at(
        &self,
        username: &str,
        user_id: &str,
        roles: &[String],
        now: u64,
    ) -> Result<String, TokenError> {
        let claims = AccessClaims {
            username: username.to_string(),
            sub: user_id.to_string(),
            roles: roles.to_vec(),
            iat: now,
            exp: expiry_after(now, ACCESS_TOKEN_TTL_SECS)?,
        };

        build_token(&TokenHeader::default(), &claims, self.secrets.access())
    }

    /// Issue a refresh token valid for [`REFRESH_TOKEN_TTL_SECS`]
    pub fn create_refresh_token(&self, username: &str, user_id: &str) -> Result<String, TokenError> {
        self.create_refresh_token_at(username, user_id, current_epoch_seconds()?)
    }

    pub fn create_refresh_token_at(
        &self,
        username: &str,
        user_id: &str,
        now: u64,
    ) -> Result<String, TokenError> {
        let claims = RefreshClaims {
            username: username.to_string(),
            sub: user_id.to_string(),
            token_type: REFRESH_TOKEN_TYPE.to_string(),
            iat: now,
            exp: expiry_after(now, REFRESH_TOKEN_TTL_SECS)?,
        };

        build_token(&TokenHeader::default(), &claims, self.secrets.refresh())
    }

    /// Verify an access token against the access secret and the clock
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, TokenError> {
        self.verify_access_token_at(token, current_epoch_seconds()?)
    }

    pub fn verify_access_token_at(&self, token: &str, now: u64) -> Result<AccessClaims, TokenError> {
        let parts = verify_signature(token, self.secrets.access())?;
        let claims: AccessClaims = decode_segment(parts.payload)?;
        ensure_not_expired(claims.exp, now)?;

        Ok(claims)
    }

    /// Verify a refresh token against the refresh secret and the clock
    pub fn verify_refresh_token(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        self.verify_refresh_token_at(token, current_epoch_seconds()?)
    }

    pub fn verify_refresh_token_at(
        &self,
        token: &str,
        now: u64,
    ) -> Result<RefreshClaims, TokenError> {
        let parts = verify_signature(token, self.secrets.refresh())?;
        let claims: RefreshClaims = decode_segment(parts.payload)?;
        if claims.token_type != REFRESH_TOKEN_TYPE {
            return Err(TokenError::MalformedToken);
        }
        ensure_not_expired(claims.exp, now)?;

        Ok(claims)
    }
}

/// Decode header and payload without checking signature or expiry.
///
/// For diagnostics only; nothing returned here is trustworthy.
pub fn decode_unverified(token: &str) -> Result<DecodedToken, TokenError> {
    let parts = parse_token(token)?;
    Ok(DecodedToken {
        header: decode_segment(parts.header)?,
        payload: decode_segment(parts.payload)?,
    })
}

fn verify_signature<'a>(token: &'a str, secret: &str) -> Result<TokenParts<'a>, TokenError> {
    let parts = parse_token(token)?;
    let expected = signer::sign(parts.signing_input, secret)?;
    if !signer::signatures_match(&expected, parts.signature) {
        return Err(TokenError::SignatureMismatch);
    }
    Ok(parts)
}

fn expiry_after(now: u64, ttl: u64) -> Result<u64, TokenError> {
    now.checked_add(ttl).ok_or(TokenError::ExpiryOverflow(now))
}

// Still valid at the exact second of exp.
fn ensure_not_expired(exp: u64, now: u64) -> Result<(), TokenError> {
    if exp < now {
        return Err(TokenError::TokenExpired);
    }
    Ok(())
}
