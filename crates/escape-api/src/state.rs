//! Application state management

use crate::auth::{
    AuthError, AuthService, InMemoryUserRepository, PasswordConfig, PasswordError,
    PgUserRepository, RepositoryError, UserRepository,
};
use crate::tags::{InMemoryTagRepository, TagRepository};
use escape_core::{AppConfig, ConfigError, CoreError, TokenService};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Failures while assembling the state at startup
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to prepare password hasher: {0}")]
    Password(#[from] PasswordError),

    #[error("Failed to open user store: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Failed to provision admin account: {0}")]
    Bootstrap(#[from] AuthError),
}

/// Application state shared across handlers
pub struct AppState {
    pub config: AppConfig,
    /// Token issuer and verifier; immutable after startup
    pub tokens: Arc<TokenService>,
    pub auth: AuthService,
    pub tags: Arc<dyn TagRepository>,
    pub start_time: Instant,
}

impl AppState {
    /// Assemble state around an explicit user store
    pub fn new(
        config: AppConfig,
        users: Arc<dyn UserRepository>,
        password_config: PasswordConfig,
    ) -> Result<Self, StartupError> {
        let tokens = Arc::new(TokenService::from_config(&config)?);
        let auth = AuthService::new(users, tokens.clone(), password_config)?;

        Ok(Self {
            config,
            tokens,
            auth,
            tags: Arc::new(InMemoryTagRepository::new()),
            start_time: Instant::now(),
        })
    }

    /// State backed entirely by in-memory stores
    pub fn in_memory(
        config: AppConfig,
        password_config: PasswordConfig,
    ) -> Result<Self, StartupError> {
        Self::new(
            config,
            Arc::new(InMemoryUserRepository::new()),
            password_config,
        )
    }

    /// State for the server: PostgreSQL users when `DATABASE_URL` is set
    pub async fn from_config(config: AppConfig) -> Result<Self, StartupError> {
        let users: Arc<dyn UserRepository> = match config.database.url.as_deref() {
            Some(url) => {
                tracing::info!("using PostgreSQL user store");
                Arc::new(PgUserRepository::connect(url, config.database.pool_size).await?)
            }
            None => {
                tracing::info!("DATABASE_URL not set, using in-memory user store");
                Arc::new(InMemoryUserRepository::new())
            }
        };

        Self::new(config, users, PasswordConfig::default())
    }

    /// Provision the configured admin account if it is missing
    pub async fn bootstrap_admin(&self) -> Result<bool, StartupError> {
        let password = self.config.admin_bootstrap_password()?;
        let created = self
            .auth
            .ensure_default_admin(&self.config.auth.admin_username, &password)
            .await?;
        Ok(created)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
