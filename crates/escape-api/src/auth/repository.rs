//! User store
//!
//! The authentication core only needs to look users up by name and, once at
//! startup, create the bootstrap admin. Two backends implement that:
//! - `InMemoryUserRepository` for development and tests
//! - `PgUserRepository` for PostgreSQL via sqlx

use super::models::User;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

/// Repository errors
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Username already exists")]
    UsernameAlreadyExists,
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::UsernameAlreadyExists
            }
            other => RepositoryError::Database(other.to_string()),
        }
    }
}

/// Lookup and provisioning of user accounts
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by name regardless of status
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;

    /// Find a user by name only if the account is active
    async fn find_active_by_username(&self, username: &str)
        -> Result<Option<User>, RepositoryError>;

    /// Insert a new user; fails if the username is taken
    async fn create(&self, user: User) -> Result<User, RepositoryError>;
}

/// Process-local user store keyed by username
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the active flag; returns false if the user does not exist
    pub async fn set_active(&self, username: &str, active: bool) -> bool {
        let mut users = self.users.write().await;
        match users.get_mut(username) {
            Some(user) => {
                user.active = active;
                user.updated_at = chrono::Utc::now();
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.read().await.get(username).cloned())
    }

    async fn find_active_by_username(
        &self,
        username: &str,
    ) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .users
            .read()
            .await
            .get(username)
            .filter(|user| user.active)
            .cloned())
    }

    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.username) {
            return Err(RepositoryError::UsernameAlreadyExists);
        }
        users.insert(user.username.clone(), user.clone());
        Ok(user)
    }
}

const USER_COLUMNS: &str = "id, username, password_hash, active, created_at, updated_at";

/// PostgreSQL-backed user store
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and make sure the `users` table exists
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, RepositoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        let repository = Self::new(pool);
        repository.ensure_schema().await?;
        Ok(repository)
    }

    pub async fn ensure_schema(&self) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_active_by_username(
        &self,
        username: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 AND active = TRUE"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        let created = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6) RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }
}
