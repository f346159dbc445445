//! User account model
//!
//! The deployment has a single admin account; `User` is what the user store
//! keeps for it (and for any other accounts provisioned out of band).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The one role this deployment grants
pub const ADMIN_ROLE: &str = "admin";

/// Role set written into every access token
pub fn granted_roles() -> Vec<String> {
    vec![ADMIN_ROLE.to_string()]
}

/// User account record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,

    /// Unique login name
    pub username: String,

    /// Argon2id PHC string; never serialized
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Inactive accounts can neither log in nor refresh
    pub active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new active user
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            password_hash: password_hash.into(),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }
}
