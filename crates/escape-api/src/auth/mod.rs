//! Authentication and authorization module
//!
//! - Credential checks and token issuance (`service`)
//! - The access gate and role checks for protected routes (`middleware`)
//! - Password hashing with Argon2id
//! - User store backends (in-memory and PostgreSQL)

pub mod error;
pub mod middleware;
pub mod models;
pub mod password;
pub mod repository;
pub mod service;

pub use error::AuthError;
pub use middleware::{auth_middleware, parse_bearer, require_role, AuthenticatedUser};
pub use models::{granted_roles, User, ADMIN_ROLE};
pub use password::{verify_password, PasswordConfig, PasswordError};
pub use repository::{InMemoryUserRepository, PgUserRepository, RepositoryError, UserRepository};
pub use service::{AuthService, LoginRequest, LoginResponse, RefreshRequest, RefreshResponse};
