//! Authentication service layer
//!
//! Credential checks at login, token issuance, and the refresh exchange.
//! The user store and the password hasher are the only collaborators; tokens
//! themselves are never stored.

use super::error::AuthError;
use super::models::{granted_roles, User};
use super::password::{verify_password, PasswordConfig, PasswordError};
use super::repository::{RepositoryError, UserRepository};
use crate::audit::{audit_log, AuditEvent};
use escape_core::TokenService;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// Admin login request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "username must not be empty"))]
    pub username: String,
    #[validate(length(min = 1, message = "password must not be empty"))]
    pub password: String,
}

/// Token refresh request
///
/// An empty token is left to the verifier, which reports it as malformed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Tokens issued on login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub username: String,
}

/// New access token issued on refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub username: String,
}

/// Authentication service
///
/// Cheap to clone; all state is behind `Arc`s.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<TokenService>,
    password_config: PasswordConfig,
    // Verified against when the username is unknown so both failure paths cost the same.
    dummy_hash: Arc<str>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: Arc<TokenService>,
        password_config: PasswordConfig,
    ) -> Result<Self, PasswordError> {
        let dummy_hash = password_config.hash("escape-timing-equalizer")?;
        Ok(Self {
            users,
            tokens,
            password_config,
            dummy_hash: dummy_hash.into(),
        })
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Check a username/password pair against the active user store
    ///
    /// Unknown user, inactive user and wrong password all return `Ok(None)`.
    pub async fn validate_user(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, AuthError> {
        let Some(user) = self.users.find_active_by_username(username).await? else {
            verify_password(password, &self.dummy_hash)?;
            return Ok(None);
        };

        if verify_password(password, &user.password_hash)? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    /// Issue an access/refresh pair for an already validated user
    pub fn login(&self, user: &User) -> Result<LoginResponse, AuthError> {
        let user_id = user.id.to_string();
        let access_token =
            self.tokens
                .create_access_token(&user.username, &user_id, &granted_roles())?;
        let refresh_token = self.tokens.create_refresh_token(&user.username, &user_id)?;

        Ok(LoginResponse {
            access_token,
            refresh_token,
            username: user.username.clone(),
        })
    }

    /// Validate credentials and issue tokens
    pub async fn authenticate(&self, request: &LoginRequest) -> Result<LoginResponse, AuthError> {
        request
            .validate()
            .map_err(|e| AuthError::InvalidRequest(e.to_string()))?;

        let user = self
            .validate_user(&request.username, &request.password)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        self.login(&user)
    }

    /// Exchange a refresh token for a new access token
    ///
    /// The token is verified before the user store is touched. The refresh
    /// token itself stays valid until its own expiry.
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<RefreshResponse, AuthError> {
        let claims = self.tokens.verify_refresh_token(refresh_token)?;

        let user = self
            .users
            .find_active_by_username(&claims.username)
            .await?
            .ok_or(AuthError::UserNotFoundOrInactive)?;

        let access_token = self.tokens.create_access_token(
            &user.username,
            &user.id.to_string(),
            &granted_roles(),
        )?;

        Ok(RefreshResponse {
            access_token,
            username: user.username,
        })
    }

    /// Create the admin account if it does not exist yet
    ///
    /// Returns `true` when an account was created.
    pub async fn ensure_default_admin(
        &self,
        username: &str,
        password: &str,
    ) -> Result<bool, AuthError> {
        if self.users.find_by_username(username).await?.is_some() {
            return Ok(false);
        }

        let hash = self.password_config.hash(password)?;
        match self.users.create(User::new(username, hash)).await {
            Ok(_) => {
                audit_log(&AuditEvent::AdminBootstrapped {
                    username: username.to_string(),
                });
                Ok(true)
            }
            // Another instance won the race.
            Err(RepositoryError::UsernameAlreadyExists) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repository::InMemoryUserRepository;
    use async_trait::async_trait;
    use escape_core::{TokenError, TokenSecrets, REFRESH_TOKEN_TTL_SECS};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Wraps the in-memory store and counts lookups
    #[derive(Default)]
    struct CountingRepository {
        inner: InMemoryUserRepository,
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl UserRepository for CountingRepository {
        async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.find_by_username(username).await
        }

        async fn find_active_by_username(
            &self,
            username: &str,
        ) -> Result<Option<User>, RepositoryError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.find_active_by_username(username).await
        }

        async fn create(&self, user: User) -> Result<User, RepositoryError> {
            self.inner.create(user).await
        }
    }

    /// A store that is always down
    struct FailingRepository;

    #[async_trait]
    impl UserRepository for FailingRepository {
        async fn find_by_username(&self, _: &str) -> Result<Option<User>, RepositoryError> {
            Err(RepositoryError::Database("connection refused".to_string()))
        }

        async fn find_active_by_username(&self, _: &str) -> Result<Option<User>, RepositoryError> {
            Err(RepositoryError::Database("connection refused".to_string()))
        }

        async fn create(&self, _: User) -> Result<User, RepositoryError> {
            Err(RepositoryError::Database("connection refused".to_string()))
        }
    }

    fn token_service() -> Arc<TokenService> {
        Arc::new(TokenService::new(
            TokenSecrets::new("test-access", "test-refresh").unwrap(),
        ))
    }

    async fn service_with(repo: Arc<CountingRepository>) -> AuthService {
        let service = AuthService::new(repo, token_service(), PasswordConfig::minimal()).unwrap();
        assert!(service
            .ensure_default_admin("admin", "correct-horse")
            .await
            .unwrap());
        service
    }

    fn login(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_login_issues_both_tokens() {
        let service = service_with(Arc::default()).await;

        let response = service
            .authenticate(&login("admin", "correct-horse"))
            .await
            .unwrap();
        assert_eq!(response.username, "admin");

        let access = service.tokens().verify_access_token(&response.access_token).unwrap();
        assert_eq!(access.username, "admin");
        assert_eq!(access.roles, vec!["admin".to_string()]);

        let refresh = service
            .tokens()
            .verify_refresh_token(&response.refresh_token)
            .unwrap();
        assert_eq!(refresh.sub, access.sub);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_look_identical() {
        let service = service_with(Arc::default()).await;

        let wrong_password = service
            .authenticate(&login("admin", "wrong"))
            .await
            .unwrap_err();
        let unknown_user = service
            .authenticate(&login("nobody", "correct-horse"))
            .await
            .unwrap_err();

        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_user, AuthError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
        assert_eq!(wrong_password.status(), unknown_user.status());
    }

    #[tokio::test]
    async fn test_inactive_user_cannot_login() {
        let repo = Arc::new(CountingRepository::default());
        let service = service_with(repo.clone()).await;
        repo.inner.set_active("admin", false).await;

        let result = service.authenticate(&login("admin", "correct-horse")).await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_empty_fields_rejected_before_lookup() {
        let repo = Arc::new(CountingRepository::default());
        let service = service_with(repo.clone()).await;
        let before = repo.lookups.load(Ordering::SeqCst);

        let result = service.authenticate(&login("", "x")).await;
        assert!(matches!(result, Err(AuthError::InvalidRequest(_))));
        assert_eq!(repo.lookups.load(Ordering::SeqCst), before);
    }

    #[tokio::test]
    async fn test_refresh_issues_new_access_token() {
        let service = service_with(Arc::default()).await;
        let tokens = service
            .authenticate(&login("admin", "correct-horse"))
            .await
            .unwrap();

        let refreshed = service
            .refresh_access_token(&tokens.refresh_token)
            .await
            .unwrap();
        assert_eq!(refreshed.username, "admin");
        assert!(service
            .tokens()
            .verify_access_token(&refreshed.access_token)
            .is_ok());

        // Not rotated: the same refresh token keeps working.
        assert!(service
            .refresh_access_token(&tokens.refresh_token)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_expired_refresh_rejected_without_lookup() {
        let repo = Arc::new(CountingRepository::default());
        let service = service_with(repo.clone()).await;
        let issued_at = escape_core::current_epoch_seconds().unwrap() - REFRESH_TOKEN_TTL_SECS - 1;
        let expired = service
            .tokens()
            .create_refresh_token_at("admin", "u-1", issued_at)
            .unwrap();
        let before = repo.lookups.load(Ordering::SeqCst);

        let result = service.refresh_access_token(&expired).await;
        assert!(matches!(
            result,
            Err(AuthError::Token(TokenError::TokenExpired))
        ));
        assert_eq!(repo.lookups.load(Ordering::SeqCst), before);
    }

    #[tokio::test]
    async fn test_access_token_cannot_refresh() {
        let service = service_with(Arc::default()).await;
        let tokens = service
            .authenticate(&login("admin", "correct-horse"))
            .await
            .unwrap();

        let result = service.refresh_access_token(&tokens.access_token).await;
        assert!(matches!(
            result,
            Err(AuthError::Token(TokenError::SignatureMismatch))
        ));
    }

    #[tokio::test]
    async fn test_refresh_rechecks_user_status() {
        let repo = Arc::new(CountingRepository::default());
        let service = service_with(repo.clone()).await;
        let tokens = service
            .authenticate(&login("admin", "correct-horse"))
            .await
            .unwrap();

        repo.inner.set_active("admin", false).await;
        let result = service.refresh_access_token(&tokens.refresh_token).await;
        assert!(matches!(result, Err(AuthError::UserNotFoundOrInactive)));
    }

    #[tokio::test]
    async fn test_refresh_for_deleted_user() {
        let service = service_with(Arc::default()).await;
        let ghost = service.tokens().create_refresh_token("ghost", "u-9").unwrap();

        let result = service.refresh_access_token(&ghost).await;
        assert!(matches!(result, Err(AuthError::UserNotFoundOrInactive)));
    }

    #[tokio::test]
    async fn test_bootstrap_is_idempotent() {
        let service = service_with(Arc::default()).await;
        assert!(!service
            .ensure_default_admin("admin", "another-password")
            .await
            .unwrap());

        // Original password still works.
        assert!(service
            .validate_user("admin", "correct-horse")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_store_outage_is_not_invalid_credentials() {
        let service = AuthService::new(
            Arc::new(FailingRepository),
            token_service(),
            PasswordConfig::minimal(),
        )
        .unwrap();

        let result = service.authenticate(&login("admin", "pw")).await;
        assert!(matches!(result, Err(AuthError::Repository(_))));
    }
}
