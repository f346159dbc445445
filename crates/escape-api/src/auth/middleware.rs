/// Access gate for protected routes
///
/// Reads the bearer token from the Authorization header, verifies it in the
/// access domain and attaches the caller's identity to the request.
use super::error::AuthError;
use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use escape_core::AccessClaims;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Identity attached to request extensions by [`auth_middleware`]
///
/// Extract it in handlers with `Extension<AuthenticatedUser>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    /// Subject claim (user id)
    pub user_id: String,
    pub username: String,
    pub roles: Vec<String>,
    /// Issued-at, seconds since the epoch
    pub issued_at: u64,
    /// Expiry, seconds since the epoch
    pub expires_at: u64,
}

impl AuthenticatedUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(super::models::ADMIN_ROLE)
    }
}

impl From<AccessClaims> for AuthenticatedUser {
    fn from(claims: AccessClaims) -> Self {
        Self {
            user_id: claims.sub,
            username: claims.username,
            roles: claims.roles,
            issued_at: claims.iat,
            expires_at: claims.exp,
        }
    }
}

/// Extract the credential from `Authorization: Bearer <token>`
///
/// The header is split on its first space; the scheme must be exactly
/// `Bearer` and a non-empty credential must follow.
pub fn parse_bearer(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthFormat)?;

    match value.split_once(' ') {
        Some(("Bearer", token)) if !token.is_empty() => Ok(token),
        _ => Err(AuthError::InvalidAuthFormat),
    }
}

/// Authentication middleware that requires a valid access token
///
/// ```ignore
/// let protected = Router::new()
///     .route("/auth/me", get(me_handler))
///     .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));
/// ```
///
/// Header format problems are rejected before any token verification.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let verified = {
        let token = parse_bearer(request.headers())?;
        state.tokens.verify_access_token(token)
    };

    let claims = match verified {
        Ok(claims) => claims,
        Err(e) => {
            audit_log(&AuditEvent::InvalidToken {
                reason: e.to_string(),
                ip_address: extract_ip_address(request.headers()),
                user_agent: extract_user_agent(request.headers()),
            });
            return Err(e.into());
        }
    };

    tracing::debug!(username = %claims.username, "request authenticated");
    request
        .extensions_mut()
        .insert(AuthenticatedUser::from(claims));

    Ok(next.run(request).await)
}

/// Role check layered after [`auth_middleware`]
///
/// ```ignore
/// .layer(middleware::from_fn(|req: Request, next: Next| {
///     require_role(ADMIN_ROLE, req, next)
/// }))
/// ```
pub async fn require_role(
    role: &'static str,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    // A missing identity means the gate did not run; treat it as unauthenticated.
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or(AuthError::MissingAuthHeader)?;

    if !user.has_role(role) {
        audit_log(&AuditEvent::AccessDenied {
            username: user.username.clone(),
            required_role: role.to_string(),
            ip_address: extract_ip_address(request.headers()),
        });
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}
