//! Authentication API handlers
//!
//! Login and refresh are public; `/auth/me` sits behind the access gate.

use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::auth::{
    AuthError, AuthenticatedUser, LoginRequest, LoginResponse, RefreshRequest, RefreshResponse,
};
use crate::state::AppState;
use axum::{extract::State, http::HeaderMap, Extension, Json};
use std::sync::Arc;

/// Login with username and password
///
/// * `200 OK` - `{access_token, refresh_token, username}`
/// * `400 Bad Request` - Empty username or password
/// * `401 Unauthorized` - Invalid credentials
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    match state.auth.authenticate(&request).await {
        Ok(response) => {
            audit_log(&AuditEvent::LoginSuccess {
                username: response.username.clone(),
                ip_address: extract_ip_address(&headers),
                user_agent: extract_user_agent(&headers),
            });
            Ok(Json(response))
        }
        Err(e) => {
            if matches!(e, AuthError::InvalidCredentials) {
                audit_log(&AuditEvent::LoginFailure {
                    username: request.username,
                    reason: e.to_string(),
                    ip_address: extract_ip_address(&headers),
                    user_agent: extract_user_agent(&headers),
                });
            }
            Err(e)
        }
    }
}

/// Exchange a refresh token for a new access token
///
/// * `200 OK` - `{access_token, username}`
/// * `401 Unauthorized` - Malformed, tampered or expired token, or the user is gone
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, AuthError> {
    match state.auth.refresh_access_token(&request.refresh_token).await {
        Ok(response) => {
            audit_log(&AuditEvent::TokenRefresh {
                username: response.username.clone(),
                ip_address: extract_ip_address(&headers),
            });
            Ok(Json(response))
        }
        Err(e) => {
            if e.status() == axum::http::StatusCode::UNAUTHORIZED {
                audit_log(&AuditEvent::RefreshFailure {
                    reason: e.to_string(),
                    ip_address: extract_ip_address(&headers),
                });
            }
            Err(e)
        }
    }
}

/// Identity attached by the access gate
pub async fn me_handler(Extension(user): Extension<AuthenticatedUser>) -> Json<AuthenticatedUser> {
    Json(user)
}
