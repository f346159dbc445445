//! Security audit logging for authentication events
//!
//! Every event is emitted at INFO level on the `"audit"` tracing target so it
//! can be filtered and routed apart from application logs. Events never carry
//! passwords or token material.
//!
//! ```ignore
//! use escape_api::audit::{audit_log, AuditEvent};
//!
//! audit_log(&AuditEvent::LoginSuccess {
//!     username: "admin".to_string(),
//!     ip_address: Some("192.168.1.1".to_string()),
//!     user_agent: None,
//! });
//! ```

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Security audit events for authentication and authorization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    LoginSuccess {
        username: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Failed login; `reason` is for operators, the client only sees "Invalid credentials"
    LoginFailure {
        username: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    TokenRefresh {
        username: String,
        ip_address: Option<String>,
    },

    RefreshFailure {
        reason: String,
        ip_address: Option<String>,
    },

    /// Token rejected at the access gate
    InvalidToken {
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    AccessDenied {
        username: String,
        required_role: String,
        ip_address: Option<String>,
    },

    /// Default admin account provisioned on startup
    AdminBootstrapped { username: String },
}

impl AuditEvent {
    fn summary(&self) -> &'static str {
        match self {
            AuditEvent::LoginSuccess { .. } => "Login successful",
            AuditEvent::LoginFailure { .. } => "Login failed",
            AuditEvent::TokenRefresh { .. } => "Token refresh",
            AuditEvent::RefreshFailure { .. } => "Token refresh failed",
            AuditEvent::InvalidToken { .. } => "Invalid token",
            AuditEvent::AccessDenied { .. } => "Access denied",
            AuditEvent::AdminBootstrapped { .. } => "Default admin created",
        }
    }
}

/// Log a security audit event
///
/// The whole event is attached as a JSON field for log aggregators, next to
/// a short human-readable summary.
pub fn audit_log(event: &AuditEvent) {
    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    info!(target: "audit", event = %event_json, "{}", event.summary());
}

/// Client IP from `X-Forwarded-For` (first hop) or `X-Real-IP`
pub fn extract_ip_address(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|chain| chain.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty());

    forwarded.or_else(|| {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(|ip| ip.to_string())
    })
}

pub fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .map(|s| s.to_string())
}
