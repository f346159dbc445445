//! API route definitions

use crate::auth::{auth_middleware, require_role, ADMIN_ROLE};
use crate::handlers::{auth, health, tags};
use crate::state::AppState;
use axum::{
    extract::Request,
    middleware::{self, Next},
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;

/// Create API v1 routes
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/refresh", post(auth::refresh_handler))
        .route("/tags", get(tags::list_tags))
        .route("/tags/:id", get(tags::get_tag));

    // Admin writes; the role check runs after the gate
    let admin_routes = Router::new()
        .route("/tags", post(tags::create_tag))
        .route("/tags/:id", patch(tags::update_tag).delete(tags::delete_tag))
        .layer(middleware::from_fn(|request: Request, next: Next| {
            require_role(ADMIN_ROLE, request, next)
        }));

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .merge(admin_routes)
        .layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new().merge(public_routes).merge(protected_routes)
}
