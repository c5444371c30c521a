use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that need no session. Registration always creates a non-admin
/// account, so nothing reachable from here grants admin access.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /register
        // Self-service account creation.
        .route("/register", post(handlers::register))
        // POST /login
        // Exchanges email + password for a bearer token.
        .route("/login", post(handlers::login))
}
