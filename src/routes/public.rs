use crate::AppState;
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints reachable without credentials. Only the liveness probe lives
/// here; it answers immediately so load balancers and monitors can verify
/// the process without holding an account.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /
        // Liveness probe. No database access, no auth.
        .route("/", get(|| async { "ok" }))
}
