use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// User Router Module
///
/// The CRUD surface for the user resource. The templates registered here are
/// the exact strings the permission table enumerates; the gate compares the
/// request's `MatchedPath` against the table, so a renamed route silently
/// loses its grants.
///
/// Access Control Strategy:
/// This router carries no role logic of its own. It must be wrapped in the
/// `require_route_access` route layer (see `create_router`), which
/// authenticates the Basic credentials and checks the role's grant for
/// (method, template) before any handler runs.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        // POST /users — create an account.
        // GET /users — list accounts (admin and editor only, per the table).
        .route(
            "/users",
            post(handlers::create_user).get(handlers::list_users),
        )
        // GET/PUT/DELETE /users/{id} — fetch, update, remove one account.
        .route(
            "/users/{id}",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
}
