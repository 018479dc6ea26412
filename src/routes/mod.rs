/// Router Module Index
///
/// Splits the routing surface by access requirements so the gate is applied
/// explicitly at the module level (via an axum `route_layer`) and a route
/// cannot drift out from under it unnoticed.

/// Routes accessible without credentials (liveness probe).
pub mod public;

/// The user CRUD surface. Every route here sits behind the
/// `require_route_access` gate; the permission table decides, per role and
/// method, which templates are reachable.
pub mod users;
