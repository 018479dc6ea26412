use axum::{
    extract::{FromRequestParts, MatchedPath, Request, State},
    http::{StatusCode, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use uuid::Uuid;

use crate::AppState;

/// AuthUser
///
/// The resolved identity of an authenticated, authorized request. Produced
/// once per request by the access gate, attached to the request extensions,
/// and consumed by handlers that want to know who is acting.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    /// The account's role label as stored. Free-form; the permission table
    /// decides what it means.
    pub role: String,
}

/// DenyReason
///
/// Why the gate refused a request. The taxonomy exists for logging and for
/// tests; externally every variant renders identically as
/// `401 "Unauthorized."` so a caller cannot tell a bad password from a
/// forbidden route. That collapse is deliberate and must not be split into
/// 401/403 responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The Authorization header was missing, not Basic, or undecodable.
    MalformedCredentials,
    /// No account matched both the username and the derived token.
    UnknownOrMismatchedAccount,
    /// The account exists but its role has no grant for (method, template).
    ForbiddenRoute,
}

impl IntoResponse for DenyReason {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, "Unauthorized.").into_response()
    }
}

/// derive_credential
///
/// The deterministic credential derivation shared by account storage and
/// login verification: `base64(username ":" password)`, standard alphabet
/// with padding.
///
/// This is an encoding, not a hash, and provides no secrecy; it is kept
/// bit-for-bit because every stored account was written with it and would
/// otherwise stop authenticating. Do not "strengthen" it here.
pub fn derive_credential(username: &str, password: &str) -> String {
    BASE64.encode(format!("{username}:{password}"))
}

/// parse_basic_credentials
///
/// Extracts (username, password) from an `Authorization: Basic <payload>`
/// header value. Returns `None` for any malformation: wrong scheme, invalid
/// base64, non-UTF-8 payload, or a payload with no `:` separator. The
/// password may legitimately contain further colons; only the first one
/// splits.
pub fn parse_basic_credentials(header_value: &str) -> Option<(String, String)> {
    let payload = header_value.strip_prefix("Basic ")?;
    let decoded = BASE64.decode(payload).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// authorize_request
///
/// The access gate. Runs once per protected request, with no cross-request
/// state, no retries, and no caching of prior decisions:
///
/// 1. Pull Basic credentials out of the Authorization header.
/// 2. Re-derive the credential token exactly as it was derived at account
///    creation time.
/// 3. Look the account up by username AND token; a store error is treated
///    the same as no match.
/// 4. Read the matched route *template* (not the resolved path) and method.
/// 5. Ask the permission table whether the account's role may perform the
///    method on that template.
pub async fn authorize_request(state: &AppState, parts: &Parts) -> Result<AuthUser, DenyReason> {
    let header_value = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(DenyReason::MalformedCredentials)?;

    let (username, password) =
        parse_basic_credentials(header_value).ok_or(DenyReason::MalformedCredentials)?;

    let token = derive_credential(&username, &password);

    let user = state
        .repo
        .find_user_by_credentials(&username, &token)
        .await
        .ok_or(DenyReason::UnknownOrMismatchedAccount)?;

    // MatchedPath is inserted by the router before route layers run, so it is
    // present for every gated route. Its absence means the request never
    // matched a registered template, which cannot carry a grant.
    let template = parts
        .extensions
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .ok_or(DenyReason::ForbiddenRoute)?;

    let method = parts.method.as_str();

    if !state.access.is_allowed(&user.role, method, &template) {
        tracing::debug!(
            role = %user.role,
            method = %method,
            template = %template,
            "route access denied"
        );
        return Err(DenyReason::ForbiddenRoute);
    }

    Ok(AuthUser {
        id: user.id,
        username: user.username,
        role: user.role,
    })
}

/// require_route_access
///
/// Middleware form of the gate, applied as a `route_layer` over every
/// protected route. On allow, the resolved `AuthUser` is inserted into the
/// request extensions for downstream handlers; on deny, the handler is never
/// reached and the client sees the single collapsed 401 response.
pub async fn require_route_access(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    // Split the request so the gate reads only its (Sync) parts; holding a
    // whole `&Request` across the lookup await would make this future non-Send,
    // since axum's request Body is not Sync. The parts are reassembled
    // unchanged before the request continues down the stack.
    let (parts, body) = request.into_parts();
    match authorize_request(&state, &parts).await {
        Ok(user) => {
            let mut request = Request::from_parts(parts, body);
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(reason) => reason.into_response(),
    }
}

/// AuthUser Extractor Implementation
///
/// Lets handlers take `AuthUser` as a plain argument. The value is the one
/// the gate stored in the request extensions; a handler reachable without the
/// gate has no identity and is rejected with 401.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}
