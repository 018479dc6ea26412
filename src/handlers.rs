use crate::{
    AppState,
    auth::{AuthUser, derive_credential},
    models::{self, CreateUserRequest, UpdateUserRequest, User, UserChanges, is_valid_email},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

/// Validation failures carry the short plain-text messages the original
/// service returned alongside a 400.
type ValidationError = (StatusCode, &'static str);

// --- Filter Structs ---

/// UserFilter
///
/// Accepted query parameters for the listing endpoint (GET /users).
#[derive(Deserialize, utoipa::IntoParams)]
pub struct UserFilter {
    /// Restrict the listing to accounts holding this role.
    pub role: Option<String>,
    /// Substring match over username and email.
    pub search: Option<String>,
}

// --- Handlers ---

/// create_user
///
/// [Protected Route] Creates a new account. The stored credential token is
/// derived from the submitted username and password with the same derivation
/// the gate uses at login, which is what makes a freshly created account
/// able to authenticate.
#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "Created", body = User),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "Username or email already exists")
    )
)]
pub async fn create_user(
    AuthUser { username: actor, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<Json<User>, ValidationError> {
    validate_create(&payload)?;

    if state
        .repo
        .username_or_email_taken(&payload.username, &payload.email)
        .await
    {
        return Err((StatusCode::CONFLICT, "username or email already exists"));
    }

    let credential = derive_credential(&payload.username, &payload.password);

    let new_user = models::NewUser {
        username: payload.username,
        email: payload.email,
        age: payload.age,
        role: payload.role,
        credential,
    };

    match state.repo.create_user(new_user).await {
        Some(user) => {
            tracing::info!(actor = %actor, username = %user.username, "user created");
            Ok(Json(user))
        }
        None => Err((StatusCode::INTERNAL_SERVER_ERROR, "failed to create user")),
    }
}

/// get_user
///
/// [Protected Route] Retrieves a single account by ID.
#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Found", body = User),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, StatusCode> {
    match state.repo.get_user(id).await {
        Some(user) => Ok(Json(user)),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// list_users
///
/// [Protected Route] Lists accounts with optional role and search filters.
#[utoipa::path(
    get,
    path = "/users",
    params(UserFilter),
    responses((status = 200, description = "List users", body = [User]))
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(filter): Query<UserFilter>,
) -> Json<Vec<User>> {
    let users = state.repo.list_users(filter.role, filter.search).await;
    Json(users)
}

/// update_user
///
/// [Protected Route] Updates an account. The partial payload is merged with
/// the current record, and the stored credential token is re-derived from
/// the effective username plus the submitted password so the row never
/// carries a token that no longer matches its username.
#[utoipa::path(
    put,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = User),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_user(
    AuthUser { username: actor, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<User>, ValidationError> {
    validate_update(&payload)?;

    let current = state
        .repo
        .get_user(id)
        .await
        .ok_or((StatusCode::NOT_FOUND, "user not found"))?;

    let username = payload.username.unwrap_or(current.username);
    let credential = derive_credential(&username, &payload.password);

    let changes = UserChanges {
        username,
        email: payload.email.unwrap_or(current.email),
        age: payload.age.unwrap_or(current.age),
        role: payload.role.unwrap_or(current.role),
        credential,
    };

    match state.repo.update_user(id, changes).await {
        Some(user) => {
            tracing::info!(actor = %actor, username = %user.username, "user updated");
            Ok(Json(user))
        }
        None => Err((StatusCode::NOT_FOUND, "user not found")),
    }
}

/// delete_user
///
/// [Protected Route] Permanently removes an account. There is no soft-delete
/// path; a deleted user stops authenticating immediately.
#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_user(
    AuthUser { username: actor, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> StatusCode {
    if state.repo.delete_user(id).await {
        tracing::info!(actor = %actor, user_id = %id, "user deleted");
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

// --- Payload validation ---

fn validate_create(payload: &CreateUserRequest) -> Result<(), ValidationError> {
    if payload.username.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Username is required"));
    }
    if payload.age < 0 {
        return Err((StatusCode::BAD_REQUEST, "Age must be a positive number"));
    }
    if payload.role.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Role is required"));
    }
    if !is_valid_email(&payload.email) {
        return Err((StatusCode::BAD_REQUEST, "Invalid email address"));
    }
    if payload.password.len() < 8 {
        return Err((
            StatusCode::BAD_REQUEST,
            "Password must be at least 8 characters",
        ));
    }
    Ok(())
}

fn validate_update(payload: &UpdateUserRequest) -> Result<(), ValidationError> {
    if payload.username.as_deref() == Some("") {
        return Err((StatusCode::BAD_REQUEST, "Username is required"));
    }
    if payload.age.is_some_and(|age| age < 0) {
        return Err((StatusCode::BAD_REQUEST, "Age must be a positive number"));
    }
    if payload.role.as_deref() == Some("") {
        return Err((StatusCode::BAD_REQUEST, "Role is required"));
    }
    if let Some(email) = payload.email.as_deref() {
        if !is_valid_email(email) {
            return Err((StatusCode::BAD_REQUEST, "Invalid email address"));
        }
    }
    if payload.password.len() < 8 {
        return Err((
            StatusCode::BAD_REQUEST,
            "Password must be at least 8 characters",
        ));
    }
    Ok(())
}
