use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// The canonical account record from the `users` table, as exposed by the
/// API. The stored credential token is intentionally NOT a field here: the
/// repository never selects it except to match it inside the login query, so
/// it cannot leak into a serialized response.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub age: i32,
    // The RBAC field. Free-form; unknown values simply hold no grants.
    pub role: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// CreateUserRequest
///
/// Input payload for POST /users. The password is consumed to derive the
/// stored credential token and is never persisted or echoed back.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub age: i32,
    pub role: String,
}

/// UpdateUserRequest
///
/// Partial update payload for PUT /users/{id}. All identity fields are
/// optional; `password` is required because the stored credential token is
/// re-derived from the effective username plus this password on every
/// update.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    pub password: String,
}

// --- Repository Inputs (Internal) ---

/// NewUser
///
/// Fully resolved insert payload handed to the repository: validation has
/// passed and the credential token is already derived.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub age: i32,
    pub role: String,
    pub credential: String,
}

/// UserChanges
///
/// Fully resolved update payload: the handler has merged the request with
/// the current record, so every field is concrete by the time it reaches the
/// repository.
#[derive(Debug, Clone)]
pub struct UserChanges {
    pub username: String,
    pub email: String,
    pub age: i32,
    pub role: String,
    pub credential: String,
}

/// is_valid_email
///
/// Minimal address check matching what the original service accepted: a
/// non-empty local part and a non-empty domain around a single leading `@`
/// split. Not an RFC validator.
pub fn is_valid_email(address: &str) -> bool {
    match address.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}
