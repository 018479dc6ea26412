use crate::models::{NewUser, User, UserChanges};
use async_trait::async_trait;
use sqlx::{PgPool, query_builder::QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// The abstract contract for all persistence operations, letting the gate
/// and the handlers talk to the data layer without knowing whether it is
/// Postgres or a test mock.
///
/// **Send + Sync + async_trait** make the trait object (`Arc<dyn
/// Repository>`) shareable across axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Identity lookup for the access gate: both the username and the
    /// derived credential token must match one stored account exactly.
    /// Implementations must not reveal which of the two mismatched.
    async fn find_user_by_credentials(&self, username: &str, credential: &str) -> Option<User>;

    // --- CRUD ---
    async fn create_user(&self, new_user: NewUser) -> Option<User>;
    async fn get_user(&self, id: Uuid) -> Option<User>;
    // Listing with optional role filter and username/email search.
    async fn list_users(&self, role: Option<String>, search: Option<String>) -> Vec<User>;
    // All fields concrete; the handler has already merged the partial payload.
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Option<User>;
    // Hard delete. Returns true iff a row was removed.
    async fn delete_user(&self, id: Uuid) -> bool;

    /// Uniqueness probe run before insert.
    async fn username_or_email_taken(&self, username: &str, email: &str) -> bool;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL. The pool is created
/// by the application bootstrap and handed in; there is no global connection
/// state anywhere in the crate.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Column list shared by every query that returns a User. The credential
// column is deliberately absent.
const USER_COLUMNS: &str = "id, username, email, age, role, created_at, updated_at";

#[async_trait]
impl Repository for PostgresRepository {
    /// find_user_by_credentials
    ///
    /// The WHERE clause matches both fields in one query so a username hit
    /// with a credential miss is indistinguishable from no user at all.
    /// Database errors are logged and collapse to `None`; the gate treats
    /// that identically to "not found".
    async fn find_user_by_credentials(&self, username: &str, credential: &str) -> Option<User> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 AND credential = $2"
        ))
        .bind(username)
        .bind(credential)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("find_user_by_credentials error: {:?}", e);
            None
        })
    }

    async fn create_user(&self, new_user: NewUser) -> Option<User> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, username, email, age, role, credential, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW()) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(new_user.username)
        .bind(new_user.email)
        .bind(new_user.age)
        .bind(new_user.role)
        .bind(new_user.credential)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("create_user error: {:?}", e);
            None
        })
    }

    async fn get_user(&self, id: Uuid) -> Option<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_user error: {:?}", e);
                None
            })
    }

    /// list_users
    ///
    /// Flexible filtering via QueryBuilder so every user-supplied value is
    /// bound, never interpolated.
    async fn list_users(&self, role: Option<String>, search: Option<String>) -> Vec<User> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
            "SELECT {USER_COLUMNS} FROM users WHERE true"
        ));

        if let Some(r) = role {
            builder.push(" AND role = ");
            builder.push_bind(r);
        }

        if let Some(s) = search {
            // Case-insensitive match across username and email.
            let pattern = format!("%{}%", s);
            builder.push(" AND (username ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR email ILIKE ");
            builder.push_bind(pattern);
            builder.push(")");
        }

        builder.push(" ORDER BY created_at DESC");

        match builder.build_query_as::<User>().fetch_all(&self.pool).await {
            Ok(users) => users,
            Err(e) => {
                tracing::error!("list_users error: {:?}", e);
                vec![]
            }
        }
    }

    /// update_user
    ///
    /// Rewrites the full record, credential included: the token is derived
    /// from username + password, so the handler re-derives it on every
    /// update and the row must never carry a stale one.
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Option<User> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users \
             SET username = $2, email = $3, age = $4, role = $5, credential = $6, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.username)
        .bind(changes.email)
        .bind(changes.age)
        .bind(changes.role)
        .bind(changes.credential)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("update_user error: {:?}", e);
            None
        })
    }

    /// delete_user
    ///
    /// Hard delete; no tombstone is retained.
    async fn delete_user(&self, id: Uuid) -> bool {
        match sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_user error: {:?}", e);
                false
            }
        }
    }

    async fn username_or_email_taken(&self, username: &str, email: &str) -> bool {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 OR email = $2)",
        )
        .bind(username)
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("username_or_email_taken error: {:?}", e);
            // On a store error, claim the name is taken so the insert is
            // refused rather than attempted against a failing database.
            true
        })
    }
}
