use async_trait::async_trait;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use std::sync::{Arc, Mutex};
use user_portal::{
    AppState,
    access::AccessPolicy,
    auth::{AuthUser, derive_credential},
    config::AppConfig,
    handlers::{self, UserFilter},
    models::{CreateUserRequest, NewUser, UpdateUserRequest, User, UserChanges},
    repository::Repository,
};
use uuid::Uuid;

// --- MOCK REPOSITORY IMPLEMENTATION ---

// Central control point for handler-level tests: pre-canned outputs plus
// captured inputs, so each test can verify what the handler actually handed
// to the persistence layer.
pub struct MockRepoControl {
    pub user_to_return: Option<User>,
    pub delete_result: bool,
    pub name_taken: bool,

    pub captured_new_user: Mutex<Option<NewUser>>,
    pub captured_changes: Mutex<Option<UserChanges>>,
}

impl Default for MockRepoControl {
    fn default() -> Self {
        MockRepoControl {
            user_to_return: Some(User::default()),
            delete_result: true,
            name_taken: false,
            captured_new_user: Mutex::new(None),
            captured_changes: Mutex::new(None),
        }
    }
}

fn user_from(username: &str, email: &str, age: i32, role: &str) -> User {
    User {
        id: Uuid::new_v4(),
        username: username.to_string(),
        email: email.to_string(),
        age,
        role: role.to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[async_trait]
impl Repository for MockRepoControl {
    async fn find_user_by_credentials(&self, _username: &str, _credential: &str) -> Option<User> {
        self.user_to_return.clone()
    }

    async fn create_user(&self, new_user: NewUser) -> Option<User> {
        let user = user_from(&new_user.username, &new_user.email, new_user.age, &new_user.role);
        *self.captured_new_user.lock().unwrap() = Some(new_user);
        Some(user)
    }

    async fn get_user(&self, _id: Uuid) -> Option<User> {
        self.user_to_return.clone()
    }

    async fn list_users(&self, _role: Option<String>, _search: Option<String>) -> Vec<User> {
        self.user_to_return.clone().into_iter().collect()
    }

    async fn update_user(&self, _id: Uuid, changes: UserChanges) -> Option<User> {
        let user = user_from(&changes.username, &changes.email, changes.age, &changes.role);
        *self.captured_changes.lock().unwrap() = Some(changes);
        Some(user)
    }

    async fn delete_user(&self, _id: Uuid) -> bool {
        self.delete_result
    }

    async fn username_or_email_taken(&self, _username: &str, _email: &str) -> bool {
        self.name_taken
    }
}

// --- Helpers ---

fn app_state(repo: Arc<MockRepoControl>) -> AppState {
    AppState {
        repo,
        access: AccessPolicy::builtin(),
        config: AppConfig::default(),
    }
}

fn acting_admin() -> AuthUser {
    AuthUser {
        id: Uuid::new_v4(),
        username: "root".to_string(),
        role: "admin".to_string(),
    }
}

fn valid_create_payload() -> CreateUserRequest {
    CreateUserRequest {
        username: "carol".to_string(),
        email: "carol@example.com".to_string(),
        password: "carolsecret".to_string(),
        age: 28,
        role: "editor".to_string(),
    }
}

// --- create_user ---

#[tokio::test]
async fn create_rejects_empty_username() {
    let state = app_state(Arc::new(MockRepoControl::default()));
    let payload = CreateUserRequest {
        username: String::new(),
        ..valid_create_payload()
    };

    let result = handlers::create_user(acting_admin(), State(state), Json(payload)).await;
    assert_eq!(
        result.err(),
        Some((StatusCode::BAD_REQUEST, "Username is required"))
    );
}

#[tokio::test]
async fn create_rejects_negative_age() {
    let state = app_state(Arc::new(MockRepoControl::default()));
    let payload = CreateUserRequest {
        age: -1,
        ..valid_create_payload()
    };

    let result = handlers::create_user(acting_admin(), State(state), Json(payload)).await;
    assert_eq!(
        result.err(),
        Some((StatusCode::BAD_REQUEST, "Age must be a positive number"))
    );
}

#[tokio::test]
async fn create_rejects_empty_role_and_bad_email_and_short_password() {
    let state = app_state(Arc::new(MockRepoControl::default()));

    let result = handlers::create_user(
        acting_admin(),
        State(state.clone()),
        Json(CreateUserRequest {
            role: String::new(),
            ..valid_create_payload()
        }),
    )
    .await;
    assert_eq!(result.err(), Some((StatusCode::BAD_REQUEST, "Role is required")));

    let result = handlers::create_user(
        acting_admin(),
        State(state.clone()),
        Json(CreateUserRequest {
            email: "not-an-address".to_string(),
            ..valid_create_payload()
        }),
    )
    .await;
    assert_eq!(
        result.err(),
        Some((StatusCode::BAD_REQUEST, "Invalid email address"))
    );

    let result = handlers::create_user(
        acting_admin(),
        State(state),
        Json(CreateUserRequest {
            password: "short".to_string(),
            ..valid_create_payload()
        }),
    )
    .await;
    assert_eq!(
        result.err(),
        Some((StatusCode::BAD_REQUEST, "Password must be at least 8 characters"))
    );
}

#[tokio::test]
async fn create_rejects_duplicate_username_or_email() {
    let repo = Arc::new(MockRepoControl {
        name_taken: true,
        ..Default::default()
    });
    let state = app_state(repo);

    let result =
        handlers::create_user(acting_admin(), State(state), Json(valid_create_payload())).await;
    assert_eq!(
        result.err(),
        Some((StatusCode::CONFLICT, "username or email already exists"))
    );
}

#[tokio::test]
async fn create_stores_the_derived_credential() {
    let repo = Arc::new(MockRepoControl::default());
    let state = app_state(repo.clone());

    let result =
        handlers::create_user(acting_admin(), State(state), Json(valid_create_payload())).await;
    assert!(result.is_ok());

    let stored = repo.captured_new_user.lock().unwrap().clone().unwrap();
    assert_eq!(stored.username, "carol");
    assert_eq!(stored.credential, derive_credential("carol", "carolsecret"));
}

// --- get_user / list_users ---

#[tokio::test]
async fn get_user_maps_missing_rows_to_404() {
    let repo = Arc::new(MockRepoControl {
        user_to_return: None,
        ..Default::default()
    });
    let state = app_state(repo);

    let result = handlers::get_user(State(state), Path(Uuid::new_v4())).await;
    assert_eq!(result.err(), Some(StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn list_users_returns_the_repository_listing() {
    let repo = Arc::new(MockRepoControl {
        user_to_return: Some(user_from("bob", "bob@example.com", 44, "viewer")),
        ..Default::default()
    });
    let state = app_state(repo);

    let Json(users) = handlers::list_users(
        State(state),
        Query(UserFilter {
            role: None,
            search: None,
        }),
    )
    .await;
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].username, "bob");
}

// --- update_user ---

#[tokio::test]
async fn update_merges_the_partial_payload_with_the_current_record() {
    let current = user_from("olduser", "old@example.com", 50, "editor");
    let repo = Arc::new(MockRepoControl {
        user_to_return: Some(current.clone()),
        ..Default::default()
    });
    let state = app_state(repo.clone());

    let payload = UpdateUserRequest {
        username: None,
        email: Some("new@example.com".to_string()),
        age: None,
        role: None,
        password: "freshsecret".to_string(),
    };

    let result =
        handlers::update_user(acting_admin(), State(state), Path(current.id), Json(payload)).await;
    assert!(result.is_ok());

    let changes = repo.captured_changes.lock().unwrap().clone().unwrap();
    // Untouched fields come from the current record.
    assert_eq!(changes.username, "olduser");
    assert_eq!(changes.age, 50);
    assert_eq!(changes.role, "editor");
    // Provided fields replace them.
    assert_eq!(changes.email, "new@example.com");
    // The credential is re-derived from the effective username + new password.
    assert_eq!(changes.credential, derive_credential("olduser", "freshsecret"));
}

#[tokio::test]
async fn update_rejects_a_short_password_before_touching_the_store() {
    let state = app_state(Arc::new(MockRepoControl::default()));
    let payload = UpdateUserRequest {
        username: None,
        email: None,
        age: None,
        role: None,
        password: "short".to_string(),
    };

    let result =
        handlers::update_user(acting_admin(), State(state), Path(Uuid::new_v4()), Json(payload))
            .await;
    assert_eq!(
        result.err(),
        Some((StatusCode::BAD_REQUEST, "Password must be at least 8 characters"))
    );
}

#[tokio::test]
async fn update_maps_missing_rows_to_404() {
    let repo = Arc::new(MockRepoControl {
        user_to_return: None,
        ..Default::default()
    });
    let state = app_state(repo);

    let payload = UpdateUserRequest {
        username: None,
        email: None,
        age: None,
        role: None,
        password: "longenough".to_string(),
    };

    let result =
        handlers::update_user(acting_admin(), State(state), Path(Uuid::new_v4()), Json(payload))
            .await;
    assert_eq!(result.err(), Some((StatusCode::NOT_FOUND, "user not found")));
}

// --- delete_user ---

#[tokio::test]
async fn delete_returns_204_when_a_row_was_removed() {
    let state = app_state(Arc::new(MockRepoControl::default()));
    let status = handlers::delete_user(acting_admin(), State(state), Path(Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn delete_returns_404_when_nothing_matched() {
    let repo = Arc::new(MockRepoControl {
        delete_result: false,
        ..Default::default()
    });
    let state = app_state(repo);

    let status = handlers::delete_user(acting_admin(), State(state), Path(Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
