use std::collections::HashMap;
use std::sync::Arc;

/// Grants
///
/// The raw permission data: role name, then HTTP method (uppercase), then the
/// list of route templates that (role, method) pair may invoke. Kept as a
/// plain deserializable map so the builtin table below can later be replaced
/// by an external config source without any change to the gate.
pub type Grants = HashMap<String, HashMap<String, Vec<String>>>;

/// AccessPolicy
///
/// The static role → method → route-template permission table consulted by
/// the access gate on every protected request.
///
/// The table is built once at startup and is read-only afterwards; it is
/// shared across request tasks behind an `Arc`, so lookups need no locking.
/// Lookups are deny-by-default: an unknown role, an unused method, or a
/// template not enumerated for the pair all yield `false`, never an error.
#[derive(Clone, Debug)]
pub struct AccessPolicy {
    grants: Arc<Grants>,
}

impl AccessPolicy {
    /// Wraps an externally supplied grant map (e.g. deserialized from a
    /// config file) into a policy.
    pub fn from_grants(grants: Grants) -> Self {
        Self {
            grants: Arc::new(grants),
        }
    }

    /// builtin
    ///
    /// The shipped permission table for the user CRUD surface.
    ///
    /// Method keys are uppercase to match what axum's router reports for
    /// standard methods; templates must be written exactly as registered
    /// with the router (`/users/{id}`, not a resolved path).
    pub fn builtin() -> Self {
        let mut grants: Grants = HashMap::new();

        grants.insert(
            "admin".to_string(),
            HashMap::from([
                (
                    "GET".to_string(),
                    vec!["/users".to_string(), "/users/{id}".to_string()],
                ),
                ("POST".to_string(), vec!["/users".to_string()]),
                ("PUT".to_string(), vec!["/users/{id}".to_string()]),
                ("DELETE".to_string(), vec!["/users/{id}".to_string()]),
            ]),
        );

        grants.insert(
            "editor".to_string(),
            HashMap::from([
                (
                    "GET".to_string(),
                    vec!["/users".to_string(), "/users/{id}".to_string()],
                ),
                ("PUT".to_string(), vec!["/users/{id}".to_string()]),
            ]),
        );

        grants.insert(
            "viewer".to_string(),
            HashMap::from([("GET".to_string(), vec!["/users/{id}".to_string()])]),
        );

        Self::from_grants(grants)
    }

    /// is_allowed
    ///
    /// Answers "may `role` perform `method` on the route registered as
    /// `template`?" by exact string equality against the enumerated
    /// templates. There is no prefix, wildcard, or trailing-slash tolerance:
    /// `/users` and `/users/{id}` are unrelated entries.
    pub fn is_allowed(&self, role: &str, method: &str, template: &str) -> bool {
        self.grants
            .get(role)
            .and_then(|methods| methods.get(method))
            .map(|templates| templates.iter().any(|t| t == template))
            .unwrap_or(false)
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::builtin()
    }
}
