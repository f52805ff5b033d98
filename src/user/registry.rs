use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// A registered player identity. Created once on registration and kept for
/// the process lifetime; there is no deletion path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    pub display_name: String,
}

/// Issues and looks up player identities. Injected as a trait object so
/// the router never touches a concrete store directly.
#[async_trait]
pub trait UserRegistry: Send + Sync {
    /// Registers a new user under a fresh opaque id.
    async fn create(&self, display_name: &str) -> User;

    /// Looks up a user by id.
    async fn get(&self, user_id: &str) -> Option<User>;
}

/// In-memory implementation backed by an id -> user map.
pub struct InMemoryUserRegistry {
    users: RwLock<HashMap<String, User>>,
}

impl Default for InMemoryUserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserRegistry {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl UserRegistry for InMemoryUserRegistry {
    async fn create(&self, display_name: &str) -> User {
        let user = User {
            user_id: Uuid::new_v4().to_string(),
            display_name: display_name.to_string(),
        };

        let mut users = self.users.write().await;
        users.insert(user.user_id.clone(), user.clone());

        info!(
            user_id = %user.user_id,
            display_name = %user.display_name,
            "Registered new user"
        );
        user
    }

    async fn get(&self, user_id: &str) -> Option<User> {
        let users = self.users.read().await;
        let result = users.get(user_id).cloned();

        debug!(user_id = %user_id, found = result.is_some(), "User lookup");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_lookup_user() {
        let registry = InMemoryUserRegistry::new();

        let user = registry.create("alice").await;
        assert_eq!(user.display_name, "alice");
        assert!(!user.user_id.is_empty());

        let found = registry.get(&user.user_id).await.unwrap();
        assert_eq!(found, user);
    }

    #[tokio::test]
    async fn test_lookup_unknown_user() {
        let registry = InMemoryUserRegistry::new();
        assert!(registry.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_ids_are_unique_for_same_name() {
        let registry = InMemoryUserRegistry::new();
        let first = registry.create("alice").await;
        let second = registry.create("alice").await;
        assert_ne!(first.user_id, second.user_id);
    }
}
