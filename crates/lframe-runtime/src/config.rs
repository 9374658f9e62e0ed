#![forbid(unsafe_code)]

//! Application configuration.
//!
//! # Example
//!
//! ```
//! use lframe_runtime::AppConfig;
//!
//! let config = AppConfig::from_json_str(r#"{ "persistence_key": "todos" }"#).unwrap();
//! assert_eq!(config.container_id, "app");
//! assert_eq!(config.persistence_key.as_deref(), Some("todos"));
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::router::RouterBuilder;
use crate::storage::Storage;
use crate::store::{State, Store};

/// Settings for [`App::mount`](crate::App::mount).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// `id` of the element the app renders into.
    pub container_id: String,
    /// Path of the router's first transition.
    pub initial_path: String,
    /// Storage key for the app store; `None` keeps state in memory only.
    pub persistence_key: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            container_id: "app".to_owned(),
            initial_path: "/".to_owned(),
            persistence_key: None,
        }
    }
}

impl AppConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from JSON; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    #[must_use]
    pub fn with_container_id(mut self, id: impl Into<String>) -> Self {
        self.container_id = id.into();
        self
    }

    #[must_use]
    pub fn with_initial_path(mut self, path: impl Into<String>) -> Self {
        self.initial_path = path.into();
        self
    }

    #[must_use]
    pub fn with_persistence_key(mut self, key: impl Into<String>) -> Self {
        self.persistence_key = Some(key.into());
        self
    }

    /// Store for this app: persisted in `storage` when a persistence key is
    /// configured, in memory otherwise.
    pub fn store(&self, initial: State, storage: impl Storage + 'static) -> Store {
        match &self.persistence_key {
            Some(key) => Store::persistent(initial, key.clone(), storage),
            None => Store::new(initial),
        }
    }

    /// Router builder starting at the configured initial path and mirroring
    /// transitions into `store`.
    #[must_use]
    pub fn router(&self, store: &Store) -> RouterBuilder {
        RouterBuilder::default()
            .initial_path(self.initial_path.clone())
            .store(store.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuntimeError;
    use crate::storage::MemoryStorage;
    use serde_json::json;

    #[test]
    fn defaults() {
        let config = AppConfig::default();
        assert_eq!(config.container_id, "app");
        assert_eq!(config.initial_path, "/");
        assert_eq!(config.persistence_key, None);
        assert_eq!(AppConfig::from_json_str("{}").unwrap(), config);
    }

    #[test]
    fn builder_overrides() {
        let config = AppConfig::new()
            .with_container_id("root")
            .with_initial_path("/about")
            .with_persistence_key("k");
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(AppConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(matches!(
            AppConfig::from_json_str(r#"{"container": "x"}"#),
            Err(RuntimeError::Config(_))
        ));
    }

    #[test]
    fn store_follows_persistence_key() {
        let storage = MemoryStorage::new();
        let memory_only = AppConfig::new().store(State::new(), storage.clone());
        assert_eq!(memory_only.persistence_key(), None);

        let persisted = AppConfig::new()
            .with_persistence_key("todos")
            .store(State::new(), storage.clone());
        let _ = persisted.set_state(crate::store::state_from(json!({"nextId": 1})));
        assert!(storage.get_item("todos").unwrap().is_some());
    }

    #[test]
    fn router_starts_at_initial_path() {
        let store = Store::default();
        let router = AppConfig::new()
            .with_initial_path("/about")
            .router(&store)
            .route("/about", |_| lframe_core::VNode::text("about"))
            .build();
        assert_eq!(router.current_route().unwrap().path, "/about");
        assert_eq!(store.get("currentRoute"), Some(json!("/about")));
    }
}
