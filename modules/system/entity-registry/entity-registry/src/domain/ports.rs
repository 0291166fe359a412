//! Output ports (interfaces) consumed by the registry.
//!
//! Every collaborator is handed to `EntityRegistryService` explicitly;
//! the registry never looks anything up from ambient state.

use std::collections::{BTreeMap, BTreeSet};

use entity_registry_sdk::CallerId;
use serde::{Deserialize, Serialize};

use super::error::{CacheError, IntrospectionError, RightsStorageError};

/// A loadable type and the path it is declared under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCandidate {
    pub type_name: String,
    pub declaring_path: String,
}

impl TypeCandidate {
    #[must_use]
    pub fn new(type_name: impl Into<String>, declaring_path: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            declaring_path: declaring_path.into(),
        }
    }
}

/// Supplies the full set of loadable types of the host and its plugins.
pub trait TypeUniverseSource: Send + Sync {
    fn all_candidate_types(&self) -> Vec<TypeCandidate>;
}

/// Answers structural questions about a type.
pub trait TypeIntrospector: Send + Sync {
    /// Direct parent type, `None` for a root type.
    ///
    /// # Errors
    ///
    /// Returns an error if the type cannot be loaded.
    fn parent_of(&self, type_name: &str) -> Result<Option<String>, IntrospectionError>;

    /// # Errors
    ///
    /// Returns an error if the type cannot be loaded.
    fn is_abstract(&self, type_name: &str) -> Result<bool, IntrospectionError>;

    /// Capability tags declared directly on the type, not inherited ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the type cannot be loaded.
    fn capability_tags_of(&self, type_name: &str) -> Result<BTreeSet<String>, IntrospectionError>;

    /// # Errors
    ///
    /// Returns an error if the type cannot be loaded.
    fn has_marker(&self, type_name: &str, marker: &str) -> Result<bool, IntrospectionError>;

    /// Value of a constant declared on the type or inherited from a parent.
    ///
    /// # Errors
    ///
    /// Returns an error if the type cannot be loaded.
    fn constant_of(
        &self,
        type_name: &str,
        name: &str,
    ) -> Result<Option<serde_json::Value>, IntrospectionError>;
}

/// Whether a grant row allows or denies its verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantEffect {
    Allow,
    Deny,
}

/// A persisted permission row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantRow {
    pub caller: CallerId,
    /// Entity identifier the row applies to.
    pub subject: String,
    pub verb: String,
    pub effect: GrantEffect,
}

/// Storage of persisted grants and their reduction rule.
pub trait RightsStorage: Send + Sync {
    /// Rows of `caller` applying to any of `subjects`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be queried.
    fn find_grants(
        &self,
        caller: CallerId,
        subjects: &[String],
    ) -> Result<Vec<GrantRow>, RightsStorageError>;

    /// Reduces rows to the effective rights per subject identifier.
    fn reduce_effective_rights(&self, rows: &[GrantRow]) -> BTreeMap<String, BTreeSet<String>>;
}

/// Key-value store holding all derived registry state.
pub trait CacheBackend: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError>;

    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set(&self, key: &str, value: serde_json::Value) -> Result<(), CacheError>;

    /// Writes several entries. Backends supporting transactions must apply
    /// them atomically; the default writes them one by one, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set_many(&self, entries: Vec<(String, serde_json::Value)>) -> Result<(), CacheError> {
        for (key, value) in entries {
            self.set(&key, value)?;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn has(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.get(key)?.is_some())
    }

    /// # Errors
    ///
    /// Returns an error if the backend cannot be cleared.
    fn clear(&self) -> Result<(), CacheError>;
}

/// Listener of registry invalidation, e.g. a menu layout cache.
pub trait RegistryListener: Send + Sync {
    /// Called synchronously before the registry cache is cleared.
    fn on_registry_cleared(&self);
}

/// Source of per-field form and search metadata for an entity type.
pub trait FieldProvider: Send + Sync {
    fn fields_of(&self, identifier: &str, type_name: &str) -> Vec<serde_json::Value>;
}
