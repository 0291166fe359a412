//! `EntityRegistryClient` trait definition.
//!
//! This trait defines the public API for the `entity-registry` module.
//! Menu builders, export services and form renderers consume the registry
//! through it, by identifier, without knowing concrete type names.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;

use crate::error::EntityRegistryError;
use crate::models::{CallerId, Manifest, Metadata, RightsManifest, Subject, Vote};

/// Public API trait for the `entity-registry` module.
///
/// Other modules depend on it as `Arc<dyn EntityRegistryClient>`:
/// ```ignore
/// let metadata = registry.get_metadata("InventoryServer").await?;
/// ```
#[async_trait]
pub trait EntityRegistryClient: Send + Sync {
    /// Returns the manifest, building it on a cold cache.
    ///
    /// Never fails: a cache backend error yields an empty manifest.
    async fn get_manifest(&self) -> Manifest;

    /// Returns the rights manifest. Empty on cache backend errors.
    async fn get_all_rights(&self) -> RightsManifest;

    /// Resolves an entity identifier to its currently active type name.
    ///
    /// # Errors
    ///
    /// * `UnknownIdentifier` - If the identifier is not a registered entity
    async fn get_entity_from_identifier(
        &self,
        identifier: &str,
    ) -> Result<String, EntityRegistryError>;

    /// Resolves a module identifier to its type name.
    ///
    /// # Errors
    ///
    /// * `UnknownIdentifier` - If the identifier is not a registered module
    async fn get_module_from_identifier(
        &self,
        identifier: &str,
    ) -> Result<String, EntityRegistryError>;

    /// Derives the entity identifier of a type name without consulting the manifest.
    ///
    /// # Errors
    ///
    /// * `MalformedTypePlacement` - If the type name has no entity namespace shape
    async fn get_entity_identifier(&self, type_name: &str) -> Result<String, EntityRegistryError>;

    /// Derives the module identifier of a module type name.
    ///
    /// # Errors
    ///
    /// * `MalformedTypePlacement` - If the type name has no module namespace shape
    async fn get_module_identifier(&self, type_name: &str) -> Result<String, EntityRegistryError>;

    /// Returns the metadata record stored for an identifier.
    ///
    /// # Errors
    ///
    /// * `UnknownIdentifier` - If no record is stored for the identifier,
    ///   even when the manifest lists it
    async fn get_metadata(&self, identifier: &str) -> Result<Metadata, EntityRegistryError>;

    /// Returns the type currently active for `type_name`, following plugin
    /// overrides. Unregistered types are returned unchanged.
    async fn get_runtime_entity_class(&self, type_name: &str) -> String;

    /// Registers an entity type outside the discovered source roots and
    /// returns its identifier.
    ///
    /// # Errors
    ///
    /// * `RegistrationRejected` - If validation or the override rules refuse the type
    /// * `MalformedTypePlacement` - If the type name has no entity namespace shape
    async fn register_entity(&self, type_name: &str) -> Result<String, EntityRegistryError>;

    /// Registers a module type outside the discovered source roots and
    /// returns its identifier.
    ///
    /// # Errors
    ///
    /// * `RegistrationRejected` - If the type is not a concrete module
    async fn register_module(&self, type_name: &str) -> Result<String, EntityRegistryError>;

    /// Returns the identifiers of every entity that lists `type_name` among
    /// its mapped superclasses.
    async fn get_child_entities_for_mapped_superclass(&self, type_name: &str) -> Vec<String>;

    /// Returns the basic rights vocabulary of an entity, following rights inheritance.
    ///
    /// # Errors
    ///
    /// * `UnknownIdentifier` - If the entity or its rights holder is not registered
    async fn get_entity_rights(
        &self,
        identifier: &str,
    ) -> Result<BTreeSet<String>, EntityRegistryError>;

    /// Returns the effective rights `caller` holds over `subject`.
    /// Empty when the subject cannot be resolved.
    async fn get_effective_rights(&self, subject: &Subject, caller: CallerId) -> BTreeSet<String>;

    /// Returns `true` if the voter takes part in deciding `action` on `subject`.
    async fn supports(&self, action: &str, subject: &Subject) -> bool;

    /// Decides whether `caller` may perform `action` on `subject`.
    async fn vote(&self, action: &str, subject: &Subject, caller: CallerId) -> Vote;

    /// Invalidates all cached registry state. Returns `false` on backend failure.
    async fn clear(&self) -> bool;

    /// Returns the entity identifiers of a module, in registration order.
    ///
    /// # Errors
    ///
    /// * `UnknownIdentifier` - If the module is not registered
    async fn get_module_entities(&self, module: &str) -> Result<Vec<String>, EntityRegistryError>;

    /// Returns the entities of a module that get their own menu item.
    ///
    /// # Errors
    ///
    /// * `UnknownIdentifier` - If the module is not registered
    async fn get_menu_entities(&self, module: &str) -> Result<Vec<String>, EntityRegistryError>;

    /// Returns settings group names mapped to the identifiers of their entities.
    async fn get_settings_groups(
        &self,
    ) -> Result<BTreeMap<String, Vec<String>>, EntityRegistryError>;

    /// Returns field metadata of an entity. Empty when no field provider is configured.
    ///
    /// # Errors
    ///
    /// * `UnknownIdentifier` - If the entity is not registered
    async fn get_fields(
        &self,
        identifier: &str,
    ) -> Result<Vec<serde_json::Value>, EntityRegistryError>;
}
