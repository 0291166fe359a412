//! Read view over one cache generation.
//!
//! A snapshot owns the manifest it was opened with; a concurrent clear does
//! not change what an in-flight read sees from the manifest. Per-identifier
//! records are still read from the backend on demand.

use std::collections::HashSet;

use entity_registry_sdk::{EntityRecord, Manifest, ModuleRecord, RightsManifest, Subject};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::builder::RegistryState;
use super::error::DomainError;
use super::identifier::{EntityPlacement, IdentifierResolver};
use super::ports::CacheBackend;

/// Cache keys of the registry.
pub mod keys {
    pub const MANIFEST: &str = "manifest";
    pub const RIGHTS_MANIFEST: &str = "rights_manifest";

    #[must_use]
    pub fn entity(identifier: &str) -> String {
        format!("entity.{identifier}")
    }

    #[must_use]
    pub fn module(identifier: &str) -> String {
        format!("module.{identifier}")
    }
}

fn encode<T: Serialize>(key: &str, value: &T) -> Result<serde_json::Value, DomainError> {
    serde_json::to_value(value).map_err(|source| DomainError::Serialization {
        key: key.to_owned(),
        source,
    })
}

pub(crate) fn decode<T: DeserializeOwned>(
    key: &str,
    value: serde_json::Value,
) -> Result<T, DomainError> {
    serde_json::from_value(value).map_err(|source| DomainError::Serialization {
        key: key.to_owned(),
        source,
    })
}

/// Reads and decodes one cache entry.
pub(crate) fn read<T: DeserializeOwned>(
    cache: &dyn CacheBackend,
    key: &str,
) -> Result<Option<T>, DomainError> {
    cache
        .get(key)?
        .map(|value| decode(key, value))
        .transpose()
}

/// Persists a whole state in one batch.
///
/// Records are written before the manifest pair, so a reader that finds the
/// manifest also finds every record it lists.
pub(crate) fn persist(cache: &dyn CacheBackend, state: &RegistryState) -> Result<(), DomainError> {
    let mut entries = Vec::with_capacity(state.modules.len() + state.entities.len() + 2);
    for (id, module) in &state.modules {
        let key = keys::module(id);
        let value = encode(&key, module)?;
        entries.push((key, value));
    }
    for (id, entity) in &state.entities {
        let key = keys::entity(id);
        let value = encode(&key, entity)?;
        entries.push((key, value));
    }
    entries.push((
        keys::MANIFEST.to_owned(),
        encode(keys::MANIFEST, &state.manifest())?,
    ));
    entries.push((
        keys::RIGHTS_MANIFEST.to_owned(),
        encode(keys::RIGHTS_MANIFEST, &state.rights_manifest())?,
    ));
    cache.set_many(entries)?;
    Ok(())
}

/// Manifest plus on-demand access to the records it lists.
pub struct RegistrySnapshot<'a> {
    manifest: Manifest,
    cache: &'a dyn CacheBackend,
    resolver: &'a IdentifierResolver,
}

impl<'a> RegistrySnapshot<'a> {
    #[must_use]
    pub fn new(
        manifest: Manifest,
        cache: &'a dyn CacheBackend,
        resolver: &'a IdentifierResolver,
    ) -> Self {
        Self {
            manifest,
            cache,
            resolver,
        }
    }

    #[must_use]
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    #[must_use]
    pub fn into_manifest(self) -> Manifest {
        self.manifest
    }

    /// # Errors
    ///
    /// Returns `UnknownIdentifier` if the record is missing, even when the
    /// manifest lists the identifier.
    pub fn entity_record(&self, identifier: &str) -> Result<EntityRecord, DomainError> {
        read(self.cache, &keys::entity(identifier))?
            .ok_or_else(|| DomainError::unknown_identifier(identifier))
    }

    /// # Errors
    ///
    /// Returns `UnknownIdentifier` if the record is missing.
    pub fn module_record(&self, identifier: &str) -> Result<ModuleRecord, DomainError> {
        read(self.cache, &keys::module(identifier))?
            .ok_or_else(|| DomainError::unknown_identifier(identifier))
    }

    /// Reads the stored rights manifest; absent means empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend or the entry is broken.
    pub fn rights_manifest(&self) -> Result<RightsManifest, DomainError> {
        Ok(read(self.cache, keys::RIGHTS_MANIFEST)?.unwrap_or_default())
    }

    /// Loads every record into a mutable state.
    ///
    /// # Errors
    ///
    /// Returns an error if any listed record is missing or corrupted.
    pub fn load_state(&self) -> Result<RegistryState, DomainError> {
        let mut state = RegistryState::default();
        for id in self.manifest.modules.keys() {
            state.modules.insert(id.clone(), self.module_record(id)?);
        }
        for id in self.manifest.entities.keys() {
            state.entities.insert(id.clone(), self.entity_record(id)?);
        }
        Ok(state)
    }

    /// Entity identifier a subject refers to, if any.
    ///
    /// Instances are identified by their normalized type. Identifiers listed
    /// in the manifest are used as-is; any other string is treated as a type
    /// name. A type name whose identifier is held by a type with a different
    /// `(module, name)` split resolves to nothing.
    #[must_use]
    pub fn resolve_subject(&self, subject: &Subject) -> Option<String> {
        match subject {
            Subject::Identifier(id) if self.manifest.contains_entity(id) => Some(id.clone()),
            Subject::Identifier(raw) | Subject::Instance(raw) => {
                let placement = self
                    .resolver
                    .entity_placement(self.resolver.normalize(raw))
                    .ok()?;
                match self.manifest.entities.get(&placement.identifier) {
                    Some(active) if !self.same_split(&placement, active) => None,
                    _ => Some(placement.identifier),
                }
            }
        }
    }

    /// Whether the registered `active` type sits at the same module and name as `placement`.
    fn same_split(&self, placement: &EntityPlacement, active: &str) -> bool {
        self.resolver
            .entity_placement(active)
            .is_ok_and(|held| held.module == placement.module && held.name == placement.name)
    }

    /// Like [`resolve_subject`](Self::resolve_subject), but only yields
    /// registered identifiers.
    #[must_use]
    pub fn registered_subject(&self, subject: &Subject) -> Option<String> {
        self.resolve_subject(subject)
            .filter(|id| self.manifest.contains_entity(id))
    }

    /// Identifiers whose records list `type_name` among their mapped superclasses.
    ///
    /// Names without namespace segments have no children and read nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if a listed record cannot be read.
    pub fn children_of(&self, type_name: &str) -> Result<Vec<String>, DomainError> {
        let type_name = self.resolver.normalize(type_name);
        let mut children = Vec::new();
        if !self.resolver.is_qualified(type_name) {
            return Ok(children);
        }
        for id in self.manifest.entities.keys() {
            let record = self.entity_record(id)?;
            if record.mapped_superclasses.iter().any(|s| s == type_name) {
                children.push(id.clone());
            }
        }
        Ok(children)
    }

    /// Identifier whose rights govern `identifier`, following rights
    /// inheritance until an entity without a redirect, an unreadable record,
    /// or a cycle is reached.
    #[must_use]
    pub fn rights_holder(&self, identifier: &str) -> String {
        let mut current = identifier.to_owned();
        let mut seen = HashSet::new();
        while seen.insert(current.clone()) {
            match self.entity_record(&current) {
                Ok(EntityRecord {
                    rights_inherited_from: Some(target),
                    ..
                }) => current = target,
                _ => break,
            }
        }
        current
    }

    /// Active type of a type name; the input itself when nothing is registered for it.
    #[must_use]
    pub fn runtime_type(&self, type_name: &str) -> String {
        let normalized = self.resolver.normalize(type_name);
        // A colliding (module, name) split with the same identifier is not an override.
        if let Ok(placement) = self.resolver.entity_placement(normalized)
            && let Some(active) = self.manifest.entities.get(&placement.identifier)
            && self.same_split(&placement, active)
        {
            return active.clone();
        }
        if let Ok(id) = self.resolver.module_identifier(normalized)
            && let Some(module) = self.manifest.modules.get(&id)
            && module.type_name == normalized
        {
            return module.type_name.clone();
        }
        type_name.to_owned()
    }
}
