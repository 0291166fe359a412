//! Domain service for the Entity Registry module.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use entity_registry_sdk::{CallerId, Manifest, Metadata, RightsManifest, Subject, Vote};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, instrument, warn};

use super::builder::{ManifestBuilder, RegistryState, log_skipped};
use super::error::DomainError;
use super::identifier::IdentifierResolver;
use super::ports::{
    CacheBackend, FieldProvider, RegistryListener, RightsStorage, TypeIntrospector,
    TypeUniverseSource,
};
use super::rights::RightsAggregator;
use super::snapshot::{self, RegistrySnapshot, keys};
use super::voter::AccessVoter;
use crate::config::EntityRegistryConfig;

/// Outcome of registering one type by hand: its identifier or the skip reason.
pub type Registration = Result<String, DomainError>;

/// Collaborators of the registry.
#[derive(Clone)]
pub struct RegistryPorts {
    pub cache: Arc<dyn CacheBackend>,
    pub universe: Arc<dyn TypeUniverseSource>,
    pub introspector: Arc<dyn TypeIntrospector>,
    pub rights_storage: Arc<dyn RightsStorage>,
    pub field_provider: Option<Arc<dyn FieldProvider>>,
}

/// Registry facade.
///
/// All derived state lives in the cache backend; the service itself only
/// holds its collaborators and the listener list. Concurrent cold-cache
/// reads may each build the manifest, and the last write wins.
pub struct EntityRegistryService {
    ports: RegistryPorts,
    resolver: IdentifierResolver,
    config: EntityRegistryConfig,
    listeners: RwLock<Vec<Arc<dyn RegistryListener>>>,
    registration: Mutex<()>,
}

impl EntityRegistryService {
    /// Creates a new `EntityRegistryService` with the given collaborators.
    #[must_use]
    pub fn new(ports: RegistryPorts, config: EntityRegistryConfig) -> Self {
        Self {
            resolver: IdentifierResolver::new(&config),
            ports,
            config,
            listeners: RwLock::new(Vec::new()),
            registration: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &EntityRegistryConfig {
        &self.config
    }

    fn builder(&self) -> ManifestBuilder<'_> {
        ManifestBuilder::new(self.ports.introspector.as_ref(), &self.resolver, &self.config)
    }

    fn open(&self, manifest: Manifest) -> RegistrySnapshot<'_> {
        RegistrySnapshot::new(manifest, self.ports.cache.as_ref(), &self.resolver)
    }

    /// Opens a snapshot, building and persisting the manifest on a cold cache.
    fn snapshot(&self) -> Result<RegistrySnapshot<'_>, DomainError> {
        if let Some(manifest) = snapshot::read(self.ports.cache.as_ref(), keys::MANIFEST)? {
            return Ok(self.open(manifest));
        }

        let candidates = self.ports.universe.all_candidate_types();
        let state = self.builder().build(&candidates);
        snapshot::persist(self.ports.cache.as_ref(), &state)?;
        info!(
            candidates = candidates.len(),
            modules = state.modules.len(),
            entities = state.entities.len(),
            "entity registry manifest built"
        );
        Ok(self.open(state.manifest()))
    }

    /// Returns the manifest, building it on a cold cache.
    ///
    /// A failing cache backend yields an empty manifest.
    #[must_use]
    #[instrument(skip(self))]
    pub fn get_manifest(&self) -> Manifest {
        match self.snapshot() {
            Ok(snapshot) => snapshot.into_manifest(),
            Err(e) => {
                error!(error = %e, "failed to load registry manifest");
                Manifest::default()
            }
        }
    }

    /// Returns the rights manifest. Empty on backend failure.
    #[must_use]
    #[instrument(skip(self))]
    pub fn get_all_rights(&self) -> RightsManifest {
        match self.snapshot().and_then(|s| s.rights_manifest()) {
            Ok(rights) => rights,
            Err(e) => {
                error!(error = %e, "failed to load rights manifest");
                RightsManifest::default()
            }
        }
    }

    /// Currently active type name of an entity identifier.
    ///
    /// # Errors
    ///
    /// Returns `UnknownIdentifier` if the entity is not registered.
    pub fn get_entity_from_identifier(&self, identifier: &str) -> Result<String, DomainError> {
        self.snapshot()?
            .manifest()
            .entities
            .get(identifier)
            .cloned()
            .ok_or_else(|| DomainError::unknown_identifier(identifier))
    }

    /// Type name of a module identifier.
    ///
    /// # Errors
    ///
    /// Returns `UnknownIdentifier` if the module is not registered.
    pub fn get_module_from_identifier(&self, identifier: &str) -> Result<String, DomainError> {
        self.snapshot()?
            .manifest()
            .modules
            .get(identifier)
            .map(|module| module.type_name.clone())
            .ok_or_else(|| DomainError::unknown_identifier(identifier))
    }

    /// Record stored for an identifier.
    ///
    /// # Errors
    ///
    /// Returns `UnknownIdentifier` if the identifier is not listed or its
    /// record is missing from the cache.
    #[instrument(skip(self))]
    pub fn get_metadata(&self, identifier: &str) -> Result<Metadata, DomainError> {
        let snapshot = self.snapshot()?;
        let manifest = snapshot.manifest();
        if manifest.contains_entity(identifier) {
            snapshot.entity_record(identifier).map(Metadata::Entity)
        } else if manifest.contains_module(identifier) {
            snapshot.module_record(identifier).map(Metadata::Module)
        } else {
            Err(DomainError::unknown_identifier(identifier))
        }
    }

    /// Identifier of an entity type; does not consult the cache.
    ///
    /// # Errors
    ///
    /// Returns `MalformedTypePlacement` for names without an entity shape.
    pub fn get_entity_identifier(&self, type_name: &str) -> Result<String, DomainError> {
        self.resolver.entity_identifier(type_name)
    }

    /// Identifier of a module type; does not consult the cache.
    ///
    /// # Errors
    ///
    /// Returns `MalformedTypePlacement` for empty names or segments.
    pub fn get_module_identifier(&self, type_name: &str) -> Result<String, DomainError> {
        self.resolver.module_identifier(type_name)
    }

    /// Active type for `type_name`; the input when nothing is registered.
    #[must_use]
    pub fn get_runtime_entity_class(&self, type_name: &str) -> String {
        match self.snapshot() {
            Ok(snapshot) => snapshot.runtime_type(type_name),
            Err(e) => {
                warn!(type_name, error = %e, "runtime class lookup fell back to input");
                type_name.to_owned()
            }
        }
    }

    /// Applies hand registrations to the stored state and persists it.
    fn register_with<F>(
        &self,
        type_names: &[&str],
        kind: &str,
        mut register: F,
    ) -> Result<Vec<Registration>, DomainError>
    where
        F: FnMut(&ManifestBuilder<'_>, &mut RegistryState, &str) -> Registration,
    {
        let _guard = self.registration.lock();
        let mut state = self.snapshot()?.load_state()?;
        let builder = self.builder();

        let results: Vec<Registration> = type_names
            .iter()
            .map(|type_name| {
                let result = register(&builder, &mut state, type_name);
                match &result {
                    Ok(identifier) => {
                        debug!(kind, type_name, identifier = %identifier, "registered");
                    }
                    Err(e) => log_skipped(kind, type_name, e),
                }
                result
            })
            .collect();

        if results.iter().any(Result::is_ok) {
            snapshot::persist(self.ports.cache.as_ref(), &state)?;
        }
        Ok(results)
    }

    /// Registers entity types outside the discovered source roots.
    ///
    /// Returns one outcome per input, in order. Validation and override
    /// rules are the same as for the bulk build.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored state cannot be loaded or persisted.
    #[instrument(skip(self))]
    pub fn register_entities(&self, type_names: &[&str]) -> Result<Vec<Registration>, DomainError> {
        self.register_with(type_names, "entity", |builder, state, type_name| {
            builder.register_entity(state, type_name)
        })
    }

    /// Registers module types outside the discovered source roots.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored state cannot be loaded or persisted.
    #[instrument(skip(self))]
    pub fn register_modules(&self, type_names: &[&str]) -> Result<Vec<Registration>, DomainError> {
        self.register_with(type_names, "module", |builder, state, type_name| {
            builder.register_module(state, type_name)
        })
    }

    /// Adds a listener notified on [`clear`](Self::clear).
    pub fn subscribe(&self, listener: Arc<dyn RegistryListener>) {
        self.listeners.write().push(listener);
    }

    /// Drops all cached registry state after notifying listeners.
    ///
    /// Returns `false` if the backend fails.
    #[instrument(skip(self))]
    pub fn clear(&self) -> bool {
        let listeners = self.listeners.read().clone();
        for listener in &listeners {
            listener.on_registry_cleared();
        }

        match self.ports.cache.clear() {
            Ok(()) => {
                info!(listeners = listeners.len(), "entity registry cleared");
                true
            }
            Err(e) => {
                error!(error = %e, "failed to clear entity registry cache");
                false
            }
        }
    }

    /// Identifiers of the entities listing `type_name` as a mapped superclass.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache cannot be read.
    pub fn get_child_entities_for_mapped_superclass(
        &self,
        type_name: &str,
    ) -> Result<Vec<String>, DomainError> {
        self.snapshot()?.children_of(type_name)
    }

    /// Basic rights vocabulary of an entity, following rights inheritance.
    ///
    /// # Errors
    ///
    /// Returns `UnknownIdentifier` if the entity or its rights holder is missing.
    pub fn get_entity_rights(&self, identifier: &str) -> Result<BTreeSet<String>, DomainError> {
        let snapshot = self.snapshot()?;
        snapshot.entity_record(identifier)?;
        let holder = snapshot.rights_holder(identifier);
        Ok(snapshot.entity_record(&holder)?.rights)
    }

    /// Effective rights of `caller` over `subject`. Empty on any failure.
    #[must_use]
    #[instrument(skip(self))]
    pub fn get_effective_rights(&self, subject: &Subject, caller: CallerId) -> BTreeSet<String> {
        match self.snapshot() {
            Ok(snapshot) => RightsAggregator::new(self.ports.rights_storage.as_ref())
                .effective_rights(&snapshot, subject, caller),
            Err(e) => {
                warn!(error = %e, "effective rights unavailable");
                BTreeSet::new()
            }
        }
    }

    /// Returns `true` if the voter takes part in deciding `verb` on `subject`.
    #[must_use]
    pub fn supports(&self, verb: &str, subject: &Subject) -> bool {
        self.snapshot()
            .is_ok_and(|snapshot| AccessVoter::supports(&snapshot, verb, subject))
    }

    /// Decides whether `caller` may perform `verb` on `subject`.
    ///
    /// Abstains when the registry cannot be read, since support cannot be established.
    #[must_use]
    #[instrument(skip(self))]
    pub fn vote(&self, verb: &str, subject: &Subject, caller: CallerId) -> Vote {
        match self.snapshot() {
            Ok(snapshot) => {
                let voter =
                    AccessVoter::new(RightsAggregator::new(self.ports.rights_storage.as_ref()));
                voter.vote(&snapshot, verb, subject, caller)
            }
            Err(e) => {
                error!(error = %e, "registry unavailable, abstaining");
                Vote::Abstain
            }
        }
    }

    /// Entity identifiers of a module, in registration order.
    ///
    /// # Errors
    ///
    /// Returns `UnknownIdentifier` if the module is not registered.
    pub fn get_module_entities(&self, module: &str) -> Result<Vec<String>, DomainError> {
        self.snapshot()?
            .manifest()
            .modules
            .get(module)
            .map(|m| m.entities.clone())
            .ok_or_else(|| DomainError::unknown_identifier(module))
    }

    /// Entities of a module that get their own menu item.
    ///
    /// # Errors
    ///
    /// Returns `UnknownIdentifier` if the module is not registered.
    pub fn get_menu_entities(&self, module: &str) -> Result<Vec<String>, DomainError> {
        let snapshot = self.snapshot()?;
        let entities = snapshot
            .manifest()
            .modules
            .get(module)
            .map(|m| m.entities.clone())
            .ok_or_else(|| DomainError::unknown_identifier(module))?;

        let mut menu = Vec::new();
        for id in entities {
            if snapshot.entity_record(&id)?.supports_menu_item {
                menu.push(id);
            }
        }
        Ok(menu)
    }

    /// Settings group name to the identifiers of its entities.
    ///
    /// # Errors
    ///
    /// Returns an error if a record cannot be read.
    pub fn get_settings_groups(&self) -> Result<BTreeMap<String, Vec<String>>, DomainError> {
        let snapshot = self.snapshot()?;
        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for id in snapshot.manifest().entities.keys() {
            if let Some(group) = snapshot.entity_record(id)?.settings_group {
                groups.entry(group).or_default().push(id.clone());
            }
        }
        Ok(groups)
    }

    /// Field metadata of an entity from the field provider, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns `UnknownIdentifier` if the entity is not registered.
    pub fn get_fields(&self, identifier: &str) -> Result<Vec<serde_json::Value>, DomainError> {
        let record = self.snapshot()?.entity_record(identifier)?;
        Ok(self
            .ports
            .field_provider
            .as_ref()
            .map(|provider| provider.fields_of(&record.identifier, &record.type_name))
            .unwrap_or_default())
    }
}
