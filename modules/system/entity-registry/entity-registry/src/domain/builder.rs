//! Manifest construction from a universe of candidate types.

use std::collections::{BTreeMap, BTreeSet};

use entity_registry_sdk::{
    EntityRecord, Manifest, ManifestModule, ModuleRecord, ModuleRights, Owner, RightsManifest,
    rights,
};
use tracing::{debug, error, warn};

use super::error::DomainError;
use super::facts::{FactCollector, TypeKind};
use super::identifier::{EntityPlacement, IdentifierResolver};
use super::ports::{TypeCandidate, TypeIntrospector};
use crate::config::EntityRegistryConfig;

/// All records of one cache generation.
///
/// The manifest and the rights manifest are projections of the records,
/// so the three can never disagree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryState {
    pub modules: BTreeMap<String, ModuleRecord>,
    pub entities: BTreeMap<String, EntityRecord>,
}

impl RegistryState {
    #[must_use]
    pub fn manifest(&self) -> Manifest {
        Manifest {
            modules: self
                .modules
                .iter()
                .map(|(id, module)| {
                    (
                        id.clone(),
                        ManifestModule {
                            type_name: module.type_name.clone(),
                            entities: module.entities.clone(),
                            rights: module.rights.clone(),
                        },
                    )
                })
                .collect(),
            entities: self
                .entities
                .iter()
                .map(|(id, entity)| (id.clone(), entity.type_name.clone()))
                .collect(),
        }
    }

    #[must_use]
    pub fn rights_manifest(&self) -> RightsManifest {
        let modules = self
            .modules
            .iter()
            .map(|(id, module)| {
                let entities = module
                    .entities
                    .iter()
                    .filter_map(|entity_id| self.entities.get(entity_id))
                    .filter(|entity| !entity.has_redirected_rights())
                    .map(|entity| (entity.identifier.clone(), entity.rights.clone()))
                    .collect();
                (
                    id.clone(),
                    ModuleRights {
                        rights: module.rights.clone(),
                        entities,
                    },
                )
            })
            .collect();
        RightsManifest { modules }
    }

    /// Recomputes the aggregate rights of a module from its entities.
    fn refresh_module_rights(&mut self, module_id: &str) {
        let Some(module) = self.modules.get(module_id) else {
            return;
        };
        let rights: BTreeSet<String> = module
            .entities
            .iter()
            .filter_map(|id| self.entities.get(id))
            .filter(|entity| !entity.has_redirected_rights())
            .flat_map(|entity| entity.rights.iter().cloned())
            .collect();
        if let Some(module) = self.modules.get_mut(module_id) {
            module.rights = rights;
        }
    }
}

/// Logs a rejected registration: rule violations at warn, other failures at error.
pub(crate) fn log_skipped(kind: &str, type_name: &str, e: &DomainError) {
    if e.is_skippable() {
        warn!(kind, type_name, error = %e, "registration skipped");
    } else {
        error!(kind, type_name, error = %e, "registration failed");
    }
}

/// Result of classifying a candidate list.
#[derive(Debug, Default)]
pub struct Classified {
    pub modules: Vec<String>,
    pub entities: Vec<String>,
}

/// Turns candidate types into validated registry records.
pub struct ManifestBuilder<'a> {
    facts: FactCollector<'a>,
    resolver: &'a IdentifierResolver,
    config: &'a EntityRegistryConfig,
}

impl<'a> ManifestBuilder<'a> {
    #[must_use]
    pub fn new(
        introspector: &'a dyn TypeIntrospector,
        resolver: &'a IdentifierResolver,
        config: &'a EntityRegistryConfig,
    ) -> Self {
        Self {
            facts: FactCollector::new(introspector, config),
            resolver,
            config,
        }
    }

    fn in_source_roots(&self, candidate: &TypeCandidate) -> bool {
        self.config
            .source_roots
            .iter()
            .any(|root| candidate.declaring_path.starts_with(root.as_str()))
    }

    /// Filters candidates to the source roots and splits them into modules
    /// and entities. Core entities come before plugin entities so override
    /// outcomes do not depend on candidate order.
    #[must_use]
    pub fn classify(&self, candidates: &[TypeCandidate]) -> Classified {
        let mut classified = Classified::default();
        let mut seen = BTreeSet::new();

        for candidate in candidates.iter().filter(|c| self.in_source_roots(c)) {
            let type_name = self.resolver.normalize(&candidate.type_name);
            if !seen.insert(type_name.to_owned()) {
                continue;
            }
            match self.facts.classify(type_name) {
                Ok(Some(TypeKind::Module)) => classified.modules.push(type_name.to_owned()),
                Ok(Some(TypeKind::Entity)) => classified.entities.push(type_name.to_owned()),
                Ok(None) => {}
                Err(e) => {
                    warn!(type_name, error = %e, "skipping candidate that cannot be introspected");
                }
            }
        }

        classified
            .entities
            .sort_by_key(|type_name| !matches!(self.resolver.owner_of(type_name), Ok(Owner::Core)));
        classified
    }

    /// Builds a fresh state from the candidate universe.
    #[must_use]
    pub fn build(&self, candidates: &[TypeCandidate]) -> RegistryState {
        let classified = self.classify(candidates);
        let mut state = RegistryState::default();

        for type_name in &classified.modules {
            if let Err(e) = self.register_module(&mut state, type_name) {
                log_skipped("module", type_name, &e);
            }
        }
        for type_name in &classified.entities {
            if let Err(e) = self.register_entity(&mut state, type_name) {
                log_skipped("entity", type_name, &e);
            }
        }

        state
    }

    /// Registers a module type and returns its identifier.
    ///
    /// Re-registering the type already holding the identifier keeps the
    /// entities collected so far; any other type starts from an empty record.
    ///
    /// # Errors
    ///
    /// Returns an error if the type is not a concrete module or cannot be introspected.
    pub fn register_module(
        &self,
        state: &mut RegistryState,
        type_name: &str,
    ) -> Result<String, DomainError> {
        let type_name = self.resolver.normalize(type_name);
        if self.facts.classify(type_name)? != Some(TypeKind::Module) {
            return Err(DomainError::not_registrable(
                type_name,
                "not a concrete module type",
            ));
        }

        let identifier = self.resolver.module_identifier(type_name)?;
        let owner = self.resolver.owner_of(type_name)?;
        let display_name_key = self
            .facts
            .display_name(type_name)?
            .unwrap_or_else(|| format!("module.{identifier}"));

        let (rights, entities) = match state.modules.remove(&identifier) {
            Some(existing) if existing.type_name == type_name => {
                (existing.rights, existing.entities)
            }
            _ => (BTreeSet::new(), Vec::new()),
        };

        state.modules.insert(
            identifier.clone(),
            ModuleRecord {
                identifier: identifier.clone(),
                type_name: type_name.to_owned(),
                owner,
                display_name_key,
                rights,
                entities,
            },
        );
        debug!(identifier = %identifier, type_name, "module registered");
        Ok(identifier)
    }

    /// Decides whether `placement` may take the identifier held by `existing`.
    fn check_override(
        &self,
        existing: &EntityRecord,
        placement: &EntityPlacement,
        type_name: &str,
    ) -> Result<(), DomainError> {
        if existing.module != placement.module || existing.name != placement.name {
            return Err(DomainError::IdentifierCollision {
                identifier: placement.identifier.clone(),
                type_name: type_name.to_owned(),
                existing: existing.type_name.clone(),
            });
        }

        let allowed = match (&existing.owner, &placement.owner) {
            (Owner::Core, Owner::Plugin(_)) => self.config.allow_plugin_overrides,
            (Owner::Plugin(_), Owner::Core) => !self.config.allow_plugin_overrides,
            // First registered plugin keeps the identifier.
            (Owner::Plugin(held), Owner::Plugin(incoming)) => held == incoming,
            (Owner::Core, Owner::Core) => true,
        };
        if allowed {
            Ok(())
        } else {
            Err(DomainError::OverrideRejected {
                identifier: placement.identifier.clone(),
                type_name: type_name.to_owned(),
                holder: existing.type_name.clone(),
            })
        }
    }

    /// Registers an entity type and returns its identifier.
    ///
    /// # Errors
    ///
    /// Every error is a skip reason: malformed placement, abstract type,
    /// rejected override, identifier collision, missing module or a failed
    /// introspection.
    pub fn register_entity(
        &self,
        state: &mut RegistryState,
        type_name: &str,
    ) -> Result<String, DomainError> {
        let type_name = self.resolver.normalize(type_name);
        if self.facts.is_abstract(type_name)? {
            return Err(DomainError::not_registrable(type_name, "abstract type"));
        }
        let placement = self.resolver.entity_placement(type_name)?;

        if let Some(existing) = state.entities.get(&placement.identifier) {
            self.check_override(existing, &placement, type_name)?;
        }
        if !state.modules.contains_key(&placement.module) {
            return Err(DomainError::module_not_yet_registered(
                type_name,
                &placement.module,
            ));
        }

        let facts = self.facts.entity_facts(type_name)?;

        let rights_inherited_from = facts.inherit_rights_from.as_deref().map(|target| {
            let target = self.resolver.normalize(target);
            self.resolver
                .entity_identifier(target)
                .unwrap_or_else(|_| target.to_owned())
        });
        let mut basic_rights = BTreeSet::new();
        if rights_inherited_from.is_none() {
            basic_rights = facts.declared_rights;
            if facts.capability_tags.contains(&self.config.trashable_tag) {
                basic_rights.insert(rights::DELETE.to_owned());
            }
        }

        let identifier = placement.identifier;
        let record = EntityRecord {
            identifier: identifier.clone(),
            type_name: type_name.to_owned(),
            owner: placement.owner,
            form_template: facts.form_template.unwrap_or_else(|| {
                format!(
                    "{}/{}/form",
                    placement.module.to_lowercase(),
                    placement.name.to_lowercase()
                )
            }),
            display_name_key: facts
                .display_name
                .unwrap_or_else(|| format!("entity.{identifier}")),
            is_relation: facts.capability_tags.contains(&self.config.relation_tag),
            capability_tags: facts.capability_tags,
            rights: basic_rights,
            rights_inherited_from,
            settings_group: facts.settings_group,
            supports_menu_item: facts.supports_menu_item,
            is_mapped_superclass: facts.is_mapped_superclass,
            mapped_superclasses: facts.mapped_superclasses,
            module: placement.module.clone(),
            name: placement.name,
        };

        if let Some(previous) = state.entities.insert(identifier.clone(), record)
            && previous.type_name != type_name
        {
            debug!(
                identifier = %identifier,
                replaced = %previous.type_name,
                type_name,
                "entity overridden"
            );
        }
        if let Some(module) = state.modules.get_mut(&placement.module)
            && !module.entities.contains(&identifier)
        {
            module.entities.push(identifier.clone());
        }
        state.refresh_module_rights(&placement.module);

        debug!(identifier = %identifier, type_name, "entity registered");
        Ok(identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::facts::constants;
    use crate::infra::StaticTypeCatalog;
    use serde_json::json;
    use tracing_test::traced_test;

    fn base() -> crate::infra::StaticTypeCatalogBuilder {
        StaticTypeCatalog::builder()
            .abstract_type("App.Entity.AbstractEntity", None)
            .abstract_type("App.Module.AbstractModule", None)
            .concrete("App.Module.Inventory", "App.Module.AbstractModule")
            .concrete("App.Module.Helpdesk", "App.Module.AbstractModule")
    }

    fn state_with_modules(builder: &ManifestBuilder<'_>) -> RegistryState {
        let mut state = RegistryState::default();
        builder
            .register_module(&mut state, "App.Module.Inventory")
            .unwrap();
        builder
            .register_module(&mut state, "App.Module.Helpdesk")
            .unwrap();
        state
    }

    #[test]
    fn test_trashable_entity_gets_delete() {
        let catalog = base()
            .concrete("App.Entity.Inventory.Server", "App.Entity.AbstractEntity")
            .tags("App.Entity.Inventory.Server", ["Trashable"])
            .constant(
                "App.Entity.Inventory.Server",
                constants::RIGHTS,
                json!(["VIEW", "EDIT", "CREATE", "PURGE"]),
            )
            .build();
        let config = EntityRegistryConfig::default();
        let resolver = IdentifierResolver::new(&config);
        let builder = ManifestBuilder::new(&catalog, &resolver, &config);
        let mut state = state_with_modules(&builder);

        let id = builder
            .register_entity(&mut state, "App.Entity.Inventory.Server")
            .unwrap();
        assert_eq!(id, "InventoryServer");

        let record = &state.entities["InventoryServer"];
        let expected: BTreeSet<String> = ["VIEW", "EDIT", "CREATE", "PURGE", "DELETE"]
            .into_iter()
            .map(ToOwned::to_owned)
            .collect();
        assert_eq!(record.rights, expected);
        assert_eq!(record.form_template, "inventory/server/form");
        assert_eq!(record.display_name_key, "entity.InventoryServer");
        assert_eq!(state.modules["Inventory"].rights, expected);
        assert_eq!(state.modules["Inventory"].entities, vec!["InventoryServer"]);
    }

    #[test]
    fn test_redirected_rights_stay_empty() {
        let catalog = base()
            .concrete("App.Entity.Inventory.Server", "App.Entity.AbstractEntity")
            .constant(
                "App.Entity.Inventory.Server",
                constants::RIGHTS,
                json!(["VIEW"]),
            )
            .concrete("App.Entity.Inventory.ServerNote", "App.Entity.AbstractEntity")
            .tags("App.Entity.Inventory.ServerNote", ["Trashable", "Relation"])
            .constant(
                "App.Entity.Inventory.ServerNote",
                constants::RIGHTS,
                json!(["VIEW", "EDIT"]),
            )
            .constant(
                "App.Entity.Inventory.ServerNote",
                constants::INHERIT_RIGHTS_FROM,
                json!("App.Entity.Inventory.Server"),
            )
            .build();
        let config = EntityRegistryConfig::default();
        let resolver = IdentifierResolver::new(&config);
        let builder = ManifestBuilder::new(&catalog, &resolver, &config);
        let mut state = state_with_modules(&builder);

        builder
            .register_entity(&mut state, "App.Entity.Inventory.Server")
            .unwrap();
        builder
            .register_entity(&mut state, "App.Entity.Inventory.ServerNote")
            .unwrap();

        let note = &state.entities["InventoryServerNote"];
        assert!(note.rights.is_empty());
        assert!(note.is_relation);
        assert_eq!(note.rights_inherited_from.as_deref(), Some("InventoryServer"));

        let rights_manifest = state.rights_manifest();
        let inventory = &rights_manifest.modules["Inventory"];
        assert!(inventory.entities.contains_key("InventoryServer"));
        assert!(!inventory.entities.contains_key("InventoryServerNote"));
        assert_eq!(inventory.rights, BTreeSet::from(["VIEW".to_owned()]));
    }

    #[test]
    fn test_missing_module_skips_entity() {
        let catalog = base()
            .concrete("App.Entity.Billing.Invoice", "App.Entity.AbstractEntity")
            .build();
        let config = EntityRegistryConfig::default();
        let resolver = IdentifierResolver::new(&config);
        let builder = ManifestBuilder::new(&catalog, &resolver, &config);
        let mut state = state_with_modules(&builder);

        let err = builder
            .register_entity(&mut state, "App.Entity.Billing.Invoice")
            .unwrap_err();
        assert!(matches!(err, DomainError::ModuleNotYetRegistered { .. }));
        assert!(state.entities.is_empty());
    }

    #[test]
    fn test_identifier_collision_rejected() {
        let catalog = base()
            .concrete("App.Module.Inv", "App.Module.AbstractModule")
            .concrete("App.Entity.Inventory.Server", "App.Entity.AbstractEntity")
            .concrete("App.Entity.Inv.entoryServer", "App.Entity.AbstractEntity")
            .build();
        let config = EntityRegistryConfig::default();
        let resolver = IdentifierResolver::new(&config);
        let builder = ManifestBuilder::new(&catalog, &resolver, &config);
        let mut state = state_with_modules(&builder);
        builder.register_module(&mut state, "App.Module.Inv").unwrap();

        builder
            .register_entity(&mut state, "App.Entity.Inventory.Server")
            .unwrap();
        let err = builder
            .register_entity(&mut state, "App.Entity.Inv.entoryServer")
            .unwrap_err();
        assert!(matches!(err, DomainError::IdentifierCollision { .. }));
        assert_eq!(
            state.entities["InventoryServer"].type_name,
            "App.Entity.Inventory.Server"
        );
    }

    #[test]
    fn test_plugin_override_policy() {
        let catalog = base()
            .concrete("App.Entity.Inventory.Server", "App.Entity.AbstractEntity")
            .concrete(
                "Plugin.Acme.Racks.Entity.Inventory.Server",
                "App.Entity.Inventory.Server",
            )
            .concrete(
                "Plugin.Other.Racks.Entity.Inventory.Server",
                "App.Entity.Inventory.Server",
            )
            .build();

        for allow in [false, true] {
            let config = EntityRegistryConfig {
                allow_plugin_overrides: allow,
                ..EntityRegistryConfig::default()
            };
            let resolver = IdentifierResolver::new(&config);
            let builder = ManifestBuilder::new(&catalog, &resolver, &config);
            let mut state = state_with_modules(&builder);

            builder
                .register_entity(&mut state, "App.Entity.Inventory.Server")
                .unwrap();
            let result =
                builder.register_entity(&mut state, "Plugin.Acme.Racks.Entity.Inventory.Server");
            assert_eq!(result.is_ok(), allow);

            // A second plugin never takes over from the first holder.
            let second =
                builder.register_entity(&mut state, "Plugin.Other.Racks.Entity.Inventory.Server");
            assert!(matches!(second, Err(DomainError::OverrideRejected { .. })));

            let expected = if allow {
                "Plugin.Acme.Racks.Entity.Inventory.Server"
            } else {
                "App.Entity.Inventory.Server"
            };
            assert_eq!(state.entities["InventoryServer"].type_name, expected);
            assert_eq!(state.modules["Inventory"].entities.len(), 1);
        }
    }

    #[test]
    fn test_build_orders_core_before_plugins() {
        let catalog = base()
            .concrete("App.Entity.Inventory.Server", "App.Entity.AbstractEntity")
            .concrete(
                "Plugin.Acme.Racks.Entity.Inventory.Server",
                "App.Entity.Inventory.Server",
            )
            .build();
        let config = EntityRegistryConfig::default();
        let resolver = IdentifierResolver::new(&config);
        let builder = ManifestBuilder::new(&catalog, &resolver, &config);

        // Plugin listed first and modules listed last.
        let candidates = vec![
            TypeCandidate::new("Plugin.Acme.Racks.Entity.Inventory.Server", "plugins/racks"),
            TypeCandidate::new("App.Entity.Inventory.Server", "src/Entity"),
            TypeCandidate::new("App.Module.Inventory", "src/Module"),
            TypeCandidate::new("App.Module.Helpdesk", "vendor/elsewhere"),
        ];
        let state = builder.build(&candidates);

        assert_eq!(
            state.entities["InventoryServer"].type_name,
            "App.Entity.Inventory.Server"
        );
        assert!(state.modules.contains_key("Inventory"));
        assert!(!state.modules.contains_key("Helpdesk"));
        let manifest = state.manifest();
        assert_eq!(
            manifest.entities["InventoryServer"],
            "App.Entity.Inventory.Server"
        );
    }

    #[test]
    #[traced_test]
    fn test_build_logs_skipped_candidates() {
        let catalog = base()
            .concrete("App.Entity.Inventory.Server", "App.Entity.AbstractEntity")
            .concrete("App.Entity.Billing.Invoice", "App.Entity.AbstractEntity")
            .build();
        let config = EntityRegistryConfig::default();
        let resolver = IdentifierResolver::new(&config);
        let builder = ManifestBuilder::new(&catalog, &resolver, &config);

        let candidates = vec![
            TypeCandidate::new("App.Module.Inventory", "src/Module"),
            TypeCandidate::new("App.Entity.Inventory.Server", "src/Entity"),
            TypeCandidate::new("App.Entity.Billing.Invoice", "src/Entity"),
            TypeCandidate::new("App.Entity.Ghost.Missing", "src/Entity"),
        ];
        let state = builder.build(&candidates);

        assert_eq!(state.entities.len(), 1);
        assert!(logs_contain("registration skipped"));
        assert!(logs_contain("App.Entity.Billing.Invoice"));
        assert!(logs_contain("skipping candidate that cannot be introspected"));
    }

    #[test]
    fn test_reregistering_module_keeps_entities() {
        let catalog = base()
            .concrete("App.Entity.Inventory.Server", "App.Entity.AbstractEntity")
            .build();
        let config = EntityRegistryConfig::default();
        let resolver = IdentifierResolver::new(&config);
        let builder = ManifestBuilder::new(&catalog, &resolver, &config);
        let mut state = state_with_modules(&builder);
        builder
            .register_entity(&mut state, "App.Entity.Inventory.Server")
            .unwrap();

        builder
            .register_module(&mut state, "App.Module.Inventory")
            .unwrap();
        assert_eq!(state.modules["Inventory"].entities, vec!["InventoryServer"]);

        let err = builder
            .register_module(&mut state, "App.Entity.Inventory.Server")
            .unwrap_err();
        assert!(matches!(err, DomainError::NotRegistrable { .. }));
    }
}
