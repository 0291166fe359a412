//! Local (in-process) client for the entity registry module.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use entity_registry_sdk::{
    CallerId, EntityRegistryClient, EntityRegistryError, Manifest, Metadata, RightsManifest,
    Subject, Vote,
};

use super::{DomainError, EntityRegistryService, Registration};

/// Local client wrapping the registry service.
pub struct EntityRegistryLocalClient {
    svc: Arc<EntityRegistryService>,
}

impl EntityRegistryLocalClient {
    #[must_use]
    pub fn new(svc: Arc<EntityRegistryService>) -> Self {
        Self { svc }
    }
}

fn log_error(op: &str, e: &DomainError) {
    match e {
        DomainError::UnknownIdentifier(_) | DomainError::MalformedTypePlacement(_) => {
            tracing::debug!(operation = op, error = %e, "entity-registry lookup miss");
        }
        e if e.is_skippable() => {
            tracing::warn!(operation = op, error = %e, "entity-registry registration rejected");
        }
        _ => tracing::error!(operation = op, error = ?e, "entity-registry call failed"),
    }
}

fn log_and_convert(op: &str, e: DomainError) -> EntityRegistryError {
    log_error(op, &e);
    e.into()
}

/// Outcome of a registration batch holding exactly one type.
fn single(results: Vec<Registration>) -> Registration {
    results.into_iter().next().unwrap_or_else(|| {
        Err(DomainError::Internal(anyhow::anyhow!(
            "registration produced no outcome"
        )))
    })
}

#[async_trait]
impl EntityRegistryClient for EntityRegistryLocalClient {
    async fn get_manifest(&self) -> Manifest {
        self.svc.get_manifest()
    }

    async fn get_all_rights(&self) -> RightsManifest {
        self.svc.get_all_rights()
    }

    async fn get_entity_from_identifier(
        &self,
        identifier: &str,
    ) -> Result<String, EntityRegistryError> {
        self.svc
            .get_entity_from_identifier(identifier)
            .map_err(|e| log_and_convert("get_entity_from_identifier", e))
    }

    async fn get_module_from_identifier(
        &self,
        identifier: &str,
    ) -> Result<String, EntityRegistryError> {
        self.svc
            .get_module_from_identifier(identifier)
            .map_err(|e| log_and_convert("get_module_from_identifier", e))
    }

    async fn get_entity_identifier(&self, type_name: &str) -> Result<String, EntityRegistryError> {
        self.svc
            .get_entity_identifier(type_name)
            .map_err(|e| log_and_convert("get_entity_identifier", e))
    }

    async fn get_module_identifier(&self, type_name: &str) -> Result<String, EntityRegistryError> {
        self.svc
            .get_module_identifier(type_name)
            .map_err(|e| log_and_convert("get_module_identifier", e))
    }

    async fn get_metadata(&self, identifier: &str) -> Result<Metadata, EntityRegistryError> {
        self.svc
            .get_metadata(identifier)
            .map_err(|e| log_and_convert("get_metadata", e))
    }

    async fn get_runtime_entity_class(&self, type_name: &str) -> String {
        self.svc.get_runtime_entity_class(type_name)
    }

    async fn register_entity(&self, type_name: &str) -> Result<String, EntityRegistryError> {
        self.svc
            .register_entities(&[type_name])
            .and_then(single)
            .map_err(|e| log_and_convert("register_entity", e))
    }

    async fn register_module(&self, type_name: &str) -> Result<String, EntityRegistryError> {
        self.svc
            .register_modules(&[type_name])
            .and_then(single)
            .map_err(|e| log_and_convert("register_module", e))
    }

    async fn get_child_entities_for_mapped_superclass(&self, type_name: &str) -> Vec<String> {
        self.svc
            .get_child_entities_for_mapped_superclass(type_name)
            .inspect_err(|e| log_error("get_child_entities_for_mapped_superclass", e))
            .unwrap_or_default()
    }

    async fn get_effective_rights(&self, subject: &Subject, caller: CallerId) -> BTreeSet<String> {
        self.svc.get_effective_rights(subject, caller)
    }

    async fn get_entity_rights(
        &self,
        identifier: &str,
    ) -> Result<BTreeSet<String>, EntityRegistryError> {
        self.svc
            .get_entity_rights(identifier)
            .map_err(|e| log_and_convert("get_entity_rights", e))
    }

    async fn supports(&self, action: &str, subject: &Subject) -> bool {
        self.svc.supports(action, subject)
    }

    async fn vote(&self, action: &str, subject: &Subject, caller: CallerId) -> Vote {
        self.svc.vote(action, subject, caller)
    }

    async fn clear(&self) -> bool {
        self.svc.clear()
    }

    async fn get_module_entities(&self, module: &str) -> Result<Vec<String>, EntityRegistryError> {
        self.svc
            .get_module_entities(module)
            .map_err(|e| log_and_convert("get_module_entities", e))
    }

    async fn get_menu_entities(&self, module: &str) -> Result<Vec<String>, EntityRegistryError> {
        self.svc
            .get_menu_entities(module)
            .map_err(|e| log_and_convert("get_menu_entities", e))
    }

    async fn get_settings_groups(
        &self,
    ) -> Result<BTreeMap<String, Vec<String>>, EntityRegistryError> {
        self.svc
            .get_settings_groups()
            .map_err(|e| log_and_convert("get_settings_groups", e))
    }

    async fn get_fields(
        &self,
        identifier: &str,
    ) -> Result<Vec<serde_json::Value>, EntityRegistryError> {
        self.svc
            .get_fields(identifier)
            .map_err(|e| log_and_convert("get_fields", e))
    }
}
