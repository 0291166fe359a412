#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

//! Common test utilities for entity-registry integration tests

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use entity_registry::config::EntityRegistryConfig;
use entity_registry::domain::facts::constants;
use entity_registry::domain::{
    FieldProvider, RegistryListener, RegistryPorts, TypeCandidate, TypeUniverseSource,
};
use entity_registry::infra::{InMemoryCacheBackend, InMemoryRightsStorage, StaticTypeCatalog};
use entity_registry::EntityRegistryService;
use serde_json::json;

pub const SERVER: &str = "App.Entity.Inventory.Server";
pub const SERVER_NOTE: &str = "App.Entity.Inventory.ServerNote";
pub const PLUGIN_SERVER: &str = "Plugin.Acme.Racks.Entity.Inventory.Server";

/// Inventory and Helpdesk modules, a trashable server, a note inheriting
/// the server's rights, an asset layout root and a plugin server override.
pub fn inventory_catalog() -> StaticTypeCatalog {
    StaticTypeCatalog::builder()
        .abstract_type("App.Entity.AbstractEntity", None)
        .abstract_type("App.Module.AbstractModule", None)
        .concrete("App.Module.Inventory", "App.Module.AbstractModule")
        .constant("App.Module.Inventory", constants::DISPLAY_NAME, json!("menu.inventory"))
        .concrete("App.Module.Helpdesk", "App.Module.AbstractModule")
        .abstract_type("App.Entity.Asset.AbstractAsset", Some("App.Entity.AbstractEntity"))
        .marker("App.Entity.Asset.AbstractAsset", "MappedSuperclass")
        .tags("App.Entity.Asset.AbstractAsset", ["Trashable"])
        .abstract_type(
            "App.Entity.Asset.AbstractHardware",
            Some("App.Entity.Asset.AbstractAsset"),
        )
        .marker("App.Entity.Asset.AbstractHardware", "MappedSuperclass")
        .concrete(SERVER, "App.Entity.Asset.AbstractHardware")
        .constant(SERVER, constants::RIGHTS, json!(["VIEW", "EDIT", "CREATE", "PURGE"]))
        .constant(SERVER, constants::MENU_ITEM, json!(true))
        .constant(SERVER, constants::SETTINGS_GROUP, json!("assets"))
        .concrete("App.Entity.Inventory.Licence", "App.Entity.Asset.AbstractAsset")
        .constant("App.Entity.Inventory.Licence", constants::RIGHTS, json!(["VIEW"]))
        .concrete(SERVER_NOTE, "App.Entity.AbstractEntity")
        .tags(SERVER_NOTE, ["Relation"])
        .constant(SERVER_NOTE, constants::RIGHTS, json!(["VIEW", "EDIT"]))
        .constant(SERVER_NOTE, constants::INHERIT_RIGHTS_FROM, json!(SERVER))
        .concrete("App.Entity.Helpdesk.Ticket", "App.Entity.AbstractEntity")
        .constant(
            "App.Entity.Helpdesk.Ticket",
            constants::RIGHTS,
            json!(["VIEW", "CREATE"]),
        )
        .concrete(PLUGIN_SERVER, SERVER)
        .declared_in(PLUGIN_SERVER, "plugins/Acme/Racks/Entity/Inventory")
        .build()
}

/// Universe wrapper counting how often the full universe is enumerated.
pub struct CountingUniverse {
    inner: Arc<StaticTypeCatalog>,
    calls: AtomicUsize,
}

impl CountingUniverse {
    pub fn new(inner: Arc<StaticTypeCatalog>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TypeUniverseSource for CountingUniverse {
    fn all_candidate_types(&self) -> Vec<TypeCandidate> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.all_candidate_types()
    }
}

/// Listener counting clear notifications.
#[derive(Default)]
pub struct CountingListener {
    pub notified: AtomicUsize,
}

impl RegistryListener for CountingListener {
    fn on_registry_cleared(&self) {
        self.notified.fetch_add(1, Ordering::SeqCst);
    }
}

/// Field provider echoing the identifier and type it was asked about.
pub struct EchoFieldProvider;

impl FieldProvider for EchoFieldProvider {
    fn fields_of(&self, identifier: &str, type_name: &str) -> Vec<serde_json::Value> {
        vec![json!({ "name": "id", "entity": identifier, "type": type_name })]
    }
}

pub struct Harness {
    pub service: Arc<EntityRegistryService>,
    pub cache: Arc<InMemoryCacheBackend>,
    pub rights: Arc<InMemoryRightsStorage>,
    pub universe: Arc<CountingUniverse>,
}

pub fn harness_with(config: EntityRegistryConfig) -> Harness {
    harness_with_catalog(inventory_catalog(), config)
}

pub fn harness_with_catalog(catalog: StaticTypeCatalog, config: EntityRegistryConfig) -> Harness {
    let catalog = Arc::new(catalog);
    let cache = Arc::new(InMemoryCacheBackend::new());
    let rights = Arc::new(InMemoryRightsStorage::new());
    let universe = Arc::new(CountingUniverse::new(catalog.clone()));

    let service = Arc::new(EntityRegistryService::new(
        RegistryPorts {
            cache: cache.clone(),
            universe: universe.clone(),
            introspector: catalog,
            rights_storage: rights.clone(),
            field_provider: Some(Arc::new(EchoFieldProvider)),
        },
        config,
    ));

    Harness {
        service,
        cache,
        rights,
        universe,
    }
}

pub fn harness() -> Harness {
    harness_with(EntityRegistryConfig::default())
}

pub fn harness_allowing_overrides() -> Harness {
    harness_with(EntityRegistryConfig {
        allow_plugin_overrides: true,
        ..EntityRegistryConfig::default()
    })
}
