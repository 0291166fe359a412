#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Integration tests for manifest construction, lookups and cache lifecycle

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use common::{
    CountingListener, PLUGIN_SERVER, SERVER, SERVER_NOTE, harness, harness_allowing_overrides,
};
use entity_registry::domain::DomainError;
use entity_registry::{Metadata, Owner};

fn verbs(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

// =============================================================================
// Manifest Tests
// =============================================================================

#[test]
fn test_manifest_lists_concrete_types() {
    let h = harness();
    let manifest = h.service.get_manifest();

    assert_eq!(
        manifest.modules.keys().collect::<Vec<_>>(),
        vec!["Helpdesk", "Inventory"]
    );
    assert_eq!(
        manifest.entities.keys().collect::<Vec<_>>(),
        vec![
            "HelpdeskTicket",
            "InventoryLicence",
            "InventoryServer",
            "InventoryServerNote"
        ]
    );
    assert_eq!(
        manifest.modules["Inventory"].entities,
        vec!["InventoryServer", "InventoryLicence", "InventoryServerNote"]
    );
}

#[test]
fn test_every_listed_identifier_has_a_record() {
    let h = harness();
    let manifest = h.service.get_manifest();

    for id in manifest.entities.keys().chain(manifest.modules.keys()) {
        let metadata = h.service.get_metadata(id).unwrap();
        assert_eq!(metadata.identifier(), id);
    }
}

#[test]
fn test_identifier_lookups() {
    let h = harness();

    assert_eq!(h.service.get_entity_identifier(SERVER).unwrap(), "InventoryServer");
    assert_eq!(
        h.service
            .get_module_identifier("App.Module.Inventory")
            .unwrap(),
        "Inventory"
    );
    assert_eq!(
        h.service.get_entity_from_identifier("InventoryServer").unwrap(),
        SERVER
    );
    assert!(matches!(
        h.service.get_module_from_identifier("Billing"),
        Err(DomainError::UnknownIdentifier(_))
    ));
    assert!(matches!(
        h.service.get_entity_identifier("App.Entity.Server"),
        Err(DomainError::MalformedTypePlacement(_))
    ));
}

#[test]
fn test_module_metadata() {
    let h = harness();

    let Metadata::Module(module) = h.service.get_metadata("Inventory").unwrap() else {
        panic!("expected a module record");
    };
    assert_eq!(module.display_name_key, "menu.inventory");
    assert_eq!(module.owner, Owner::Core);
    assert_eq!(
        module.rights,
        verbs(&["VIEW", "EDIT", "CREATE", "DELETE", "PURGE"])
    );

    let rights = h.service.get_all_rights();
    let inventory = &rights.modules["Inventory"];
    assert_eq!(inventory.rights, module.rights);
    assert!(!inventory.entities.contains_key("InventoryServerNote"));
    assert_eq!(
        rights.modules["Helpdesk"].entities["HelpdeskTicket"],
        verbs(&["VIEW", "CREATE"])
    );
}

#[test]
fn test_missing_record_fails_even_when_listed() {
    let h = harness();
    assert!(h.service.get_manifest().contains_entity("InventoryLicence"));

    assert!(h.cache.remove("entity.InventoryLicence"));
    assert!(matches!(
        h.service.get_metadata("InventoryLicence"),
        Err(DomainError::UnknownIdentifier(_))
    ));
    assert!(matches!(
        h.service.get_metadata("Nope"),
        Err(DomainError::UnknownIdentifier(_))
    ));
}

// =============================================================================
// Rights Tests
// =============================================================================

#[test]
fn test_trashable_entity_gains_delete() {
    let h = harness();

    let record = h.service.get_metadata("InventoryServer").unwrap();
    let server = record.as_entity().unwrap();
    assert_eq!(
        server.rights,
        verbs(&["VIEW", "EDIT", "CREATE", "PURGE", "DELETE"])
    );
    assert!(server.capability_tags.contains("Trashable"));
    assert!(server.supports_menu_item);
    assert_eq!(server.settings_group.as_deref(), Some("assets"));
}

#[test]
fn test_redirected_rights_are_empty_locally() {
    let h = harness();

    let record = h.service.get_metadata("InventoryServerNote").unwrap();
    let note = record.as_entity().unwrap();
    assert_eq!(note.type_name, SERVER_NOTE);
    assert!(note.rights.is_empty());
    assert!(note.is_relation);
    assert_eq!(note.rights_inherited_from.as_deref(), Some("InventoryServer"));

    assert_eq!(
        h.service.get_entity_rights("InventoryServerNote").unwrap(),
        verbs(&["VIEW", "EDIT", "CREATE", "PURGE", "DELETE"])
    );
}

// =============================================================================
// Override Tests
// =============================================================================

#[test]
fn test_plugin_override_forbidden_keeps_core() {
    let h = harness();

    assert_eq!(h.service.get_runtime_entity_class(SERVER), SERVER);
    assert_eq!(
        h.service.get_entity_from_identifier("InventoryServer").unwrap(),
        SERVER
    );
    let record = h.service.get_metadata("InventoryServer").unwrap();
    assert_eq!(record.as_entity().unwrap().owner, Owner::Core);
}

#[test]
fn test_plugin_override_allowed_replaces_core() {
    let h = harness_allowing_overrides();

    assert_eq!(h.service.get_runtime_entity_class(SERVER), PLUGIN_SERVER);
    assert_eq!(
        h.service
            .get_runtime_entity_class(&format!("Proxies.__CG__.{SERVER}")),
        PLUGIN_SERVER
    );
    let record = h.service.get_metadata("InventoryServer").unwrap();
    let server = record.as_entity().unwrap();
    assert_eq!(server.type_name, PLUGIN_SERVER);
    assert_eq!(server.owner, Owner::Plugin("Acme.Racks".to_owned()));
    // Constants and tags are inherited from the overridden type.
    assert!(server.rights.contains("DELETE"));
    assert_eq!(
        h.service.get_module_entities("Inventory").unwrap().len(),
        3
    );
}

#[test]
fn test_runtime_class_of_unregistered_type_is_unchanged() {
    let h = harness();
    assert_eq!(
        h.service.get_runtime_entity_class("App.Entity.Billing.Invoice"),
        "App.Entity.Billing.Invoice"
    );
    assert_eq!(h.service.get_runtime_entity_class("garbage"), "garbage");
}

// =============================================================================
// Mapped Superclass Tests
// =============================================================================

#[test]
fn test_children_of_mapped_superclasses() {
    let h = harness();

    assert_eq!(
        h.service
            .get_child_entities_for_mapped_superclass("App.Entity.Asset.AbstractAsset")
            .unwrap(),
        vec!["InventoryLicence", "InventoryServer"]
    );
    assert_eq!(
        h.service
            .get_child_entities_for_mapped_superclass("App.Entity.Asset.AbstractHardware")
            .unwrap(),
        vec!["InventoryServer"]
    );
    assert!(
        h.service
            .get_child_entities_for_mapped_superclass("App.Entity.AbstractEntity")
            .unwrap()
            .is_empty()
    );
}

// =============================================================================
// Cache Lifecycle Tests
// =============================================================================

#[test]
fn test_clear_then_rebuild_once() {
    let h = harness();
    let listener = Arc::new(CountingListener::default());
    h.service.subscribe(listener.clone());

    let before = h.service.get_manifest();
    assert!(!h.service.get_manifest().is_empty());
    assert_eq!(h.universe.calls(), 1);

    assert!(h.service.clear());
    assert_eq!(listener.notified.load(Ordering::SeqCst), 1);
    assert!(h.cache.is_empty());

    let after = h.service.get_manifest();
    assert!(!h.service.get_all_rights().modules.is_empty());
    h.service.get_metadata("InventoryServer").unwrap();
    assert_eq!(h.universe.calls(), 2);
    assert_eq!(
        before.entities.keys().collect::<Vec<_>>(),
        after.entities.keys().collect::<Vec<_>>()
    );
    assert_eq!(before, after);
}

#[test]
fn test_manual_registration_follows_override_rules() {
    let h = harness();

    let results = h.service.register_entities(&[PLUGIN_SERVER]).unwrap();
    assert!(matches!(
        results[0],
        Err(DomainError::OverrideRejected { .. })
    ));

    // Abstract types never register.
    let results = h
        .service
        .register_entities(&["App.Entity.Asset.AbstractAsset"])
        .unwrap();
    assert!(matches!(results[0], Err(DomainError::NotRegistrable { .. })));

    assert_eq!(h.universe.calls(), 1);
    assert!(h.service.clear());
    assert_eq!(h.service.get_manifest().entities.len(), 4);
    assert_eq!(h.universe.calls(), 2);
}

// =============================================================================
// Menu, Settings and Field Tests
// =============================================================================

#[test]
fn test_menu_settings_and_fields() {
    let h = harness();

    assert_eq!(
        h.service.get_menu_entities("Inventory").unwrap(),
        vec!["InventoryServer"]
    );
    assert!(h.service.get_menu_entities("Helpdesk").unwrap().is_empty());
    assert!(h.service.get_menu_entities("Billing").is_err());

    let groups = h.service.get_settings_groups().unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups["assets"], vec!["InventoryServer"]);

    let fields = h.service.get_fields("InventoryServer").unwrap();
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0]["entity"], "InventoryServer");
    assert_eq!(fields[0]["type"], SERVER);
}
