//! Entity Registry SDK
//!
//! This crate provides the public API for the `entity-registry` module:
//! - `EntityRegistryClient` trait for inter-module communication
//! - `Manifest` / `RightsManifest` models describing every registered identifier
//! - `EntityRecord` / `ModuleRecord` per-identifier metadata
//! - `Subject`, `Action` and `Vote` for access-control checks
//! - `EntityRegistryError` for error handling
//!
//! ## Usage
//!
//! Consumers hold the client as a trait object:
//! ```ignore
//! use entity_registry_sdk::{EntityRegistryClient, Subject, Vote};
//!
//! let registry: Arc<dyn EntityRegistryClient> = registry_client();
//!
//! // Resolve an identifier to the currently active type
//! let type_name = registry.get_entity_from_identifier("InventoryServer").await?;
//!
//! // Ask whether a caller may edit servers
//! let vote = registry
//!     .vote("EDIT", &Subject::identifier("InventoryServer"), caller_id)
//!     .await;
//! assert_eq!(vote, Vote::Granted);
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

pub mod api;
pub mod error;
pub mod models;

// Re-export main types at crate root for convenience
pub use api::EntityRegistryClient;
pub use error::EntityRegistryError;
pub use models::{
    Action, CallerId, EntityInstance, EntityRecord, Manifest, ManifestModule, Metadata,
    ModuleRecord, ModuleRights, Owner, RightsManifest, Subject, Vote, rights,
};
