//! Entity Registry Module Implementation
//!
//! Discovers entity and module types of a host application and its plugins,
//! assigns each a short stable identifier, aggregates their rights model and
//! keeps the result in a cache backend. The public API is defined in
//! `entity-registry-sdk` and re-exported here.
//!
//! ## Architecture
//!
//! - **Build on miss**: the manifest is built from the type universe only when
//!   the cache holds none, and persisted together with every record
//! - **Ports**: type universe, introspection, cache, rights storage and field
//!   metadata are collaborators passed to [`EntityRegistryService`]
//! - **Fail closed**: rights failures collapse to an empty set, which the
//!   voter turns into a denial

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

// === PUBLIC API (from SDK) ===
pub use entity_registry_sdk::{
    Action, CallerId, EntityInstance, EntityRecord, EntityRegistryClient, EntityRegistryError,
    Manifest, Metadata, ModuleRecord, Owner, RightsManifest, Subject, Vote,
};

// === CONFIGURATION ===
pub mod config;
pub use config::EntityRegistryConfig;

// === SERVICE ===
pub use domain::{EntityRegistryLocalClient, EntityRegistryService, RegistryPorts};

// === INTERNAL MODULES ===
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;
