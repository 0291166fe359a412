//! Domain layer for the Entity Registry module.
//!
//! Contains identifier resolution, manifest construction, rights
//! aggregation, the access voter and the registry service.

pub mod builder;
pub mod error;
pub mod facts;
pub mod identifier;
pub mod local_client;
pub mod ports;
pub mod rights;
pub mod service;
pub mod snapshot;
pub mod voter;

pub use builder::{ManifestBuilder, RegistryState};
pub use error::DomainError;
pub use identifier::IdentifierResolver;
pub use local_client::EntityRegistryLocalClient;
pub use ports::{
    CacheBackend, FieldProvider, GrantEffect, GrantRow, RegistryListener, RightsStorage,
    TypeCandidate, TypeIntrospector, TypeUniverseSource,
};
pub use service::{EntityRegistryService, Registration, RegistryPorts};
