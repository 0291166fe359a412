//! Infrastructure layer for the Entity Registry module.
//!
//! Contains cache, rights storage and type catalog adapters.

pub mod cache;
pub mod catalog;
pub mod rights;

pub use cache::InMemoryCacheBackend;
pub use catalog::{StaticCatalogConfig, StaticTypeCatalog, StaticTypeCatalogBuilder};
pub use rights::InMemoryRightsStorage;
