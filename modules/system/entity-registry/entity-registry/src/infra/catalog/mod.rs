pub mod static_catalog;

pub use static_catalog::{
    StaticCatalogConfig, StaticTypeCatalog, StaticTypeCatalogBuilder, TypeDeclaration,
};
