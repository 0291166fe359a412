//! Domain error types for the Entity Registry module.

use entity_registry_sdk::EntityRegistryError;
use thiserror::Error;

/// Failure reported by a type introspector.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntrospectionError {
    /// The type cannot be loaded.
    #[error("type not loadable: {0}")]
    UnknownType(String),

    /// The parent chain of the type loops back on itself.
    #[error("inheritance cycle through {0}")]
    InheritanceCycle(String),

    /// A declared constant has an unexpected shape.
    #[error("constant {constant} of {type_name} is invalid: {reason}")]
    InvalidConstant {
        type_name: String,
        constant: String,
        reason: String,
    },
}

/// Failure reported by a cache backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cache backend failure on '{key}': {message}")]
pub struct CacheError {
    pub key: String,
    pub message: String,
}

impl CacheError {
    #[must_use]
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Failure reported by the rights storage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("rights storage failure: {0}")]
pub struct RightsStorageError(pub String);

/// Domain-level errors for the Entity Registry module.
#[derive(Error, Debug)]
pub enum DomainError {
    /// The identifier is absent from the manifest or the per-identifier cache.
    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(String),

    /// The namespace of the type does not match an entity or module shape.
    #[error("Malformed type placement: {0}")]
    MalformedTypePlacement(String),

    /// The entity references a module that is not registered yet.
    #[error("Module {module} not registered for entity {type_name}")]
    ModuleNotYetRegistered { type_name: String, module: String },

    /// The type is abstract or does not derive from the expected base type.
    #[error("Type {type_name} is not registrable: {reason}")]
    NotRegistrable { type_name: String, reason: String },

    /// The identifier is held by another owner and the override policy keeps it.
    #[error("Override of {identifier} by {type_name} rejected: held by {holder}")]
    OverrideRejected {
        identifier: String,
        type_name: String,
        holder: String,
    },

    /// Two different (module, name) pairs concatenate to the same identifier.
    #[error("Identifier {identifier} of {type_name} collides with {existing}")]
    IdentifierCollision {
        identifier: String,
        type_name: String,
        existing: String,
    },

    /// Introspection of a type failed.
    #[error("Structural resolution failed: {0}")]
    StructuralResolution(#[from] IntrospectionError),

    /// The cache backend failed.
    #[error("Cache backend failed: {0}")]
    CacheBackend(#[from] CacheError),

    /// The rights storage failed.
    #[error("Rights storage failed: {0}")]
    RightsStorage(#[from] RightsStorageError),

    /// A cached value does not deserialize.
    #[error("Corrupted cache entry '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl DomainError {
    /// Creates an `UnknownIdentifier` error.
    #[must_use]
    pub fn unknown_identifier(identifier: impl Into<String>) -> Self {
        Self::UnknownIdentifier(identifier.into())
    }

    /// Creates a `MalformedTypePlacement` error.
    #[must_use]
    pub fn malformed_type_placement(type_name: impl Into<String>) -> Self {
        Self::MalformedTypePlacement(type_name.into())
    }

    /// Creates a `ModuleNotYetRegistered` error.
    #[must_use]
    pub fn module_not_yet_registered(
        type_name: impl Into<String>,
        module: impl Into<String>,
    ) -> Self {
        Self::ModuleNotYetRegistered {
            type_name: type_name.into(),
            module: module.into(),
        }
    }

    /// Creates a `NotRegistrable` error.
    #[must_use]
    pub fn not_registrable(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NotRegistrable {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for the outcomes registration skips over and continues.
    #[must_use]
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            Self::MalformedTypePlacement(_)
                | Self::ModuleNotYetRegistered { .. }
                | Self::NotRegistrable { .. }
                | Self::OverrideRejected { .. }
                | Self::IdentifierCollision { .. }
                | Self::StructuralResolution(_)
        )
    }
}

impl From<DomainError> for EntityRegistryError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::UnknownIdentifier(id) => EntityRegistryError::unknown_identifier(id),
            DomainError::MalformedTypePlacement(type_name) => {
                EntityRegistryError::malformed_type_placement(type_name)
            }
            other if other.is_skippable() => {
                EntityRegistryError::registration_rejected(other.to_string())
            }
            other => EntityRegistryError::internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_constructors() {
        let err = DomainError::unknown_identifier("InventoryServer");
        assert!(matches!(err, DomainError::UnknownIdentifier(_)));

        let err = DomainError::module_not_yet_registered("App.Entity.Billing.Invoice", "Billing");
        assert!(matches!(err, DomainError::ModuleNotYetRegistered { .. }));
        assert!(err.is_skippable());

        let err = DomainError::not_registrable("App.Entity.Base", "abstract");
        assert!(err.is_skippable());
    }

    #[test]
    fn test_domain_to_sdk_error_conversion() {
        let sdk_err: EntityRegistryError = DomainError::unknown_identifier("Nope").into();
        assert!(sdk_err.is_unknown_identifier());

        let sdk_err: EntityRegistryError = DomainError::malformed_type_placement("App.X").into();
        assert!(sdk_err.is_malformed_type_placement());

        let sdk_err: EntityRegistryError =
            DomainError::not_registrable("App.Entity.Base", "abstract").into();
        assert!(sdk_err.is_registration_rejected());

        let sdk_err: EntityRegistryError =
            DomainError::CacheBackend(CacheError::new("manifest", "down")).into();
        assert!(matches!(sdk_err, EntityRegistryError::Internal(_)));
    }

    #[test]
    fn test_error_display() {
        let err = DomainError::unknown_identifier("InventoryServer");
        assert_eq!(err.to_string(), "Unknown identifier: InventoryServer");

        let err = DomainError::CacheBackend(CacheError::new("manifest", "connection refused"));
        assert_eq!(
            err.to_string(),
            "Cache backend failed: cache backend failure on 'manifest': connection refused"
        );

        let err = DomainError::from(IntrospectionError::UnknownType("App.X".to_owned()));
        assert_eq!(
            err.to_string(),
            "Structural resolution failed: type not loadable: App.X"
        );
        assert!(!DomainError::unknown_identifier("x").is_skippable());
    }

    #[test]
    fn test_internal_error_from_anyhow() {
        let domain_err: DomainError = anyhow::anyhow!("test error").into();
        assert!(matches!(domain_err, DomainError::Internal(_)));
    }
}
