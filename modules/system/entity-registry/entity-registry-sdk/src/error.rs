//! Error types for the entity registry module.

use thiserror::Error;

/// Errors that can occur when using the entity registry API.
///
/// Identifier lookups and manual registrations surface typed failures. Every
/// other failure inside the registry degrades to an empty or denying result.
#[derive(Debug, Error)]
pub enum EntityRegistryError {
    /// The identifier is not present in the manifest or its per-identifier
    /// metadata entry is missing.
    #[error("unknown identifier: {identifier}")]
    UnknownIdentifier {
        /// The identifier that could not be resolved.
        identifier: String,
    },

    /// The type name does not have the namespace shape of an entity or module.
    #[error("malformed type placement: {type_name}")]
    MalformedTypePlacement {
        /// The offending type name.
        type_name: String,
    },

    /// A registration was refused by the validation or override rules.
    #[error("registration rejected: {0}")]
    RegistrationRejected(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EntityRegistryError {
    /// Creates an `UnknownIdentifier` error.
    #[must_use]
    pub fn unknown_identifier(identifier: impl Into<String>) -> Self {
        Self::UnknownIdentifier {
            identifier: identifier.into(),
        }
    }

    /// Creates a `MalformedTypePlacement` error.
    #[must_use]
    pub fn malformed_type_placement(type_name: impl Into<String>) -> Self {
        Self::MalformedTypePlacement {
            type_name: type_name.into(),
        }
    }

    /// Creates a `RegistrationRejected` error.
    #[must_use]
    pub fn registration_rejected(reason: impl Into<String>) -> Self {
        Self::RegistrationRejected(reason.into())
    }

    /// Creates an `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns `true` if this is an `UnknownIdentifier` error.
    #[must_use]
    pub fn is_unknown_identifier(&self) -> bool {
        matches!(self, Self::UnknownIdentifier { .. })
    }

    /// Returns `true` if this is a `MalformedTypePlacement` error.
    #[must_use]
    pub fn is_malformed_type_placement(&self) -> bool {
        matches!(self, Self::MalformedTypePlacement { .. })
    }

    /// Returns `true` if this is a `RegistrationRejected` error.
    #[must_use]
    pub fn is_registration_rejected(&self) -> bool {
        matches!(self, Self::RegistrationRejected(_))
    }
}
