//! Models for the entity registry module.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of the caller an access-control decision is made for.
pub type CallerId = Uuid;

/// Rights verbs understood by the registry.
pub mod rights {
    /// Read access.
    pub const VIEW: &str = "VIEW";
    /// Update access.
    pub const EDIT: &str = "EDIT";
    /// Creation access.
    pub const CREATE: &str = "CREATE";
    /// Soft-delete (move to trash) access.
    pub const DELETE: &str = "DELETE";
    /// Permanent removal access.
    pub const PURGE: &str = "PURGE";
}

/// Who a registered type originates from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Owner {
    /// The core application.
    Core,
    /// A plugin, named `authority.plugin`.
    Plugin(String),
}

impl Owner {
    /// Returns `true` for core-owned types.
    #[must_use]
    pub fn is_core(&self) -> bool {
        matches!(self, Self::Core)
    }

    /// Returns the plugin name for plugin-owned types.
    #[must_use]
    pub fn plugin_name(&self) -> Option<&str> {
        match self {
            Self::Core => None,
            Self::Plugin(name) => Some(name),
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Core => f.write_str("core"),
            Self::Plugin(name) => write!(f, "plugin:{name}"),
        }
    }
}

/// Module entry of the [`Manifest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestModule {
    /// Concrete type name of the module.
    pub type_name: String,
    /// Identifiers of the entities owned by the module, in registration order.
    pub entities: Vec<String>,
    /// Aggregate rights vocabulary of the module.
    pub rights: BTreeSet<String>,
}

/// The single source of truth for which identifiers exist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Module identifier to module entry.
    pub modules: BTreeMap<String, ManifestModule>,
    /// Entity identifier to the currently active type name.
    pub entities: BTreeMap<String, String>,
}

impl Manifest {
    /// Returns `true` when no module and no entity is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty() && self.entities.is_empty()
    }

    /// Returns `true` if the entity identifier is registered.
    #[must_use]
    pub fn contains_entity(&self, identifier: &str) -> bool {
        self.entities.contains_key(identifier)
    }

    /// Returns `true` if the module identifier is registered.
    #[must_use]
    pub fn contains_module(&self, identifier: &str) -> bool {
        self.modules.contains_key(identifier)
    }
}

/// Rights of one module as shown by the rights manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRights {
    /// Union of the rights of every entity of the module that owns its rights.
    pub rights: BTreeSet<String>,
    /// Entity identifier to its own rights.
    pub entities: BTreeMap<String, BTreeSet<String>>,
}

/// Denormalized projection of the manifest used for bulk permission display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RightsManifest {
    /// Module identifier to module rights.
    pub modules: BTreeMap<String, ModuleRights>,
}

/// Per-identifier record of a registered module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRecord {
    pub identifier: String,
    pub type_name: String,
    pub owner: Owner,
    pub display_name_key: String,
    pub rights: BTreeSet<String>,
    pub entities: Vec<String>,
}

/// Per-identifier record of a registered entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub identifier: String,
    /// Final segment of the type name.
    pub name: String,
    pub type_name: String,
    pub owner: Owner,
    /// Identifier of the owning module.
    pub module: String,
    pub form_template: String,
    pub capability_tags: BTreeSet<String>,
    /// Basic rights. Empty when `rights_inherited_from` is set; never read
    /// an empty set here as "no rights" without following the redirect.
    pub rights: BTreeSet<String>,
    /// Identifier of the entity whose rights govern this one.
    pub rights_inherited_from: Option<String>,
    pub is_relation: bool,
    pub settings_group: Option<String>,
    pub display_name_key: String,
    pub supports_menu_item: bool,
    /// Whether the type itself carries the mapped-superclass marker.
    pub is_mapped_superclass: bool,
    /// Ancestor type names carrying the mapped-superclass marker, nearest first.
    pub mapped_superclasses: Vec<String>,
}

impl EntityRecord {
    /// Returns `true` if the rights of this entity live at another entity.
    #[must_use]
    pub fn has_redirected_rights(&self) -> bool {
        self.rights_inherited_from.is_some()
    }
}

/// Metadata stored for a single identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Metadata {
    Entity(EntityRecord),
    Module(ModuleRecord),
}

impl Metadata {
    /// Identifier of the record.
    #[must_use]
    pub fn identifier(&self) -> &str {
        match self {
            Self::Entity(record) => &record.identifier,
            Self::Module(record) => &record.identifier,
        }
    }

    /// Type name of the record.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::Entity(record) => &record.type_name,
            Self::Module(record) => &record.type_name,
        }
    }

    /// Returns the entity record, if this is one.
    #[must_use]
    pub fn as_entity(&self) -> Option<&EntityRecord> {
        match self {
            Self::Entity(record) => Some(record),
            Self::Module(_) => None,
        }
    }

    /// Returns the module record, if this is one.
    #[must_use]
    pub fn as_module(&self) -> Option<&ModuleRecord> {
        match self {
            Self::Module(record) => Some(record),
            Self::Entity(_) => None,
        }
    }
}

/// A live object whose type the registry can identify.
pub trait EntityInstance {
    /// Type name of the object, possibly a proxy wrapper type.
    fn entity_type_name(&self) -> &str;
}

/// Subject of a rights query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Subject {
    /// A live instance, identified by its (possibly proxied) type name.
    Instance(String),
    /// An identifier, or a raw type name to resolve.
    Identifier(String),
}

impl Subject {
    /// Builds a subject from a live instance.
    #[must_use]
    pub fn instance<I: EntityInstance + ?Sized>(instance: &I) -> Self {
        Self::Instance(instance.entity_type_name().to_owned())
    }

    /// Builds a subject from an identifier or raw type name.
    #[must_use]
    pub fn identifier(identifier: impl Into<String>) -> Self {
        Self::Identifier(identifier.into())
    }

    /// The raw string carried by the subject.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Instance(type_name) => type_name,
            Self::Identifier(identifier) => identifier,
        }
    }
}

impl From<&str> for Subject {
    fn from(value: &str) -> Self {
        Self::Identifier(value.to_owned())
    }
}

/// The five verbs the access voter decides on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    View,
    Edit,
    Create,
    Delete,
    Purge,
}

impl Action {
    /// All recognized actions.
    pub const ALL: [Action; 5] = [
        Action::View,
        Action::Edit,
        Action::Create,
        Action::Delete,
        Action::Purge,
    ];

    /// Parses a verb. Matching is exact; `"edit"` is not a recognized verb.
    #[must_use]
    pub fn parse(verb: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.as_str() == verb)
    }

    /// The verb as stored in rights sets.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::View => rights::VIEW,
            Self::Edit => rights::EDIT,
            Self::Create => rights::CREATE,
            Self::Delete => rights::DELETE,
            Self::Purge => rights::PURGE,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an access-control vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vote {
    Granted,
    Denied,
    /// The voter plays no role in this decision.
    Abstain,
}

impl Vote {
    /// Returns `true` only for [`Vote::Granted`].
    #[must_use]
    pub fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}
