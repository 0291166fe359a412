//! Mapping between fully-qualified type names and short identifiers.
//!
//! Core types are laid out as `<core>.Entity.<Module>.<Name>` and plugin
//! types as `<plugin>.<Vendor>.<Plugin>.Entity.<Module>.<Name>`. An entity
//! identifier is the module segment concatenated with the final segment, so
//! `App.Entity.Inventory.Server` becomes `InventoryServer`.

use entity_registry_sdk::Owner;

use super::error::DomainError;
use crate::config::EntityRegistryConfig;

/// Offset of the module segment in core entity paths.
const CORE_MODULE_OFFSET: usize = 2;
/// Offset of the module segment in plugin entity paths.
const PLUGIN_MODULE_OFFSET: usize = 4;
/// Minimum number of segments of any entity path.
const MIN_ENTITY_SEGMENTS: usize = 4;

/// Where an entity type sits in the namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityPlacement {
    pub owner: Owner,
    /// Module identifier the entity belongs to.
    pub module: String,
    /// Final segment of the type name.
    pub name: String,
    pub identifier: String,
}

/// Pure, deterministic type name to identifier mapping.
#[derive(Debug, Clone)]
pub struct IdentifierResolver {
    separator: String,
    core_authority: String,
    plugin_authority: String,
    proxy_marker: String,
}

impl IdentifierResolver {
    #[must_use]
    pub fn new(config: &EntityRegistryConfig) -> Self {
        Self {
            separator: config.namespace_separator.clone(),
            core_authority: config.core_authority.clone(),
            plugin_authority: config.plugin_authority.clone(),
            proxy_marker: config.proxy_marker.clone(),
        }
    }

    /// Strips a generated proxy wrapper prefix, returning the author's type.
    ///
    /// `Proxies.__CG__.App.Entity.Inventory.Server` normalizes to
    /// `App.Entity.Inventory.Server`; names without the marker are unchanged.
    #[must_use]
    pub fn normalize<'a>(&self, type_name: &'a str) -> &'a str {
        let needle = format!("{}{}", self.proxy_marker, self.separator);
        match type_name.rfind(&needle) {
            Some(pos) if pos == 0 || type_name[..pos].ends_with(&self.separator) => {
                &type_name[pos + needle.len()..]
            }
            _ => type_name,
        }
    }

    /// Whether a name has namespace segments at all; bare identifiers do not.
    #[must_use]
    pub fn is_qualified(&self, name: &str) -> bool {
        name.contains(self.separator.as_str())
    }

    fn segments<'a>(&self, type_name: &'a str) -> Vec<&'a str> {
        self.normalize(type_name)
            .split(self.separator.as_str())
            .collect()
    }

    fn is_well_formed(segments: &[&str]) -> bool {
        !segments.is_empty() && segments.iter().all(|s| !s.is_empty())
    }

    /// Owner of a type, judged by its first path segment.
    ///
    /// # Errors
    ///
    /// Returns `MalformedTypePlacement` if the first segment is neither
    /// authority or a plugin path lacks its vendor and plugin segments.
    pub fn owner_of(&self, type_name: &str) -> Result<Owner, DomainError> {
        let segments = self.segments(type_name);
        if !Self::is_well_formed(&segments) {
            return Err(DomainError::malformed_type_placement(type_name));
        }
        if segments[0] == self.core_authority {
            Ok(Owner::Core)
        } else if segments[0] == self.plugin_authority && segments.len() >= 3 {
            Ok(Owner::Plugin(format!("{}.{}", segments[1], segments[2])))
        } else {
            Err(DomainError::malformed_type_placement(type_name))
        }
    }

    /// Resolves owner, module, name and identifier of an entity type.
    ///
    /// # Errors
    ///
    /// Returns `MalformedTypePlacement` if the path is too short for its
    /// authority kind or does not start with a known authority.
    pub fn entity_placement(&self, type_name: &str) -> Result<EntityPlacement, DomainError> {
        let owner = self.owner_of(type_name)?;
        let segments = self.segments(type_name);
        let offset = if owner.is_core() {
            CORE_MODULE_OFFSET
        } else {
            PLUGIN_MODULE_OFFSET
        };
        // The module segment must sit strictly before the final segment.
        if segments.len() < MIN_ENTITY_SEGMENTS || segments.len() <= offset + 1 {
            return Err(DomainError::malformed_type_placement(type_name));
        }

        let module = segments[offset].to_owned();
        let name = segments[segments.len() - 1].to_owned();
        Ok(EntityPlacement {
            identifier: format!("{module}{name}"),
            owner,
            module,
            name,
        })
    }

    /// Identifier of an entity type: module segment followed by the final segment.
    ///
    /// # Errors
    ///
    /// Returns `MalformedTypePlacement` for paths without an entity shape.
    pub fn entity_identifier(&self, type_name: &str) -> Result<String, DomainError> {
        self.entity_placement(type_name).map(|p| p.identifier)
    }

    /// Identifier of a module type: its final segment.
    ///
    /// # Errors
    ///
    /// Returns `MalformedTypePlacement` for empty names or empty segments.
    pub fn module_identifier(&self, type_name: &str) -> Result<String, DomainError> {
        let segments = self.segments(type_name);
        if !Self::is_well_formed(&segments) {
            return Err(DomainError::malformed_type_placement(type_name));
        }
        Ok(segments[segments.len() - 1].to_owned())
    }
}
