//! Registration-time capture of the structural facts the registry needs.
//!
//! Each type is introspected once, when it is registered; reads afterwards
//! only see the captured facts stored in the records.

use std::collections::{BTreeSet, HashSet};

use super::error::IntrospectionError;
use super::ports::TypeIntrospector;
use crate::config::EntityRegistryConfig;

/// Names of the constants a type may declare.
pub mod constants {
    /// Array of rights verbs.
    pub const RIGHTS: &str = "RIGHTS";
    /// Type name (or identifier) of the entity whose rights govern this one.
    pub const INHERIT_RIGHTS_FROM: &str = "INHERIT_RIGHTS_FROM";
    /// Settings group the entity belongs to.
    pub const SETTINGS_GROUP: &str = "SETTINGS_GROUP";
    /// Whether the entity gets its own menu item.
    pub const MENU_ITEM: &str = "MENU_ITEM";
    /// Template rendering the entity form.
    pub const FORM_TEMPLATE: &str = "FORM_TEMPLATE";
    /// Translation key of the display name.
    pub const DISPLAY_NAME: &str = "DISPLAY_NAME";
}

/// Upper bound on inheritance depth; deeper chains are treated as cycles.
const MAX_ANCESTRY_DEPTH: usize = 64;

/// What a candidate type is registered as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Module,
    Entity,
}

/// Facts about an entity type, captured once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityFacts {
    /// Tags of the type and every ancestor below the entity base.
    pub capability_tags: BTreeSet<String>,
    /// Verbs of the `RIGHTS` constant.
    pub declared_rights: BTreeSet<String>,
    /// Raw `INHERIT_RIGHTS_FROM` value.
    pub inherit_rights_from: Option<String>,
    pub settings_group: Option<String>,
    pub supports_menu_item: bool,
    pub form_template: Option<String>,
    pub display_name: Option<String>,
    pub is_mapped_superclass: bool,
    /// Ancestors carrying the mapped-superclass marker, nearest first.
    pub mapped_superclasses: Vec<String>,
}

/// Reads type facts through a [`TypeIntrospector`].
pub struct FactCollector<'a> {
    introspector: &'a dyn TypeIntrospector,
    config: &'a EntityRegistryConfig,
}

impl<'a> FactCollector<'a> {
    #[must_use]
    pub fn new(introspector: &'a dyn TypeIntrospector, config: &'a EntityRegistryConfig) -> Self {
        Self {
            introspector,
            config,
        }
    }

    /// Ancestors of `type_name` from its parent up to, but excluding, `base`.
    ///
    /// Returns `None` when `base` is not reached, i.e. the type does not
    /// derive from it.
    fn ancestors_below(
        &self,
        type_name: &str,
        base: &str,
    ) -> Result<Option<Vec<String>>, IntrospectionError> {
        let mut seen: HashSet<String> = HashSet::from([type_name.to_owned()]);
        let mut ancestors = Vec::new();
        let mut current = self.introspector.parent_of(type_name)?;

        while let Some(parent) = current {
            if parent == base {
                return Ok(Some(ancestors));
            }
            if !seen.insert(parent.clone()) || ancestors.len() >= MAX_ANCESTRY_DEPTH {
                return Err(IntrospectionError::InheritanceCycle(type_name.to_owned()));
            }
            current = self.introspector.parent_of(&parent)?;
            ancestors.push(parent);
        }
        Ok(None)
    }

    /// Classifies a type as a concrete module or a concrete entity.
    ///
    /// Returns `None` for abstract types and types deriving from neither base.
    ///
    /// # Errors
    ///
    /// Returns an error if the type or one of its ancestors cannot be loaded.
    pub fn classify(&self, type_name: &str) -> Result<Option<TypeKind>, IntrospectionError> {
        if self.introspector.is_abstract(type_name)? {
            return Ok(None);
        }
        if self
            .ancestors_below(type_name, &self.config.module_base_type)?
            .is_some()
        {
            return Ok(Some(TypeKind::Module));
        }
        if self
            .ancestors_below(type_name, &self.config.entity_base_type)?
            .is_some()
        {
            return Ok(Some(TypeKind::Entity));
        }
        Ok(None)
    }

    /// Returns `true` if the type is abstract.
    ///
    /// # Errors
    ///
    /// Returns an error if the type cannot be loaded.
    pub fn is_abstract(&self, type_name: &str) -> Result<bool, IntrospectionError> {
        self.introspector.is_abstract(type_name)
    }

    /// Captures the facts of an entity type.
    ///
    /// # Errors
    ///
    /// Returns an error if the type is not an entity, if any type in its
    /// chain cannot be loaded, or if a constant has the wrong shape.
    pub fn entity_facts(&self, type_name: &str) -> Result<EntityFacts, IntrospectionError> {
        let ancestors = self
            .ancestors_below(type_name, &self.config.entity_base_type)?
            .ok_or_else(|| IntrospectionError::UnknownType(type_name.to_owned()))?;

        let mut facts = EntityFacts {
            capability_tags: self.introspector.capability_tags_of(type_name)?,
            is_mapped_superclass: self
                .introspector
                .has_marker(type_name, &self.config.mapped_superclass_marker)?,
            ..EntityFacts::default()
        };

        for ancestor in &ancestors {
            facts
                .capability_tags
                .extend(self.introspector.capability_tags_of(ancestor)?);
            if self
                .introspector
                .has_marker(ancestor, &self.config.mapped_superclass_marker)?
            {
                facts.mapped_superclasses.push(ancestor.clone());
            }
        }

        facts.declared_rights = self.string_list(type_name, constants::RIGHTS)?;
        facts.inherit_rights_from = self.string(type_name, constants::INHERIT_RIGHTS_FROM)?;
        facts.settings_group = self.string(type_name, constants::SETTINGS_GROUP)?;
        facts.form_template = self.string(type_name, constants::FORM_TEMPLATE)?;
        facts.display_name = self.string(type_name, constants::DISPLAY_NAME)?;
        facts.supports_menu_item = self.flag(type_name, constants::MENU_ITEM)?;

        Ok(facts)
    }

    /// Reads the `DISPLAY_NAME` constant of any type.
    ///
    /// # Errors
    ///
    /// Returns an error if the type cannot be loaded or the constant is not a string.
    pub fn display_name(&self, type_name: &str) -> Result<Option<String>, IntrospectionError> {
        self.string(type_name, constants::DISPLAY_NAME)
    }

    fn invalid(type_name: &str, constant: &str, reason: &str) -> IntrospectionError {
        IntrospectionError::InvalidConstant {
            type_name: type_name.to_owned(),
            constant: constant.to_owned(),
            reason: reason.to_owned(),
        }
    }

    fn string(&self, type_name: &str, name: &str) -> Result<Option<String>, IntrospectionError> {
        match self.introspector.constant_of(type_name, name)? {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(serde_json::Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(Self::invalid(type_name, name, "expected a string")),
        }
    }

    fn flag(&self, type_name: &str, name: &str) -> Result<bool, IntrospectionError> {
        match self.introspector.constant_of(type_name, name)? {
            None | Some(serde_json::Value::Null) => Ok(false),
            Some(serde_json::Value::Bool(b)) => Ok(b),
            Some(_) => Err(Self::invalid(type_name, name, "expected a boolean")),
        }
    }

    fn string_list(
        &self,
        type_name: &str,
        name: &str,
    ) -> Result<BTreeSet<String>, IntrospectionError> {
        match self.introspector.constant_of(type_name, name)? {
            None | Some(serde_json::Value::Null) => Ok(BTreeSet::new()),
            Some(serde_json::Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    serde_json::Value::String(s) => Ok(s),
                    _ => Err(Self::invalid(type_name, name, "expected an array of strings")),
                })
                .collect(),
            Some(_) => Err(Self::invalid(type_name, name, "expected an array of strings")),
        }
    }
}
