//! Config-driven type catalog.
//!
//! Serves both the type universe and structural introspection from a list of
//! declared types, for hosts without runtime reflection and for tests.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Deserialize;

use crate::domain::error::IntrospectionError;
use crate::domain::ports::{TypeCandidate, TypeIntrospector, TypeUniverseSource};

/// Catalog configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StaticCatalogConfig {
    /// Declared types, in universe order.
    pub types: Vec<TypeDeclaration>,
}

/// Configuration for a single type.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeDeclaration {
    /// Fully-qualified type name.
    pub name: String,

    /// Direct parent. `None` for root types.
    #[serde(default)]
    pub parent: Option<String>,

    #[serde(rename = "abstract", default)]
    pub is_abstract: bool,

    /// Path the type is declared under. Derived from the name when absent.
    #[serde(default)]
    pub path: Option<String>,

    /// Capability tags declared directly on the type.
    #[serde(default)]
    pub tags: BTreeSet<String>,

    #[serde(default)]
    pub markers: BTreeSet<String>,

    /// Constants declared directly on the type.
    #[serde(default)]
    pub constants: BTreeMap<String, serde_json::Value>,
}

impl TypeDeclaration {
    fn new(name: &str, parent: Option<&str>, is_abstract: bool) -> Self {
        Self {
            name: name.to_owned(),
            parent: parent.map(ToOwned::to_owned),
            is_abstract,
            path: None,
            tags: BTreeSet::new(),
            markers: BTreeSet::new(),
            constants: BTreeMap::new(),
        }
    }

    fn declaring_path(&self) -> String {
        self.path
            .clone()
            .unwrap_or_else(|| format!("src/{}", self.name.replace('.', "/")))
    }
}

/// Static type catalog.
#[derive(Debug, Clone, Default)]
pub struct StaticTypeCatalog {
    order: Vec<String>,
    types: HashMap<String, TypeDeclaration>,
}

impl StaticTypeCatalog {
    /// Creates a catalog from configuration. Later declarations of the same
    /// name replace earlier ones.
    #[must_use]
    pub fn from_config(config: StaticCatalogConfig) -> Self {
        let mut catalog = Self::default();
        for declaration in config.types {
            catalog.insert(declaration);
        }
        catalog
    }

    #[must_use]
    pub fn builder() -> StaticTypeCatalogBuilder {
        StaticTypeCatalogBuilder::default()
    }

    fn insert(&mut self, declaration: TypeDeclaration) {
        if !self.types.contains_key(&declaration.name) {
            self.order.push(declaration.name.clone());
        }
        self.types.insert(declaration.name.clone(), declaration);
    }

    fn lookup(&self, type_name: &str) -> Result<&TypeDeclaration, IntrospectionError> {
        self.types
            .get(type_name)
            .ok_or_else(|| IntrospectionError::UnknownType(type_name.to_owned()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl TypeUniverseSource for StaticTypeCatalog {
    fn all_candidate_types(&self) -> Vec<TypeCandidate> {
        self.order
            .iter()
            .filter_map(|name| self.types.get(name))
            .map(|decl| TypeCandidate::new(decl.name.clone(), decl.declaring_path()))
            .collect()
    }
}

impl TypeIntrospector for StaticTypeCatalog {
    fn parent_of(&self, type_name: &str) -> Result<Option<String>, IntrospectionError> {
        Ok(self.lookup(type_name)?.parent.clone())
    }

    fn is_abstract(&self, type_name: &str) -> Result<bool, IntrospectionError> {
        Ok(self.lookup(type_name)?.is_abstract)
    }

    fn capability_tags_of(&self, type_name: &str) -> Result<BTreeSet<String>, IntrospectionError> {
        Ok(self.lookup(type_name)?.tags.clone())
    }

    fn has_marker(&self, type_name: &str, marker: &str) -> Result<bool, IntrospectionError> {
        Ok(self.lookup(type_name)?.markers.contains(marker))
    }

    fn constant_of(
        &self,
        type_name: &str,
        name: &str,
    ) -> Result<Option<serde_json::Value>, IntrospectionError> {
        let mut seen = BTreeSet::new();
        let mut current = Some(type_name.to_owned());
        while let Some(candidate) = current {
            let decl = self.lookup(&candidate)?;
            if let Some(value) = decl.constants.get(name) {
                return Ok(Some(value.clone()));
            }
            if !seen.insert(candidate) {
                return Err(IntrospectionError::InheritanceCycle(type_name.to_owned()));
            }
            current = decl.parent.clone();
        }
        Ok(None)
    }
}

/// Fluent construction of a [`StaticTypeCatalog`].
///
/// Modifiers such as [`tags`](Self::tags) apply to a type declared earlier in
/// the chain; modifiers naming an undeclared type are ignored.
#[derive(Debug, Default)]
pub struct StaticTypeCatalogBuilder {
    catalog: StaticTypeCatalog,
}

impl StaticTypeCatalogBuilder {
    #[must_use]
    pub fn abstract_type(mut self, name: &str, parent: Option<&str>) -> Self {
        self.catalog
            .insert(TypeDeclaration::new(name, parent, true));
        self
    }

    #[must_use]
    pub fn concrete(mut self, name: &str, parent: &str) -> Self {
        self.catalog
            .insert(TypeDeclaration::new(name, Some(parent), false));
        self
    }

    fn with(mut self, name: &str, f: impl FnOnce(&mut TypeDeclaration)) -> Self {
        if let Some(decl) = self.catalog.types.get_mut(name) {
            f(decl);
        }
        self
    }

    #[must_use]
    pub fn declared_in(self, name: &str, path: &str) -> Self {
        self.with(name, |decl| decl.path = Some(path.to_owned()))
    }

    #[must_use]
    pub fn tags<I, S>(self, name: &str, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with(name, |decl| decl.tags.extend(tags.into_iter().map(Into::into)))
    }

    #[must_use]
    pub fn marker(self, name: &str, marker: &str) -> Self {
        self.with(name, |decl| {
            decl.markers.insert(marker.to_owned());
        })
    }

    #[must_use]
    pub fn constant(self, name: &str, constant: &str, value: serde_json::Value) -> Self {
        self.with(name, |decl| {
            decl.constants.insert(constant.to_owned(), value);
        })
    }

    #[must_use]
    pub fn build(self) -> StaticTypeCatalog {
        self.catalog
    }
}
