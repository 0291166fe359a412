//! Configuration for the Entity Registry module.

use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};

/// Prefix of environment variables overriding the configuration,
/// e.g. `ENTITY_REGISTRY__ALLOW_PLUGIN_OVERRIDES=true`.
pub const ENV_PREFIX: &str = "ENTITY_REGISTRY__";

/// Configuration error for typed config loading.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("invalid config for module '{module}': {source}")]
    InvalidConfig {
        module: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to load layered config: {0}")]
    Layered(#[from] Box<figment::Error>),
}

/// Configuration for the Entity Registry module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct EntityRegistryConfig {
    /// Separator between namespace segments of a type name.
    pub namespace_separator: String,

    /// First path segment of core-owned types.
    pub core_authority: String,

    /// First path segment of plugin-owned types.
    /// Plugin types are laid out as `<plugin_authority>.<Vendor>.<Plugin>...`.
    pub plugin_authority: String,

    /// Root type every entity derives from.
    pub entity_base_type: String,

    /// Root type every module derives from.
    pub module_base_type: String,

    /// Declaring-path prefixes of the core source tree and the plugin tree.
    /// Candidates declared elsewhere are discarded by the bulk build.
    pub source_roots: Vec<String>,

    /// Namespace segment introducing a generated proxy wrapper type.
    pub proxy_marker: String,

    /// Whether a plugin entity may replace a core entity with the same identifier.
    pub allow_plugin_overrides: bool,

    /// Capability tag granting soft-delete.
    pub trashable_tag: String,

    /// Capability tag marking relation entities.
    pub relation_tag: String,

    /// Marker of abstract shared-layout ancestors.
    pub mapped_superclass_marker: String,
}

impl Default for EntityRegistryConfig {
    fn default() -> Self {
        Self {
            namespace_separator: ".".to_owned(),
            core_authority: "App".to_owned(),
            plugin_authority: "Plugin".to_owned(),
            entity_base_type: "App.Entity.AbstractEntity".to_owned(),
            module_base_type: "App.Module.AbstractModule".to_owned(),
            source_roots: vec!["src/".to_owned(), "plugins/".to_owned()],
            proxy_marker: "__CG__".to_owned(),
            allow_plugin_overrides: false,
            trashable_tag: "Trashable".to_owned(),
            relation_tag: "Relation".to_owned(),
            mapped_superclass_marker: "MappedSuperclass".to_owned(),
        }
    }
}

impl EntityRegistryConfig {
    /// Name of the module section in the host configuration.
    pub const MODULE_NAME: &'static str = "entity_registry";

    /// Reads the config from a host module entry of the form
    /// `{ "config": { ... } }`.
    ///
    /// A missing entry, a non-object entry or a missing `config` section
    /// fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidConfig` if the `config` section exists
    /// but cannot be deserialized.
    pub fn from_module_entry(module_raw: Option<&serde_json::Value>) -> Result<Self, ConfigError> {
        let Some(config_section) = module_raw
            .and_then(serde_json::Value::as_object)
            .and_then(|obj| obj.get("config"))
        else {
            return Ok(Self::default());
        };

        serde_json::from_value(config_section.clone()).map_err(|e| ConfigError::InvalidConfig {
            module: Self::MODULE_NAME.to_owned(),
            source: e,
        })
    }

    /// Loads the config by layering defaults, an optional YAML file and
    /// `ENTITY_REGISTRY__*` environment variables, in that order.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Layered` if a layer cannot be read or the
    /// merged result does not deserialize.
    pub fn load(yaml_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));
        if let Some(path) = yaml_path {
            figment = figment.merge(Yaml::file(path));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| ConfigError::Layered(Box::new(e)))
    }
}
