//! # Plugman Plugin Loading
//!
//! Turns a validated manifest into a live [`PluginInstance`] by resolving
//! its entry point through the [`PluginRegistry`]. Resolved registry
//! entries are cached per loader, so repeated loads of the same entry
//! point skip the lookup. [`LoadError`] covers the whole load phase: the
//! manager records one per plugin that fails anywhere between the version
//! check and the first successful `validate()`.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::config::ConfigError;
use crate::manifest::{PluginKind, PluginManifest};
use crate::registry::{PluginRegistry, RegistryEntry};
use crate::traits::{PluginError, PluginInstance};

/// Why one plugin failed to load.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Plugin '{plugin}' requires system version '{constraint}' but the system is {system}")]
    IncompatibleSystemVersion {
        plugin: String,
        constraint: String,
        system: String,
    },

    #[error("Plugin '{plugin}' declares unknown type '{plugin_type}'")]
    UnknownDeclaredKind { plugin: String, plugin_type: String },

    #[error("Plugin '{plugin}' names entry point '{entry_point}' but no factory is registered under it")]
    UnknownEntryPoint { plugin: String, entry_point: String },

    #[error("Plugin '{plugin}' is declared as '{declared}' but entry point '{entry_point}' builds '{registered}'")]
    KindMismatch {
        plugin: String,
        entry_point: String,
        declared: PluginKind,
        registered: PluginKind,
    },

    #[error("Plugin '{plugin}' factory failed: {source}")]
    Factory {
        plugin: String,
        #[source]
        source: PluginError,
    },

    #[error("Plugin '{plugin}' depends on '{dependency}', which is not active")]
    DependencyNotActive { plugin: String, dependency: String },

    #[error("Plugin '{plugin}' requires '{dependency}' {constraint}, but {dependency} is {actual}")]
    DependencyVersionMismatch {
        plugin: String,
        dependency: String,
        constraint: String,
        actual: String,
    },

    #[error("Plugin '{plugin}' config rejected: {source}")]
    Config {
        plugin: String,
        #[source]
        source: ConfigError,
    },

    #[error("Plugin '{plugin}' failed to initialize: {source}")]
    Initialize {
        plugin: String,
        #[source]
        source: PluginError,
    },

    #[error("Plugin '{plugin}' failed self-validation: {source}")]
    Validate {
        plugin: String,
        #[source]
        source: PluginError,
    },

    #[error("Plugin '{plugin}' excluded by dependency resolution: {reason}")]
    Resolution { plugin: String, reason: String },
}

/// Builds plugin instances from manifests via the registry.
pub struct PluginLoader {
    registry: PluginRegistry,
    // Entry points resolved during this run; a lookup cache only.
    cache: HashMap<String, Arc<RegistryEntry>>,
}

impl PluginLoader {
    /// Creates a loader over a populated registry.
    pub fn new(registry: PluginRegistry) -> Self {
        PluginLoader {
            registry,
            cache: HashMap::new(),
        }
    }

    /// The registry this loader resolves entry points against.
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Instantiates the plugin a manifest describes. The manifest is
    /// expected to have passed validation; an unparseable `type` still
    /// fails cleanly here.
    pub fn load(&mut self, manifest: &PluginManifest) -> Result<PluginInstance, LoadError> {
        let declared = manifest
            .kind()
            .ok_or_else(|| LoadError::UnknownDeclaredKind {
                plugin: manifest.name.clone(),
                plugin_type: manifest.plugin_type.clone(),
            })?;

        let entry = self.resolve(&manifest.name, &manifest.entry_point)?;
        if entry.kind() != declared {
            return Err(LoadError::KindMismatch {
                plugin: manifest.name.clone(),
                entry_point: manifest.entry_point.clone(),
                declared,
                registered: entry.kind(),
            });
        }

        let instance = entry.build(manifest).map_err(|source| LoadError::Factory {
            plugin: manifest.name.clone(),
            source,
        })?;

        // The typed registration methods make this unreachable, but a
        // factory registered through the raw `register` could still lie.
        if instance.kind() != declared {
            return Err(LoadError::KindMismatch {
                plugin: manifest.name.clone(),
                entry_point: manifest.entry_point.clone(),
                declared,
                registered: instance.kind(),
            });
        }

        log::debug!(
            "Built {} plugin '{}' from entry point '{}'",
            declared,
            manifest.name,
            manifest.entry_point
        );
        Ok(instance)
    }

    fn resolve(&mut self, plugin: &str, entry_point: &str) -> Result<Arc<RegistryEntry>, LoadError> {
        if let Some(entry) = self.cache.get(entry_point) {
            return Ok(entry.clone());
        }
        let entry = self
            .registry
            .get(entry_point)
            .ok_or_else(|| LoadError::UnknownEntryPoint {
                plugin: plugin.to_string(),
                entry_point: entry_point.to_string(),
            })?;
        self.cache.insert(entry_point.to_string(), entry.clone());
        Ok(entry)
    }
}
