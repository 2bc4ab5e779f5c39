//! # Plugman Plugin Registry
//!
//! Maps manifest entry points to plugin factories. Plugins are compiled
//! into the host and announce themselves by registering a factory under
//! the entry point their manifest declares; the loader then turns a
//! manifest into a live instance by looking its entry point up here.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::manifest::{PluginKind, PluginManifest};
use crate::traits::{
    HookPlugin, IntegrationPlugin, PluginError, PluginInstance, QualityCheckPlugin,
    ValidatorPlugin,
};

/// Errors produced while registering plugin factories.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Entry point already registered: {0}")]
    DuplicateEntryPoint(String),
}

/// Builds a plugin instance from its manifest.
pub type PluginFactory =
    Box<dyn Fn(&PluginManifest) -> Result<PluginInstance, PluginError> + Send + Sync>;

/// A registered factory and the kind it produces.
pub struct RegistryEntry {
    kind: PluginKind,
    factory: PluginFactory,
}

impl RegistryEntry {
    /// The kind of plugin this entry builds.
    pub fn kind(&self) -> PluginKind {
        self.kind
    }

    /// Invokes the factory.
    pub fn build(&self, manifest: &PluginManifest) -> Result<PluginInstance, PluginError> {
        (self.factory)(manifest)
    }
}

/// Registry of plugin factories keyed by entry point.
#[derive(Default)]
pub struct PluginRegistry {
    entries: HashMap<String, Arc<RegistryEntry>>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        PluginRegistry::default()
    }

    /// Registers `factory` under `entry_point`, rejecting duplicates.
    pub fn register(
        &mut self,
        entry_point: impl Into<String>,
        kind: PluginKind,
        factory: PluginFactory,
    ) -> Result<(), RegistryError> {
        let entry_point = entry_point.into();
        if self.entries.contains_key(&entry_point) {
            return Err(RegistryError::DuplicateEntryPoint(entry_point));
        }
        log::debug!("Registered {} factory for entry point '{}'", kind, entry_point);
        self.entries
            .insert(entry_point, Arc::new(RegistryEntry { kind, factory }));
        Ok(())
    }

    /// Registers a hook factory.
    pub fn register_hook<F>(
        &mut self,
        entry_point: impl Into<String>,
        factory: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(&PluginManifest) -> Result<Box<dyn HookPlugin>, PluginError> + Send + Sync + 'static,
    {
        self.register(
            entry_point,
            PluginKind::Hook,
            Box::new(move |manifest| Ok(PluginInstance::Hook(factory(manifest)?))),
        )
    }

    /// Registers a validator factory.
    pub fn register_validator<F>(
        &mut self,
        entry_point: impl Into<String>,
        factory: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(&PluginManifest) -> Result<Box<dyn ValidatorPlugin>, PluginError>
            + Send
            + Sync
            + 'static,
    {
        self.register(
            entry_point,
            PluginKind::Validator,
            Box::new(move |manifest| Ok(PluginInstance::Validator(factory(manifest)?))),
        )
    }

    /// Registers a quality check factory.
    pub fn register_quality_check<F>(
        &mut self,
        entry_point: impl Into<String>,
        factory: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(&PluginManifest) -> Result<Box<dyn QualityCheckPlugin>, PluginError>
            + Send
            + Sync
            + 'static,
    {
        self.register(
            entry_point,
            PluginKind::QualityCheck,
            Box::new(move |manifest| Ok(PluginInstance::QualityCheck(factory(manifest)?))),
        )
    }

    /// Registers an integration factory.
    pub fn register_integration<F>(
        &mut self,
        entry_point: impl Into<String>,
        factory: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(&PluginManifest) -> Result<Box<dyn IntegrationPlugin>, PluginError>
            + Send
            + Sync
            + 'static,
    {
        self.register(
            entry_point,
            PluginKind::Integration,
            Box::new(move |manifest| Ok(PluginInstance::Integration(factory(manifest)?))),
        )
    }

    /// Looks up the factory registered under `entry_point`.
    pub fn get(&self, entry_point: &str) -> Option<Arc<RegistryEntry>> {
        self.entries.get(entry_point).cloned()
    }

    /// Whether `entry_point` has a registered factory.
    pub fn contains(&self, entry_point: &str) -> bool {
        self.entries.contains_key(entry_point)
    }

    /// Number of registered entry points.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entry_points: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        entry_points.sort_unstable();
        f.debug_struct("PluginRegistry")
            .field("entry_points", &entry_points)
            .finish()
    }
}
