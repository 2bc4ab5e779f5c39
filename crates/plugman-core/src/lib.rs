//! # Plugman Core
//!
//! The plugin dependency-resolution and loading subsystem behind the
//! `plugin-manager` CLI. Hosts embed it by building a [`PluginRegistry`]
//! of factories, wiring a [`PluginManager`] over their plugin
//! directories, and driving discovery and loading:
//!
//! discovery finds `plugin.json`/`plugin.yaml` manifests, the loader and
//! validator turn them into records, the version checker gates on system
//! compatibility, the dependency resolver computes a load order, and the
//! manager drives each plugin through `initialize`/`validate` with its
//! validated configuration. Per-plugin failures are collected into
//! reports instead of aborting the run.

pub mod config;
pub mod constants;
pub mod discovery;
pub mod error;
pub mod loader;
pub mod manager;
pub mod manifest;
pub mod registry;
pub mod resolver;
pub mod traits;
pub mod validation;
pub mod version;

// Re-export the types most embedders need.
pub use config::{ConfigError, ConfigManager, PluginConfig};
pub use error::{Error, Result};
pub use loader::{LoadError, PluginLoader};
pub use manager::{
    DiscoveryReport, LoadReport, ManagerState, PluginManager, PluginRecord, PluginStatus,
};
pub use manifest::{
    ConfigFieldSpec, ManifestBuilder, ManifestDependency, ManifestError, ManifestLoader,
    PluginKind, PluginManifest,
};
pub use registry::{PluginRegistry, RegistryError};
pub use resolver::{DependencyError, DependencyResolver, DependencyTree};
pub use traits::{
    CheckOutcome, HookPlugin, IntegrationPlugin, Plugin, PluginContext, PluginError,
    PluginInstance, QualityCheckPlugin, ValidatorPlugin,
};
pub use validation::{ManifestValidator, ValidationIssue};
pub use version::{Version, VersionChecker, VersionConstraint, VersionError};

#[cfg(test)]
mod tests;
