//! # Plugman Core Error Handling
//!
//! Defines [`Error`], the top-level error type aggregating the subsystem
//! errors, and the crate-wide [`Result`] alias. Each subsystem keeps its
//! own thiserror enum (manifest, version, dependency, registry, load,
//! config, plugin lifecycle) and converts into [`Error`] via `#[from]`,
//! so `?` works across subsystem boundaries.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::loader::LoadError;
use crate::manifest::ManifestError;
use crate::registry::RegistryError;
use crate::resolver::DependencyError;
use crate::traits::PluginError;
use crate::version::VersionError;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error for plugin manager operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error(transparent)]
    Dependency(#[from] DependencyError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error("Unknown plugin: {0}")]
    UnknownPlugin(String),

    #[error("I/O error during '{operation}' on '{path}': {source}")]
    Io {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Creates an [`Error::Io`] tagged with the failed operation and path.
    pub fn io(source: std::io::Error, operation: impl Into<String>, path: PathBuf) -> Self {
        Error::Io {
            path,
            operation: operation.into(),
            source,
        }
    }
}

impl From<&str> for Error {
    fn from(message: &str) -> Self {
        Error::Other(message.to_string())
    }
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Error::Other(message)
    }
}
