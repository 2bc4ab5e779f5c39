//! # Plugman Plugin Configuration
//!
//! Per-plugin runtime configuration. [`PluginConfig`] is one plugin's
//! config object with dotted-path lookups, nested sets and deep merging;
//! [`ConfigManager`] owns every plugin's config, backed by a single
//! aggregate JSON file mapping plugin name to config object.
//!
//! Plugins never touch the store themselves: the manager loads a config,
//! validates it against the manifest's schema, and hands the result to
//! `initialize`. Writes go through a temp file and an atomic rename, so a
//! crash mid-save never leaves a half-written store behind.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::manifest::PluginManifest;

/// Reserved config key holding the persisted enabled/disabled flag.
/// Schema validation skips it.
pub const ENABLED_KEY: &str = "enabled";

/// Errors produced by config loading, validation and persistence.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config '{path}': {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Failed to write config '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config store '{path}' must be a JSON object of plugin configs")]
    NotAnObject { path: PathBuf },

    #[error("Plugin '{plugin}' config is missing required field '{field}'")]
    MissingRequired { plugin: String, field: String },

    #[error("Plugin '{plugin}' config field '{field}' is not of type '{expected}'")]
    TypeMismatch {
        plugin: String,
        field: String,
        expected: String,
    },
}

/// One plugin's configuration object.
///
/// Keys in lookups and sets may be dotted paths into nested objects,
/// e.g. `database.host`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PluginConfig {
    values: Map<String, Value>,
}

impl PluginConfig {
    /// Creates an empty config.
    pub fn new() -> Self {
        PluginConfig::default()
    }

    /// Wraps an existing JSON object.
    pub fn from_object(values: Map<String, Value>) -> Self {
        PluginConfig { values }
    }

    /// Looks a value up by dotted path.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let mut parts = key.split('.');
        let mut current = self.values.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    /// Sets a value by dotted path, creating intermediate objects as
    /// needed. A non-object value on the path is replaced by an object.
    /// Paths with an empty segment (`""`, `"a..b"`, `".x"`) are ignored:
    /// they can never be read back through [`PluginConfig::get`].
    pub fn set(&mut self, key: &str, value: Value) {
        let mut parts: Vec<&str> = key.split('.').collect();
        if parts.iter().any(|part| part.is_empty()) {
            return;
        }
        let last = parts.pop().unwrap_or(key);

        let mut current = &mut self.values;
        for part in parts {
            let slot = current
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            current = slot.as_object_mut().expect("slot was just made an object");
        }
        current.insert(last.to_string(), value);
    }

    /// Deep-merges `updates` into this config: nested objects merge
    /// key by key, everything else is replaced.
    pub fn update(&mut self, updates: &Map<String, Value>) {
        Self::deep_update(&mut self.values, updates);
    }

    fn deep_update(target: &mut Map<String, Value>, source: &Map<String, Value>) {
        for (key, value) in source {
            match (target.get_mut(key), value.as_object()) {
                (Some(Value::Object(existing)), Some(incoming)) => {
                    Self::deep_update(existing, incoming);
                }
                _ => {
                    target.insert(key.clone(), value.clone());
                }
            }
        }
    }

    /// The underlying JSON object.
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// This config as a JSON value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone())
    }

    /// Whether the config holds no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Owns every plugin's configuration, persisted to one aggregate JSON
/// file mapping plugin name to config object.
#[derive(Debug)]
pub struct ConfigManager {
    path: PathBuf,
    configs: BTreeMap<String, PluginConfig>,
}

impl ConfigManager {
    /// Opens the store at `path`, reading it if it exists. A missing
    /// file is an empty store, not an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let mut manager = ConfigManager {
            path,
            configs: BTreeMap::new(),
        };
        manager.reload()?;
        Ok(manager)
    }

    /// Path of the backing store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-reads the store from disk, replacing in-memory state.
    pub fn reload(&mut self) -> Result<(), ConfigError> {
        self.configs.clear();
        if !self.path.is_file() {
            return Ok(());
        }
        let text = fs::read_to_string(&self.path).map_err(|source| ConfigError::Read {
            path: self.path.clone(),
            source,
        })?;
        let root: Value = serde_json::from_str(&text).map_err(|err| ConfigError::Parse {
            path: self.path.clone(),
            message: err.to_string(),
        })?;
        let Value::Object(entries) = root else {
            return Err(ConfigError::NotAnObject {
                path: self.path.clone(),
            });
        };
        for (name, value) in entries {
            let Value::Object(values) = value else {
                return Err(ConfigError::NotAnObject {
                    path: self.path.clone(),
                });
            };
            self.configs.insert(name, PluginConfig::from_object(values));
        }
        Ok(())
    }

    /// Writes the store to disk atomically: serialize into a temp file
    /// next to the target, then rename over it.
    pub fn save(&self) -> Result<(), ConfigError> {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: self.path.clone(),
            source,
        })?;

        let mut root = Map::new();
        for (name, config) in &self.configs {
            root.insert(name.clone(), config.to_value());
        }
        let text = serde_json::to_string_pretty(&Value::Object(root)).map_err(|err| {
            ConfigError::Parse {
                path: self.path.clone(),
                message: err.to_string(),
            }
        })?;

        let mut temp = NamedTempFile::new_in(parent).map_err(|source| ConfigError::Write {
            path: self.path.clone(),
            source,
        })?;
        temp.write_all(text.as_bytes())
            .map_err(|source| ConfigError::Write {
                path: self.path.clone(),
                source,
            })?;
        temp.persist(&self.path).map_err(|err| ConfigError::Write {
            path: self.path.clone(),
            source: err.error,
        })?;
        log::debug!("Saved plugin config store '{}'", self.path.display());
        Ok(())
    }

    /// The persisted config for `plugin`, if any.
    pub fn config(&self, plugin: &str) -> Option<&PluginConfig> {
        self.configs.get(plugin)
    }

    /// Replaces `plugin`'s config wholesale.
    pub fn set_config(&mut self, plugin: impl Into<String>, config: PluginConfig) {
        self.configs.insert(plugin.into(), config);
    }

    /// Deep-merges `updates` into `plugin`'s config, creating it if
    /// absent.
    pub fn update_config(&mut self, plugin: &str, updates: &Map<String, Value>) {
        self.configs
            .entry(plugin.to_string())
            .or_default()
            .update(updates);
    }

    /// Removes `plugin`'s config. Returns whether one existed.
    pub fn delete_config(&mut self, plugin: &str) -> bool {
        self.configs.remove(plugin).is_some()
    }

    /// Every persisted config, keyed by plugin name.
    pub fn all_configs(&self) -> &BTreeMap<String, PluginConfig> {
        &self.configs
    }

    /// Dotted-path lookup into `plugin`'s persisted config.
    pub fn get(&self, plugin: &str, key: &str) -> Option<&Value> {
        self.configs.get(plugin)?.get(key)
    }

    /// Writes `plugin`'s config to a standalone JSON file.
    pub fn export_config(&self, plugin: &str, output: &Path) -> Result<(), ConfigError> {
        let value = self
            .configs
            .get(plugin)
            .map(PluginConfig::to_value)
            .unwrap_or_else(|| Value::Object(Map::new()));
        let text = serde_json::to_string_pretty(&value).map_err(|err| ConfigError::Parse {
            path: output.to_path_buf(),
            message: err.to_string(),
        })?;
        fs::write(output, text).map_err(|source| ConfigError::Write {
            path: output.to_path_buf(),
            source,
        })
    }

    /// Replaces `plugin`'s config with the contents of a standalone
    /// JSON file.
    pub fn import_config(&mut self, plugin: &str, input: &Path) -> Result<(), ConfigError> {
        let text = fs::read_to_string(input).map_err(|source| ConfigError::Read {
            path: input.to_path_buf(),
            source,
        })?;
        let value: Value = serde_json::from_str(&text).map_err(|err| ConfigError::Parse {
            path: input.to_path_buf(),
            message: err.to_string(),
        })?;
        let Value::Object(values) = value else {
            return Err(ConfigError::NotAnObject {
                path: input.to_path_buf(),
            });
        };
        self.configs
            .insert(plugin.to_string(), PluginConfig::from_object(values));
        Ok(())
    }

    /// Whether `plugin` is enabled. Plugins with no persisted flag are
    /// enabled.
    pub fn is_enabled(&self, plugin: &str) -> bool {
        self.get(plugin, ENABLED_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }

    /// Persists the enabled/disabled flag for `plugin`.
    pub fn set_enabled(&mut self, plugin: &str, enabled: bool) -> Result<(), ConfigError> {
        self.configs
            .entry(plugin.to_string())
            .or_default()
            .set(ENABLED_KEY, Value::Bool(enabled));
        self.save()
    }

    /// A config populated with every schema field's declared default.
    pub fn create_default_config(manifest: &PluginManifest) -> PluginConfig {
        let mut config = PluginConfig::new();
        for (field, spec) in &manifest.config_schema {
            if let Some(default) = &spec.default {
                config.set(field, default.clone());
            }
        }
        config
    }

    /// Builds the effective config for a plugin: schema defaults first,
    /// the persisted config merged over them, then schema validation.
    /// A schema violation fails here, before the plugin is initialized.
    pub fn load_config(&self, manifest: &PluginManifest) -> Result<PluginConfig, ConfigError> {
        let mut config = Self::create_default_config(manifest);
        if let Some(persisted) = self.configs.get(&manifest.name) {
            config.update(persisted.values());
        }
        Self::check_schema(manifest, &config)?;
        Ok(config)
    }

    fn check_schema(manifest: &PluginManifest, config: &PluginConfig) -> Result<(), ConfigError> {
        for (field, spec) in &manifest.config_schema {
            if field == ENABLED_KEY {
                continue;
            }
            match config.values().get(field) {
                Some(value) => {
                    if let Some(kind) = spec.kind() {
                        if !kind.matches(value) {
                            return Err(ConfigError::TypeMismatch {
                                plugin: manifest.name.clone(),
                                field: field.clone(),
                                expected: spec.field_type.clone(),
                            });
                        }
                    }
                }
                None if spec.required => {
                    return Err(ConfigError::MissingRequired {
                        plugin: manifest.name.clone(),
                        field: field.clone(),
                    });
                }
                None => {}
            }
        }
        Ok(())
    }
}
