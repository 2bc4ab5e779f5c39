//! # Plugman Plugin Manifests
//!
//! Defines [`PluginManifest`], the in-memory form of a `plugin.json` /
//! `plugin.yaml` file, together with [`ManifestBuilder`] for constructing
//! manifests in code and [`ManifestLoader`] for reading them from disk.
//!
//! Loading is shape-only: it fails when the file cannot be read or parsed,
//! or when a required key is absent. Value-level checks (name charset,
//! version syntax, known plugin type) belong to
//! [`ManifestValidator`](crate::validation::ManifestValidator).

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::version::{Version, VersionConstraint, VersionError};

/// The plugin kinds understood by the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginKind {
    /// Reacts to named events raised by the host application.
    Hook,
    /// Judges whether an input value is acceptable.
    Validator,
    /// Runs a check and reports a pass/fail outcome.
    QualityCheck,
    /// Bridges to an external service.
    Integration,
}

impl PluginKind {
    /// Every kind, in manifest spelling order.
    pub const ALL: [PluginKind; 4] = [
        PluginKind::Hook,
        PluginKind::Validator,
        PluginKind::QualityCheck,
        PluginKind::Integration,
    ];

    /// The manifest spelling of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginKind::Hook => "hook",
            PluginKind::Validator => "validator",
            PluginKind::QualityCheck => "quality_check",
            PluginKind::Integration => "integration",
        }
    }

    /// Parses a manifest `type` value, returning `None` for unknown kinds.
    pub fn from_str(value: &str) -> Option<PluginKind> {
        match value {
            "hook" => Some(PluginKind::Hook),
            "validator" => Some(PluginKind::Validator),
            "quality_check" => Some(PluginKind::QualityCheck),
            "integration" => Some(PluginKind::Integration),
            _ => None,
        }
    }
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A dependency declaration naming another plugin and an optional
/// version constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestDependency {
    /// Name of the plugin depended on.
    pub name: String,
    /// Version constraint the dependency must satisfy, if any.
    pub constraint: Option<String>,
}

impl ManifestDependency {
    /// Creates a new dependency declaration.
    pub fn new(name: impl Into<String>, constraint: Option<&str>) -> Self {
        ManifestDependency {
            name: name.into(),
            constraint: constraint.map(String::from),
        }
    }

    /// Parses the declared constraint, if present.
    pub fn parsed_constraint(&self) -> Result<Option<VersionConstraint>, VersionError> {
        match &self.constraint {
            Some(raw) => Ok(Some(VersionConstraint::parse(raw)?)),
            None => Ok(None),
        }
    }
}

impl fmt::Display for ManifestDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.constraint {
            Some(constraint) => write!(f, "Requires plugin: {} (version: {})", self.name, constraint),
            None => write!(f, "Requires plugin: {} (any version)", self.name),
        }
    }
}

/// Value types a config schema field may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigValueKind {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ConfigValueKind {
    /// The schema spelling of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigValueKind::String => "string",
            ConfigValueKind::Integer => "integer",
            ConfigValueKind::Number => "number",
            ConfigValueKind::Boolean => "boolean",
            ConfigValueKind::Array => "array",
            ConfigValueKind::Object => "object",
        }
    }

    /// Parses a schema `type` value, returning `None` for unknown kinds.
    pub fn from_str(value: &str) -> Option<ConfigValueKind> {
        match value {
            "string" => Some(ConfigValueKind::String),
            "integer" => Some(ConfigValueKind::Integer),
            "number" => Some(ConfigValueKind::Number),
            "boolean" => Some(ConfigValueKind::Boolean),
            "array" => Some(ConfigValueKind::Array),
            "object" => Some(ConfigValueKind::Object),
            _ => None,
        }
    }

    /// Whether `value` inhabits this kind. Integers accept whole numbers
    /// only, while `number` accepts any JSON number.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ConfigValueKind::String => value.is_string(),
            ConfigValueKind::Integer => value.is_i64() || value.is_u64(),
            ConfigValueKind::Number => value.is_number(),
            ConfigValueKind::Boolean => value.is_boolean(),
            ConfigValueKind::Array => value.is_array(),
            ConfigValueKind::Object => value.is_object(),
        }
    }
}

impl fmt::Display for ConfigValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Schema entry for one config field: declared type, optional default,
/// and whether a value must be present.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConfigFieldSpec {
    /// Declared value type, e.g. `"string"` or `"integer"`. Kept as the
    /// raw string so the validator can report unknown types.
    #[serde(rename = "type")]
    pub field_type: String,
    /// Default used when no stored value exists.
    #[serde(default)]
    pub default: Option<Value>,
    /// Whether a value must be present after defaults are applied.
    #[serde(default)]
    pub required: bool,
}

impl ConfigFieldSpec {
    /// Creates a spec of the given type with no default, not required.
    pub fn new(field_type: impl Into<String>) -> Self {
        ConfigFieldSpec {
            field_type: field_type.into(),
            default: None,
            required: false,
        }
    }

    /// Sets the default value for this field.
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Marks this field as required.
    pub fn require(mut self) -> Self {
        self.required = true;
        self
    }

    /// The declared type, if it names a known kind.
    pub fn kind(&self) -> Option<ConfigValueKind> {
        ConfigValueKind::from_str(&self.field_type)
    }
}

/// In-memory form of a plugin manifest file.
///
/// `version`, `plugin_type` and `compatible_system_version` are kept as
/// the raw strings read from disk; the typed accessors parse them on
/// demand and the validator reports on their contents.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginManifest {
    /// Unique plugin name (lowercase letters, digits, `-` and `_`).
    pub name: String,
    /// Declared plugin version, expected to be semantic-version syntax.
    pub version: String,
    /// Declared plugin kind, one of [`PluginKind::ALL`] once validated.
    pub plugin_type: String,
    /// Registry key naming the factory that builds this plugin.
    pub entry_point: String,
    /// Plugins this plugin depends on.
    pub dependencies: Vec<ManifestDependency>,
    /// Constraint on the manager version this plugin can run under.
    pub compatible_system_version: Option<String>,
    /// Schema for the plugin's config object, keyed by field name.
    pub config_schema: BTreeMap<String, ConfigFieldSpec>,
    /// Human-readable description of the plugin.
    pub description: String,
    /// Plugin author.
    pub author: String,
    /// License identifier, if declared.
    pub license: Option<String>,
    /// Project homepage, if declared.
    pub homepage: Option<String>,
    /// Free-form classification tags.
    pub tags: Vec<String>,
}

impl PluginManifest {
    /// Creates a manifest with the required fields set and everything
    /// else empty.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        kind: PluginKind,
        entry_point: impl Into<String>,
    ) -> Self {
        PluginManifest {
            name: name.into(),
            version: version.into(),
            plugin_type: kind.as_str().to_string(),
            entry_point: entry_point.into(),
            dependencies: Vec::new(),
            compatible_system_version: None,
            config_schema: BTreeMap::new(),
            description: String::new(),
            author: String::new(),
            license: None,
            homepage: None,
            tags: Vec::new(),
        }
    }

    /// The declared plugin type, if it names a known kind.
    pub fn kind(&self) -> Option<PluginKind> {
        PluginKind::from_str(&self.plugin_type)
    }

    /// Parses the declared plugin version.
    pub fn parsed_version(&self) -> Result<Version, VersionError> {
        crate::version::parse(&self.version)
    }

    /// Parses the declared system-version constraint, if present.
    pub fn system_constraint(&self) -> Result<Option<VersionConstraint>, VersionError> {
        match &self.compatible_system_version {
            Some(raw) => Ok(Some(VersionConstraint::parse(raw)?)),
            None => Ok(None),
        }
    }

    /// Names of the plugins this manifest depends on.
    pub fn dependency_names(&self) -> impl Iterator<Item = &str> {
        self.dependencies.iter().map(|dep| dep.name.as_str())
    }

    /// Adds a dependency on another plugin.
    pub fn add_dependency(&mut self, name: impl Into<String>, constraint: Option<&str>) -> &mut Self {
        self.dependencies.push(ManifestDependency::new(name, constraint));
        self
    }

    /// Adds a classification tag.
    pub fn add_tag(&mut self, tag: impl Into<String>) -> &mut Self {
        self.tags.push(tag.into());
        self
    }
}

/// Fluent builder for [`PluginManifest`], used by tests and built-in
/// plugins that register their manifests in code.
pub struct ManifestBuilder {
    manifest: PluginManifest,
}

impl ManifestBuilder {
    /// Starts a builder with the required manifest fields.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        kind: PluginKind,
        entry_point: impl Into<String>,
    ) -> Self {
        ManifestBuilder {
            manifest: PluginManifest::new(name, version, kind, entry_point),
        }
    }

    /// Sets the plugin description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.manifest.description = description.into();
        self
    }

    /// Sets the plugin author.
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.manifest.author = author.into();
        self
    }

    /// Sets the license identifier.
    pub fn license(mut self, license: impl Into<String>) -> Self {
        self.manifest.license = Some(license.into());
        self
    }

    /// Sets the project homepage.
    pub fn homepage(mut self, homepage: impl Into<String>) -> Self {
        self.manifest.homepage = Some(homepage.into());
        self
    }

    /// Adds a classification tag.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.manifest.tags.push(tag.into());
        self
    }

    /// Adds a dependency on another plugin.
    pub fn dependency(mut self, name: impl Into<String>, constraint: Option<&str>) -> Self {
        self.manifest.add_dependency(name, constraint);
        self
    }

    /// Declares the manager versions this plugin is compatible with.
    pub fn system_version(mut self, constraint: impl Into<String>) -> Self {
        self.manifest.compatible_system_version = Some(constraint.into());
        self
    }

    /// Adds one config schema field.
    pub fn config_field(mut self, name: impl Into<String>, spec: ConfigFieldSpec) -> Self {
        self.manifest.config_schema.insert(name.into(), spec);
        self
    }

    /// Finishes the build.
    pub fn build(self) -> PluginManifest {
        self.manifest
    }
}

/// Errors produced while reading a manifest file.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to read manifest '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse manifest '{path}': {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Manifest '{path}' is missing required key '{key}'")]
    MissingKey { path: PathBuf, key: String },

    #[error("Manifest '{path}' has unsupported format '{extension}' (expected json, yaml or yml)")]
    UnsupportedFormat { path: PathBuf, extension: String },
}

/// Shape of a manifest file on disk, before required keys are checked.
#[derive(Debug, Deserialize)]
struct RawManifest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default, rename = "type")]
    plugin_type: Option<String>,
    #[serde(default)]
    entry_point: Option<String>,
    #[serde(default)]
    dependencies: Vec<RawDependency>,
    #[serde(default)]
    compatible_system_version: Option<String>,
    #[serde(default)]
    config_schema: BTreeMap<String, ConfigFieldSpec>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    license: Option<String>,
    #[serde(default)]
    homepage: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

/// Shape of one dependency entry. The constraint key accepts both
/// `version_constraint` and the shorter `version`.
#[derive(Debug, Deserialize)]
struct RawDependency {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, alias = "version")]
    version_constraint: Option<String>,
}

/// Reads manifest files from disk.
///
/// JSON is always supported; YAML support comes with the `yaml-config`
/// feature, which is part of the default feature set.
#[derive(Debug, Default)]
pub struct ManifestLoader;

impl ManifestLoader {
    /// Creates a manifest loader.
    pub fn new() -> Self {
        ManifestLoader
    }

    /// Loads the manifest at `path`, dispatching on the file extension.
    pub fn load(&self, path: &Path) -> Result<PluginManifest, ManifestError> {
        let text = fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let raw = Self::parse(path, &text)?;
        Self::finish(path, raw)
    }

    fn parse(path: &Path, text: &str) -> Result<RawManifest, ManifestError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match extension.as_str() {
            "json" => serde_json::from_str(text).map_err(|err| ManifestError::Parse {
                path: path.to_path_buf(),
                message: err.to_string(),
            }),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => serde_yaml::from_str(text).map_err(|err| ManifestError::Parse {
                path: path.to_path_buf(),
                message: err.to_string(),
            }),
            other => Err(ManifestError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension: other.to_string(),
            }),
        }
    }

    fn finish(path: &Path, raw: RawManifest) -> Result<PluginManifest, ManifestError> {
        let name = Self::require(path, raw.name, "name")?;
        let version = Self::require(path, raw.version, "version")?;
        let plugin_type = Self::require(path, raw.plugin_type, "type")?;
        let entry_point = Self::require(path, raw.entry_point, "entry_point")?;

        let mut dependencies = Vec::with_capacity(raw.dependencies.len());
        for (index, dep) in raw.dependencies.into_iter().enumerate() {
            let dep_name = dep.name.ok_or_else(|| ManifestError::MissingKey {
                path: path.to_path_buf(),
                key: format!("dependencies[{index}].name"),
            })?;
            dependencies.push(ManifestDependency {
                name: dep_name,
                constraint: dep.version_constraint,
            });
        }

        Ok(PluginManifest {
            name,
            version,
            plugin_type,
            entry_point,
            dependencies,
            compatible_system_version: raw.compatible_system_version,
            config_schema: raw.config_schema,
            description: raw.description.unwrap_or_default(),
            author: raw.author.unwrap_or_default(),
            license: raw.license,
            homepage: raw.homepage,
            tags: raw.tags,
        })
    }

    fn require(path: &Path, value: Option<String>, key: &str) -> Result<String, ManifestError> {
        value.ok_or_else(|| ManifestError::MissingKey {
            path: path.to_path_buf(),
            key: key.to_string(),
        })
    }
}
