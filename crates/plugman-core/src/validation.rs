//! # Plugman Manifest Validation
//!
//! Value-level checks applied to a [`PluginManifest`] after loading.
//! [`ManifestValidator`] is pure: it never touches the filesystem and it
//! collects every issue it finds instead of stopping at the first, so a
//! plugin author sees the full list in one pass.

use thiserror::Error;

use crate::manifest::{PluginKind, PluginManifest};
use crate::version::VersionConstraint;

/// One problem found in a manifest.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationIssue {
    #[error("Plugin name must not be empty")]
    EmptyName,

    #[error("Plugin name '{name}' may only contain lowercase letters, digits, '-' and '_'")]
    InvalidName { name: String },

    #[error("{message}")]
    InvalidVersion { message: String },

    #[error("Unknown plugin type '{plugin_type}' (expected one of: hook, validator, quality_check, integration)")]
    UnknownType { plugin_type: String },

    #[error("Entry point must not be empty")]
    EmptyEntryPoint,

    #[error("Entry point '{entry_point}' is malformed: {reason}")]
    InvalidEntryPoint { entry_point: String, reason: String },

    #[error("Dependency #{index} has an empty name")]
    EmptyDependencyName { index: usize },

    #[error("Dependency '{dependency}': {message}")]
    InvalidDependencyConstraint { dependency: String, message: String },

    #[error("System version constraint is invalid: {message}")]
    InvalidSystemConstraint { message: String },

    #[error("Config field '{field}' declares unknown type '{field_type}'")]
    UnknownSchemaType { field: String, field_type: String },

    #[error("Config field '{field}' has a default that is not of type '{field_type}'")]
    SchemaDefaultMismatch { field: String, field_type: String },
}

/// Checks manifest values after loading.
#[derive(Debug, Default)]
pub struct ManifestValidator;

impl ManifestValidator {
    /// Creates a manifest validator.
    pub fn new() -> Self {
        ManifestValidator
    }

    /// Returns every issue found in `manifest`. An empty vec means the
    /// manifest is valid.
    pub fn validate(&self, manifest: &PluginManifest) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        Self::check_name(manifest, &mut issues);
        Self::check_version(manifest, &mut issues);
        Self::check_type(manifest, &mut issues);
        Self::check_entry_point(manifest, &mut issues);
        Self::check_dependencies(manifest, &mut issues);
        Self::check_system_constraint(manifest, &mut issues);
        Self::check_config_schema(manifest, &mut issues);
        issues
    }

    /// Whether `manifest` has no issues.
    pub fn is_valid(&self, manifest: &PluginManifest) -> bool {
        self.validate(manifest).is_empty()
    }

    fn check_name(manifest: &PluginManifest, issues: &mut Vec<ValidationIssue>) {
        if manifest.name.is_empty() {
            issues.push(ValidationIssue::EmptyName);
            return;
        }
        let allowed = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_';
        if !manifest.name.chars().all(allowed) {
            issues.push(ValidationIssue::InvalidName {
                name: manifest.name.clone(),
            });
        }
    }

    fn check_version(manifest: &PluginManifest, issues: &mut Vec<ValidationIssue>) {
        if let Err(err) = manifest.parsed_version() {
            issues.push(ValidationIssue::InvalidVersion {
                message: err.to_string(),
            });
        }
    }

    fn check_type(manifest: &PluginManifest, issues: &mut Vec<ValidationIssue>) {
        if manifest.kind().is_none() {
            issues.push(ValidationIssue::UnknownType {
                plugin_type: manifest.plugin_type.clone(),
            });
        }
    }

    fn check_entry_point(manifest: &PluginManifest, issues: &mut Vec<ValidationIssue>) {
        let entry_point = &manifest.entry_point;
        if entry_point.is_empty() {
            issues.push(ValidationIssue::EmptyEntryPoint);
            return;
        }
        let allowed = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == ':';
        if !entry_point.chars().all(allowed) {
            issues.push(ValidationIssue::InvalidEntryPoint {
                entry_point: entry_point.clone(),
                reason: "contains characters outside [A-Za-z0-9_.:]".to_string(),
            });
            return;
        }
        // A "module.Item" or "module:Item" reference with non-empty halves.
        let split = entry_point
            .split_once(':')
            .or_else(|| entry_point.rsplit_once('.'));
        match split {
            Some((module, item)) if !module.is_empty() && !item.is_empty() => {}
            _ => {
                issues.push(ValidationIssue::InvalidEntryPoint {
                    entry_point: entry_point.clone(),
                    reason: "expected a 'module.Item' reference with non-empty halves".to_string(),
                });
            }
        }
    }

    fn check_dependencies(manifest: &PluginManifest, issues: &mut Vec<ValidationIssue>) {
        for (index, dep) in manifest.dependencies.iter().enumerate() {
            if dep.name.is_empty() {
                issues.push(ValidationIssue::EmptyDependencyName { index });
            }
            if let Some(raw) = &dep.constraint {
                if let Err(err) = VersionConstraint::parse(raw) {
                    issues.push(ValidationIssue::InvalidDependencyConstraint {
                        dependency: dep.name.clone(),
                        message: err.to_string(),
                    });
                }
            }
        }
    }

    fn check_system_constraint(manifest: &PluginManifest, issues: &mut Vec<ValidationIssue>) {
        if let Some(raw) = &manifest.compatible_system_version {
            if let Err(err) = VersionConstraint::parse(raw) {
                issues.push(ValidationIssue::InvalidSystemConstraint {
                    message: err.to_string(),
                });
            }
        }
    }

    fn check_config_schema(manifest: &PluginManifest, issues: &mut Vec<ValidationIssue>) {
        for (field, spec) in &manifest.config_schema {
            let Some(kind) = spec.kind() else {
                issues.push(ValidationIssue::UnknownSchemaType {
                    field: field.clone(),
                    field_type: spec.field_type.clone(),
                });
                continue;
            };
            if let Some(default) = &spec.default {
                if !kind.matches(default) {
                    issues.push(ValidationIssue::SchemaDefaultMismatch {
                        field: field.clone(),
                        field_type: spec.field_type.clone(),
                    });
                }
            }
        }
    }
}
