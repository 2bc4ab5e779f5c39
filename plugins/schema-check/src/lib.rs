//! # Schema Check Plugin
//!
//! Built-in quality check that verifies the configured schema
//! directories exist and contain at least one schema file. The
//! directories come from the `schema_paths` config field and default to
//! a single `schemas` directory relative to the working directory.

use std::path::{Path, PathBuf};

use plugman_core::config::PluginConfig;
use plugman_core::registry::{PluginRegistry, RegistryError};
use plugman_core::traits::{CheckOutcome, Plugin, PluginContext, PluginError, QualityCheckPlugin};
use serde_json::{json, Value};

/// Entry point this plugin registers under.
pub const ENTRY_POINT: &str = "schema_check.SchemaCheckPlugin";

/// File extensions counted as schema files.
const SCHEMA_EXTENSIONS: &[&str] = &["json", "yaml"];

/// Checks that schema files exist in the configured directories.
#[derive(Debug, Default)]
pub struct SchemaCheckPlugin {
    schema_paths: Vec<PathBuf>,
}

impl SchemaCheckPlugin {
    pub fn new() -> Self {
        SchemaCheckPlugin::default()
    }

    fn schema_files_in(path: &Path) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(path) else {
            return Vec::new();
        };
        let mut files: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|candidate| {
                candidate.is_file()
                    && candidate
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .is_some_and(|ext| SCHEMA_EXTENSIONS.contains(&ext))
            })
            .collect();
        files.sort();
        files
    }
}

impl Plugin for SchemaCheckPlugin {
    fn initialize(&mut self, config: &PluginConfig) -> Result<(), PluginError> {
        self.schema_paths = match config.get("schema_paths") {
            Some(Value::Array(paths)) => paths
                .iter()
                .filter_map(Value::as_str)
                .map(PathBuf::from)
                .collect(),
            _ => vec![PathBuf::from("schemas")],
        };
        log::debug!("Schema check watching {} path(s)", self.schema_paths.len());
        Ok(())
    }

    fn validate(&self) -> Result<(), PluginError> {
        if self.schema_paths.is_empty() {
            return Err(PluginError::Validate(
                "schema_paths resolved to an empty list".to_string(),
            ));
        }
        Ok(())
    }

    fn execute(&mut self, _context: &PluginContext) -> Result<Value, PluginError> {
        let outcome = self.run_check();
        Ok(json!({ "passed": outcome.passed, "message": outcome.message }))
    }
}

impl QualityCheckPlugin for SchemaCheckPlugin {
    fn run_check(&mut self) -> CheckOutcome {
        let mut missing_dirs: Vec<String> = Vec::new();
        let mut found = 0usize;

        for path in &self.schema_paths {
            if !path.exists() {
                missing_dirs.push(path.display().to_string());
            } else {
                found += Self::schema_files_in(path).len();
            }
        }

        if !missing_dirs.is_empty() {
            return CheckOutcome::fail(format!(
                "Missing schema directories: {}",
                missing_dirs.join(", ")
            ));
        }
        if found == 0 {
            return CheckOutcome::fail("No schema files found in configured paths");
        }
        CheckOutcome::pass(format!("Found {found} schema file(s)"))
    }
}

/// Registers this plugin's factory under [`ENTRY_POINT`].
pub fn register(registry: &mut PluginRegistry) -> Result<(), RegistryError> {
    registry.register_quality_check(ENTRY_POINT, |_| Ok(Box::new(SchemaCheckPlugin::new())))
}
