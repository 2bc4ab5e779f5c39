// crates/plugman-core/src/tests/common.rs
#![cfg(test)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use crate::config::{ConfigManager, PluginConfig};
use crate::manager::PluginManager;
use crate::registry::PluginRegistry;
use crate::traits::{
    CheckOutcome, HookPlugin, Plugin, PluginContext, PluginError, QualityCheckPlugin,
    ValidatorPlugin,
};
use crate::version;

/// Shared lifecycle log the test plugins append to.
pub type LifecycleLog = Arc<Mutex<Vec<String>>>;

pub fn lifecycle_log() -> LifecycleLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn log_entries(log: &LifecycleLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

// ===== TEST PLUGINS =====

/// A hook plugin that records every lifecycle call it receives, with
/// switches to fail `initialize` or `validate` on demand.
pub struct RecordingHook {
    name: String,
    log: LifecycleLog,
    fail_init: bool,
    fail_validate: bool,
    greeting: Option<String>,
}

impl RecordingHook {
    pub fn new(name: &str, log: LifecycleLog) -> Self {
        RecordingHook {
            name: name.to_string(),
            log,
            fail_init: false,
            fail_validate: false,
            greeting: None,
        }
    }

    pub fn failing_init(name: &str, log: LifecycleLog) -> Self {
        RecordingHook {
            fail_init: true,
            ..RecordingHook::new(name, log)
        }
    }

    pub fn failing_validate(name: &str, log: LifecycleLog) -> Self {
        RecordingHook {
            fail_validate: true,
            ..RecordingHook::new(name, log)
        }
    }

    fn record(&self, event: &str) {
        self.log.lock().unwrap().push(format!("{}:{}", self.name, event));
    }
}

impl Plugin for RecordingHook {
    fn initialize(&mut self, config: &PluginConfig) -> Result<(), PluginError> {
        if self.fail_init {
            self.record("init-failed");
            return Err(PluginError::Init("configured to fail".to_string()));
        }
        self.greeting = config
            .get("greeting")
            .and_then(Value::as_str)
            .map(String::from);
        match &self.greeting {
            Some(greeting) => self.record(&format!("init[{greeting}]")),
            None => self.record("init"),
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), PluginError> {
        if self.fail_validate {
            return Err(PluginError::Validate("configured to fail".to_string()));
        }
        self.record("validate");
        Ok(())
    }

    fn execute(&mut self, _context: &PluginContext) -> Result<Value, PluginError> {
        self.record("execute");
        Ok(json!({ "plugin": self.name }))
    }

    fn cleanup(&mut self) {
        self.record("cleanup");
    }
}

impl HookPlugin for RecordingHook {
    fn hook_config(&self) -> Value {
        json!({ "events": ["test"] })
    }
}

/// A validator plugin accepting strings up to a configured length.
#[derive(Default)]
pub struct LengthValidator {
    max_length: usize,
    errors: Vec<String>,
}

impl Plugin for LengthValidator {
    fn initialize(&mut self, config: &PluginConfig) -> Result<(), PluginError> {
        self.max_length = config
            .get("max_length")
            .and_then(Value::as_u64)
            .unwrap_or(10) as usize;
        Ok(())
    }

    fn validate(&self) -> Result<(), PluginError> {
        Ok(())
    }

    fn execute(&mut self, context: &PluginContext) -> Result<Value, PluginError> {
        let input = context.get("input").cloned().unwrap_or(Value::Null);
        Ok(Value::Bool(self.validate_input(&input)))
    }
}

impl ValidatorPlugin for LengthValidator {
    fn validate_input(&mut self, input: &Value) -> bool {
        self.errors.clear();
        match input.as_str() {
            Some(text) if text.len() <= self.max_length => true,
            Some(text) => {
                self.errors
                    .push(format!("input is {} chars, max is {}", text.len(), self.max_length));
                false
            }
            None => {
                self.errors.push("input must be a string".to_string());
                false
            }
        }
    }

    fn validation_errors(&self) -> &[String] {
        &self.errors
    }
}

/// A quality check that always passes.
pub struct AlwaysPassCheck;

impl Plugin for AlwaysPassCheck {
    fn initialize(&mut self, _config: &PluginConfig) -> Result<(), PluginError> {
        Ok(())
    }

    fn validate(&self) -> Result<(), PluginError> {
        Ok(())
    }

    fn execute(&mut self, _context: &PluginContext) -> Result<Value, PluginError> {
        Ok(Value::Bool(true))
    }
}

impl QualityCheckPlugin for AlwaysPassCheck {
    fn run_check(&mut self) -> CheckOutcome {
        CheckOutcome::pass("nothing to report")
    }
}

// ===== FIXTURES =====

/// A registry with one factory per test entry point.
pub fn test_registry(log: &LifecycleLog) -> PluginRegistry {
    let mut registry = PluginRegistry::new();

    let l = log.clone();
    registry
        .register_hook("test.RecordingHook", move |manifest| {
            Ok(Box::new(RecordingHook::new(&manifest.name, l.clone())))
        })
        .unwrap();

    let l = log.clone();
    registry
        .register_hook("test.FailingInit", move |manifest| {
            Ok(Box::new(RecordingHook::failing_init(&manifest.name, l.clone())))
        })
        .unwrap();

    let l = log.clone();
    registry
        .register_hook("test.FailingValidate", move |manifest| {
            Ok(Box::new(RecordingHook::failing_validate(&manifest.name, l.clone())))
        })
        .unwrap();

    registry
        .register_validator("test.LengthValidator", |_| {
            Ok(Box::new(LengthValidator::default()))
        })
        .unwrap();

    registry
        .register_quality_check("test.AlwaysPass", |_| Ok(Box::new(AlwaysPassCheck)))
        .unwrap();

    registry
}

/// Writes `manifest` as `<root>/<dir>/plugin.json` and returns its path.
pub fn write_plugin(root: &Path, dir: &str, manifest: &Value) -> PathBuf {
    let dir_path = root.join(dir);
    fs::create_dir_all(&dir_path).unwrap();
    let path = dir_path.join("plugin.json");
    fs::write(&path, serde_json::to_string_pretty(manifest).unwrap()).unwrap();
    path
}

/// A hook manifest body using the recording entry point.
pub fn hook_manifest(name: &str, dependencies: &[(&str, Option<&str>)]) -> Value {
    let deps: Vec<Value> = dependencies
        .iter()
        .map(|(dep, constraint)| match constraint {
            Some(constraint) => json!({ "name": dep, "version": constraint }),
            None => json!({ "name": dep }),
        })
        .collect();
    json!({
        "name": name,
        "version": "1.0.0",
        "type": "hook",
        "entry_point": "test.RecordingHook",
        "dependencies": deps,
    })
}

/// A manager over `<root>/plugins` with its config store at
/// `<root>/config.json`.
pub fn manager_at(root: &Path, system: &str, log: &LifecycleLog) -> PluginManager {
    let config = ConfigManager::open(root.join("config.json")).unwrap();
    PluginManager::new(
        vec![root.join("plugins")],
        version::parse(system).unwrap(),
        test_registry(log),
        config,
    )
}
