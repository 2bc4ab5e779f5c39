//! # Plugman Plugin Traits
//!
//! The lifecycle contract every plugin implements, one extension trait per
//! plugin kind, and [`PluginInstance`], the tagged value the registry and
//! loader traffic in. Dispatching on an enum keeps the set of kinds closed,
//! so the manager can match on kind without downcasting.

use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::PluginConfig;
use crate::manifest::PluginKind;

/// Error type for plugin lifecycle operations.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("Plugin construction error: {0}")]
    Construction(String),

    #[error("Plugin initialization error: {0}")]
    Init(String),

    #[error("Plugin validation error: {0}")]
    Validate(String),

    #[error("Plugin execution error: {0}")]
    Execution(String),

    #[error("Plugin connection error: {0}")]
    Connection(String),
}

/// Execution context handed to [`Plugin::execute`].
///
/// A bag of named JSON values, so the host can pass whatever a given
/// plugin expects without a shared compile-time type.
#[derive(Debug, Clone, Default)]
pub struct PluginContext {
    values: Map<String, Value>,
}

impl PluginContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        PluginContext::default()
    }

    /// Adds a named value, consuming and returning the context.
    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    /// Inserts a named value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Looks up a named value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}

/// Lifecycle contract shared by every plugin.
///
/// The manager drives instances through initialize, validate and cleanup;
/// execute may be called any number of times in between.
pub trait Plugin: Send {
    /// Prepares the plugin with its resolved configuration.
    fn initialize(&mut self, config: &PluginConfig) -> Result<(), PluginError>;

    /// Checks that the plugin is ready to execute.
    fn validate(&self) -> Result<(), PluginError>;

    /// Runs the plugin's main operation.
    fn execute(&mut self, context: &PluginContext) -> Result<Value, PluginError>;

    /// Releases resources before unload. Must not fail.
    fn cleanup(&mut self) {}
}

/// A plugin that reacts to named events raised by the host.
pub trait HookPlugin: Plugin {
    /// Describes which events this hook handles and how.
    fn hook_config(&self) -> Value;
}

/// A plugin that judges whether an input value is acceptable.
pub trait ValidatorPlugin: Plugin {
    /// Checks `input`, recording any errors for later retrieval.
    fn validate_input(&mut self, input: &Value) -> bool;

    /// Errors recorded by the most recent `validate_input` call.
    fn validation_errors(&self) -> &[String];
}

/// Outcome of one quality check run.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    /// Whether the check passed.
    pub passed: bool,
    /// Detail line explaining the outcome.
    pub message: String,
}

impl CheckOutcome {
    /// A passing outcome with the given detail message.
    pub fn pass(message: impl Into<String>) -> Self {
        CheckOutcome {
            passed: true,
            message: message.into(),
        }
    }

    /// A failing outcome with the given detail message.
    pub fn fail(message: impl Into<String>) -> Self {
        CheckOutcome {
            passed: false,
            message: message.into(),
        }
    }

    /// Two-line report for this outcome, labelled with the check name.
    pub fn report(&self, check_name: &str) -> String {
        let marker = if self.passed { "\u{2713} PASS" } else { "\u{2717} FAIL" };
        format!("{}: {}\n  {}", marker, check_name, self.message)
    }
}

/// A plugin that runs a check and reports a pass/fail outcome.
pub trait QualityCheckPlugin: Plugin {
    /// Runs the check.
    fn run_check(&mut self) -> CheckOutcome;
}

/// A plugin that bridges to an external service.
pub trait IntegrationPlugin: Plugin {
    /// Establishes the connection to the external service.
    fn connect(&mut self) -> Result<(), PluginError>;

    /// Tears the connection down. Must not fail.
    fn disconnect(&mut self);

    /// Whether the external service is currently reachable.
    fn is_available(&self) -> bool;
}

/// A constructed plugin, tagged by kind.
pub enum PluginInstance {
    Hook(Box<dyn HookPlugin>),
    Validator(Box<dyn ValidatorPlugin>),
    QualityCheck(Box<dyn QualityCheckPlugin>),
    Integration(Box<dyn IntegrationPlugin>),
}

impl PluginInstance {
    /// The kind tag of this instance.
    pub fn kind(&self) -> PluginKind {
        match self {
            PluginInstance::Hook(_) => PluginKind::Hook,
            PluginInstance::Validator(_) => PluginKind::Validator,
            PluginInstance::QualityCheck(_) => PluginKind::QualityCheck,
            PluginInstance::Integration(_) => PluginKind::Integration,
        }
    }

    /// Prepares the plugin with its resolved configuration.
    pub fn initialize(&mut self, config: &PluginConfig) -> Result<(), PluginError> {
        match self {
            PluginInstance::Hook(p) => p.initialize(config),
            PluginInstance::Validator(p) => p.initialize(config),
            PluginInstance::QualityCheck(p) => p.initialize(config),
            PluginInstance::Integration(p) => p.initialize(config),
        }
    }

    /// Checks that the plugin is ready to execute.
    pub fn validate(&self) -> Result<(), PluginError> {
        match self {
            PluginInstance::Hook(p) => p.validate(),
            PluginInstance::Validator(p) => p.validate(),
            PluginInstance::QualityCheck(p) => p.validate(),
            PluginInstance::Integration(p) => p.validate(),
        }
    }

    /// Runs the plugin's main operation.
    pub fn execute(&mut self, context: &PluginContext) -> Result<Value, PluginError> {
        match self {
            PluginInstance::Hook(p) => p.execute(context),
            PluginInstance::Validator(p) => p.execute(context),
            PluginInstance::QualityCheck(p) => p.execute(context),
            PluginInstance::Integration(p) => p.execute(context),
        }
    }

    /// Releases resources before unload.
    pub fn cleanup(&mut self) {
        match self {
            PluginInstance::Hook(p) => p.cleanup(),
            PluginInstance::Validator(p) => p.cleanup(),
            PluginInstance::QualityCheck(p) => p.cleanup(),
            PluginInstance::Integration(p) => p.cleanup(),
        }
    }

    /// Kind-specific access for hooks.
    pub fn as_hook(&self) -> Option<&dyn HookPlugin> {
        match self {
            PluginInstance::Hook(p) => Some(p.as_ref()),
            _ => None,
        }
    }

    /// Kind-specific access for validators.
    pub fn as_validator(&self) -> Option<&dyn ValidatorPlugin> {
        match self {
            PluginInstance::Validator(p) => Some(p.as_ref()),
            _ => None,
        }
    }

    /// Mutable kind-specific access for validators.
    pub fn as_validator_mut(&mut self) -> Option<&mut dyn ValidatorPlugin> {
        match self {
            PluginInstance::Validator(p) => Some(p.as_mut()),
            _ => None,
        }
    }

    /// Mutable kind-specific access for quality checks.
    pub fn as_quality_check_mut(&mut self) -> Option<&mut dyn QualityCheckPlugin> {
        match self {
            PluginInstance::QualityCheck(p) => Some(p.as_mut()),
            _ => None,
        }
    }

    /// Kind-specific access for integrations.
    pub fn as_integration(&self) -> Option<&dyn IntegrationPlugin> {
        match self {
            PluginInstance::Integration(p) => Some(p.as_ref()),
            _ => None,
        }
    }

    /// Mutable kind-specific access for integrations.
    pub fn as_integration_mut(&mut self) -> Option<&mut dyn IntegrationPlugin> {
        match self {
            PluginInstance::Integration(p) => Some(p.as_mut()),
            _ => None,
        }
    }
}

impl fmt::Debug for PluginInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PluginInstance({})", self.kind())
    }
}
