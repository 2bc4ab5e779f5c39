//! # Plugman Plugin Manager
//!
//! The orchestrator tying the subsystem together: discovery finds
//! manifest files, the loader and validator turn them into records, the
//! version checker gates on system compatibility, the resolver orders the
//! survivors, and the plugin loader plus config manager bring each one to
//! `Active` through `initialize` and `validate`.
//!
//! Per-plugin failures never abort a run. Every failure is caught, the
//! plugin's record is marked `Failed` with the reason, and the run
//! continues with the next plugin in order; the reports collect the full
//! picture for the caller. Only infrastructure failures (an unreadable
//! search path, a corrupt config store) abort an operation and park the
//! manager in the `Error` state.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;

use crate::config::ConfigManager;
use crate::discovery::PluginDiscovery;
use crate::error::{Error, Result};
use crate::loader::{LoadError, PluginLoader};
use crate::manifest::{ManifestLoader, PluginKind, PluginManifest};
use crate::registry::PluginRegistry;
use crate::resolver::{DependencyError, DependencyResolver, DependencyTree};
use crate::traits::PluginInstance;
use crate::validation::ManifestValidator;
use crate::version::{Version, VersionChecker};

/// Where a plugin currently stands in its run lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginStatus {
    /// Manifest found and parsed.
    Discovered,
    /// Manifest passed structural validation.
    Validated,
    /// Placed in the resolved load order.
    Resolved,
    /// Instance built from its factory.
    Loaded,
    /// `initialize` succeeded.
    Initialized,
    /// `validate` succeeded; the plugin is usable.
    Active,
    /// Excluded by persisted config before resolution.
    Disabled,
    /// Explicitly unloaded after having been loaded.
    Unloaded,
    /// Failed somewhere; terminal for this run.
    Failed,
}

impl PluginStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginStatus::Discovered => "discovered",
            PluginStatus::Validated => "validated",
            PluginStatus::Resolved => "resolved",
            PluginStatus::Loaded => "loaded",
            PluginStatus::Initialized => "initialized",
            PluginStatus::Active => "active",
            PluginStatus::Disabled => "disabled",
            PluginStatus::Unloaded => "unloaded",
            PluginStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for PluginStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which phase the manager is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    Idle,
    Discovering,
    Validating,
    Resolving,
    Loading,
    Ready,
    Error,
}

impl fmt::Display for ManagerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ManagerState::Idle => "idle",
            ManagerState::Discovering => "discovering",
            ManagerState::Validating => "validating",
            ManagerState::Resolving => "resolving",
            ManagerState::Loading => "loading",
            ManagerState::Ready => "ready",
            ManagerState::Error => "error",
        };
        write!(f, "{name}")
    }
}

/// Everything the manager knows about one discovered plugin.
#[derive(Debug, Clone)]
pub struct PluginRecord {
    /// The parsed manifest.
    pub manifest: PluginManifest,
    /// Where the manifest was found.
    pub manifest_path: PathBuf,
    /// Current lifecycle status.
    pub status: PluginStatus,
    /// Failure reason, when status is `Failed`.
    pub failure: Option<String>,
}

/// Outcome of one `discover_plugins` pass.
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    /// Manifest files found by discovery.
    pub candidates: usize,
    /// Plugins that passed validation, in discovery order.
    pub validated: Vec<String>,
    /// Plugins excluded by their persisted enabled flag.
    pub disabled: Vec<String>,
    /// Parse and validation failures: plugin name (or manifest path when
    /// no name could be read) and reason.
    pub failures: Vec<(String, String)>,
}

impl DiscoveryReport {
    /// Whether every candidate validated cleanly.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for DiscoveryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Discovered {} candidate(s): {} valid, {} disabled, {} failed",
            self.candidates,
            self.validated.len(),
            self.disabled.len(),
            self.failures.len()
        )?;
        for (name, reason) in &self.failures {
            write!(f, "\n  {name}: {reason}")?;
        }
        Ok(())
    }
}

/// Outcome of one `load_all_plugins` pass.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Plugins brought to `Active`, in load order.
    pub active: Vec<String>,
    /// Plugins that failed, each with its load error.
    pub failed: Vec<(String, LoadError)>,
    /// Plugins skipped because they are disabled.
    pub skipped: Vec<String>,
}

impl LoadReport {
    /// Whether every attempted plugin is active.
    pub fn all_active(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Loaded {} plugin(s), {} failed, {} skipped",
            self.active.len(),
            self.failed.len(),
            self.skipped.len()
        )?;
        if !self.active.is_empty() {
            write!(f, "\n  active: {}", self.active.join(", "))?;
        }
        for (name, error) in &self.failed {
            write!(f, "\n  {name}: {error}")?;
        }
        Ok(())
    }
}

/// Orchestrates discovery, validation, resolution and loading.
///
/// An explicit instance the caller owns; there is no global registry.
pub struct PluginManager {
    discovery: PluginDiscovery,
    manifest_loader: ManifestLoader,
    validator: ManifestValidator,
    checker: VersionChecker,
    loader: PluginLoader,
    config: ConfigManager,
    state: ManagerState,
    records: Vec<PluginRecord>,
    instances: HashMap<String, PluginInstance>,
    load_order: Vec<String>,
}

impl PluginManager {
    /// Wires a manager from its collaborators. The registry must already
    /// hold a factory for every entry point the manifests will name.
    pub fn new(
        search_paths: Vec<PathBuf>,
        system_version: Version,
        registry: PluginRegistry,
        config: ConfigManager,
    ) -> Self {
        PluginManager {
            discovery: PluginDiscovery::new(search_paths),
            manifest_loader: ManifestLoader::new(),
            validator: ManifestValidator::new(),
            checker: VersionChecker::new(system_version),
            loader: PluginLoader::new(registry),
            config,
            state: ManagerState::Idle,
            records: Vec::new(),
            instances: HashMap::new(),
            load_order: Vec::new(),
        }
    }

    /// Current orchestration state.
    pub fn state(&self) -> ManagerState {
        self.state
    }

    /// The system version plugins are checked against.
    pub fn system_version(&self) -> &Version {
        self.checker.system_version()
    }

    /// Every discovered plugin record, in discovery order.
    pub fn records(&self) -> &[PluginRecord] {
        &self.records
    }

    /// The record for one plugin.
    pub fn record(&self, name: &str) -> Option<&PluginRecord> {
        self.records.iter().find(|r| r.manifest.name == name)
    }

    /// The config store.
    pub fn config(&self) -> &ConfigManager {
        &self.config
    }

    /// Mutable access to the config store.
    pub fn config_mut(&mut self) -> &mut ConfigManager {
        &mut self.config
    }

    /// Names of plugins currently active, in load order.
    pub fn active_plugins(&self) -> &[String] {
        &self.load_order
    }

    /// A loaded plugin instance.
    pub fn get_plugin(&self, name: &str) -> Option<&PluginInstance> {
        self.instances.get(name)
    }

    /// Mutable access to a loaded plugin instance.
    pub fn get_plugin_mut(&mut self, name: &str) -> Option<&mut PluginInstance> {
        self.instances.get_mut(name)
    }

    /// Names of active plugins of the given kind, in load order.
    pub fn plugins_by_kind(&self, kind: PluginKind) -> Vec<&str> {
        self.load_order
            .iter()
            .filter(|name| {
                self.instances
                    .get(name.as_str())
                    .is_some_and(|i| i.kind() == kind)
            })
            .map(String::as_str)
            .collect()
    }

    /// Scans the search paths and rebuilds the record set: parse every
    /// manifest found, validate it, and check the persisted enabled flag.
    /// All problems are collected into the report; none abort the pass.
    /// Calling this again on an unchanged tree yields the same records.
    pub fn discover_plugins(&mut self) -> Result<DiscoveryReport> {
        if !self.instances.is_empty() {
            self.shutdown();
        }
        self.state = ManagerState::Discovering;
        self.records.clear();
        self.load_order.clear();

        let paths = match self.discovery.discover() {
            Ok(paths) => paths,
            Err(err) => {
                self.state = ManagerState::Error;
                return Err(err);
            }
        };

        self.state = ManagerState::Validating;
        let mut report = DiscoveryReport {
            candidates: paths.len(),
            ..DiscoveryReport::default()
        };

        for path in paths {
            let manifest = match self.manifest_loader.load(&path) {
                Ok(manifest) => manifest,
                Err(err) => {
                    log::warn!("Skipping manifest '{}': {}", path.display(), err);
                    report.failures.push((path.display().to_string(), err.to_string()));
                    continue;
                }
            };

            if self.record(&manifest.name).is_some() {
                let reason = format!(
                    "Duplicate plugin name '{}' (first seen manifest wins)",
                    manifest.name
                );
                log::warn!("{reason}");
                report.failures.push((manifest.name.clone(), reason));
                continue;
            }

            let issues = self.validator.validate(&manifest);
            let name = manifest.name.clone();
            let (status, failure) = if !issues.is_empty() {
                let joined = issues
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                report.failures.push((name.clone(), joined.clone()));
                (PluginStatus::Failed, Some(joined))
            } else if !self.config.is_enabled(&name) {
                report.disabled.push(name.clone());
                (PluginStatus::Disabled, None)
            } else {
                report.validated.push(name.clone());
                (PluginStatus::Validated, None)
            };

            self.records.push(PluginRecord {
                manifest,
                manifest_path: path,
                status,
                failure,
            });
        }

        log::info!("{report}");
        self.state = ManagerState::Ready;
        Ok(report)
    }

    /// Loads every validated plugin: system-version gate, dependency
    /// resolution (with the members of cycles and broken dependency
    /// chains excluded so the rest still load), then per plugin in
    /// resolved order: dependency checks, factory, config, `initialize`,
    /// `validate`. One plugin's failure never stops the others.
    pub fn load_all_plugins(&mut self) -> Result<LoadReport> {
        self.state = ManagerState::Validating;
        let mut report = LoadReport::default();

        for record in &self.records {
            if record.status == PluginStatus::Disabled {
                report.skipped.push(record.manifest.name.clone());
            }
        }

        // System-version gate.
        let mut incompatible: Vec<(String, LoadError)> = Vec::new();
        for record in &self.records {
            if record.status != PluginStatus::Validated {
                continue;
            }
            let Some(constraint) = &record.manifest.compatible_system_version else {
                continue;
            };
            let compatible = self.checker.is_compatible(constraint).unwrap_or(false);
            if !compatible {
                incompatible.push((
                    record.manifest.name.clone(),
                    LoadError::IncompatibleSystemVersion {
                        plugin: record.manifest.name.clone(),
                        constraint: constraint.clone(),
                        system: self.checker.system_version().to_string(),
                    },
                ));
            }
        }
        for (name, error) in incompatible {
            self.mark_failed(&name, error.to_string());
            report.failed.push((name, error));
        }

        // Resolution, retried with failed plugins excluded so plugins
        // outside a broken component still load.
        self.state = ManagerState::Resolving;
        let candidates: Vec<(String, Vec<String>)> = self
            .records
            .iter()
            .filter(|r| r.status == PluginStatus::Validated)
            .map(|r| {
                (
                    r.manifest.name.clone(),
                    r.manifest.dependency_names().map(String::from).collect(),
                )
            })
            .collect();

        let mut excluded: HashSet<String> = HashSet::new();
        let order = loop {
            let mut resolver = DependencyResolver::new();
            for (name, deps) in &candidates {
                if excluded.contains(name) {
                    continue;
                }
                let deps: Vec<&str> = deps.iter().map(String::as_str).collect();
                resolver.add_plugin(name.clone(), &deps);
            }
            match resolver.resolve() {
                Ok(order) => break order,
                Err(err) => {
                    let members = match &err {
                        DependencyError::MissingDependency { dependent, .. } => {
                            vec![dependent.clone()]
                        }
                        DependencyError::CircularDependency(members) => members.clone(),
                        DependencyError::UnknownPlugin(_) => {
                            self.state = ManagerState::Error;
                            return Err(err.into());
                        }
                    };
                    for member in members {
                        self.mark_failed(&member, err.to_string());
                        report.failed.push((
                            member.clone(),
                            LoadError::Resolution {
                                plugin: member.clone(),
                                reason: err.to_string(),
                            },
                        ));
                        excluded.insert(member);
                    }
                }
            }
        };

        for name in &order {
            if let Some(record) = self.record_mut(name) {
                record.status = PluginStatus::Resolved;
            }
        }

        self.state = ManagerState::Loading;
        for name in order {
            match self.load_one(&name) {
                Ok(()) => report.active.push(name),
                Err(error) => {
                    log::warn!("Plugin '{name}' failed to load: {error}");
                    self.mark_failed(&name, error.to_string());
                    report.failed.push((name, error));
                }
            }
        }

        log::info!("{report}");
        self.state = ManagerState::Ready;
        Ok(report)
    }

    /// Loads one plugin and any of its dependencies that are not yet
    /// active, in dependency order. Unlike `load_all_plugins`, a failure
    /// anywhere in the chain is returned as an error.
    pub fn load_plugin(&mut self, name: &str) -> Result<()> {
        let record = self
            .record(name)
            .ok_or_else(|| Error::UnknownPlugin(name.to_string()))?;
        if record.status == PluginStatus::Active {
            return Ok(());
        }
        if record.status == PluginStatus::Disabled {
            return Err(Error::Other(format!("Plugin '{name}' is disabled")));
        }

        // The transitive dependency closure of the requested plugin.
        let mut needed: HashSet<String> = HashSet::new();
        let mut stack = vec![name.to_string()];
        while let Some(current) = stack.pop() {
            if !needed.insert(current.clone()) {
                continue;
            }
            if let Some(record) = self.record(&current) {
                for dep in record.manifest.dependency_names() {
                    stack.push(dep.to_string());
                }
            }
        }

        // Resolve over the closure only, so a broken manifest elsewhere
        // in the record set cannot block this load.
        let mut resolver = DependencyResolver::new();
        for record in &self.records {
            if record.status != PluginStatus::Disabled && needed.contains(&record.manifest.name) {
                resolver.add_manifest(&record.manifest);
            }
        }
        let order = resolver.resolve()?;

        for candidate in order {
            if self.instances.contains_key(&candidate) {
                continue;
            }
            if let Err(error) = self.load_one(&candidate) {
                self.mark_failed(&candidate, error.to_string());
                return Err(error.into());
            }
        }
        Ok(())
    }

    /// Unloads one plugin, refusing while any loaded plugin depends on
    /// it. Runs `cleanup` on the instance.
    pub fn unload_plugin(&mut self, name: &str) -> Result<()> {
        if !self.instances.contains_key(name) {
            return Err(Error::Other(format!("Plugin '{name}' is not loaded")));
        }

        let dependents: Vec<String> = self
            .load_order
            .iter()
            .filter(|loaded| {
                self.record(loaded)
                    .is_some_and(|r| r.manifest.dependency_names().any(|dep| dep == name))
            })
            .cloned()
            .collect();
        if !dependents.is_empty() {
            return Err(Error::Other(format!(
                "Cannot unload '{}': still required by {}",
                name,
                dependents.join(", ")
            )));
        }

        if let Some(mut instance) = self.instances.remove(name) {
            instance.cleanup();
        }
        self.load_order.retain(|loaded| loaded != name);
        if let Some(record) = self.record_mut(name) {
            record.status = PluginStatus::Unloaded;
        }
        log::info!("Unloaded plugin '{name}'");
        Ok(())
    }

    /// Unloads and reloads one plugin.
    pub fn reload_plugin(&mut self, name: &str) -> Result<()> {
        self.unload_plugin(name)?;
        self.load_plugin(name)
    }

    /// Persists the enabled flag for a plugin and lifts its `Disabled`
    /// status for this run.
    pub fn enable_plugin(&mut self, name: &str) -> Result<()> {
        self.config.set_enabled(name, true)?;
        if let Some(record) = self.record_mut(name) {
            if record.status == PluginStatus::Disabled {
                record.status = PluginStatus::Validated;
            }
        }
        Ok(())
    }

    /// Persists the disabled flag for a plugin. A currently loaded
    /// instance stays loaded; the flag takes effect on the next run.
    pub fn disable_plugin(&mut self, name: &str) -> Result<()> {
        self.config.set_enabled(name, false)?;
        if let Some(record) = self.record_mut(name) {
            if !matches!(
                record.status,
                PluginStatus::Loaded | PluginStatus::Initialized | PluginStatus::Active
            ) {
                record.status = PluginStatus::Disabled;
            }
        }
        Ok(())
    }

    /// Cleans up every loaded plugin in reverse load order. Cleanup
    /// cannot fail, so shutdown always completes.
    pub fn shutdown(&mut self) {
        let names: Vec<String> = self.load_order.drain(..).rev().collect();
        for name in names {
            if let Some(mut instance) = self.instances.remove(&name) {
                log::debug!("Cleaning up plugin '{name}'");
                instance.cleanup();
            }
            if let Some(record) = self.record_mut(&name) {
                record.status = PluginStatus::Unloaded;
            }
        }
        self.instances.clear();
        self.state = ManagerState::Idle;
    }

    /// The dependency graph of every discovered plugin, for rendering.
    pub fn dependency_tree(&self) -> DependencyTree {
        let mut resolver = DependencyResolver::new();
        for record in &self.records {
            resolver.add_manifest(&record.manifest);
        }
        resolver.tree()
    }

    fn record_mut(&mut self, name: &str) -> Option<&mut PluginRecord> {
        self.records.iter_mut().find(|r| r.manifest.name == name)
    }

    fn mark_failed(&mut self, name: &str, reason: String) {
        if let Some(record) = self.record_mut(name) {
            record.status = PluginStatus::Failed;
            record.failure = Some(reason);
        }
    }

    /// Drives one resolved plugin to `Active`. Dependencies must already
    /// be active and satisfy their declared version constraints.
    fn load_one(&mut self, name: &str) -> std::result::Result<(), LoadError> {
        let manifest = self
            .record(name)
            .map(|r| r.manifest.clone())
            .ok_or_else(|| LoadError::Resolution {
                plugin: name.to_string(),
                reason: "no record for resolved plugin".to_string(),
            })?;

        for dep in &manifest.dependencies {
            let dep_record =
                self.record(&dep.name)
                    .ok_or_else(|| LoadError::DependencyNotActive {
                        plugin: name.to_string(),
                        dependency: dep.name.clone(),
                    })?;
            if dep_record.status != PluginStatus::Active {
                return Err(LoadError::DependencyNotActive {
                    plugin: name.to_string(),
                    dependency: dep.name.clone(),
                });
            }
            if let Some(constraint) = &dep.constraint {
                let satisfied = dep_record
                    .manifest
                    .parsed_version()
                    .ok()
                    .map(|version| {
                        VersionChecker::version_satisfies(&version, constraint).unwrap_or(false)
                    })
                    .unwrap_or(false);
                if !satisfied {
                    return Err(LoadError::DependencyVersionMismatch {
                        plugin: name.to_string(),
                        dependency: dep.name.clone(),
                        constraint: constraint.clone(),
                        actual: dep_record.manifest.version.clone(),
                    });
                }
            }
        }

        let mut instance = self.loader.load(&manifest)?;
        self.set_status(name, PluginStatus::Loaded);

        let config = self
            .config
            .load_config(&manifest)
            .map_err(|source| LoadError::Config {
                plugin: name.to_string(),
                source,
            })?;

        instance
            .initialize(&config)
            .map_err(|source| LoadError::Initialize {
                plugin: name.to_string(),
                source,
            })?;
        self.set_status(name, PluginStatus::Initialized);

        instance.validate().map_err(|source| LoadError::Validate {
            plugin: name.to_string(),
            source,
        })?;
        self.set_status(name, PluginStatus::Active);

        self.instances.insert(name.to_string(), instance);
        self.load_order.push(name.to_string());
        log::info!("Plugin '{}' is active (v{})", name, manifest.version);
        Ok(())
    }

    fn set_status(&mut self, name: &str, status: PluginStatus) {
        if let Some(record) = self.record_mut(name) {
            record.status = status;
        }
    }
}

impl fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginManager")
            .field("state", &self.state)
            .field("records", &self.records.len())
            .field("active", &self.load_order)
            .finish()
    }
}
