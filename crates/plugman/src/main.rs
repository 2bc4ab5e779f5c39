use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use log::debug;

use plugman_core::constants::{DEFAULT_CONFIG_PATH, DEFAULT_PLUGINS_DIR, SYSTEM_VERSION};
use plugman_core::version;
use plugman_core::{
    ConfigManager, ManifestLoader, ManifestValidator, PluginManager, PluginRegistry, Result,
};

/// Manage plugins: discover, inspect, validate, enable and disable.
#[derive(Parser, Debug)]
#[command(name = "plugin-manager", version, about, long_about = None)]
struct CliArgs {
    /// Directory scanned for plugin manifests (repeatable)
    #[arg(long = "plugin-dir", value_name = "DIR", global = true)]
    plugin_dirs: Vec<PathBuf>,

    /// Aggregate plugin config file
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// System version plugins are checked against
    #[arg(long, value_name = "VERSION", global = true)]
    system_version: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List discovered plugins and their status
    List,
    /// Show details for one plugin
    Info {
        /// The name of the plugin to inspect
        name: String,
    },
    /// Validate a manifest file without loading it
    Validate {
        /// Path to the manifest file
        path: PathBuf,
    },
    /// Enable a plugin (persist setting)
    Enable {
        /// The name of the plugin to enable
        name: String,
    },
    /// Disable a plugin (persist setting)
    Disable {
        /// The name of the plugin to disable
        name: String,
    },
    /// Render the dependency tree of the discovered plugins
    Tree,
}

fn main() {
    let args = CliArgs::parse();
    let code = match run(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err}");
            1
        }
    };
    process::exit(code);
}

fn run(args: CliArgs) -> Result<i32> {
    match &args.command {
        Commands::Validate { path } => validate_manifest(path),
        Commands::Enable { name } => set_enabled(&args, name, true),
        Commands::Disable { name } => set_enabled(&args, name, false),
        Commands::List => list_plugins(&mut build_manager(&args)?),
        Commands::Info { name } => plugin_info(&mut build_manager(&args)?, name),
        Commands::Tree => render_tree(&mut build_manager(&args)?),
    }
}

fn config_path(args: &CliArgs) -> PathBuf {
    args.config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Wires a manager over the configured directories, with the built-in
/// plugin factories registered.
fn build_manager(args: &CliArgs) -> Result<PluginManager> {
    let mut registry = PluginRegistry::new();
    sql_validator::register(&mut registry)?;
    schema_check::register(&mut registry)?;
    debug!("Registered {} built-in entry point(s)", registry.len());

    let system = version::parse(args.system_version.as_deref().unwrap_or(SYSTEM_VERSION))?;
    let config = ConfigManager::open(config_path(args))?;
    let search_paths = if args.plugin_dirs.is_empty() {
        vec![PathBuf::from(DEFAULT_PLUGINS_DIR)]
    } else {
        args.plugin_dirs.clone()
    };

    Ok(PluginManager::new(search_paths, system, registry, config))
}

fn list_plugins(manager: &mut PluginManager) -> Result<i32> {
    let report = manager.discover_plugins()?;

    if manager.records().is_empty() && report.is_clean() {
        println!("No plugins discovered.");
        return Ok(0);
    }

    println!("Discovered {} plugin(s):", report.candidates);
    for record in manager.records() {
        let manifest = &record.manifest;
        let mut line = format!(
            "  - {} v{} ({}) [{}]",
            manifest.name, manifest.version, manifest.plugin_type, record.status
        );
        if let Some(reason) = &record.failure {
            line.push_str(&format!(": {reason}"));
        }
        println!("{line}");
    }

    // Manifests that never became a record (unreadable or duplicate).
    for (name, reason) in &report.failures {
        if manager.record(name).is_none() {
            println!("  ! {name}: {reason}");
        }
    }

    Ok(if report.is_clean() { 0 } else { 1 })
}

fn plugin_info(manager: &mut PluginManager, name: &str) -> Result<i32> {
    manager.discover_plugins()?;

    let Some(record) = manager.record(name) else {
        eprintln!("Unknown plugin: {name}");
        return Ok(1);
    };
    let manifest = &record.manifest;

    println!("Name:        {}", manifest.name);
    println!("Version:     {}", manifest.version);
    println!("Type:        {}", manifest.plugin_type);
    println!("Entry point: {}", manifest.entry_point);
    if !manifest.description.is_empty() {
        println!("Description: {}", manifest.description);
    }
    if !manifest.author.is_empty() {
        println!("Author:      {}", manifest.author);
    }
    if let Some(license) = &manifest.license {
        println!("License:     {license}");
    }
    if let Some(constraint) = &manifest.compatible_system_version {
        println!("Requires system version: {constraint}");
    }
    if !manifest.tags.is_empty() {
        println!("Tags:        {}", manifest.tags.join(", "));
    }
    println!("Status:      {}", record.status);
    println!(
        "Enabled:     {}",
        if manager.config().is_enabled(name) { "yes" } else { "no" }
    );
    if !manifest.dependencies.is_empty() {
        println!("Dependencies:");
        for dep in &manifest.dependencies {
            println!("  - {dep}");
        }
    }
    if let Some(reason) = &record.failure {
        println!("Failure:     {reason}");
        return Ok(1);
    }
    Ok(0)
}

fn validate_manifest(path: &Path) -> Result<i32> {
    let manifest = match ManifestLoader::new().load(path) {
        Ok(manifest) => manifest,
        Err(err) => {
            eprintln!("{err}");
            return Ok(1);
        }
    };

    let issues = ManifestValidator::new().validate(&manifest);
    if issues.is_empty() {
        println!(
            "Manifest '{}' is valid ({} plugin v{})",
            manifest.name, manifest.plugin_type, manifest.version
        );
        Ok(0)
    } else {
        eprintln!("Manifest '{}' failed validation:", path.display());
        for issue in &issues {
            eprintln!("  - {issue}");
        }
        Ok(1)
    }
}

fn set_enabled(args: &CliArgs, name: &str, enabled: bool) -> Result<i32> {
    let mut config = ConfigManager::open(config_path(args))?;
    config.set_enabled(name, enabled)?;
    let state = if enabled { "enabled" } else { "disabled" };
    println!("Successfully marked plugin '{name}' as {state}.");
    Ok(0)
}

fn render_tree(manager: &mut PluginManager) -> Result<i32> {
    manager.discover_plugins()?;
    if manager.records().is_empty() {
        println!("No plugins discovered.");
        return Ok(0);
    }
    println!("{}", manager.dependency_tree().render());
    Ok(0)
}
