// crates/plugman-core/src/tests/loader_tests.rs
#![cfg(test)]

use crate::loader::{LoadError, PluginLoader};
use crate::manifest::{ManifestBuilder, PluginKind};
use crate::registry::{PluginRegistry, RegistryError};
use crate::tests::common::{lifecycle_log, test_registry, AlwaysPassCheck};
use crate::traits::PluginError;

#[test]
fn load_builds_an_instance_of_the_declared_kind() {
    let log = lifecycle_log();
    let mut loader = PluginLoader::new(test_registry(&log));

    let manifest =
        ManifestBuilder::new("demo", "1.0.0", PluginKind::Hook, "test.RecordingHook").build();
    let instance = loader.load(&manifest).unwrap();
    assert_eq!(instance.kind(), PluginKind::Hook);

    let manifest = ManifestBuilder::new(
        "checker",
        "1.0.0",
        PluginKind::QualityCheck,
        "test.AlwaysPass",
    )
    .build();
    let instance = loader.load(&manifest).unwrap();
    assert_eq!(instance.kind(), PluginKind::QualityCheck);
    assert!(instance.as_hook().is_none());
}

#[test]
fn unknown_entry_point_is_reported() {
    let log = lifecycle_log();
    let mut loader = PluginLoader::new(test_registry(&log));
    let manifest =
        ManifestBuilder::new("demo", "1.0.0", PluginKind::Hook, "test.DoesNotExist").build();

    match loader.load(&manifest).unwrap_err() {
        LoadError::UnknownEntryPoint { plugin, entry_point } => {
            assert_eq!(plugin, "demo");
            assert_eq!(entry_point, "test.DoesNotExist");
        }
        other => panic!("expected UnknownEntryPoint, got {other:?}"),
    }
}

#[test]
fn declared_kind_must_match_the_registered_kind() {
    let log = lifecycle_log();
    let mut loader = PluginLoader::new(test_registry(&log));
    // The manifest claims validator, but the factory builds hooks.
    let manifest =
        ManifestBuilder::new("demo", "1.0.0", PluginKind::Validator, "test.RecordingHook").build();

    match loader.load(&manifest).unwrap_err() {
        LoadError::KindMismatch {
            declared,
            registered,
            ..
        } => {
            assert_eq!(declared, PluginKind::Validator);
            assert_eq!(registered, PluginKind::Hook);
        }
        other => panic!("expected KindMismatch, got {other:?}"),
    }
}

#[test]
fn unparseable_declared_type_fails_cleanly() {
    let log = lifecycle_log();
    let mut loader = PluginLoader::new(test_registry(&log));
    let mut manifest =
        ManifestBuilder::new("demo", "1.0.0", PluginKind::Hook, "test.RecordingHook").build();
    manifest.plugin_type = "middleware".to_string();

    assert!(matches!(
        loader.load(&manifest),
        Err(LoadError::UnknownDeclaredKind { .. })
    ));
}

#[test]
fn factory_errors_carry_the_plugin_name() {
    let mut registry = PluginRegistry::new();
    registry
        .register_quality_check("test.Broken", |_| {
            Err(PluginError::Construction("out of order".to_string()))
        })
        .unwrap();
    let mut loader = PluginLoader::new(registry);
    let manifest =
        ManifestBuilder::new("broken", "1.0.0", PluginKind::QualityCheck, "test.Broken").build();

    match loader.load(&manifest).unwrap_err() {
        LoadError::Factory { plugin, source } => {
            assert_eq!(plugin, "broken");
            assert!(source.to_string().contains("out of order"));
        }
        other => panic!("expected Factory, got {other:?}"),
    }
}

#[test]
fn repeated_loads_of_one_entry_point_use_the_cache() {
    let log = lifecycle_log();
    let mut loader = PluginLoader::new(test_registry(&log));
    let manifest =
        ManifestBuilder::new("demo", "1.0.0", PluginKind::Hook, "test.RecordingHook").build();

    // Two loads through the same entry point both succeed; the second
    // resolves from the per-run cache.
    loader.load(&manifest).unwrap();
    loader.load(&manifest).unwrap();
}

#[test]
fn duplicate_entry_point_registration_is_rejected() {
    let mut registry = PluginRegistry::new();
    registry
        .register_quality_check("test.Check", |_| Ok(Box::new(AlwaysPassCheck)))
        .unwrap();
    let err = registry
        .register_quality_check("test.Check", |_| Ok(Box::new(AlwaysPassCheck)))
        .unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateEntryPoint(entry) if entry == "test.Check"));
    assert_eq!(registry.len(), 1);
}
