// crates/plugman-core/src/tests/validation_tests.rs
#![cfg(test)]

use serde_json::json;

use crate::manifest::{ConfigFieldSpec, ManifestBuilder, PluginKind, PluginManifest};
use crate::validation::{ManifestValidator, ValidationIssue};

fn valid_manifest() -> PluginManifest {
    ManifestBuilder::new("demo-plugin", "1.0.0", PluginKind::Hook, "demo.HookPlugin")
        .dependency("base", Some("^1.0.0"))
        .system_version(">=0.1.0")
        .config_field("level", ConfigFieldSpec::new("string").with_default(json!("info")))
        .build()
}

#[test]
fn a_well_formed_manifest_has_no_issues() {
    assert!(ManifestValidator::new().validate(&valid_manifest()).is_empty());
    assert!(ManifestValidator::new().is_valid(&valid_manifest()));
}

#[test]
fn empty_and_uppercase_names_are_flagged() {
    let mut manifest = valid_manifest();
    manifest.name = String::new();
    let issues = ManifestValidator::new().validate(&manifest);
    assert!(issues.contains(&ValidationIssue::EmptyName));

    manifest.name = "Bad Name".to_string();
    let issues = ManifestValidator::new().validate(&manifest);
    assert!(matches!(issues[0], ValidationIssue::InvalidName { .. }));
}

#[test]
fn unparseable_version_is_flagged() {
    let mut manifest = valid_manifest();
    manifest.version = "not-a-version".to_string();
    let issues = ManifestValidator::new().validate(&manifest);
    assert!(issues.iter().any(|i| matches!(i, ValidationIssue::InvalidVersion { .. })));
}

#[test]
fn unknown_type_is_flagged() {
    let mut manifest = valid_manifest();
    manifest.plugin_type = "middleware".to_string();
    let issues = ManifestValidator::new().validate(&manifest);
    assert!(issues.iter().any(
        |i| matches!(i, ValidationIssue::UnknownType { plugin_type } if plugin_type == "middleware")
    ));
}

#[test]
fn entry_point_shape_is_enforced() {
    let mut manifest = valid_manifest();

    manifest.entry_point = String::new();
    let issues = ManifestValidator::new().validate(&manifest);
    assert!(issues.contains(&ValidationIssue::EmptyEntryPoint));

    // No module/item separator at all.
    manifest.entry_point = "justaname".to_string();
    let issues = ManifestValidator::new().validate(&manifest);
    assert!(issues.iter().any(|i| matches!(i, ValidationIssue::InvalidEntryPoint { .. })));

    // Bad charset.
    manifest.entry_point = "module Class!".to_string();
    let issues = ManifestValidator::new().validate(&manifest);
    assert!(issues.iter().any(|i| matches!(i, ValidationIssue::InvalidEntryPoint { .. })));

    // Empty half around the separator.
    manifest.entry_point = "module.".to_string();
    let issues = ManifestValidator::new().validate(&manifest);
    assert!(issues.iter().any(|i| matches!(i, ValidationIssue::InvalidEntryPoint { .. })));

    // Both accepted spellings.
    manifest.entry_point = "module.Class".to_string();
    assert!(ManifestValidator::new().is_valid(&manifest));
    manifest.entry_point = "module.path:Class".to_string();
    assert!(ManifestValidator::new().is_valid(&manifest));
}

#[test]
fn dependency_entries_are_checked() {
    let mut manifest = valid_manifest();
    manifest.dependencies[0].name = String::new();
    manifest.add_dependency("other", Some("not a constraint"));

    let issues = ManifestValidator::new().validate(&manifest);
    assert!(issues.contains(&ValidationIssue::EmptyDependencyName { index: 0 }));
    assert!(issues.iter().any(|i| matches!(
        i,
        ValidationIssue::InvalidDependencyConstraint { dependency, .. } if dependency == "other"
    )));
}

#[test]
fn bad_system_constraint_is_flagged() {
    let mut manifest = valid_manifest();
    manifest.compatible_system_version = Some(">= what".to_string());
    let issues = ManifestValidator::new().validate(&manifest);
    assert!(issues.iter().any(|i| matches!(i, ValidationIssue::InvalidSystemConstraint { .. })));
}

#[test]
fn config_schema_defaults_must_match_their_declared_type() {
    let mut manifest = valid_manifest();
    manifest.config_schema.insert(
        "retries".to_string(),
        ConfigFieldSpec::new("integer").with_default(json!("three")),
    );
    manifest
        .config_schema
        .insert("mystery".to_string(), ConfigFieldSpec::new("tuple"));

    let issues = ManifestValidator::new().validate(&manifest);
    assert!(issues.iter().any(|i| matches!(
        i,
        ValidationIssue::SchemaDefaultMismatch { field, .. } if field == "retries"
    )));
    assert!(issues.iter().any(|i| matches!(
        i,
        ValidationIssue::UnknownSchemaType { field, .. } if field == "mystery"
    )));
}

#[test]
fn every_issue_is_collected_in_one_pass() {
    let mut manifest = valid_manifest();
    manifest.name = "Bad Name".to_string();
    manifest.version = "x".to_string();
    manifest.plugin_type = "nope".to_string();
    manifest.entry_point = String::new();

    let issues = ManifestValidator::new().validate(&manifest);
    assert!(issues.len() >= 4, "expected all issues at once, got {issues:?}");
}
