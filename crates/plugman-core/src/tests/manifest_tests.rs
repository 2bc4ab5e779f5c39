// crates/plugman-core/src/tests/manifest_tests.rs
#![cfg(test)]

use std::fs;

use tempfile::tempdir;

use crate::manifest::{
    ConfigFieldSpec, ManifestBuilder, ManifestError, ManifestLoader, PluginKind,
};

#[test]
fn loads_a_full_json_manifest() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("plugin.json");
    fs::write(
        &path,
        r#"{
            "name": "sql-validator",
            "version": "1.2.0",
            "type": "validator",
            "entry_point": "sql_validator.SqlValidatorPlugin",
            "dependencies": [
                { "name": "core-lib", "version": "^1.0.0" },
                { "name": "helper" }
            ],
            "compatible_system_version": ">=0.1.0",
            "config_schema": {
                "strict": { "type": "boolean", "default": false }
            },
            "description": "Validates SQL syntax",
            "author": "Data Platform",
            "tags": ["sql", "validation"]
        }"#,
    )
    .unwrap();

    let manifest = ManifestLoader::new().load(&path).unwrap();
    assert_eq!(manifest.name, "sql-validator");
    assert_eq!(manifest.version, "1.2.0");
    assert_eq!(manifest.kind(), Some(PluginKind::Validator));
    assert_eq!(manifest.entry_point, "sql_validator.SqlValidatorPlugin");
    assert_eq!(manifest.dependencies.len(), 2);
    assert_eq!(manifest.dependencies[0].name, "core-lib");
    assert_eq!(manifest.dependencies[0].constraint.as_deref(), Some("^1.0.0"));
    assert_eq!(manifest.dependencies[1].constraint, None);
    assert_eq!(manifest.compatible_system_version.as_deref(), Some(">=0.1.0"));
    assert!(manifest.config_schema.contains_key("strict"));
    assert_eq!(manifest.tags, vec!["sql", "validation"]);
}

#[test]
fn dependency_constraint_accepts_both_spellings() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("plugin.json");
    fs::write(
        &path,
        r#"{
            "name": "a",
            "version": "1.0.0",
            "type": "hook",
            "entry_point": "m.C",
            "dependencies": [
                { "name": "b", "version_constraint": "~1.2.0" }
            ]
        }"#,
    )
    .unwrap();

    let manifest = ManifestLoader::new().load(&path).unwrap();
    assert_eq!(manifest.dependencies[0].constraint.as_deref(), Some("~1.2.0"));
}

#[cfg(feature = "yaml-config")]
#[test]
fn loads_a_yaml_manifest() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("plugin.yaml");
    fs::write(
        &path,
        concat!(
            "name: schema-check\n",
            "version: 0.2.0\n",
            "type: quality_check\n",
            "entry_point: schema_check.SchemaCheckPlugin\n",
            "dependencies:\n",
            "  - name: sql-validator\n",
            "    version: '>=1.0.0'\n",
        ),
    )
    .unwrap();

    let manifest = ManifestLoader::new().load(&path).unwrap();
    assert_eq!(manifest.name, "schema-check");
    assert_eq!(manifest.kind(), Some(PluginKind::QualityCheck));
    assert_eq!(manifest.dependencies[0].constraint.as_deref(), Some(">=1.0.0"));
}

#[test]
fn missing_required_key_is_reported_by_name() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("plugin.json");
    fs::write(&path, r#"{ "name": "a", "version": "1.0.0", "type": "hook" }"#).unwrap();

    let err = ManifestLoader::new().load(&path).unwrap_err();
    match err {
        ManifestError::MissingKey { key, .. } => assert_eq!(key, "entry_point"),
        other => panic!("expected MissingKey, got {other:?}"),
    }
}

#[test]
fn dependency_without_a_name_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("plugin.json");
    fs::write(
        &path,
        r#"{
            "name": "a", "version": "1.0.0", "type": "hook", "entry_point": "m.C",
            "dependencies": [ { "version": "^1.0.0" } ]
        }"#,
    )
    .unwrap();

    let err = ManifestLoader::new().load(&path).unwrap_err();
    match err {
        ManifestError::MissingKey { key, .. } => assert_eq!(key, "dependencies[0].name"),
        other => panic!("expected MissingKey, got {other:?}"),
    }
}

#[test]
fn malformed_json_is_a_parse_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("plugin.json");
    fs::write(&path, "{ not json").unwrap();

    assert!(matches!(
        ManifestLoader::new().load(&path),
        Err(ManifestError::Parse { .. })
    ));
}

#[test]
fn unknown_extension_is_an_unsupported_format() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("plugin.toml");
    fs::write(&path, "name = \"a\"").unwrap();

    assert!(matches!(
        ManifestLoader::new().load(&path),
        Err(ManifestError::UnsupportedFormat { .. })
    ));
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = tempdir().unwrap();
    assert!(matches!(
        ManifestLoader::new().load(&dir.path().join("plugin.json")),
        Err(ManifestError::Read { .. })
    ));
}

#[test]
fn builder_produces_an_equivalent_manifest() {
    let manifest = ManifestBuilder::new("demo", "1.0.0", PluginKind::Hook, "demo.Hook")
        .description("demo plugin")
        .author("tests")
        .license("MIT")
        .tag("demo")
        .dependency("base", Some("^1.0.0"))
        .system_version(">=0.1.0")
        .config_field(
            "retries",
            ConfigFieldSpec::new("integer").with_default(3.into()).require(),
        )
        .build();

    assert_eq!(manifest.name, "demo");
    assert_eq!(manifest.kind(), Some(PluginKind::Hook));
    assert_eq!(manifest.dependencies[0].name, "base");
    assert_eq!(manifest.license.as_deref(), Some("MIT"));
    let spec = &manifest.config_schema["retries"];
    assert!(spec.required);
    assert_eq!(spec.default, Some(3.into()));
}
