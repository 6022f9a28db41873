//! Integration tests for configuration loading and script resolution

mod common;

use common::{create_archetype, create_test_config, load};
use rask::config::{parse_config, validate_config, ROOT_ARCHETYPE};

#[test]
fn test_parse_complete_config() {
    let yaml = r#"
name: my-app

archetypes:
  - build-tools

scripts:
  build: tsc -p .
  prebuild: rm -rf dist
  test: jest
"#;

    let config = parse_config(yaml).unwrap();
    validate_config(&config).unwrap();

    assert_eq!(config.name, Some("my-app".to_string()));
    assert_eq!(config.archetypes, vec!["build-tools".to_string()]);
    assert_eq!(config.scripts.len(), 3);
    assert_eq!(config.scripts.get("build"), Some(&"tsc -p .".to_string()));
}

#[test]
fn test_project_script_shadows_archetype_script() {
    let (dir, config_path) = create_test_config(
        r#"
archetypes:
  - shared
scripts:
  build: echo project-build
"#,
    );
    create_archetype(
        dir.path(),
        "shared",
        r#"
scripts:
  build: echo shared-build
  lint: eslint .
"#,
    );

    let project = load(&config_path);

    let build = project.resolve_script("run", "build").unwrap();
    assert_eq!(build.script, "echo project-build");
    assert_eq!(build.archetype_name, ROOT_ARCHETYPE);

    let lint = project.resolve_script("run", "lint").unwrap();
    assert_eq!(lint.script, "eslint .");
    assert_eq!(lint.archetype_name, "shared");
    assert_eq!(
        lint.archetype_path,
        Some(dir.path().join("node_modules").join("shared"))
    );
}

#[test]
fn test_self_referential_delegation_falls_through() {
    // A project script that just re-invokes rask for the same task is a
    // delegation marker, not a definition.
    let (dir, config_path) = create_test_config(
        r#"
archetypes:
  - shared
scripts:
  build: rask run build
"#,
    );
    create_archetype(
        dir.path(),
        "shared",
        r#"
scripts:
  build: echo shared-build
"#,
    );

    let project = load(&config_path);
    let build = project.resolve_script("run", "build").unwrap();
    assert_eq!(build.script, "echo shared-build");
    assert_eq!(build.archetype_name, "shared");
}

#[test]
fn test_archetype_priority_follows_declaration_order() {
    let (dir, config_path) = create_test_config(
        r#"
archetypes:
  - first
  - second
scripts: {}
"#,
    );
    create_archetype(
        dir.path(),
        "first",
        r#"
scripts:
  deploy: echo from-first
"#,
    );
    create_archetype(
        dir.path(),
        "second",
        r#"
scripts:
  deploy: echo from-second
  publish: echo publish
"#,
    );

    let project = load(&config_path);
    assert_eq!(
        project.resolve_script("run", "deploy").unwrap().script,
        "echo from-first"
    );
    assert_eq!(
        project.resolve_script("run", "publish").unwrap().script,
        "echo publish"
    );
}

#[test]
fn test_unknown_task_reports_not_found() {
    let (_dir, config_path) = create_test_config(
        r#"
scripts:
  build: tsc
"#,
    );

    let project = load(&config_path);
    let result = project.resolve_script("run", "ghost");
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("ghost"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let yaml = r#"
scripts:
  "bad name": echo hi
"#;
    let config = parse_config(yaml).unwrap();
    assert!(validate_config(&config).is_err());
}
