//! Configuration resolution tests
//!
//! Covers the priority order (flag → environment → TOML → default), TOML
//! file loading, and the validation errors raised before any network call.
//!
//! Tests that touch process environment variables are marked `#[serial]`.

use serial_test::serial;
use sift_common::config::{
    load_toml_config, AppConfig, ConfigOverrides, TomlConfig, DEFAULT_BATCH_SIZE, ENV_API_KEY,
    ENV_APP_ID, ENV_CONFIG_PATH, ENV_INDEX_NAME, MAX_BATCH_SIZE,
};
use sift_common::{Error, IdDeriver};
use std::collections::HashMap;
use std::env;
use tempfile::TempDir;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name| map.get(name).cloned()
}

const CREDENTIALS: &[(&str, &str)] = &[("ALGOLIA_APP_ID", "APP"), ("ALGOLIA_API_KEY", "KEY")];

#[test]
fn test_defaults_apply_when_nothing_is_set() {
    let config =
        AppConfig::resolve(&ConfigOverrides::default(), env_from(CREDENTIALS), &TomlConfig::default())
            .unwrap();
    assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
    assert!(!config.wait_for_tasks);
    assert_eq!(config.ids, IdDeriver::default());
    assert!(config.resource_types.is_empty());
    assert!(config.default_index.is_none());
}

#[test]
fn test_flag_beats_environment_beats_file() {
    let toml_config = TomlConfig {
        index_name: Some("from-file".to_string()),
        batch_size: Some(200),
        ..Default::default()
    };
    let env = env_from(&[
        ("ALGOLIA_APP_ID", "APP"),
        ("ALGOLIA_API_KEY", "KEY"),
        ("ALGOLIA_INDEX_NAME", "from-env"),
        ("SIFT_BATCH_SIZE", "300"),
    ]);

    let from_env = AppConfig::resolve(&ConfigOverrides::default(), &env, &toml_config).unwrap();
    assert_eq!(from_env.default_index.as_deref(), Some("from-env"));
    assert_eq!(from_env.batch_size, 300);

    let overrides = ConfigOverrides {
        index_name: Some("from-flag".to_string()),
        batch_size: Some(400),
        ..Default::default()
    };
    let from_flag = AppConfig::resolve(&overrides, &env, &toml_config).unwrap();
    assert_eq!(from_flag.default_index.as_deref(), Some("from-flag"));
    assert_eq!(from_flag.batch_size, 400);

    let from_file =
        AppConfig::resolve(&ConfigOverrides::default(), env_from(CREDENTIALS), &toml_config).unwrap();
    assert_eq!(from_file.default_index.as_deref(), Some("from-file"));
    assert_eq!(from_file.batch_size, 200);
}

#[test]
fn test_missing_credentials_are_config_errors() {
    let err = AppConfig::resolve(
        &ConfigOverrides::default(),
        env_from(&[("ALGOLIA_API_KEY", "KEY")]),
        &TomlConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Config(_)));

    let err = AppConfig::resolve(
        &ConfigOverrides::default(),
        env_from(&[("ALGOLIA_APP_ID", "APP"), ("ALGOLIA_API_KEY", "   ")]),
        &TomlConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_admin_key_fallback() {
    let config = AppConfig::resolve(
        &ConfigOverrides::default(),
        env_from(&[("ALGOLIA_APP_ID", "APP"), ("ALGOLIA_ADMIN_API_KEY", "ADMIN")]),
        &TomlConfig::default(),
    )
    .unwrap();
    assert_eq!(config.api_key, "ADMIN");
}

#[test]
fn test_batch_size_bounds() {
    let zero = ConfigOverrides {
        batch_size: Some(0),
        ..Default::default()
    };
    let err = AppConfig::resolve(&zero, env_from(CREDENTIALS), &TomlConfig::default()).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let huge = ConfigOverrides {
        batch_size: Some(50_000),
        ..Default::default()
    };
    let config = AppConfig::resolve(&huge, env_from(CREDENTIALS), &TomlConfig::default()).unwrap();
    assert_eq!(config.batch_size, MAX_BATCH_SIZE);
}

#[test]
fn test_resource_types_from_environment() {
    let config = AppConfig::resolve(
        &ConfigOverrides::default(),
        env_from(&[
            ("ALGOLIA_APP_ID", "APP"),
            ("ALGOLIA_API_KEY", "KEY"),
            ("SIFT_RESOURCE_TYPES", r#"{"article": "/schemas/article"}"#),
        ]),
        &TomlConfig::default(),
    )
    .unwrap();
    assert_eq!(config.resource_types.schema_path("article"), Some("/schemas/article"));

    let err = AppConfig::resolve(
        &ConfigOverrides::default(),
        env_from(&[
            ("ALGOLIA_APP_ID", "APP"),
            ("ALGOLIA_API_KEY", "KEY"),
            ("SIFT_RESOURCE_TYPES", r#"{"article": 5}"#),
        ]),
        &TomlConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_toml_file_loading() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
app_id = "APP"
api_key = "KEY"
index_name = "content"
wait_for_tasks = true

[resource_types]
article = "/schemas/article"
"#,
    )
    .unwrap();

    let loaded = load_toml_config(&path).unwrap().unwrap();
    assert_eq!(loaded.index_name.as_deref(), Some("content"));
    assert_eq!(loaded.wait_for_tasks, Some(true));
    assert_eq!(loaded.resource_types.len(), 1);

    assert!(load_toml_config(&dir.path().join("absent.toml")).unwrap().is_none());

    std::fs::write(&path, "app_id = [unterminated").unwrap();
    assert!(matches!(load_toml_config(&path), Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_load_reads_process_environment_and_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sift.toml");
    std::fs::write(&path, "index_name = \"file-index\"\nbatch_size = 250\n").unwrap();

    env::set_var(ENV_APP_ID, "APP");
    env::set_var(ENV_API_KEY, "KEY");
    env::set_var(ENV_CONFIG_PATH, &path);
    env::remove_var(ENV_INDEX_NAME);

    let config = AppConfig::load(&ConfigOverrides::default());

    env::remove_var(ENV_APP_ID);
    env::remove_var(ENV_API_KEY);
    env::remove_var(ENV_CONFIG_PATH);

    let config = config.unwrap();
    assert_eq!(config.index_name(None).unwrap(), "file-index");
    assert_eq!(config.index_name(Some("explicit")).unwrap(), "explicit");
}
