//! Configuration loading
//!
//! Configuration is resolved once at startup into an immutable [`AppConfig`]
//! that is passed explicitly to every component. Priority per field:
//! 1. Command-line flag (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::identifier::{parse_namespace, IdDeriver};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const MAX_BATCH_SIZE: usize = 10_000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_APP_ID: &str = "ALGOLIA_APP_ID";
pub const ENV_API_KEY: &str = "ALGOLIA_API_KEY";
pub const ENV_ADMIN_API_KEY: &str = "ALGOLIA_ADMIN_API_KEY";
pub const ENV_INDEX_NAME: &str = "ALGOLIA_INDEX_NAME";
pub const ENV_BATCH_SIZE: &str = "SIFT_BATCH_SIZE";
pub const ENV_TIMEOUT_SECS: &str = "SIFT_TIMEOUT_SECS";
pub const ENV_WAIT_FOR_TASKS: &str = "SIFT_WAIT_FOR_TASKS";
pub const ENV_ID_NAMESPACE: &str = "SIFT_ID_NAMESPACE";
pub const ENV_RESOURCE_TYPES: &str = "SIFT_RESOURCE_TYPES";
pub const ENV_CONFIG_PATH: &str = "SIFT_CONFIG";

/// resourceType → schemaPath mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceTypeConfig {
    paths: BTreeMap<String, String>,
}

impl ResourceTypeConfig {
    pub fn new(paths: BTreeMap<String, String>) -> Self {
        Self { paths }
    }

    /// Parse the JSON object form, e.g. `{"article": "/schemas/article"}`
    pub fn from_json(text: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| Error::Config(format!("Resource type mapping is not valid JSON: {}", e)))?;
        let object = value.as_object().ok_or_else(|| {
            Error::Config("Resource type mapping must be a JSON object".to_string())
        })?;

        let mut paths = BTreeMap::new();
        for (resource_type, schema_path) in object {
            let schema_path = schema_path.as_str().ok_or_else(|| {
                Error::Config(format!(
                    "Schema path for resource type '{}' must be a string",
                    resource_type
                ))
            })?;
            paths.insert(resource_type.clone(), schema_path.to_string());
        }
        Ok(Self { paths })
    }

    pub fn schema_path(&self, resource_type: &str) -> Option<&str> {
        self.paths.get(resource_type).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.paths.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// On-disk TOML configuration; every key is optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub app_id: Option<String>,
    pub api_key: Option<String>,
    pub index_name: Option<String>,
    pub batch_size: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub wait_for_tasks: Option<bool>,
    pub id_namespace: Option<String>,
    #[serde(default)]
    pub resource_types: BTreeMap<String, String>,
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub index_name: Option<String>,
    pub batch_size: Option<usize>,
}

/// Immutable run configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_id: String,
    pub api_key: String,
    pub default_index: Option<String>,
    pub batch_size: usize,
    pub timeout: Duration,
    pub wait_for_tasks: bool,
    pub ids: IdDeriver,
    pub resource_types: ResourceTypeConfig,
}

impl AppConfig {
    /// Resolve configuration from the process environment and config file
    pub fn load(overrides: &ConfigOverrides) -> Result<Self> {
        let toml_path = overrides
            .config_path
            .clone()
            .or_else(|| std::env::var(ENV_CONFIG_PATH).ok().map(PathBuf::from))
            .or_else(default_config_path);

        let toml_config = match toml_path {
            Some(path) => load_toml_config(&path)?.unwrap_or_default(),
            None => TomlConfig::default(),
        };

        Self::resolve(overrides, |name| std::env::var(name).ok(), &toml_config)
    }

    /// Resolve configuration from explicit sources
    pub fn resolve<F>(overrides: &ConfigOverrides, env: F, toml_config: &TomlConfig) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        let app_id = env(ENV_APP_ID)
            .or_else(|| toml_config.app_id.clone())
            .filter(|v| is_valid_credential(v))
            .ok_or_else(|| {
                Error::Config(format!(
                    "Application id not configured. Set {} or app_id in the config file",
                    ENV_APP_ID
                ))
            })?;

        let api_key = env(ENV_API_KEY)
            .or_else(|| env(ENV_ADMIN_API_KEY))
            .or_else(|| toml_config.api_key.clone())
            .filter(|v| is_valid_credential(v))
            .ok_or_else(|| {
                Error::Config(format!(
                    "API key not configured. Set {} (or {}) or api_key in the config file",
                    ENV_API_KEY, ENV_ADMIN_API_KEY
                ))
            })?;

        let default_index = overrides
            .index_name
            .clone()
            .or_else(|| env(ENV_INDEX_NAME))
            .or_else(|| toml_config.index_name.clone())
            .filter(|v| !v.trim().is_empty());

        let batch_size = match overrides.batch_size {
            Some(n) => n,
            None => match env(ENV_BATCH_SIZE) {
                Some(raw) => parse_setting::<usize>(ENV_BATCH_SIZE, &raw)?,
                None => toml_config.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
            },
        };
        let batch_size = validate_batch_size(batch_size)?;

        let timeout_secs = match env(ENV_TIMEOUT_SECS) {
            Some(raw) => parse_setting::<u64>(ENV_TIMEOUT_SECS, &raw)?,
            None => toml_config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        };
        if timeout_secs == 0 {
            return Err(Error::Config("Timeout must be at least 1 second".to_string()));
        }

        let wait_for_tasks = match env(ENV_WAIT_FOR_TASKS) {
            Some(raw) => parse_bool(ENV_WAIT_FOR_TASKS, &raw)?,
            None => toml_config.wait_for_tasks.unwrap_or(false),
        };

        let ids = match env(ENV_ID_NAMESPACE).or_else(|| toml_config.id_namespace.clone()) {
            Some(raw) => IdDeriver::new(parse_namespace(&raw).map_err(|e| {
                Error::Config(format!("Identifier namespace '{}' is not a UUID: {}", raw, e))
            })?),
            None => IdDeriver::default(),
        };

        let resource_types = match env(ENV_RESOURCE_TYPES) {
            Some(raw) => ResourceTypeConfig::from_json(&raw)?,
            None => ResourceTypeConfig::new(toml_config.resource_types.clone()),
        };

        Ok(Self {
            app_id,
            api_key,
            default_index,
            batch_size,
            timeout: Duration::from_secs(timeout_secs),
            wait_for_tasks,
            ids,
            resource_types,
        })
    }

    /// Index to operate on: explicit name, else the configured default
    pub fn index_name(&self, explicit: Option<&str>) -> Result<String> {
        explicit
            .map(str::to_string)
            .or_else(|| self.default_index.clone())
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| {
                Error::Config(format!(
                    "No index name given. Pass --index or set {}",
                    ENV_INDEX_NAME
                ))
            })
    }
}

/// Credentials must be non-empty and non-whitespace
pub fn is_valid_credential(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Enforce the batch-size contract: at least 1, capped at [`MAX_BATCH_SIZE`]
pub fn validate_batch_size(batch_size: usize) -> Result<usize> {
    if batch_size == 0 {
        return Err(Error::Validation(
            "Batch size must be at least 1".to_string(),
        ));
    }
    if batch_size > MAX_BATCH_SIZE {
        warn!(
            requested = batch_size,
            cap = MAX_BATCH_SIZE,
            "Batch size exceeds maximum, capping"
        );
        return Ok(MAX_BATCH_SIZE);
    }
    Ok(batch_size)
}

fn parse_setting<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| Error::Config(format!("{} has invalid value '{}': {}", name, raw, e)))
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!(
            "{} has invalid boolean value '{}'",
            name, raw
        ))),
    }
}

/// Default config file location: `<config_dir>/sift/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("sift").join("config.toml"))
}

/// Load the TOML config file
///
/// A missing file is not an error (`Ok(None)`); a malformed one is.
pub fn load_toml_config(path: &Path) -> Result<Option<TomlConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    info!("Loaded config file: {}", path.display());
    Ok(Some(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;
    use std::io::Write;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn credentials() -> Vec<(&'static str, &'static str)> {
        vec![(ENV_APP_ID, "APP"), (ENV_API_KEY, "KEY")]
    }

    #[test]
    fn test_defaults_with_credentials_only() {
        let config = AppConfig::resolve(
            &ConfigOverrides::default(),
            env_from(&credentials()),
            &TomlConfig::default(),
        )
        .unwrap();

        assert_eq!(config.app_id, "APP");
        assert_eq!(config.api_key, "KEY");
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert!(!config.wait_for_tasks);
        assert_eq!(config.ids, IdDeriver::default());
        assert!(config.resource_types.is_empty());
        assert!(config.default_index.is_none());
    }

    #[test]
    fn test_missing_credentials_is_config_error() {
        let err = AppConfig::resolve(
            &ConfigOverrides::default(),
            env_from(&[(ENV_APP_ID, "APP"), (ENV_API_KEY, "   ")]),
            &TomlConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = AppConfig::resolve(
            &ConfigOverrides::default(),
            env_from(&[]),
            &TomlConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_admin_key_fallback() {
        let config = AppConfig::resolve(
            &ConfigOverrides::default(),
            env_from(&[(ENV_APP_ID, "APP"), (ENV_ADMIN_API_KEY, "ADMIN")]),
            &TomlConfig::default(),
        )
        .unwrap();
        assert_eq!(config.api_key, "ADMIN");
    }

    #[test]
    fn test_priority_cli_over_env_over_toml() {
        let toml_config = TomlConfig {
            index_name: Some("toml-index".to_string()),
            batch_size: Some(50),
            ..Default::default()
        };
        let mut pairs = credentials();
        pairs.push((ENV_INDEX_NAME, "env-index"));
        pairs.push((ENV_BATCH_SIZE, "200"));

        let config = AppConfig::resolve(
            &ConfigOverrides::default(),
            env_from(&pairs),
            &toml_config,
        )
        .unwrap();
        assert_eq!(config.default_index.as_deref(), Some("env-index"));
        assert_eq!(config.batch_size, 200);

        let overrides = ConfigOverrides {
            index_name: Some("cli-index".to_string()),
            batch_size: Some(300),
            ..Default::default()
        };
        let config = AppConfig::resolve(&overrides, env_from(&pairs), &toml_config).unwrap();
        assert_eq!(config.default_index.as_deref(), Some("cli-index"));
        assert_eq!(config.batch_size, 300);

        let config =
            AppConfig::resolve(&ConfigOverrides::default(), env_from(&credentials()), &toml_config)
                .unwrap();
        assert_eq!(config.default_index.as_deref(), Some("toml-index"));
        assert_eq!(config.batch_size, 50);
    }

    #[test]
    fn test_batch_size_contract() {
        assert!(matches!(validate_batch_size(0), Err(Error::Validation(_))));
        assert_eq!(validate_batch_size(1).unwrap(), 1);
        assert_eq!(validate_batch_size(MAX_BATCH_SIZE).unwrap(), MAX_BATCH_SIZE);
        assert_eq!(validate_batch_size(50_000).unwrap(), MAX_BATCH_SIZE);
    }

    #[test]
    fn test_invalid_numeric_setting() {
        let mut pairs = credentials();
        pairs.push((ENV_BATCH_SIZE, "lots"));
        let err = AppConfig::resolve(
            &ConfigOverrides::default(),
            env_from(&pairs),
            &TomlConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_resource_types_from_env_json() {
        let mut pairs = credentials();
        pairs.push((ENV_RESOURCE_TYPES, r#"{"article": "/schemas/article", "video": "/schemas/video"}"#));
        let config = AppConfig::resolve(
            &ConfigOverrides::default(),
            env_from(&pairs),
            &TomlConfig::default(),
        )
        .unwrap();
        assert_eq!(config.resource_types.len(), 2);
        assert_eq!(config.resource_types.schema_path("article"), Some("/schemas/article"));
        assert_eq!(config.resource_types.schema_path("podcast"), None);
    }

    #[test]
    fn test_resource_types_malformed() {
        assert!(matches!(
            ResourceTypeConfig::from_json("{not json"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            ResourceTypeConfig::from_json(r#"["article"]"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            ResourceTypeConfig::from_json(r#"{"article": 5}"#),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_namespace_override() {
        let mut pairs = credentials();
        pairs.push((ENV_ID_NAMESPACE, "6ba7b810-9dad-11d1-80b4-00c04fd430c8"));
        let config = AppConfig::resolve(
            &ConfigOverrides::default(),
            env_from(&pairs),
            &TomlConfig::default(),
        )
        .unwrap();
        assert_eq!(config.ids.namespace(), uuid::Uuid::NAMESPACE_DNS);

        let mut pairs = credentials();
        pairs.push((ENV_ID_NAMESPACE, "nope"));
        assert!(AppConfig::resolve(
            &ConfigOverrides::default(),
            env_from(&pairs),
            &TomlConfig::default()
        )
        .is_err());
    }

    #[test]
    fn test_wait_for_tasks_parsing() {
        let mut pairs = credentials();
        pairs.push((ENV_WAIT_FOR_TASKS, "yes"));
        let config = AppConfig::resolve(
            &ConfigOverrides::default(),
            env_from(&pairs),
            &TomlConfig::default(),
        )
        .unwrap();
        assert!(config.wait_for_tasks);

        let mut pairs = credentials();
        pairs.push((ENV_WAIT_FOR_TASKS, "maybe"));
        assert!(AppConfig::resolve(
            &ConfigOverrides::default(),
            env_from(&pairs),
            &TomlConfig::default()
        )
        .is_err());
    }

    #[test]
    fn test_index_name_resolution() {
        let mut config = AppConfig::resolve(
            &ConfigOverrides::default(),
            env_from(&credentials()),
            &TomlConfig::default(),
        )
        .unwrap();
        assert!(matches!(config.index_name(None), Err(Error::Config(_))));
        assert_eq!(config.index_name(Some("explicit")).unwrap(), "explicit");

        config.default_index = Some("fallback".to_string());
        assert_eq!(config.index_name(None).unwrap(), "fallback");
    }

    #[test]
    fn test_load_toml_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "app_id = \"APP\"\napi_key = \"KEY\"\nbatch_size = 250\n\n[resource_types]\narticle = \"/schemas/article\""
        )
        .unwrap();

        let config = load_toml_config(&path).unwrap().unwrap();
        assert_eq!(config.app_id.as_deref(), Some("APP"));
        assert_eq!(config.batch_size, Some(250));
        assert_eq!(
            config.resource_types.get("article").map(String::as_str),
            Some("/schemas/article")
        );
    }

    #[test]
    fn test_missing_toml_is_not_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(load_toml_config(&dir.path().join("absent.toml"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "batch_size = \"many\"").unwrap();
        assert!(matches!(load_toml_config(&path), Err(Error::Config(_))));
    }

    #[test]
    #[serial]
    fn test_load_reads_process_environment() {
        let dir = tempfile::TempDir::new().unwrap();
        std::env::set_var(ENV_APP_ID, "ENV-APP");
        std::env::set_var(ENV_API_KEY, "ENV-KEY");
        std::env::remove_var(ENV_ADMIN_API_KEY);
        std::env::remove_var(ENV_BATCH_SIZE);

        let overrides = ConfigOverrides {
            config_path: Some(dir.path().join("none.toml")),
            ..Default::default()
        };
        let config = AppConfig::load(&overrides).unwrap();
        assert_eq!(config.app_id, "ENV-APP");
        assert_eq!(config.api_key, "ENV-KEY");

        std::env::remove_var(ENV_APP_ID);
        std::env::remove_var(ENV_API_KEY);
    }
}
