//! Container configuration, loadable from YAML or JSON.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::{
  env,
  fs::File,
  io,
  path::{Path, PathBuf},
};

const DEFAULT_CONFIG_BASE_NAME: &str = "autowire";
const DEFAULT_CONFIG_EXTENSION: &str = "yaml";

/// What the container does when asked to build a type that cannot be
/// instantiated and has no binding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnbuildablePolicy {
  /// Fail with [`Error::NotFound`].
  #[default]
  NotFound,
  /// Hand back a [`TypeIdentity`](crate::TypeIdentity) carrying the type name.
  ReturnIdentity,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContainerConfig {
  pub unbuildable: UnbuildablePolicy,
  /// Alias key to canonical identifier.
  pub aliases: IndexMap<String, String>,
  /// Identifiers flagged as singletons up front.
  pub shared: Vec<String>,
}

impl ContainerConfig {
  pub fn from_yaml_str(source: &str) -> Result<Self> {
    let config: Self = serde_yaml::from_str(source).map_err(|e| Error::ConfigParse(e.to_string()))?;
    config.validate()
  }

  pub fn from_json_str(source: &str) -> Result<Self> {
    let config: Self = serde_json::from_str(source).map_err(|e| Error::ConfigParse(e.to_string()))?;
    config.validate()
  }

  /// Reads a config file. Files ending in `.json` are parsed as JSON,
  /// anything else as YAML.
  pub fn from_file(path: &Path) -> Result<Self> {
    let reader = io::BufReader::new(File::open(path)?);
    let is_json = path
      .extension()
      .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let config: Self = if is_json {
      serde_json::from_reader(reader).map_err(|e| Error::ConfigParse(e.to_string()))?
    } else {
      serde_yaml::from_reader(reader).map_err(|e| Error::ConfigParse(e.to_string()))?
    };
    config.validate()
  }

  fn validate(self) -> Result<Self> {
    for (key, target) in &self.aliases {
      if key.trim().is_empty() {
        return Err(Error::InvalidConfigValue {
          field: "aliases".to_owned(),
          message: "alias keys must not be empty".to_owned(),
        });
      }
      if target.trim().is_empty() {
        return Err(Error::InvalidConfigValue {
          field: format!("aliases.{key}"),
          message: "alias target must not be empty".to_owned(),
        });
      }
    }
    if self.shared.iter().any(|id| id.trim().is_empty()) {
      return Err(Error::InvalidConfigValue {
        field: "shared".to_owned(),
        message: "shared identifiers must not be empty".to_owned(),
      });
    }
    Ok(self)
  }
}

/// Finds the configuration file based on common patterns and an optional environment suffix.
///
/// Looks in the working directory for `autowire.<env>.yaml`, then `autowire.yaml`.
/// The environment comes from `environment_suffix`, `AUTOWIRE_ENV` or `APP_ENV`.
pub fn find_config_file(environment_suffix: Option<&str>) -> Result<PathBuf> {
  find_config_file_in(Path::new("."), environment_suffix)
}

pub(crate) fn find_config_file_in(dir: &Path, environment_suffix: Option<&str>) -> Result<PathBuf> {
  let env_from_var = environment_suffix
    .map(|s| s.to_string())
    .or_else(|| env::var("AUTOWIRE_ENV").ok())
    .or_else(|| env::var("APP_ENV").ok());

  let mut files_to_check: Vec<String> = Vec::new();
  if let Some(env_str) = env_from_var.filter(|s| !s.is_empty()) {
    files_to_check.push(format!(
      "{}.{}.{}",
      DEFAULT_CONFIG_BASE_NAME, env_str, DEFAULT_CONFIG_EXTENSION
    ));
  }
  files_to_check.push(format!("{}.{}", DEFAULT_CONFIG_BASE_NAME, DEFAULT_CONFIG_EXTENSION));

  files_to_check
    .iter()
    .map(|file_name| dir.join(file_name))
    .find(|path| path.is_file())
    .ok_or_else(|| {
      Error::ConfigNotFound(format!(
        "Searched for: {:?} in {:?}. Provide a config file or check AUTOWIRE_ENV/APP_ENV.",
        files_to_check, dir
      ))
    })
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;
  use std::io::Write;

  #[test]
  fn test_parse_yaml() {
    let config = ContainerConfig::from_yaml_str(
      r#"
unbuildable: return_identity
aliases:
  logger: App.Logging.FileLogger
  db: Infra.Database
shared:
  - Infra.Database
"#,
    )
    .unwrap();

    assert_eq!(config.unbuildable, UnbuildablePolicy::ReturnIdentity);
    assert_eq!(
      config.aliases.keys().collect::<Vec<_>>(),
      vec!["logger", "db"]
    );
    assert_eq!(config.shared, vec!["Infra.Database".to_owned()]);
  }

  #[test]
  fn test_empty_document_uses_defaults() {
    let config = ContainerConfig::from_json_str("{}").unwrap();
    assert_eq!(config, ContainerConfig::default());
    assert_eq!(config.unbuildable, UnbuildablePolicy::NotFound);
  }

  #[test]
  fn test_unknown_fields_are_rejected() {
    let err = ContainerConfig::from_yaml_str("scopes: [request]").unwrap_err();
    assert!(matches!(err, Error::ConfigParse(_)));
  }

  #[test]
  fn test_empty_alias_target_is_invalid() {
    let err = ContainerConfig::from_json_str(r#"{"aliases": {"db": " "}}"#).unwrap_err();
    match err {
      Error::InvalidConfigValue { field, .. } => assert_eq!(field, "aliases.db"),
      other => panic!("unexpected error: {other:?}"),
    }
  }

  #[test]
  fn test_from_file_by_extension() {
    let dir = tempfile::tempdir().unwrap();

    let json_path = dir.path().join("container.json");
    File::create(&json_path)
      .unwrap()
      .write_all(br#"{"shared": ["App.Cache"]}"#)
      .unwrap();
    assert_eq!(
      ContainerConfig::from_file(&json_path).unwrap().shared,
      vec!["App.Cache".to_owned()]
    );

    let yaml_path = dir.path().join("container.yml");
    File::create(&yaml_path)
      .unwrap()
      .write_all(b"unbuildable: not_found\n")
      .unwrap();
    assert_eq!(
      ContainerConfig::from_file(&yaml_path).unwrap().unbuildable,
      UnbuildablePolicy::NotFound
    );
  }

  #[test]
  fn test_find_config_file_prefers_environment() {
    let dir = tempfile::tempdir().unwrap();
    File::create(dir.path().join("autowire.yaml")).unwrap();

    let found = find_config_file_in(dir.path(), Some("staging")).unwrap();
    assert_eq!(found, dir.path().join("autowire.yaml"));

    File::create(dir.path().join("autowire.staging.yaml")).unwrap();
    let found = find_config_file_in(dir.path(), Some("staging")).unwrap();
    assert_eq!(found, dir.path().join("autowire.staging.yaml"));
  }

  #[test]
  fn test_find_config_file_missing() {
    let dir = tempfile::tempdir().unwrap();
    let err = find_config_file_in(dir.path(), Some("prod")).unwrap_err();
    assert!(matches!(err, Error::ConfigNotFound(_)));
  }
}
