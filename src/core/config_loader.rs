//! Configuration file loader for nuget-publisher
//!
//! Reads `.nuget-publish.yaml`, expands `${VAR}` references and resolves
//! relative paths against the directory holding the file.

use super::config::*;
use crate::core::error::PublishError;
use crate::security::token_manager::EnvironmentSource;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_yaml::Value;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Configuration file name
pub const CONFIG_FILENAME: &str = ".nuget-publish.yaml";

lazy_static! {
    /// Environment variable pattern (${VAR_NAME})
    static ref ENV_VAR_PATTERN: Regex =
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env var pattern");
}

/// Configuration file loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load `.nuget-publish.yaml` from `project_dir`; a missing file yields the defaults
    pub async fn load(project_dir: &Path, env: &EnvironmentSource) -> Result<PublisherConfig, PublishError> {
        let path = project_dir.join(CONFIG_FILENAME);
        if fs::metadata(&path).await.is_err() {
            tracing::debug!(path = %path.display(), "no configuration file, using defaults");
            let mut config = PublisherConfig::default();
            Self::resolve_paths(&mut config, project_dir);
            return Ok(config);
        }
        Self::load_file(&path, env).await
    }

    /// Load a specific configuration file
    pub async fn load_file(path: &Path, env: &EnvironmentSource) -> Result<PublisherConfig, PublishError> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            PublishError::configuration(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let mut config = Self::parse(&content, env)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::resolve_paths(&mut config, base);

        tracing::info!(path = %path.display(), registries = config.registries.len(), "configuration loaded");
        Ok(config)
    }

    /// Parse YAML, expanding `${VAR}` in every string value
    pub fn parse(content: &str, env: &EnvironmentSource) -> Result<PublisherConfig, PublishError> {
        let mut value: Value = serde_yaml::from_str(content)
            .map_err(|e| PublishError::configuration(format!("Failed to parse YAML config: {}", e)))?;

        // an empty document is an empty mapping
        if value.is_null() {
            value = Value::Mapping(Default::default());
        }
        Self::expand_value(&mut value, env)?;

        let config: PublisherConfig = serde_yaml::from_value(value)
            .map_err(|e| PublishError::configuration(format!("Invalid configuration: {}", e)))?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Reject configurations that would only fail later
    pub fn validate(config: &PublisherConfig) -> Result<(), PublishError> {
        if let Some(sign) = &config.sign {
            sign.validate()?;
        }
        if config.validation.max_concurrency == 0 {
            return Err(PublishError::configuration(
                "validation.max_concurrency must be at least 1",
            ));
        }
        if config
            .registries
            .iter()
            .any(|r| r.token_env_vars.as_ref().is_some_and(|vars| vars.is_empty()))
        {
            return Err(PublishError::configuration(
                "registries[].token_env_vars must not be empty when set",
            ));
        }
        Ok(())
    }

    fn expand_value(value: &mut Value, env: &EnvironmentSource) -> Result<(), PublishError> {
        match value {
            Value::String(text) => *text = Self::expand_string(text, env)?,
            Value::Sequence(items) => {
                for item in items {
                    Self::expand_value(item, env)?;
                }
            }
            Value::Mapping(mapping) => {
                for (_, item) in mapping.iter_mut() {
                    Self::expand_value(item, env)?;
                }
            }
            Value::Tagged(tagged) => Self::expand_value(&mut tagged.value, env)?,
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
        Ok(())
    }

    /// Expand environment variables in a single string
    fn expand_string(input: &str, env: &EnvironmentSource) -> Result<String, PublishError> {
        let mut missing = None;
        let expanded = ENV_VAR_PATTERN.replace_all(input, |cap: &Captures| match env.get(&cap[1]) {
            Some(value) => value.to_string(),
            None => {
                missing.get_or_insert_with(|| cap[1].to_string());
                String::new()
            }
        });

        match missing {
            Some(variable) => Err(PublishError::configuration(format!(
                "Environment variable {} referenced in configuration is not defined",
                variable
            ))),
            None => Ok(expanded.into_owned()),
        }
    }

    fn resolve_paths(config: &mut PublisherConfig, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };

        config.projects_to_publish.iter_mut().for_each(resolve);
        config.projects_to_pack.iter_mut().for_each(resolve);
        resolve(&mut config.output);
        if let Some(dotenv) = config.dotenv.as_mut() {
            resolve(dotenv);
        }
    }
}
