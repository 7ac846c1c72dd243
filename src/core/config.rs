//! Configuration structures and types for nuget-publisher
//!
//! This module provides type-safe configuration management with serde support.

use crate::core::retry::RetryConfig;
use crate::orchestration::package_publisher::SignOptions;
use crate::plugins::plugin_loader::RegistryType;
use crate::plugins::registry_info::{PackPackagesOptions, PushPackagesOptions};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default shared package output directory, relative to the config file
pub const DEFAULT_OUTPUT_DIR: &str = "publish";

/// Root configuration object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PublisherConfig {
    /// Projects published once per runtime/framework permutation
    pub projects_to_publish: Vec<PathBuf>,

    /// Projects packed (and pushed to every registry)
    pub projects_to_pack: Vec<PathBuf>,

    /// Target registries; empty packs without registry-specific subfolders
    pub registries: Vec<RegistryConfig>,

    /// `dotnet pack` options
    pub pack: PackPackagesOptions,

    /// `dotnet nuget push` options
    pub push: PushPackagesOptions,

    /// `dotnet nuget sign` options (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sign: Option<SignOptions>,

    /// Busy-file retry policy for project evaluation
    pub retry: RetryConfig,

    /// `.env` file consulted after the process environment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dotenv: Option<PathBuf>,

    /// Shared package output directory
    pub output: PathBuf,

    pub per_source_subfolder: bool,
    pub per_package_id_subfolder: bool,

    /// Write-access validation settings
    pub validation: ValidationConfig,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            projects_to_publish: Vec::new(),
            projects_to_pack: Vec::new(),
            registries: Vec::new(),
            pack: PackPackagesOptions::default(),
            push: PushPackagesOptions::default(),
            sign: None,
            retry: RetryConfig::default(),
            dotenv: None,
            output: PathBuf::from(DEFAULT_OUTPUT_DIR),
            per_source_subfolder: true,
            per_package_id_subfolder: true,
            validation: ValidationConfig::default(),
        }
    }
}

/// One target registry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistryConfig {
    #[serde(rename = "type")]
    pub registry_type: RegistryType,

    /// Explicit feed URL. For GitLab also `project` or `group`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Credential variables in priority order (default: the provider's list)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env_vars: Option<Vec<String>>,
}

impl RegistryConfig {
    pub fn new(registry_type: RegistryType) -> Self {
        Self {
            registry_type,
            url: None,
            token_env_vars: None,
        }
    }
}

/// Write-access validation settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ValidationConfig {
    pub sequential: bool,
    pub continue_on_error: bool,
    pub max_concurrency: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            sequential: false,
            continue_on_error: false,
            max_concurrency: 3,
        }
    }
}
