//! Plugin Loader - maps registry configuration to providers
//!
//! This module turns `registries` entries into [`RegistryProvider`]s and
//! [`RegistryInfo`]s, and can detect likely registries from CI environment
//! facts when nothing is configured.
//!
//! # Example
//!
//! ```no_run
//! use nuget_publisher::plugins::plugin_loader::PluginLoader;
//! use nuget_publisher::security::token_manager::EnvironmentSource;
//!
//! let detected = PluginLoader::detect_registries(&EnvironmentSource::from_process());
//! println!("Detected {} registries", detected.len());
//! ```

use crate::core::config::RegistryConfig;
use crate::core::error::PublishResult;
use crate::core::traits::RegistryProvider;
use crate::msbuild::MSBuildProject;
use crate::plugins::github_plugin::GithubPlugin;
use crate::plugins::gitlab_plugin::{GitlabFeed, GitlabPlugin};
use crate::plugins::nuget_org_plugin::NuGetOrgPlugin;
use crate::plugins::registry_info::RegistryInfo;
use crate::security::token_manager::EnvironmentSource;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Registry type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryType {
    NuGet,
    GitHub,
    GitLab,
}

impl RegistryType {
    /// Get string representation of registry type
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistryType::NuGet => "nuget",
            RegistryType::GitHub => "github",
            RegistryType::GitLab => "gitlab",
        }
    }
}

/// Registry detected from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedRegistry {
    pub registry_type: RegistryType,
    /// Variable that revealed it
    pub evidence: &'static str,
}

/// Plugin loader for registry providers
pub struct PluginLoader;

impl PluginLoader {
    /// Provider for one configured registry
    pub fn load_plugin(config: &RegistryConfig) -> Box<dyn RegistryProvider> {
        match config.registry_type {
            RegistryType::NuGet => Box::new(match &config.url {
                Some(url) => NuGetOrgPlugin::with_url(url),
                None => NuGetOrgPlugin::new(),
            }),
            RegistryType::GitHub => Box::new(match &config.url {
                Some(url) => GithubPlugin::with_url(url),
                None => GithubPlugin::new(),
            }),
            RegistryType::GitLab => Box::new(GitlabPlugin::new(
                config
                    .url
                    .as_deref()
                    .map(GitlabFeed::parse)
                    .unwrap_or_default(),
            )),
        }
    }

    /// Bind `project` to every configured registry.
    ///
    /// Fails on the first registry whose credential or URL cannot be resolved.
    pub fn load_registries(
        project: &Arc<MSBuildProject>,
        configs: &[RegistryConfig],
        env: &EnvironmentSource,
    ) -> PublishResult<Vec<RegistryInfo>> {
        configs
            .iter()
            .map(|config| {
                let provider = Self::load_plugin(config);
                match &config.token_env_vars {
                    Some(vars) => RegistryInfo::with_token_env_vars(
                        Arc::clone(project),
                        provider.as_ref(),
                        vars.clone(),
                        env,
                    ),
                    None => RegistryInfo::new(Arc::clone(project), provider.as_ref(), env),
                }
            })
            .collect()
    }

    /// Registries suggested by CI environment facts
    pub fn detect_registries(env: &EnvironmentSource) -> Vec<DetectedRegistry> {
        let candidates = [
            (RegistryType::NuGet, "NUGET_TOKEN"),
            (RegistryType::GitHub, "GITHUB_REPOSITORY_OWNER"),
            (RegistryType::GitLab, "CI_API_V4_URL"),
        ];

        candidates
            .into_iter()
            .filter(|(_, evidence)| env.is_defined(evidence))
            .map(|(registry_type, evidence)| DetectedRegistry {
                registry_type,
                evidence,
            })
            .collect()
    }
}
