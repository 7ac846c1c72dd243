//! GitHub Plugin - GitHub Packages NuGet registry
//!
//! The feed is owned by the repository owner (user or organization), which
//! GitHub Actions exposes as `GITHUB_REPOSITORY_OWNER`.

use crate::core::error::PublishError;
use crate::core::traits::RegistryProvider;
use crate::security::token_manager::EnvironmentSource;

const OWNER_VAR: &str = "GITHUB_REPOSITORY_OWNER";

/// GitHub Packages registry plugin
#[derive(Debug, Clone, Default)]
pub struct GithubPlugin {
    url: Option<String>,
}

impl GithubPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
        }
    }

    /// Feed URL for an owner
    pub fn owner_url(owner: &str) -> String {
        format!("https://nuget.pkg.github.com/{}/index.json", owner)
    }
}

impl RegistryProvider for GithubPlugin {
    fn name(&self) -> &str {
        "github"
    }

    fn default_token_env_vars(&self) -> &'static [&'static str] {
        &["GITHUB_TOKEN", "GH_TOKEN"]
    }

    fn resolve_url(&self, env: &EnvironmentSource) -> Result<String, PublishError> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }
        let owner = env.get(OWNER_VAR).ok_or_else(|| PublishError::MissingEnvironment {
            variable: OWNER_VAR.to_string(),
            purpose: "derive the GitHub Packages feed URL".to_string(),
        })?;
        Ok(Self::owner_url(owner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_from_owner() {
        let env = EnvironmentSource::from_pairs([(OWNER_VAR, "contoso")]);
        assert_eq!(
            GithubPlugin::new().resolve_url(&env).unwrap(),
            "https://nuget.pkg.github.com/contoso/index.json"
        );
    }

    #[test]
    fn test_missing_owner() {
        let error = GithubPlugin::new()
            .resolve_url(&EnvironmentSource::default())
            .unwrap_err();
        assert!(matches!(
            error,
            PublishError::MissingEnvironment { ref variable, .. } if variable == OWNER_VAR
        ));
    }

    #[test]
    fn test_token_priority() {
        assert_eq!(
            GithubPlugin::new().default_token_env_vars(),
            &["GITHUB_TOKEN", "GH_TOKEN"]
        );
    }
}
