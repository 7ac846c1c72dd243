//! NuGet.org Plugin - the public NuGet gallery

use crate::core::error::PublishError;
use crate::core::traits::RegistryProvider;
use crate::security::token_manager::EnvironmentSource;

/// NuGet.org V3 service index
pub const NUGET_ORG_URL: &str = "https://api.nuget.org/v3/index.json";

/// NuGet.org registry plugin
#[derive(Debug, Clone, Default)]
pub struct NuGetOrgPlugin {
    url: Option<String>,
}

impl NuGetOrgPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point at a NuGet.org-compatible mirror instead
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
        }
    }
}

impl RegistryProvider for NuGetOrgPlugin {
    fn name(&self) -> &str {
        "nuget"
    }

    fn default_token_env_vars(&self) -> &'static [&'static str] {
        &["NUGET_TOKEN"]
    }

    fn resolve_url(&self, _env: &EnvironmentSource) -> Result<String, PublishError> {
        Ok(self.url.clone().unwrap_or_else(|| NUGET_ORG_URL.to_string()))
    }
}
