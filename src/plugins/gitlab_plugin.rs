//! GitLab Plugin - GitLab package registry (project or group level)
//!
//! Inside GitLab CI the feed URL is derived from the predefined variables:
//!
//! - project: `${CI_API_V4_URL}/projects/${CI_PROJECT_ID}/packages/nuget/index.json`
//! - group: `${CI_API_V4_URL}/groups/${CI_PROJECT_NAMESPACE_ID}/-/packages/nuget/index.json`

use crate::core::error::PublishError;
use crate::core::traits::RegistryProvider;
use crate::security::token_manager::EnvironmentSource;

const API_VAR: &str = "CI_API_V4_URL";
const PROJECT_VAR: &str = "CI_PROJECT_ID";
const GROUP_VAR: &str = "CI_PROJECT_NAMESPACE_ID";

/// Which GitLab feed to publish to
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GitlabFeed {
    #[default]
    Project,
    Group,
    Url(String),
}

impl GitlabFeed {
    /// `"project"`, `"group"` (case-insensitive) or a literal URL
    pub fn parse(selector: &str) -> Self {
        match selector.trim() {
            s if s.eq_ignore_ascii_case("project") => Self::Project,
            s if s.eq_ignore_ascii_case("group") => Self::Group,
            url => Self::Url(url.to_string()),
        }
    }
}

/// GitLab registry plugin
#[derive(Debug, Clone, Default)]
pub struct GitlabPlugin {
    feed: GitlabFeed,
}

impl GitlabPlugin {
    pub fn new(feed: GitlabFeed) -> Self {
        Self { feed }
    }

    pub fn feed(&self) -> &GitlabFeed {
        &self.feed
    }
}

fn require(env: &EnvironmentSource, variable: &str) -> Result<String, PublishError> {
    env.get(variable)
        .map(str::to_string)
        .ok_or_else(|| PublishError::MissingEnvironment {
            variable: variable.to_string(),
            purpose: "derive the GitLab package registry URL".to_string(),
        })
}

impl RegistryProvider for GitlabPlugin {
    fn name(&self) -> &str {
        "gitlab"
    }

    fn default_token_env_vars(&self) -> &'static [&'static str] {
        &["GL_TOKEN", "GITLAB_TOKEN", "CI_JOB_TOKEN"]
    }

    fn resolve_url(&self, env: &EnvironmentSource) -> Result<String, PublishError> {
        let api = || require(env, API_VAR).map(|api| api.trim_end_matches('/').to_string());

        match &self.feed {
            GitlabFeed::Url(url) => Ok(url.clone()),
            GitlabFeed::Project => Ok(format!(
                "{}/projects/{}/packages/nuget/index.json",
                api()?,
                require(env, PROJECT_VAR)?
            )),
            GitlabFeed::Group => Ok(format!(
                "{}/groups/{}/-/packages/nuget/index.json",
                api()?,
                require(env, GROUP_VAR)?
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ci_env() -> EnvironmentSource {
        EnvironmentSource::from_pairs([
            (API_VAR, "https://gitlab.example.com/api/v4"),
            (PROJECT_VAR, "42"),
            (GROUP_VAR, "7"),
        ])
    }

    #[test]
    fn test_parse_selector() {
        assert_eq!(GitlabFeed::parse("project"), GitlabFeed::Project);
        assert_eq!(GitlabFeed::parse("Group"), GitlabFeed::Group);
        assert_eq!(
            GitlabFeed::parse("https://gitlab.example.com/feed/index.json"),
            GitlabFeed::Url("https://gitlab.example.com/feed/index.json".to_string())
        );
    }

    #[test]
    fn test_project_url() {
        let url = GitlabPlugin::new(GitlabFeed::Project)
            .resolve_url(&ci_env())
            .unwrap();
        assert_eq!(
            url,
            "https://gitlab.example.com/api/v4/projects/42/packages/nuget/index.json"
        );
    }

    #[test]
    fn test_group_url() {
        let url = GitlabPlugin::new(GitlabFeed::Group)
            .resolve_url(&ci_env())
            .unwrap();
        assert_eq!(
            url,
            "https://gitlab.example.com/api/v4/groups/7/-/packages/nuget/index.json"
        );
    }

    #[test]
    fn test_literal_url_needs_no_ci_variables() {
        let url = GitlabPlugin::new(GitlabFeed::parse("https://example.com/index.json"))
            .resolve_url(&EnvironmentSource::default())
            .unwrap();
        assert_eq!(url, "https://example.com/index.json");
    }

    #[test]
    fn test_missing_ci_variables() {
        let env = EnvironmentSource::from_pairs([(PROJECT_VAR, "42")]);
        let error = GitlabPlugin::new(GitlabFeed::Project)
            .resolve_url(&env)
            .unwrap_err();
        assert!(matches!(
            error,
            PublishError::MissingEnvironment { ref variable, .. } if variable == API_VAR
        ));
    }
}
