//! Registry providers and the project/registry binding

pub mod github_plugin;
pub mod gitlab_plugin;
pub mod nuget_org_plugin;
pub mod plugin_loader;
pub mod registry_info;

pub use github_plugin::GithubPlugin;
pub use gitlab_plugin::{GitlabFeed, GitlabPlugin};
pub use nuget_org_plugin::{NUGET_ORG_URL, NuGetOrgPlugin};
pub use plugin_loader::{DetectedRegistry, PluginLoader, RegistryType};
pub use registry_info::{
    DUMMY_VERSION, PackPackagesOptions, PushPackagesOptions, RegistryInfo, name_for_url,
};
