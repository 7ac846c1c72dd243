//! RegistryInfo - one project bound to one NuGet registry
//!
//! Responsibilities:
//! - Resolve the registry credential at construction (never later)
//! - Build `dotnet pack` / `dotnet nuget push` command lines
//! - Prove write access by packing and pushing a throwaway "dummy" version

use crate::core::error::{PublishError, PublishResult};
use crate::core::traits::{ProcessRunner, RegistryProvider};
use crate::msbuild::MSBuildProject;
use crate::security::command_executor::{escaped_arg, quote_arg};
use crate::security::credential_validator::CredentialValidator;
use crate::security::token_manager::{EnvironmentSource, ResolvedToken, SecureTokenManager};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;
use url::Url;

/// Version forced on dummy packages
pub const DUMMY_VERSION: &str = "0.0.1-DUMMY";

const DOTNET: &str = "dotnet";

/// Options for `dotnet pack`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackPackagesOptions {
    pub artifacts_path: Option<String>,
    pub configuration: Option<String>,
    pub disable_build_servers: bool,
    pub force: bool,
    pub include_source: bool,
    pub include_symbols: bool,
    pub interactive: bool,
    pub no_build: bool,
    pub no_logo: bool,
    pub no_restore: bool,
    /// Base output directory; defaults to the project's PackageOutputPath
    pub output: Option<PathBuf>,
    pub runtime: Option<String>,
    pub serviceable: bool,
    /// `auto`, `on` or `off`
    pub terminal_logger: Option<String>,
    pub use_current_runtime: bool,
    pub verbosity: Option<String>,
    pub version_suffix: Option<String>,
    /// MSBuild property overrides, serialized as one `-p:"k=v;..."` argument
    pub properties: BTreeMap<String, String>,
}

/// Options for `dotnet nuget push`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushPackagesOptions {
    /// Directory holding the packages; defaults to the pack output directory
    pub root: Option<PathBuf>,
    /// `None` uses the resolved credential; `Some("")` omits `--api-key`
    pub api_key: Option<String>,
    /// Defaults to the registry URL
    pub source: Option<String>,
    pub symbol_api_key: Option<String>,
    pub symbol_source: Option<String>,
    /// Seconds
    pub timeout: Option<u32>,
    pub disable_buffering: bool,
    pub force_english_output: bool,
    pub interactive: bool,
    pub no_service_endpoint: bool,
    pub no_symbols: bool,
    pub skip_duplicate: bool,
}

/// Folder name derived from a registry URL: host (+ `_port`) + path, `/index.json` stripped, `/` -> `_`.
///
/// # Examples
///
/// ```
/// use nuget_publisher::plugins::name_for_url;
///
/// assert_eq!(name_for_url("https://api.nuget.org/v3/index.json").unwrap(), "api.nuget.org_v3");
/// ```
pub fn name_for_url(url: &str) -> PublishResult<String> {
    let parsed = Url::parse(url)
        .map_err(|e| PublishError::configuration(format!("Invalid registry URL '{}': {}", url, e)))?;
    let host = match parsed.port() {
        Some(port) => format!("{}_{}", parsed.host_str().unwrap_or_default(), port),
        None => parsed.host_str().unwrap_or_default().to_string(),
    };
    let path = parsed.path();
    let path = path.strip_suffix("/index.json").unwrap_or(path);

    Ok(format!("{}{}", host, path.trim_end_matches('/')).replace('/', "_"))
}

/// Default pack output directory of a project
pub fn default_output_dir(project: &MSBuildProject) -> PathBuf {
    project
        .directory()
        .join(project.properties().package_output_path())
}

fn nested_dir(base: &Path, source_folder: Option<&str>, package_id: Option<&str>) -> PathBuf {
    let mut dir = base.to_path_buf();
    if let Some(folder) = source_folder {
        dir.push(folder);
    }
    if let Some(id) = package_id {
        dir.push(id);
    }
    dir
}

/// `dotnet pack` for a project, writing into `base/[source_folder]/[package id]`
pub fn pack_command(
    project: &MSBuildProject,
    options: &PackPackagesOptions,
    source_folder: Option<&str>,
    per_package_id_subfolder: bool,
) -> String {
    let mut args = vec![
        DOTNET.to_string(),
        "pack".to_string(),
        quote_arg(project.full_path().display()),
    ];

    if let Some(path) = &options.artifacts_path {
        args.push(format!("--artifacts-path {}", quote_arg(path)));
    }
    if let Some(configuration) = &options.configuration {
        args.push(format!("--configuration {}", configuration));
    }
    if options.disable_build_servers {
        args.push("--disable-build-servers".to_string());
    }
    if options.force {
        args.push("--force".to_string());
    }
    if options.include_source {
        args.push("--include-source".to_string());
    }
    if options.include_symbols {
        args.push("--include-symbols".to_string());
    }
    if options.interactive {
        args.push("--interactive".to_string());
    }
    if options.no_build {
        args.push("--no-build".to_string());
    }
    if options.no_logo {
        args.push("--nologo".to_string());
    }
    if options.no_restore {
        args.push("--no-restore".to_string());
    }
    if let Some(runtime) = &options.runtime {
        args.push(format!("--runtime {}", runtime));
    }
    if options.serviceable {
        args.push("--serviceable".to_string());
    }
    if let Some(mode) = &options.terminal_logger {
        args.push(format!("--tl:{}", mode));
    }
    if options.use_current_runtime {
        args.push("--use-current-runtime".to_string());
    }
    if let Some(verbosity) = &options.verbosity {
        args.push(format!("--verbosity {}", verbosity));
    }
    if let Some(suffix) = &options.version_suffix {
        args.push(format!("--version-suffix {}", suffix));
    }
    if !options.properties.is_empty() {
        let properties = options
            .properties
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join(";");
        args.push(format!("-p:{}", quote_arg(properties)));
    }

    let base = options
        .output
        .clone()
        .unwrap_or_else(|| default_output_dir(project));
    let package_id = per_package_id_subfolder.then(|| project.properties().package_id());
    args.push(format!(
        "--output {}",
        quote_arg(nested_dir(&base, source_folder, package_id).display())
    ));

    args.join(" ")
}

/// A project bound to a registry with a resolved credential
#[derive(Debug)]
pub struct RegistryInfo {
    project: Arc<MSBuildProject>,
    provider: String,
    url: String,
    url_folder: String,
    token_env_vars: Vec<String>,
    token: ResolvedToken,
    dummy_root: PathBuf,
    validator: CredentialValidator,
    /// Settled (or in-flight) result of the write-access check
    push_check: OnceCell<PublishResult<bool>>,
}

impl RegistryInfo {
    /// Bind `project` to the registry described by `provider`, using its default credential variables.
    ///
    /// # Errors
    ///
    /// `CredentialsUnavailable` when no candidate variable is defined; URL resolution errors otherwise.
    pub fn new(
        project: Arc<MSBuildProject>,
        provider: &dyn RegistryProvider,
        env: &EnvironmentSource,
    ) -> PublishResult<Self> {
        let token_env_vars = provider
            .default_token_env_vars()
            .iter()
            .map(|name| name.to_string())
            .collect();
        Self::with_token_env_vars(project, provider, token_env_vars, env)
    }

    /// Same as [`RegistryInfo::new`] with an explicit, ordered list of credential variables
    pub fn with_token_env_vars(
        project: Arc<MSBuildProject>,
        provider: &dyn RegistryProvider,
        token_env_vars: Vec<String>,
        env: &EnvironmentSource,
    ) -> PublishResult<Self> {
        let token = SecureTokenManager::new(env.clone()).resolve_first(&token_env_vars)?;
        let url = provider.resolve_url(env)?;
        let url_folder = name_for_url(&url)?;

        tracing::debug!(
            registry = provider.name(),
            %url,
            token_var = %token.env_var,
            token = %SecureTokenManager::mask_token(token.value.expose_secret()),
            project = %project.full_path().display(),
            "registry resolved"
        );

        Ok(Self {
            project,
            provider: provider.name().to_string(),
            url,
            url_folder,
            token_env_vars,
            token,
            dummy_root: std::env::temp_dir().join("nuget-publisher").join("dummies"),
            validator: CredentialValidator::new(),
            push_check: OnceCell::new(),
        })
    }

    /// Use another base directory for dummy packages
    pub fn with_dummy_root(mut self, dummy_root: impl Into<PathBuf>) -> Self {
        self.dummy_root = dummy_root.into();
        self
    }

    pub fn with_credential_validator(mut self, validator: CredentialValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn project(&self) -> &Arc<MSBuildProject> {
        &self.project
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Folder name derived from the registry URL
    pub fn url_folder(&self) -> &str {
        &self.url_folder
    }

    pub fn token_env_vars(&self) -> &[String] {
        &self.token_env_vars
    }

    /// Name of the variable the credential came from
    pub fn token_env_var(&self) -> &str {
        &self.token.env_var
    }

    pub fn dummy_root(&self) -> &Path {
        &self.dummy_root
    }

    /// `dotnet pack` for the owning project
    pub fn get_pack_command(
        &self,
        options: &PackPackagesOptions,
        per_source_subfolder: bool,
        per_package_id_subfolder: bool,
    ) -> String {
        let source_folder = per_source_subfolder.then_some(self.url_folder.as_str());
        pack_command(&self.project, options, source_folder, per_package_id_subfolder)
    }

    /// `dotnet nuget push` for the owning project's packages
    pub fn get_push_command(
        &self,
        options: &PushPackagesOptions,
        per_source_subfolder: bool,
        per_package_id_subfolder: bool,
    ) -> String {
        let base = options
            .root
            .clone()
            .unwrap_or_else(|| default_output_dir(&self.project));
        let root = nested_dir(
            &base,
            per_source_subfolder.then_some(self.url_folder.as_str()),
            per_package_id_subfolder.then(|| self.project.properties().package_id()),
        );

        let mut args = vec![
            DOTNET.to_string(),
            "nuget".to_string(),
            "push".to_string(),
            quote_arg(root.join("*.nupkg").display()),
            format!("--source {}", quote_arg(options.source.as_deref().unwrap_or(&self.url))),
        ];

        let api_key = options
            .api_key
            .as_deref()
            .unwrap_or_else(|| self.token.value.expose_secret());
        if !api_key.is_empty() {
            args.push(format!("--api-key {}", quote_arg(api_key)));
        }
        if let Some(source) = &options.symbol_source {
            args.push(format!("--symbol-source {}", quote_arg(source)));
        }
        if let Some(key) = &options.symbol_api_key {
            args.push(format!("--symbol-api-key {}", quote_arg(key)));
        }
        if let Some(timeout) = options.timeout {
            args.push(format!("--timeout {}", timeout));
        }
        if options.disable_buffering {
            args.push("--disable-buffering".to_string());
        }
        if options.force_english_output {
            args.push("--force-english-output".to_string());
        }
        if options.interactive {
            args.push("--interactive".to_string());
        }
        if options.no_service_endpoint {
            args.push("--no-service-endpoint".to_string());
        }
        if options.no_symbols {
            args.push("--no-symbols".to_string());
        }
        if options.skip_duplicate {
            args.push("--skip-duplicate".to_string());
        }

        args.join(" ")
    }

    /// Pack the project as [`DUMMY_VERSION`] into this registry's dummy directory
    pub fn get_pack_dummy_command(&self, options: &PackPackagesOptions) -> String {
        let mut options = options.clone();
        options.output = Some(self.dummy_root.clone());
        options
            .properties
            .insert("Version".to_string(), DUMMY_VERSION.to_string());
        options
            .properties
            .insert("PackageVersion".to_string(), DUMMY_VERSION.to_string());
        self.get_pack_command(&options, true, true)
    }

    /// Push the dummy package; duplicates are skipped
    pub fn get_push_dummy_command(&self, options: &PushPackagesOptions) -> String {
        let mut options = options.clone();
        options.root = Some(self.dummy_root.clone());
        options.skip_duplicate = true;
        self.get_push_command(&options, true, true)
    }

    /// Whether the credential can push to this registry.
    ///
    /// The round trip runs at most once per instance; concurrent and later
    /// callers share its result. Errors have the credential scrubbed.
    pub async fn can_push_packages_to_source(&self, runner: &dyn ProcessRunner) -> PublishResult<bool> {
        self.push_check
            .get_or_init(|| self.check_push_access(runner))
            .await
            .clone()
    }

    async fn check_push_access(&self, runner: &dyn ProcessRunner) -> PublishResult<bool> {
        let secret = self.token.value.expose_secret();
        self.push_round_trip(runner, secret)
            .await
            .map_err(|error| error.redact(&escaped_arg(secret)).redact(secret))
    }

    async fn push_round_trip(&self, runner: &dyn ProcessRunner, secret: &str) -> PublishResult<bool> {
        if let Err(reason) = self.validator.validate_token(secret) {
            tracing::warn!(registry = %self.url, token_var = %self.token.env_var, "credential cannot push packages");
            return Err(self.insufficient_permissions(reason, None));
        }

        tracing::info!(
            registry = %self.url,
            package = self.project.properties().package_id(),
            "validating push access with a dummy package"
        );

        let pack = self.get_pack_dummy_command(&PackPackagesOptions::default());
        tracing::debug!(command = %pack, "packing dummy package");
        runner.run(&pack).await.map_err(|e| {
            self.insufficient_permissions(
                "failed to pack the dummy package".to_string(),
                Some(PublishError::Command(e)),
            )
        })?;

        let push = self.get_push_dummy_command(&PushPackagesOptions::default());
        tracing::debug!(
            command = %SecureTokenManager::mask_token_in_string(&push, &self.token.value),
            "pushing dummy package"
        );
        runner.run(&push).await.map_err(|e| {
            self.insufficient_permissions(
                "failed to push the dummy package".to_string(),
                Some(PublishError::Command(e)),
            )
        })?;

        tracing::info!(registry = %self.url, "push access confirmed");
        Ok(true)
    }

    fn insufficient_permissions(&self, message: String, source: Option<PublishError>) -> PublishError {
        PublishError::InsufficientPermissions {
            registry: self.url.clone(),
            message,
            source: source.map(Box::new),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msbuild::EvaluationResult;
    use crate::plugins::NuGetOrgPlugin;
    use crate::test_support::{SpyRunner, failure};
    use std::path::Component;
    use tempfile::TempDir;

    const NUGET_URL: &str = "https://api.nuget.org/v3/index.json";

    fn project(dir: &TempDir) -> Arc<MSBuildProject> {
        let path = dir.path().join("Contoso.Core.csproj");
        std::fs::write(&path, "<Project />").unwrap();
        let mut properties = BTreeMap::new();
        properties.insert("PackageId".to_string(), "Contoso.Core".to_string());
        let evaluation = EvaluationResult {
            properties: Some(properties),
            ..EvaluationResult::default()
        };
        Arc::new(MSBuildProject::new(&path, evaluation, Vec::new()).unwrap())
    }

    fn registry(dir: &TempDir, token: &str) -> RegistryInfo {
        RegistryInfo::new(
            project(dir),
            &NuGetOrgPlugin::new(),
            &EnvironmentSource::from_pairs([("NUGET_TOKEN", token)]),
        )
        .unwrap()
        .with_dummy_root(dir.path().join("dummies"))
    }

    fn normal_components(path: &str) -> Vec<String> {
        Path::new(path)
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect()
    }

    fn quoted_value_after<'a>(command: &'a str, flag: &str) -> &'a str {
        let start = command.find(flag).unwrap() + flag.len() + 2;
        let end = command[start..].find('"').unwrap() + start;
        &command[start..end]
    }

    #[test]
    fn test_name_for_url() {
        assert_eq!(name_for_url(NUGET_URL).unwrap(), "api.nuget.org_v3");
        assert_eq!(
            name_for_url("https://nuget.pkg.github.com/contoso/index.json").unwrap(),
            "nuget.pkg.github.com_contoso"
        );
        assert!(name_for_url("not a url").is_err());
    }

    #[test]
    fn test_name_for_url_keeps_explicit_port() {
        let first = name_for_url("https://localhost:5000/v3/index.json").unwrap();
        let second = name_for_url("https://localhost:5001/v3/index.json").unwrap();

        assert_eq!(first, "localhost_5000_v3");
        assert_ne!(first, second);
        assert_eq!(name_for_url("https://localhost:443/v3/index.json").unwrap(), "localhost_v3");
    }

    #[test]
    fn test_construction_fails_without_credentials() {
        let dir = TempDir::new().unwrap();
        let error = RegistryInfo::with_token_env_vars(
            project(&dir),
            &NuGetOrgPlugin::new(),
            vec!["FIRST_TOKEN".to_string(), "SECOND_TOKEN".to_string()],
            &EnvironmentSource::default(),
        )
        .unwrap_err();

        match error {
            PublishError::CredentialsUnavailable { attempted } => {
                assert_eq!(attempted, vec!["FIRST_TOKEN", "SECOND_TOKEN"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_pack_command_nests_output_in_order() {
        let dir = TempDir::new().unwrap();
        let info = registry(&dir, "nuget-secret");
        let base = dir.path().join("out");
        let options = PackPackagesOptions {
            output: Some(base.clone()),
            ..PackPackagesOptions::default()
        };

        let command = info.get_pack_command(&options, true, true);
        let output = quoted_value_after(&command, "--output");

        let mut expected = normal_components(&base.to_string_lossy());
        expected.push("api.nuget.org_v3".to_string());
        expected.push("Contoso.Core".to_string());
        assert_eq!(normal_components(output), expected);
    }

    #[test]
    fn test_pack_command_flags_and_properties() {
        let dir = TempDir::new().unwrap();
        let info = registry(&dir, "nuget-secret");
        let mut options = PackPackagesOptions {
            configuration: Some("Release".to_string()),
            include_symbols: true,
            no_build: true,
            runtime: Some("linux-x64".to_string()),
            ..PackPackagesOptions::default()
        };
        options
            .properties
            .insert("ContinuousIntegrationBuild".to_string(), "true".to_string());
        options
            .properties
            .insert("Version".to_string(), "1.2.3".to_string());

        let command = info.get_pack_command(&options, false, false);

        assert!(command.starts_with("dotnet pack \""));
        assert!(command.contains("--configuration Release"));
        assert!(command.contains("--include-symbols"));
        assert!(command.contains("--no-build"));
        assert!(command.contains("--runtime linux-x64"));
        assert!(command.contains("-p:\"ContinuousIntegrationBuild=true;Version=1.2.3\""));
    }

    #[test]
    fn test_push_command_defaults_to_registry_and_token() {
        let dir = TempDir::new().unwrap();
        let info = registry(&dir, "nuget-secret");

        let command = info.get_push_command(&PushPackagesOptions::default(), false, false);

        assert!(command.starts_with("dotnet nuget push \""));
        assert!(command.contains("*.nupkg\""));
        assert!(command.contains(&format!("--source \"{}\"", NUGET_URL)));
        assert!(command.contains("--api-key \"nuget-secret\""));
    }

    #[test]
    fn test_push_command_with_empty_api_key_omits_flag() {
        let dir = TempDir::new().unwrap();
        let info = registry(&dir, "nuget-secret");
        let options = PushPackagesOptions {
            api_key: Some(String::new()),
            ..PushPackagesOptions::default()
        };

        let command = info.get_push_command(&options, false, false);
        assert!(!command.contains("--api-key"));
    }

    #[test]
    fn test_push_command_explicit_overrides() {
        let dir = TempDir::new().unwrap();
        let info = registry(&dir, "nuget-secret");
        let options = PushPackagesOptions {
            api_key: Some("other-key".to_string()),
            source: Some("https://example.com/v3/index.json".to_string()),
            timeout: Some(600),
            skip_duplicate: true,
            ..PushPackagesOptions::default()
        };

        let command = info.get_push_command(&options, false, false);
        assert!(command.contains("--api-key \"other-key\""));
        assert!(command.contains("--source \"https://example.com/v3/index.json\""));
        assert!(command.contains("--timeout 600"));
        assert!(command.contains("--skip-duplicate"));
        assert!(!command.contains("nuget-secret"));
    }

    #[test]
    fn test_dummy_commands_use_dummy_root() {
        let dir = TempDir::new().unwrap();
        let info = registry(&dir, "nuget-secret");

        let pack = info.get_pack_dummy_command(&PackPackagesOptions::default());
        let push = info.get_push_dummy_command(&PushPackagesOptions::default());

        assert!(pack.contains("PackageVersion=0.0.1-DUMMY;Version=0.0.1-DUMMY"));
        let dummy_dir = info
            .dummy_root()
            .join("api.nuget.org_v3")
            .join("Contoso.Core");
        assert!(pack.contains(&dummy_dir.display().to_string()));
        assert!(push.contains(&dummy_dir.display().to_string()));
        assert!(push.contains("--skip-duplicate"));
    }

    #[tokio::test]
    async fn test_fine_grained_token_rejected_without_processes() {
        let dir = TempDir::new().unwrap();
        let info = registry(&dir, "github_pat_11ABCDEF0123456789");
        let runner = SpyRunner::new();

        let error = info.can_push_packages_to_source(&runner).await.unwrap_err();

        assert!(matches!(error, PublishError::InsufficientPermissions { .. }));
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_custom_incapable_prefix() {
        let dir = TempDir::new().unwrap();
        let info = registry(&dir, "ro_readonly_token_value")
            .with_credential_validator(CredentialValidator::new().with_incapable_prefix("ro_", "read-only key"));
        let runner = SpyRunner::new();

        let error = info.can_push_packages_to_source(&runner).await.unwrap_err();

        assert!(error.to_string().contains("read-only key"));
        assert!(!error.to_string().contains("ro_readonly_token_value"));
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_round_trip_packs_then_pushes_once() {
        let dir = TempDir::new().unwrap();
        let info = registry(&dir, "nuget-secret");
        let runner = SpyRunner::new();

        assert!(info.can_push_packages_to_source(&runner).await.unwrap());
        assert!(info.can_push_packages_to_source(&runner).await.unwrap());

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].starts_with("dotnet pack"));
        assert!(calls[1].starts_with("dotnet nuget push"));
    }

    #[tokio::test]
    async fn test_concurrent_checks_share_one_round_trip() {
        let dir = TempDir::new().unwrap();
        let info = registry(&dir, "nuget-secret");
        let runner = SpyRunner::new();

        let (first, second) = tokio::join!(
            info.can_push_packages_to_source(&runner),
            info.can_push_packages_to_source(&runner)
        );

        assert!(first.unwrap() && second.unwrap());
        assert_eq!(runner.call_count(), 2);
    }

    #[tokio::test]
    async fn test_push_failure_is_scrubbed() {
        let dir = TempDir::new().unwrap();
        let info = registry(&dir, "nuget-secret");
        let runner = SpyRunner::new();
        runner.push_stdout("packed");
        runner.push_response(Err(failure(
            "dotnet nuget push --api-key \"nuget-secret\"",
            "Response status code does not indicate success: 403 (key nuget-secret)",
        )));

        let error = info.can_push_packages_to_source(&runner).await.unwrap_err();

        assert!(matches!(error, PublishError::InsufficientPermissions { .. }));
        let rendered = format!("{error:?} {error}");
        assert!(!rendered.contains("nuget-secret"));
        assert!(rendered.contains("403"));

        // settled failures are shared too
        assert!(info.can_push_packages_to_source(&runner).await.is_err());
        assert_eq!(runner.call_count(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_push_command_escapes_shell_characters_in_key() {
        let dir = TempDir::new().unwrap();
        let info = registry(&dir, "oy2$HOME`id`");

        let command = info.get_push_command(&PushPackagesOptions::default(), false, false);

        assert!(command.contains(r#"--api-key "oy2\$HOME\`id\`""#));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_escaped_key_is_scrubbed_from_failures() {
        let dir = TempDir::new().unwrap();
        let info = registry(&dir, "oy2$HOME`id`");
        let runner = SpyRunner::new();
        runner.push_stdout("packed");
        runner.push_response(Err(failure(
            r#"dotnet nuget push --api-key "oy2\$HOME\`id\`""#,
            "Response status code does not indicate success: 401",
        )));

        let error = info.can_push_packages_to_source(&runner).await.unwrap_err();

        let rendered = format!("{error:?} {error}");
        assert!(!rendered.contains("oy2"));
        assert!(rendered.contains("401"));
    }
}
