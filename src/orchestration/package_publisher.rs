//! Package Publisher - builds the release command pipeline
//!
//! Produces, for one run:
//! - one `dotnet publish` per runtime/framework permutation of each project
//! - one `dotnet pack` per project or registry, into a shared output directory
//! - an optional `dotnet nuget sign` over everything packed
//!
//! Steps are joined with `&&` so the first failure stops the pipeline.
//! Nothing is executed here.

use crate::core::error::{PublishError, PublishResult};
use crate::msbuild::MSBuildProject;
use crate::plugins::registry_info::{
    PackPackagesOptions, PushPackagesOptions, RegistryInfo, pack_command,
};
use crate::security::command_executor::quote_arg;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Convention target that publishes every permutation itself
pub const PUBLISH_ALL_TARGET: &str = "PublishAll";

/// Separator that chains pipeline steps on success
pub const STEP_SEPARATOR: &str = " && ";

/// Something to pack: a bare project, or a project bound to a registry
#[derive(Debug, Clone)]
pub enum PackTarget {
    Project(Arc<MSBuildProject>),
    Registry(Arc<RegistryInfo>),
}

impl PackTarget {
    pub fn project(&self) -> &MSBuildProject {
        match self {
            Self::Project(project) => project,
            Self::Registry(registry) => registry.project(),
        }
    }
}

/// Options for `dotnet nuget sign`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignOptions {
    pub certificate_path: Option<String>,
    pub certificate_store_name: Option<String>,
    pub certificate_store_location: Option<String>,
    pub certificate_subject_name: Option<String>,
    pub certificate_fingerprint: Option<String>,
    pub certificate_password: Option<String>,
    pub hash_algorithm: Option<String>,
    pub timestamper: Option<String>,
    pub timestamp_hash_algorithm: Option<String>,
    /// Write signed packages elsewhere instead of in place
    pub output: Option<PathBuf>,
    pub overwrite: bool,
    pub verbosity: Option<String>,
}

impl SignOptions {
    /// A certificate needs both a location and a selector
    pub fn validate(&self) -> PublishResult<()> {
        let located = self.certificate_path.is_some()
            || self.certificate_store_name.is_some()
            || self.certificate_store_location.is_some();
        if !located {
            return Err(PublishError::configuration(
                "signing requires a certificate path, store name or store location",
            ));
        }

        let selected =
            self.certificate_subject_name.is_some() || self.certificate_fingerprint.is_some();
        if !selected {
            return Err(PublishError::configuration(
                "signing requires a certificate subject name or fingerprint",
            ));
        }
        Ok(())
    }
}

/// `dotnet publish` commands for a project.
///
/// A project declaring [`PUBLISH_ALL_TARGET`] gets a single invocation of that
/// target; otherwise one command per runtime x framework pair.
pub fn publish_commands(project: &MSBuildProject) -> Vec<String> {
    let path = quote_arg(project.full_path().display());

    if project.has_target(PUBLISH_ALL_TARGET) {
        return vec![format!("dotnet msbuild {} -t:{}", path, PUBLISH_ALL_TARGET)];
    }

    let properties = project.properties().msbuild();
    let runtimes = properties.runtime_identifier_list();
    let frameworks = properties.target_framework_list();
    let base = format!("dotnet publish {}", path);
    let base = base.as_str();

    match (runtimes.is_empty(), frameworks.is_empty()) {
        (true, true) => vec![base.to_string()],
        (false, true) => runtimes
            .iter()
            .map(|rid| format!("{} --runtime {}", base, rid))
            .collect(),
        (true, false) => frameworks
            .iter()
            .map(|tfm| format!("{} --framework {}", base, tfm))
            .collect(),
        (false, false) => runtimes
            .iter()
            .flat_map(|rid| {
                frameworks
                    .iter()
                    .map(move |tfm| format!("{} --runtime {} --framework {}", base, rid, tfm))
            })
            .collect(),
    }
}

/// `dotnet nuget sign` over every package below `packages_dir`
pub fn sign_command(packages_dir: &Path, options: &SignOptions) -> PublishResult<String> {
    options.validate()?;

    let mut args = vec![format!(
        "dotnet nuget sign {}",
        quote_arg(packages_dir.join("**").join("*.nupkg").display())
    )];

    let valued = [
        ("--certificate-path", &options.certificate_path),
        ("--certificate-store-name", &options.certificate_store_name),
        ("--certificate-store-location", &options.certificate_store_location),
        ("--certificate-subject-name", &options.certificate_subject_name),
        ("--certificate-fingerprint", &options.certificate_fingerprint),
        ("--certificate-password", &options.certificate_password),
        ("--hash-algorithm", &options.hash_algorithm),
        ("--timestamper", &options.timestamper),
        ("--timestamp-hash-algorithm", &options.timestamp_hash_algorithm),
        ("--verbosity", &options.verbosity),
    ];
    for (flag, value) in valued {
        if let Some(value) = value {
            args.push(format!("{} {}", flag, quote_arg(value)));
        }
    }
    if let Some(output) = &options.output {
        args.push(format!("--output {}", quote_arg(output.display())));
    }
    if options.overwrite {
        args.push("--overwrite".to_string());
    }

    Ok(args.join(" "))
}

/// Main pipeline builder
#[derive(Debug, Clone)]
pub struct PackagePublisher {
    output_dir: PathBuf,
    pack_options: PackPackagesOptions,
    push_options: PushPackagesOptions,
    sign_options: Option<SignOptions>,
    per_source_subfolder: bool,
    per_package_id_subfolder: bool,
}

impl PackagePublisher {
    /// Create a publisher writing packages below `output_dir`
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            pack_options: PackPackagesOptions::default(),
            push_options: PushPackagesOptions::default(),
            sign_options: None,
            per_source_subfolder: true,
            per_package_id_subfolder: true,
        }
    }

    pub fn with_pack_options(mut self, options: PackPackagesOptions) -> Self {
        self.pack_options = options;
        self
    }

    pub fn with_push_options(mut self, options: PushPackagesOptions) -> Self {
        self.push_options = options;
        self
    }

    pub fn with_sign_options(mut self, options: SignOptions) -> Self {
        self.sign_options = Some(options);
        self
    }

    /// Control how the shared output directory is partitioned
    pub fn with_subfolders(mut self, per_source: bool, per_package_id: bool) -> Self {
        self.per_source_subfolder = per_source;
        self.per_package_id_subfolder = per_package_id;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Ordered steps: every publish, then every pack, then the signature.
    ///
    /// # Errors
    ///
    /// `Configuration` when signing options are incomplete.
    pub fn prepare_steps(
        &self,
        projects_to_publish: &[Arc<MSBuildProject>],
        projects_to_pack: &[PackTarget],
    ) -> PublishResult<Vec<String>> {
        // validate before producing anything
        let sign = self
            .sign_options
            .as_ref()
            .map(|options| sign_command(&self.output_dir, options))
            .transpose()?;

        let mut steps: Vec<String> = projects_to_publish
            .iter()
            .flat_map(|project| publish_commands(project))
            .collect();

        let pack_options = PackPackagesOptions {
            output: Some(self.output_dir.clone()),
            ..self.pack_options.clone()
        };
        steps.extend(projects_to_pack.iter().map(|target| match target {
            PackTarget::Registry(registry) => registry.get_pack_command(
                &pack_options,
                self.per_source_subfolder,
                self.per_package_id_subfolder,
            ),
            PackTarget::Project(project) => {
                pack_command(project, &pack_options, None, self.per_package_id_subfolder)
            }
        }));

        steps.extend(sign);

        tracing::debug!(steps = steps.len(), "prepare pipeline built");
        Ok(steps)
    }

    /// [`PackagePublisher::prepare_steps`] joined into one pipeline
    pub fn prepare_commands(
        &self,
        projects_to_publish: &[Arc<MSBuildProject>],
        projects_to_pack: &[PackTarget],
    ) -> PublishResult<String> {
        Ok(self
            .prepare_steps(projects_to_publish, projects_to_pack)?
            .join(STEP_SEPARATOR))
    }

    /// One `dotnet nuget push` per registry, reading from the shared output directory
    pub fn push_steps(&self, registries: &[Arc<RegistryInfo>]) -> Vec<String> {
        let push_options = PushPackagesOptions {
            root: Some(self.output_dir.clone()),
            ..self.push_options.clone()
        };
        registries
            .iter()
            .map(|registry| {
                registry.get_push_command(
                    &push_options,
                    self.per_source_subfolder,
                    self.per_package_id_subfolder,
                )
            })
            .collect()
    }

    pub fn push_commands(&self, registries: &[Arc<RegistryInfo>]) -> String {
        self.push_steps(registries).join(STEP_SEPARATOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msbuild::EvaluationResult;
    use crate::plugins::{GithubPlugin, NuGetOrgPlugin};
    use crate::security::token_manager::EnvironmentSource;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn project(dir: &TempDir, name: &str, properties: &[(&str, &str)], targets: &[&str]) -> Arc<MSBuildProject> {
        let path = dir.path().join(format!("{name}.csproj"));
        std::fs::write(&path, "<Project />").unwrap();
        let properties: BTreeMap<String, String> = properties
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let evaluation = EvaluationResult {
            properties: Some(properties),
            ..EvaluationResult::default()
        };
        let targets = targets.iter().map(|t| t.to_string()).collect();
        Arc::new(MSBuildProject::new(&path, evaluation, targets).unwrap())
    }

    fn full_sign_options() -> SignOptions {
        SignOptions {
            certificate_path: Some("cert.pfx".to_string()),
            certificate_fingerprint: Some("ABCDEF".to_string()),
            ..SignOptions::default()
        }
    }

    #[test]
    fn test_publish_permutations_cross_product() {
        let dir = TempDir::new().unwrap();
        let app = project(
            &dir,
            "App",
            &[
                ("RuntimeIdentifiers", "win-x64;linux-x64"),
                ("TargetFrameworks", "net8.0;net9.0"),
            ],
            &[],
        );

        let commands = publish_commands(&app);

        assert_eq!(commands.len(), 4);
        for rid in ["win-x64", "linux-x64"] {
            for tfm in ["net8.0", "net9.0"] {
                let expected = format!("--runtime {} --framework {}", rid, tfm);
                assert_eq!(commands.iter().filter(|c| c.ends_with(&expected)).count(), 1);
            }
        }
    }

    #[test]
    fn test_publish_partial_and_empty_products() {
        let dir = TempDir::new().unwrap();

        let frameworks_only = project(&dir, "Lib", &[("TargetFrameworks", "net8.0;net9.0")], &[]);
        let commands = publish_commands(&frameworks_only);
        assert_eq!(commands.len(), 2);
        assert!(commands.iter().all(|c| !c.contains("--runtime")));

        let plain = project(&dir, "Plain", &[], &[]);
        let commands = publish_commands(&plain);
        assert_eq!(commands.len(), 1);
        assert!(!commands[0].contains("--runtime"));
        assert!(!commands[0].contains("--framework"));
    }

    #[test]
    fn test_publish_all_target_short_circuits() {
        let dir = TempDir::new().unwrap();
        let app = project(
            &dir,
            "App",
            &[("RuntimeIdentifiers", "win-x64;linux-x64")],
            &["Build", "PublishAll"],
        );

        let commands = publish_commands(&app);

        assert_eq!(commands.len(), 1);
        assert!(commands[0].starts_with("dotnet msbuild"));
        assert!(commands[0].ends_with("-t:PublishAll"));
    }

    #[test]
    fn test_sign_requires_location_and_selector() {
        let no_location = SignOptions {
            certificate_subject_name: Some("Contoso".to_string()),
            ..SignOptions::default()
        };
        assert!(matches!(
            no_location.validate(),
            Err(PublishError::Configuration { .. })
        ));

        let no_selector = SignOptions {
            certificate_store_name: Some("My".to_string()),
            ..SignOptions::default()
        };
        assert!(matches!(
            no_selector.validate(),
            Err(PublishError::Configuration { .. })
        ));

        assert!(full_sign_options().validate().is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_sign_password_is_shell_escaped() {
        let options = SignOptions {
            certificate_password: Some("pa$$`w\"d".to_string()),
            ..full_sign_options()
        };

        let command = sign_command(Path::new("/out"), &options).unwrap();

        assert!(command.contains(r#"--certificate-password "pa\$\$\`w\"d""#));
    }

    #[test]
    fn test_invalid_sign_options_fail_before_any_step() {
        let dir = TempDir::new().unwrap();
        let app = project(&dir, "App", &[], &[]);
        let publisher = PackagePublisher::new(dir.path().join("out")).with_sign_options(SignOptions {
            certificate_path: Some("cert.pfx".to_string()),
            ..SignOptions::default()
        });

        let error = publisher
            .prepare_commands(&[app.clone()], &[PackTarget::Project(app)])
            .unwrap_err();
        assert_eq!(error.code(), "CONFIGURATION_ERROR");
    }

    #[test]
    fn test_prepare_orders_publish_pack_sign() {
        let dir = TempDir::new().unwrap();
        let app = project(&dir, "App", &[("TargetFrameworks", "net8.0;net9.0")], &[]);
        let lib = project(&dir, "Lib", &[], &[]);
        let registry = RegistryInfo::new(
            lib.clone(),
            &NuGetOrgPlugin::new(),
            &EnvironmentSource::from_pairs([("NUGET_TOKEN", "nuget-secret")]),
        )
        .unwrap();
        let publisher = PackagePublisher::new(dir.path().join("out")).with_sign_options(full_sign_options());

        let pipeline = publisher
            .prepare_commands(
                &[app.clone()],
                &[PackTarget::Project(app), PackTarget::Registry(Arc::new(registry))],
            )
            .unwrap();
        let steps: Vec<&str> = pipeline.split(STEP_SEPARATOR).collect();

        assert_eq!(steps.len(), 5);
        assert!(steps[0].starts_with("dotnet publish"));
        assert!(steps[1].starts_with("dotnet publish"));
        assert!(steps[2].starts_with("dotnet pack"));
        assert!(steps[3].starts_with("dotnet pack"));
        assert!(steps[3].contains("api.nuget.org_v3"));
        assert!(steps[4].starts_with("dotnet nuget sign"));
        assert!(steps[4].contains("--certificate-fingerprint \"ABCDEF\""));
        let out = dir.path().join("out").display().to_string();
        assert!(steps[2].contains(&out) && steps[3].contains(&out));
    }

    #[test]
    fn test_push_commands_per_registry() {
        let dir = TempDir::new().unwrap();
        let lib = project(&dir, "Lib", &[], &[]);
        let env = EnvironmentSource::from_pairs([
            ("NUGET_TOKEN", "nuget-secret"),
            ("GITHUB_TOKEN", "ghp_secret"),
            ("GITHUB_REPOSITORY_OWNER", "contoso"),
        ]);
        let registries = vec![
            Arc::new(RegistryInfo::new(lib.clone(), &NuGetOrgPlugin::new(), &env).unwrap()),
            Arc::new(RegistryInfo::new(lib, &GithubPlugin::new(), &env).unwrap()),
        ];
        let publisher = PackagePublisher::new(dir.path().join("out")).with_push_options(PushPackagesOptions {
            skip_duplicate: true,
            ..PushPackagesOptions::default()
        });

        let steps = publisher.push_steps(&registries);

        assert_eq!(steps.len(), 2);
        assert!(steps[0].contains("--api-key \"nuget-secret\""));
        assert!(steps[1].contains("nuget.pkg.github.com/contoso/index.json"));
        assert!(steps[1].contains("--api-key \"ghp_secret\""));
        assert!(steps.iter().all(|s| s.contains("--skip-duplicate")));
        assert_eq!(publisher.push_commands(&registries), steps.join(STEP_SEPARATOR));
    }
}
