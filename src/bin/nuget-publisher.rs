//! NuGet Publisher CLI
//!
//! Evaluates .NET projects and prints the pack/sign/push pipelines for a release

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nuget_publisher::core::{ConfigLoader, PublisherConfig, RetryPolicy};
use nuget_publisher::msbuild::{MSBuildEvaluator, MSBuildProject};
use nuget_publisher::orchestration::{
    BatchValidateOptions, BatchValidator, PackTarget, PackagePublisher, ValidationOutcome,
};
use nuget_publisher::plugins::{PluginLoader, RegistryInfo};
use nuget_publisher::security::{EnvironmentSource, ShellCommandExecutor};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// NuGet packaging and publishing assistant
#[derive(Parser)]
#[command(name = "nuget-publisher")]
#[command(version)]
#[command(about = "NuGet packaging and publishing assistant", long_about = None)]
struct Cli {
    /// Directory holding .nuget-publish.yaml and .env (defaults to current directory)
    #[arg(short = 'C', long, global = true, value_name = "DIR")]
    project_dir: Option<PathBuf>,

    /// Configuration file (overrides <DIR>/.nuget-publish.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the targets a project declares
    Targets {
        #[arg(value_name = "PROJECT")]
        project: PathBuf,

        /// Include `_`-prefixed internal targets
        #[arg(long)]
        all: bool,
    },

    /// Evaluate projects and print their package identity
    Evaluate {
        /// Project files or directories containing them
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,
    },

    /// Print the publish/pack/sign pipeline
    Prepare,

    /// Print the push pipeline
    Push,

    /// Check write access to every configured registry
    Verify {
        /// Check registries one at a time
        #[arg(long)]
        sequential: bool,

        /// Keep checking after a failure (sequential mode)
        #[arg(long)]
        continue_on_error: bool,
    },
}

/// Everything a subcommand needs after configuration is loaded
struct Session {
    config: PublisherConfig,
    env: EnvironmentSource,
    evaluator: MSBuildEvaluator,
    runner: Arc<ShellCommandExecutor>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("\n❌ Error");
            eprintln!("{:#}", e);
            if let Some(error) = e.downcast_ref::<nuget_publisher::PublishError>() {
                eprintln!("\nSuggested actions:");
                for action in error.suggested_actions() {
                    eprintln!("  - {}", action);
                }
            }
            process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<i32> {
    let project_dir = match cli.project_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("cannot determine the current directory")?,
    };
    let session = Session::open(&project_dir, cli.config.as_deref()).await?;

    match cli.command {
        Commands::Targets { project, all } => targets_command(&session, &project, all).await,
        Commands::Evaluate { paths } => evaluate_command(&session, &paths).await,
        Commands::Prepare => prepare_command(&session).await,
        Commands::Push => push_command(&session).await,
        Commands::Verify {
            sequential,
            continue_on_error,
        } => verify_command(&session, sequential, continue_on_error).await,
    }
}

impl Session {
    async fn open(project_dir: &Path, config_path: Option<&Path>) -> Result<Self> {
        let env = EnvironmentSource::from_process().with_dotenv_file(&project_dir.join(".env"))?;

        let config = match config_path {
            Some(path) => ConfigLoader::load_file(path, &env).await?,
            None => ConfigLoader::load(project_dir, &env).await?,
        };
        let env = match &config.dotenv {
            Some(path) => env.with_dotenv_file(path)?,
            None => env,
        };

        let runner = Arc::new(ShellCommandExecutor::new(project_dir)?);
        let evaluator =
            MSBuildEvaluator::with_retry_policy(runner.clone(), RetryPolicy::from(&config.retry));

        Ok(Self {
            config,
            env,
            evaluator,
            runner,
        })
    }

    async fn load_projects(&self, paths: &[PathBuf]) -> Result<Vec<Arc<MSBuildProject>>> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }
        let projects = self.evaluator.discover_projects(paths).await?;
        Ok(projects.into_iter().map(Arc::new).collect())
    }

    async fn registries(&self) -> Result<Vec<Arc<RegistryInfo>>> {
        let projects = self.load_projects(&self.config.projects_to_pack).await?;
        let mut registries = Vec::new();
        for project in &projects {
            let bound = PluginLoader::load_registries(project, &self.config.registries, &self.env)?;
            registries.extend(bound.into_iter().map(Arc::new));
        }
        Ok(registries)
    }

    fn publisher(&self) -> PackagePublisher {
        let mut publisher = PackagePublisher::new(&self.config.output)
            .with_pack_options(self.config.pack.clone())
            .with_push_options(self.config.push.clone())
            .with_subfolders(
                self.config.per_source_subfolder,
                self.config.per_package_id_subfolder,
            );
        if let Some(sign) = &self.config.sign {
            publisher = publisher.with_sign_options(sign.clone());
        }
        publisher
    }
}

async fn targets_command(session: &Session, project: &Path, all: bool) -> Result<i32> {
    for target in session.evaluator.get_targets(project, all).await? {
        println!("{}", target);
    }
    Ok(0)
}

async fn evaluate_command(session: &Session, paths: &[PathBuf]) -> Result<i32> {
    for project in session.load_projects(paths).await? {
        let properties = project.properties();
        println!(
            "{} {} {}",
            properties.package_id(),
            properties.package_version(),
            project.full_path().display()
        );
    }
    Ok(0)
}

async fn prepare_command(session: &Session) -> Result<i32> {
    let to_publish = session.load_projects(&session.config.projects_to_publish).await?;

    let to_pack: Vec<PackTarget> = if session.config.registries.is_empty() {
        session
            .load_projects(&session.config.projects_to_pack)
            .await?
            .into_iter()
            .map(PackTarget::Project)
            .collect()
    } else {
        session
            .registries()
            .await?
            .into_iter()
            .map(PackTarget::Registry)
            .collect()
    };

    if to_publish.is_empty() && to_pack.is_empty() {
        eprintln!("⚠️  Nothing to prepare: configure projects_to_publish or projects_to_pack");
        return Ok(1);
    }

    println!("{}", session.publisher().prepare_commands(&to_publish, &to_pack)?);
    Ok(0)
}

async fn push_command(session: &Session) -> Result<i32> {
    let registries = session.registries().await?;
    if registries.is_empty() {
        eprintln!("⚠️  Nothing to push: configure registries and projects_to_pack");
        return Ok(1);
    }

    println!("{}", session.publisher().push_commands(&registries));
    Ok(0)
}

async fn verify_command(session: &Session, sequential: bool, continue_on_error: bool) -> Result<i32> {
    let registries = session.registries().await?;
    if registries.is_empty() {
        eprintln!("⚠️  No registries configured");
        return Ok(1);
    }

    let options = BatchValidateOptions {
        sequential: sequential || session.config.validation.sequential,
        continue_on_error: continue_on_error || session.config.validation.continue_on_error,
        max_concurrency: session.config.validation.max_concurrency,
    };
    let result = BatchValidator::new(session.runner.clone())
        .validate_all(&registries, &options)
        .await;

    for validation in &result.validations {
        match &validation.outcome {
            ValidationOutcome::Writable => {
                println!("✅ {} → {}", validation.package_id, validation.registry)
            }
            ValidationOutcome::Failed(error) => {
                println!("❌ {} → {}: {}", validation.package_id, validation.registry, error)
            }
            ValidationOutcome::Skipped => {
                println!("⏭️  {} → {}: skipped", validation.package_id, validation.registry)
            }
        }
    }

    Ok(if result.success() { 0 } else { 1 })
}
