//! MSBuild evaluator
//!
//! Queries project metadata with `dotnet msbuild -getProperty/-getItem/-getTargetResult`
//! and parses the JSON the tool prints. Whole invocations are retried while
//! the tool reports files locked by another process.

use super::nuget_properties::all_property_names;
use super::project::MSBuildProject;
use crate::core::error::{PublishError, PublishResult};
use crate::core::retry::{RetryError, RetryManager, RetryPolicy};
use crate::core::traits::ProcessRunner;
use crate::security::command_executor::{CommandError, quote_arg};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use walkdir::WalkDir;

/// Project file extensions recognized when a directory is given
pub const PROJECT_FILE_EXTENSIONS: &[&str] = &["csproj", "fsproj", "vbproj", "proj"];

/// Target run by [`MSBuildEvaluator::discover_projects`] when a project declares it
pub const PACK_TARGET: &str = "Pack";

const DOTNET: &str = "dotnet";

/// Banners printed by MSBuild versions that do not understand `-getProperty`
const VERSION_BANNERS: &[&str] = &["MSBuild version", "Microsoft (R) Build Engine"];

// ============================================================================
// Request / Result
// ============================================================================

/// Input of [`MSBuildEvaluator::evaluate`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationRequest {
    /// Project file path
    pub full_name: PathBuf,
    /// Global properties set before evaluation (`-property`)
    pub properties: BTreeMap<String, String>,
    /// Targets to run (`-target`)
    pub targets: Vec<String>,
    /// Properties to query (`-getProperty`)
    pub get_property: Vec<String>,
    /// Item types to query (`-getItem`)
    pub get_item: Vec<String>,
    /// Target results to query (`-getTargetResult`)
    pub get_target_result: Vec<String>,
}

impl EvaluationRequest {
    pub fn new(full_name: impl Into<PathBuf>) -> Self {
        Self {
            full_name: full_name.into(),
            ..Self::default()
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn with_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.targets.extend(targets.into_iter().map(Into::into));
        self
    }

    pub fn get_properties<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.get_property.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn get_items<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.get_item.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn get_target_results<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.get_target_result
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// At least one query list must be non-empty
    pub fn validate(&self) -> PublishResult<()> {
        if self.get_property.is_empty() && self.get_item.is_empty() && self.get_target_result.is_empty() {
            return Err(PublishError::invalid_request(format!(
                "no properties, items or target results requested for {}",
                self.full_name.display()
            )));
        }
        Ok(())
    }

    /// Whether the tool will answer with a bare value instead of JSON
    fn is_single_property_query(&self) -> bool {
        self.get_property.len() == 1 && self.get_item.is_empty() && self.get_target_result.is_empty()
    }
}

/// One MSBuild item with its well-known and custom metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EvaluationItem {
    pub identity: String,
    pub full_path: String,
    pub root_dir: String,
    pub filename: String,
    pub extension: String,
    pub relative_dir: String,
    pub directory: String,
    pub recursive_dir: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessed_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defining_project_full_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defining_project_directory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defining_project_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defining_project_extension: Option<String>,
    /// Custom metadata
    #[serde(flatten)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetResultCode {
    Success,
    Failure,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TargetResult {
    pub result: TargetResultCode,
    #[serde(default)]
    pub items: Vec<EvaluationItem>,
}

/// Parsed output of one evaluation; immutable once built
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EvaluationResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<BTreeMap<String, Vec<EvaluationItem>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_results: Option<BTreeMap<String, TargetResult>>,
}

impl EvaluationResult {
    /// Drop anything that was not asked for (names compare case-insensitively)
    fn restrict_to(self, request: &EvaluationRequest) -> Self {
        Self {
            properties: retain_requested(self.properties, &request.get_property),
            items: retain_requested(self.items, &request.get_item),
            target_results: retain_requested(self.target_results, &request.get_target_result),
        }
    }
}

fn retain_requested<V>(
    map: Option<BTreeMap<String, V>>,
    requested: &[String],
) -> Option<BTreeMap<String, V>> {
    if requested.is_empty() {
        return None;
    }
    map.map(|mut map| {
        map.retain(|name, _| requested.iter().any(|r| r.eq_ignore_ascii_case(name)));
        map
    })
}

// ============================================================================
// Evaluator
// ============================================================================

/// Runs `dotnet msbuild` queries through a [`ProcessRunner`]
#[derive(Clone)]
pub struct MSBuildEvaluator {
    runner: Arc<dyn ProcessRunner>,
    retry: RetryManager,
}

impl std::fmt::Debug for MSBuildEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MSBuildEvaluator")
            .field("retry", self.retry.policy())
            .finish_non_exhaustive()
    }
}

impl MSBuildEvaluator {
    /// Evaluator with the default (unbounded, 1 second) busy-file retry
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self::with_retry_policy(runner, RetryPolicy::default())
    }

    pub fn with_retry_policy(runner: Arc<dyn ProcessRunner>, policy: RetryPolicy) -> Self {
        Self {
            runner,
            retry: RetryManager::new(policy),
        }
    }

    pub fn runner(&self) -> &Arc<dyn ProcessRunner> {
        &self.runner
    }

    /// Evaluate a project and return the requested properties, items and target results.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` when nothing is queried (no process is started)
    /// - `NotFound` when the project file does not exist
    /// - `UnexpectedOutput` / `Parse` when the output cannot be interpreted
    /// - `Command` for any non busy-file failure, `TransientLock` when the retry budget runs out
    pub async fn evaluate(&self, request: &EvaluationRequest) -> PublishResult<EvaluationResult> {
        request.validate()?;
        let full_name = resolve_existing(&request.full_name)?;
        let command = evaluation_command(&full_name, request);

        tracing::debug!(project = %full_name.display(), %command, "evaluating project");
        let output = self.run_with_retry(&command).await?;

        parse_evaluation_output(request, &command, &output)
    }

    /// List the project's targets, sorted, optionally including `_`-prefixed internal ones
    pub async fn get_targets(&self, project_path: &Path, include_non_public: bool) -> PublishResult<Vec<String>> {
        let full_name = resolve_existing(project_path)?;
        let command = format!("{} msbuild {} -targets", DOTNET, quote_arg(full_name.display()));

        tracing::debug!(project = %full_name.display(), "listing targets");
        let output = self.run_with_retry(&command).await?;

        Ok(parse_targets(&output, include_non_public))
    }

    /// Evaluate a project with every NuGet-related property and, when the
    /// project declares it, the `Pack` target result.
    pub async fn load_project(&self, project_path: &Path) -> PublishResult<MSBuildProject> {
        let targets = self.get_targets(project_path, false).await?;
        let mut request = EvaluationRequest::new(project_path).get_properties(all_property_names());

        if targets.iter().any(|t| t.eq_ignore_ascii_case(PACK_TARGET)) {
            request = request
                .with_targets([PACK_TARGET])
                .get_target_results([PACK_TARGET]);
        }

        let evaluation = self.evaluate(&request).await?;
        MSBuildProject::new(project_path, evaluation, targets)
    }

    /// Run another evaluation against a loaded project and accumulate its results
    pub async fn reevaluate(&self, project: &mut MSBuildProject, request: EvaluationRequest) -> PublishResult<()> {
        let request = EvaluationRequest {
            full_name: project.full_path().to_path_buf(),
            ..request
        };
        let evaluation = self.evaluate(&request).await?;
        project.record_evaluation(evaluation);
        Ok(())
    }

    /// Resolve files and directories to project files and load each one.
    ///
    /// Evaluations run concurrently; results come back in input order.
    pub async fn discover_projects(&self, paths: &[PathBuf]) -> PublishResult<Vec<MSBuildProject>> {
        let project_files = resolve_project_files(paths)?;
        tracing::info!(count = project_files.len(), "evaluating projects");

        let mut tasks = JoinSet::new();
        for (index, path) in project_files.into_iter().enumerate() {
            let evaluator = self.clone();
            tasks.spawn(async move { (index, evaluator.load_project(&path).await) });
        }

        let mut loaded = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            let (index, result) = joined.unwrap_or_else(|e| std::panic::resume_unwind(e.into_panic()));
            loaded.push((index, result?));
        }
        loaded.sort_by_key(|(index, _)| *index);

        Ok(loaded.into_iter().map(|(_, project)| project).collect())
    }

    async fn run_with_retry(&self, command: &str) -> PublishResult<String> {
        let runner = &self.runner;
        self.retry
            .retry_when(|| runner.run(command), CommandError::is_busy_file)
            .await
            .map(|output| output.stdout)
            .map_err(|error| match error {
                RetryError::Fatal(source) => PublishError::Command(source),
                RetryError::Exhausted { attempts, last } => PublishError::TransientLock {
                    attempts,
                    source: last,
                },
            })
    }
}

/// Absolute path of an existing file or directory
pub(crate) fn resolve_existing(path: &Path) -> PublishResult<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|_| PublishError::NotFound {
                path: path.to_path_buf(),
            })?
            .join(path)
    };

    if !absolute.exists() {
        return Err(PublishError::NotFound { path: absolute });
    }
    Ok(absolute)
}

/// Expand files and directories into concrete project files
pub fn resolve_project_files(paths: &[PathBuf]) -> PublishResult<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        let path = resolve_existing(path)?;
        if path.is_file() {
            files.push(path);
            continue;
        }

        let mut found: Vec<PathBuf> = WalkDir::new(&path)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file() && is_project_file(entry.path()))
            .map(|entry| entry.into_path())
            .collect();
        found.sort();
        files.extend(found);
    }

    Ok(files)
}

fn is_project_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            PROJECT_FILE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// `dotnet msbuild "<project>" -restore [-property:"k=v;..."] ["-target:A;B"] [-getItem:"..."] [-getProperty:"..."] [-getTargetResult:"..."]`
pub fn evaluation_command(full_name: &Path, request: &EvaluationRequest) -> String {
    let mut args = vec![
        DOTNET.to_string(),
        "msbuild".to_string(),
        quote_arg(full_name.display()),
        "-restore".to_string(),
    ];

    if !request.properties.is_empty() {
        let properties = request
            .properties
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join(";");
        args.push(format!("-property:{}", quote_arg(properties)));
    }
    if !request.targets.is_empty() {
        args.push(format!("\"-target:{}\"", request.targets.join(";")));
    }
    if !request.get_item.is_empty() {
        args.push(format!("-getItem:\"{}\"", request.get_item.join(",")));
    }
    if !request.get_property.is_empty() {
        args.push(format!("-getProperty:\"{}\"", request.get_property.join(",")));
    }
    if !request.get_target_result.is_empty() {
        args.push(format!(
            "-getTargetResult:\"{}\"",
            request.get_target_result.join(",")
        ));
    }

    args.join(" ")
}

fn parse_evaluation_output(
    request: &EvaluationRequest,
    command: &str,
    stdout: &str,
) -> PublishResult<EvaluationResult> {
    let trimmed = stdout.trim();

    if VERSION_BANNERS.iter().any(|banner| trimmed.starts_with(banner)) {
        return Err(PublishError::UnexpectedOutput {
            command: command.to_string(),
            output: trimmed.to_string(),
        });
    }

    if trimmed.starts_with('{')
        && let Ok(result) = serde_json::from_str::<EvaluationResult>(trimmed)
    {
        return Ok(result.restrict_to(request));
    }

    // One property is printed as its bare value
    if request.is_single_property_query() {
        let mut properties = BTreeMap::new();
        properties.insert(request.get_property[0].clone(), trimmed.to_string());
        return Ok(EvaluationResult {
            properties: Some(properties),
            ..EvaluationResult::default()
        });
    }

    if !trimmed.starts_with('{') {
        return Err(PublishError::UnexpectedOutput {
            command: command.to_string(),
            output: trimmed.to_string(),
        });
    }

    serde_json::from_str::<EvaluationResult>(trimmed)
        .map(|result| result.restrict_to(request))
        .map_err(|e| PublishError::Parse {
            command: command.to_string(),
            message: e.to_string(),
        })
}

/// Target names are single tokens; header and banner lines contain spaces
fn parse_targets(stdout: &str, include_non_public: bool) -> Vec<String> {
    let mut targets: Vec<String> = stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.contains(char::is_whitespace))
        .filter(|name| include_non_public || !name.starts_with('_'))
        .map(str::to_string)
        .collect();
    targets.sort();
    targets.dedup();
    targets
}
