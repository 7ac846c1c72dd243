//! An evaluated MSBuild project

use super::evaluator::{EvaluationItem, EvaluationResult, TargetResult, resolve_existing};
use super::nuget_properties::NuGetProjectProperties;
use super::property_map::PropertyMap;
use crate::core::error::PublishResult;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MSBuildProject {
    full_path: PathBuf,
    items: BTreeMap<String, Vec<EvaluationItem>>,
    /// One entry per evaluation, oldest first
    target_results: Vec<BTreeMap<String, TargetResult>>,
    targets: Vec<String>,
    properties: NuGetProjectProperties,
}

impl MSBuildProject {
    /// Wrap an evaluation of the project at `full_path`.
    ///
    /// The path must exist; it is made absolute.
    pub fn new(full_path: &Path, evaluation: EvaluationResult, targets: Vec<String>) -> PublishResult<Self> {
        let full_path = resolve_existing(full_path)?;
        let properties: PropertyMap = evaluation.properties.unwrap_or_default().into_iter().collect();

        Ok(Self {
            properties: NuGetProjectProperties::from_map(&full_path, properties),
            items: evaluation.items.unwrap_or_default(),
            target_results: evaluation.target_results.into_iter().collect(),
            targets,
            full_path,
        })
    }

    /// Accumulate a later evaluation.
    ///
    /// Target results are appended, never replaced; items of the same type are replaced.
    pub fn record_evaluation(&mut self, evaluation: EvaluationResult) {
        if let Some(items) = evaluation.items {
            self.items.extend(items);
        }
        if let Some(results) = evaluation.target_results {
            self.target_results.push(results);
        }
    }

    pub fn full_path(&self) -> &Path {
        &self.full_path
    }

    /// Directory containing the project file
    pub fn directory(&self) -> &Path {
        self.full_path.parent().unwrap_or(&self.full_path)
    }

    pub fn properties(&self) -> &NuGetProjectProperties {
        &self.properties
    }

    pub fn items(&self) -> &BTreeMap<String, Vec<EvaluationItem>> {
        &self.items
    }

    pub fn target_results(&self) -> &[BTreeMap<String, TargetResult>] {
        &self.target_results
    }

    /// Most recent result of `target`
    pub fn target_result(&self, target: &str) -> Option<&TargetResult> {
        self.target_results.iter().rev().find_map(|results| {
            results
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(target))
                .map(|(_, result)| result)
        })
    }

    /// Public targets declared by the project
    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn has_target(&self, target: &str) -> bool {
        self.targets.iter().any(|t| t.eq_ignore_ascii_case(target))
    }
}
