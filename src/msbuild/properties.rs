//! Generic MSBuild project properties
//!
//! The base layer of the project property model. Values are resolved once, at
//! construction, in dependency order: a property missing from the evaluation
//! gets the same default MSBuild would compute, and that value never changes
//! afterwards, so every command generated for the project agrees on it.

use super::property_map::PropertyMap;
use std::path::{Path, PathBuf};

/// Properties consumed by [`MSBuildProjectProperties`]
pub const MSBUILD_PROPERTY_NAMES: &[&str] = &[
    "MSBuildProjectFullPath",
    "AssemblyName",
    "Description",
    "OutputPath",
    "Version",
    "VersionPrefix",
    "VersionSuffix",
    "TargetFramework",
    "TargetFrameworks",
    "RuntimeIdentifier",
    "RuntimeIdentifiers",
];

pub const DEFAULT_VERSION_PREFIX: &str = "1.0.0";
pub const DEFAULT_OUTPUT_PATH: &str = "bin/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MSBuildProjectProperties {
    full_path: PathBuf,
    assembly_name: String,
    description: String,
    output_path: String,
    version: String,
    version_prefix: String,
    version_suffix: String,
    target_framework: String,
    target_frameworks: String,
    runtime_identifier: String,
    runtime_identifiers: String,
    /// Evaluated properties no layer recognized
    dynamic: PropertyMap,
}

impl MSBuildProjectProperties {
    /// Consume the known keys from `properties` and keep the rest as dynamic properties
    pub fn from_map(full_path: &Path, mut properties: PropertyMap) -> Self {
        let full_path = properties
            .take("MSBuildProjectFullPath")
            .map(PathBuf::from)
            .unwrap_or_else(|| full_path.to_path_buf());

        let assembly_name = properties.take("AssemblyName").unwrap_or_else(|| {
            full_path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        let description = properties.take("Description").unwrap_or_default();
        let output_path = properties
            .take("OutputPath")
            .unwrap_or_else(|| DEFAULT_OUTPUT_PATH.to_string());

        let version_prefix = properties
            .take("VersionPrefix")
            .unwrap_or_else(|| DEFAULT_VERSION_PREFIX.to_string());
        let version_suffix = properties.take("VersionSuffix").unwrap_or_default();
        let version = properties.take("Version").unwrap_or_else(|| {
            if version_suffix.is_empty() {
                version_prefix.clone()
            } else {
                format!("{}-{}", version_prefix, version_suffix)
            }
        });

        Self {
            assembly_name,
            description,
            output_path,
            version,
            version_prefix,
            version_suffix,
            target_framework: properties.take("TargetFramework").unwrap_or_default(),
            target_frameworks: properties.take("TargetFrameworks").unwrap_or_default(),
            runtime_identifier: properties.take("RuntimeIdentifier").unwrap_or_default(),
            runtime_identifiers: properties.take("RuntimeIdentifiers").unwrap_or_default(),
            dynamic: properties,
            full_path,
        }
    }

    pub fn full_path(&self) -> &Path {
        &self.full_path
    }

    pub fn assembly_name(&self) -> &str {
        &self.assembly_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn output_path(&self) -> &str {
        &self.output_path
    }

    /// `Version`, defaulting to `VersionPrefix[-VersionSuffix]`
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn version_prefix(&self) -> &str {
        &self.version_prefix
    }

    pub fn version_suffix(&self) -> &str {
        &self.version_suffix
    }

    pub fn target_framework(&self) -> &str {
        &self.target_framework
    }

    pub fn target_frameworks(&self) -> &str {
        &self.target_frameworks
    }

    pub fn runtime_identifier(&self) -> &str {
        &self.runtime_identifier
    }

    pub fn runtime_identifiers(&self) -> &str {
        &self.runtime_identifiers
    }

    /// Properties that were evaluated but are not modelled by any layer
    pub fn dynamic(&self) -> &PropertyMap {
        &self.dynamic
    }

    /// Look up any property by name, modelled or dynamic
    pub fn get(&self, name: &str) -> Option<&str> {
        let value = match name.to_ascii_lowercase().as_str() {
            "msbuildprojectfullpath" => return self.full_path.to_str(),
            "assemblyname" => &self.assembly_name,
            "description" => &self.description,
            "outputpath" => &self.output_path,
            "version" => &self.version,
            "versionprefix" => &self.version_prefix,
            "versionsuffix" => &self.version_suffix,
            "targetframework" => &self.target_framework,
            "targetframeworks" => &self.target_frameworks,
            "runtimeidentifier" => &self.runtime_identifier,
            "runtimeidentifiers" => &self.runtime_identifiers,
            _ => return self.dynamic.get(name),
        };
        Some(value.as_str())
    }

    /// Target frameworks, preferring the plural property
    pub fn target_framework_list(&self) -> Vec<String> {
        split_list(&self.target_frameworks, &self.target_framework)
    }

    /// Runtime identifiers, preferring the plural property
    pub fn runtime_identifier_list(&self) -> Vec<String> {
        split_list(&self.runtime_identifiers, &self.runtime_identifier)
    }
}

fn split_list(plural: &str, singular: &str) -> Vec<String> {
    let source = if plural.trim().is_empty() { singular } else { plural };
    source
        .split(';')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}
