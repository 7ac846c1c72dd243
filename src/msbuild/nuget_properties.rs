//! NuGet packaging properties
//!
//! The derived layer of the project property model. It takes its own keys out
//! of the evaluated map *before* handing the remainder to
//! [`MSBuildProjectProperties`], so NuGet keys never end up among the base
//! layer's dynamic properties. Defaults follow the .NET SDK's pack targets.

use super::properties::{MSBUILD_PROPERTY_NAMES, MSBuildProjectProperties};
use super::property_map::PropertyMap;
use std::path::Path;

/// Properties consumed by [`NuGetProjectProperties`] itself
pub const NUGET_PROPERTY_NAMES: &[&str] = &[
    "IsPackable",
    "SuppressDependenciesWhenPacking",
    "PackageVersion",
    "PackageId",
    "PackageDescription",
    "Authors",
    "Copyright",
    "PackageRequireLicenseAcceptance",
    "DevelopmentDependency",
    "PackageLicenseExpression",
    "PackageLicenseFile",
    "PackageProjectUrl",
    "PackageIcon",
    "PackageReleaseNotes",
    "PackageReadmeFile",
    "PackageTags",
    "PackageOutputPath",
    "IncludeSymbols",
    "IncludeSource",
    "PackageType",
    "IsTool",
    "RepositoryUrl",
    "RepositoryType",
    "RepositoryCommit",
    "RepositoryBranch",
    "SymbolPackageFormat",
    "NoPackageAnalysis",
    "MinClientVersion",
    "IncludeBuildOutput",
    "IncludeContentInPack",
    "BuildOutputTargetFolder",
    "ContentTargetFolders",
    "NuspecFile",
    "NuspecBasePath",
    "NuspecProperties",
    "Title",
    "Company",
    "Product",
];

/// Every property name known to either layer, base layer first
pub fn all_property_names() -> Vec<&'static str> {
    MSBUILD_PROPERTY_NAMES
        .iter()
        .chain(NUGET_PROPERTY_NAMES)
        .copied()
        .collect()
}

const DEFAULT_PACKAGE_DESCRIPTION: &str = "Package Description";

macro_rules! str_accessors {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            pub fn $name(&self) -> &str {
                &self.$name
            }
        )*
    };
}

macro_rules! bool_accessors {
    ($($name:ident),* $(,)?) => {
        $(
            pub fn $name(&self) -> bool {
                self.$name
            }
        )*
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NuGetProjectProperties {
    msbuild: MSBuildProjectProperties,
    is_packable: bool,
    suppress_dependencies_when_packing: bool,
    package_version: String,
    package_id: String,
    package_description: String,
    authors: String,
    copyright: String,
    package_require_license_acceptance: bool,
    development_dependency: bool,
    package_license_expression: String,
    package_license_file: String,
    package_project_url: String,
    package_icon: String,
    package_release_notes: String,
    package_readme_file: String,
    package_tags: String,
    package_output_path: String,
    include_symbols: bool,
    include_source: bool,
    package_type: String,
    is_tool: bool,
    repository_url: String,
    repository_type: String,
    repository_commit: String,
    repository_branch: String,
    symbol_package_format: String,
    no_package_analysis: bool,
    min_client_version: String,
    include_build_output: bool,
    include_content_in_pack: bool,
    build_output_target_folder: String,
    content_target_folders: String,
    nuspec_file: String,
    nuspec_base_path: String,
    nuspec_properties: String,
    title: String,
    company: String,
    product: String,
}

/// Raw NuGet values taken out of the map before the base layer sees it
struct Extracted(PropertyMap);

impl Extracted {
    fn string(&mut self, name: &str) -> Option<String> {
        self.0.take(name)
    }

    fn string_or(&mut self, name: &str, default: &str) -> String {
        self.0.take(name).unwrap_or_else(|| default.to_string())
    }

    fn flag(&mut self, name: &str, default: bool) -> bool {
        self.0
            .take(name)
            .map(|value| value.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(default)
    }
}

impl NuGetProjectProperties {
    /// Build both layers from an evaluated property map
    pub fn from_map(full_path: &Path, mut properties: PropertyMap) -> Self {
        let mut own = PropertyMap::new();
        for name in NUGET_PROPERTY_NAMES {
            if let Some(value) = properties.take(name) {
                own.insert(*name, value);
            }
        }
        let msbuild = MSBuildProjectProperties::from_map(full_path, properties);
        let mut raw = Extracted(own);

        let package_id = raw
            .string("PackageId")
            .unwrap_or_else(|| msbuild.assembly_name().to_string());
        let package_version = raw
            .string("PackageVersion")
            .unwrap_or_else(|| msbuild.version().to_string());
        let package_description = raw.string("PackageDescription").unwrap_or_else(|| {
            if msbuild.description().is_empty() {
                DEFAULT_PACKAGE_DESCRIPTION.to_string()
            } else {
                msbuild.description().to_string()
            }
        });
        let authors = raw
            .string("Authors")
            .unwrap_or_else(|| msbuild.assembly_name().to_string());
        let package_output_path = raw
            .string("PackageOutputPath")
            .unwrap_or_else(|| msbuild.output_path().to_string());
        let title = raw.string("Title").unwrap_or_else(|| package_id.clone());
        let company = raw
            .string("Company")
            .unwrap_or_else(|| msbuild.assembly_name().to_string());
        let product = raw
            .string("Product")
            .unwrap_or_else(|| msbuild.assembly_name().to_string());

        Self {
            is_packable: raw.flag("IsPackable", true),
            suppress_dependencies_when_packing: raw.flag("SuppressDependenciesWhenPacking", false),
            copyright: raw.string_or("Copyright", ""),
            package_require_license_acceptance: raw.flag("PackageRequireLicenseAcceptance", false),
            development_dependency: raw.flag("DevelopmentDependency", false),
            package_license_expression: raw.string_or("PackageLicenseExpression", ""),
            package_license_file: raw.string_or("PackageLicenseFile", ""),
            package_project_url: raw.string_or("PackageProjectUrl", ""),
            package_icon: raw.string_or("PackageIcon", ""),
            package_release_notes: raw.string_or("PackageReleaseNotes", ""),
            package_readme_file: raw.string_or("PackageReadmeFile", ""),
            package_tags: raw.string_or("PackageTags", ""),
            include_symbols: raw.flag("IncludeSymbols", false),
            include_source: raw.flag("IncludeSource", false),
            package_type: raw.string_or("PackageType", "Dependency"),
            is_tool: raw.flag("IsTool", false),
            repository_url: raw.string_or("RepositoryUrl", ""),
            repository_type: raw.string_or("RepositoryType", ""),
            repository_commit: raw.string_or("RepositoryCommit", ""),
            repository_branch: raw.string_or("RepositoryBranch", ""),
            symbol_package_format: raw.string_or("SymbolPackageFormat", "symbols.nupkg"),
            no_package_analysis: raw.flag("NoPackageAnalysis", false),
            min_client_version: raw.string_or("MinClientVersion", ""),
            include_build_output: raw.flag("IncludeBuildOutput", true),
            include_content_in_pack: raw.flag("IncludeContentInPack", true),
            build_output_target_folder: raw.string_or("BuildOutputTargetFolder", "lib"),
            content_target_folders: raw.string_or("ContentTargetFolders", "content;contentFiles"),
            nuspec_file: raw.string_or("NuspecFile", ""),
            nuspec_base_path: raw.string_or("NuspecBasePath", ""),
            nuspec_properties: raw.string_or("NuspecProperties", ""),
            package_id,
            package_version,
            package_description,
            authors,
            package_output_path,
            title,
            company,
            product,
            msbuild,
        }
    }

    /// The generic MSBuild layer
    pub fn msbuild(&self) -> &MSBuildProjectProperties {
        &self.msbuild
    }

    /// Properties neither layer models
    pub fn dynamic(&self) -> &PropertyMap {
        self.msbuild.dynamic()
    }

    str_accessors! {
        /// `PackageVersion`, defaulting to `Version`
        package_version,
        /// `PackageId`, defaulting to `AssemblyName`
        package_id,
        package_description,
        authors,
        copyright,
        package_license_expression,
        package_license_file,
        package_project_url,
        package_icon,
        package_release_notes,
        package_readme_file,
        package_tags,
        /// `PackageOutputPath`, defaulting to `OutputPath`
        package_output_path,
        package_type,
        repository_url,
        repository_type,
        repository_commit,
        repository_branch,
        symbol_package_format,
        min_client_version,
        build_output_target_folder,
        content_target_folders,
        nuspec_file,
        nuspec_base_path,
        nuspec_properties,
        /// `Title`, defaulting to `PackageId`
        title,
        company,
        product,
    }

    bool_accessors! {
        is_packable,
        suppress_dependencies_when_packing,
        package_require_license_acceptance,
        development_dependency,
        include_symbols,
        include_source,
        is_tool,
        no_package_analysis,
        include_build_output,
        include_content_in_pack,
    }
}
