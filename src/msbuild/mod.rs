//! MSBuild project evaluation and property model

pub mod evaluator;
pub mod nuget_properties;
pub mod project;
pub mod properties;
pub mod property_map;

pub use evaluator::{
    EvaluationItem, EvaluationRequest, EvaluationResult, MSBuildEvaluator, PACK_TARGET,
    PROJECT_FILE_EXTENSIONS, TargetResult, TargetResultCode, resolve_project_files,
};
pub use nuget_properties::{NUGET_PROPERTY_NAMES, NuGetProjectProperties, all_property_names};
pub use project::MSBuildProject;
pub use properties::{MSBUILD_PROPERTY_NAMES, MSBuildProjectProperties};
pub use property_map::PropertyMap;
