//! Orchestration layer for packaging and publishing
//!
//! This module turns evaluated projects and resolved registries into
//! ordered command pipelines, and validates write access in bulk.

pub mod batch_validator;
pub mod package_publisher;

// Re-export main types for convenience
pub use batch_validator::{
    BatchValidateOptions, BatchValidationResult, BatchValidator, RegistryValidation,
    ValidationOutcome,
};
pub use package_publisher::{
    PUBLISH_ALL_TARGET, PackTarget, PackagePublisher, STEP_SEPARATOR, SignOptions,
    publish_commands, sign_command,
};
