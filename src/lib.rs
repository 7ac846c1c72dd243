pub mod core;
pub mod msbuild;
pub mod orchestration;
pub mod plugins;
pub mod security;

#[cfg(test)]
mod test_support;

pub use core::*;
pub use msbuild::{EvaluationRequest, EvaluationResult, MSBuildEvaluator, MSBuildProject};
pub use orchestration::{BatchValidator, PackTarget, PackagePublisher, SignOptions};
pub use plugins::{PluginLoader, RegistryInfo, RegistryType};
pub use security::{CommandError, EnvironmentSource, SecureTokenManager, ShellCommandExecutor};
