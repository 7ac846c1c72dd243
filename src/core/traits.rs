//! Core traits and types for NuGet publishing
//!
//! This module defines the seams the rest of the crate is written against:
//! running external processes and describing a package registry provider.

use crate::core::error::PublishError;
use crate::security::command_executor::CommandError;
use crate::security::token_manager::EnvironmentSource;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

// ============================================================================
// Process execution
// ============================================================================

/// Captured streams of a successful process
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn stdout(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }
}

/// Runs one external command line per call.
///
/// Implementations must not retry; retry is a caller concern.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, command_line: &str) -> Result<ProcessOutput, CommandError>;
}

// ============================================================================
// Registry providers
// ============================================================================

/// A package registry flavor (NuGet.org, GitHub Packages, GitLab Packages, ...).
///
/// Providers only decide the endpoint and the default credential variables;
/// command construction is shared by [`crate::plugins::RegistryInfo`].
pub trait RegistryProvider: Send + Sync + Debug {
    /// Provider name (e.g., "nuget", "github")
    fn name(&self) -> &str;

    /// Candidate credential variables, in priority order
    fn default_token_env_vars(&self) -> &'static [&'static str];

    /// Resolve the registry's NuGet V3 service index URL
    fn resolve_url(&self, env: &EnvironmentSource) -> Result<String, PublishError>;
}
