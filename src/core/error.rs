//! Error handling for NuGet packaging and publishing
//!
//! This module provides the error taxonomy shared by the evaluator, the
//! registry subsystem and the orchestrator, with recovery guidance in the
//! same shape the CLI reports it.

use crate::security::command_executor::CommandError;
use std::path::PathBuf;
use thiserror::Error;

/// Replacement text for scrubbed credentials
pub const REDACTED: &str = "***";

/// Main error type for packaging and publishing operations
#[derive(Error, Debug, Clone)]
pub enum PublishError {
    // Evaluation errors
    #[error("Invalid evaluation request: {message}")]
    InvalidRequest { message: String },

    #[error("Path does not exist: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Unexpected output from `{command}`: {output}")]
    UnexpectedOutput { command: String, output: String },

    #[error("Failed to parse output of `{command}`: {message}")]
    Parse { command: String, message: String },

    // Process errors
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("File still in use after {attempts} attempt(s): {source}")]
    TransientLock {
        attempts: u32,
        #[source]
        source: CommandError,
    },

    // Credential errors
    #[error("None of the credential environment variables are defined: {}", attempted.join(", "))]
    CredentialsUnavailable { attempted: Vec<String> },

    #[error("Environment variable {variable} is required to {purpose}")]
    MissingEnvironment { variable: String, purpose: String },

    #[error("[{registry}] Insufficient permissions to push packages: {message}")]
    InsufficientPermissions {
        registry: String,
        message: String,
        #[source]
        source: Option<Box<PublishError>>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl PublishError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable
    ///
    /// Only file locks are recovered locally; everything else aborts the release.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Command(error) => error.is_busy_file(),
            Self::TransientLock { .. } => true,
            _ => false,
        }
    }

    /// Get error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "INVALID_REQUEST",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::UnexpectedOutput { .. } => "UNEXPECTED_OUTPUT",
            Self::Parse { .. } => "PARSE_ERROR",
            Self::Command(_) => "COMMAND_ERROR",
            Self::TransientLock { .. } => "TRANSIENT_LOCK",
            Self::CredentialsUnavailable { .. } => "CREDENTIALS_UNAVAILABLE",
            Self::MissingEnvironment { .. } => "MISSING_ENVIRONMENT",
            Self::InsufficientPermissions { .. } => "INSUFFICIENT_PERMISSIONS",
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
        }
    }

    /// Get suggested actions for this error
    pub fn suggested_actions(&self) -> Vec<&'static str> {
        match self {
            Self::InvalidRequest { .. } => {
                vec!["Request at least one property, item or target result"]
            }
            Self::NotFound { .. } => vec![
                "Check the project path",
                "Paths are resolved against the current directory",
            ],
            Self::UnexpectedOutput { .. } | Self::Parse { .. } => vec![
                "Check that the installed .NET SDK supports -getProperty/-getItem (8.0 or later)",
                "Run the printed command manually to inspect its output",
            ],
            Self::Command(_) => vec![
                "Check the command output",
                "Make sure the dotnet CLI is installed and on PATH",
            ],
            Self::TransientLock { .. } => vec![
                "Stop IDEs or build servers holding the output files (dotnet build-server shutdown)",
                "Increase the retry budget",
            ],
            Self::CredentialsUnavailable { .. } => vec![
                "Set one of the listed environment variables",
                "Or add it to the .env file next to the project",
            ],
            Self::MissingEnvironment { .. } => vec![
                "Run inside the CI provider that defines the variable, or set it explicitly",
                "Or configure the registry URL directly",
            ],
            Self::InsufficientPermissions { .. } => vec![
                "Use a token with package write scope",
                "GitHub fine-grained tokens cannot publish packages; use a classic token or GITHUB_TOKEN",
            ],
            Self::Configuration { .. } => vec!["Fix the configuration and try again"],
        }
    }

    /// Scrub a credential from every string this error carries.
    ///
    /// Every variant is listed explicitly so a new field cannot bypass the scrubber.
    pub fn redact(self, secret: &str) -> Self {
        if secret.is_empty() {
            return self;
        }
        let scrub = |text: String| text.replace(secret, REDACTED);

        match self {
            Self::InvalidRequest { message } => Self::InvalidRequest {
                message: scrub(message),
            },
            Self::NotFound { path } => Self::NotFound {
                path: PathBuf::from(scrub(path.to_string_lossy().into_owned())),
            },
            Self::UnexpectedOutput { command, output } => Self::UnexpectedOutput {
                command: scrub(command),
                output: scrub(output),
            },
            Self::Parse { command, message } => Self::Parse {
                command: scrub(command),
                message: scrub(message),
            },
            Self::Command(error) => Self::Command(error.redact(secret)),
            Self::TransientLock { attempts, source } => Self::TransientLock {
                attempts,
                source: source.redact(secret),
            },
            Self::CredentialsUnavailable { attempted } => Self::CredentialsUnavailable {
                attempted: attempted.into_iter().map(scrub).collect(),
            },
            Self::MissingEnvironment { variable, purpose } => Self::MissingEnvironment {
                variable: scrub(variable),
                purpose: scrub(purpose),
            },
            Self::InsufficientPermissions {
                registry,
                message,
                source,
            } => Self::InsufficientPermissions {
                registry: scrub(registry),
                message: scrub(message),
                source: source.map(|inner| Box::new(inner.redact(secret))),
            },
            Self::Configuration { message } => Self::Configuration {
                message: scrub(message),
            },
        }
    }
}

pub type PublishResult<T> = Result<T, PublishError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    fn failed_command(stdout: &str, stderr: &str) -> CommandError {
        CommandError::Failed {
            command: "dotnet nuget push --api-key \"s3cr3t-value\"".to_string(),
            exit_code: Some(1),
            signal: None,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }
    }

    #[test]
    fn test_invalid_request_error() {
        let error = PublishError::invalid_request("nothing to query");

        assert_eq!(error.code(), "INVALID_REQUEST");
        assert!(!error.is_recoverable());
        assert!(error.to_string().contains("nothing to query"));
    }

    #[test]
    fn test_credentials_unavailable_lists_names() {
        let error = PublishError::CredentialsUnavailable {
            attempted: vec!["GITHUB_TOKEN".to_string(), "GH_TOKEN".to_string()],
        };

        assert_eq!(error.code(), "CREDENTIALS_UNAVAILABLE");
        assert!(error.to_string().contains("GITHUB_TOKEN, GH_TOKEN"));
        assert!(!error.suggested_actions().is_empty());
    }

    #[test]
    fn test_transient_lock_is_recoverable() {
        let error = PublishError::TransientLock {
            attempts: 3,
            source: failed_command("being used by another process", ""),
        };

        assert!(error.is_recoverable());
        assert_eq!(error.code(), "TRANSIENT_LOCK");
        assert!(error.source().is_some());
    }

    #[test]
    fn test_redact_command_fields() {
        let error = PublishError::Command(failed_command(
            "pushing with s3cr3t-value",
            "401 for key s3cr3t-value",
        ))
        .redact("s3cr3t-value");

        let PublishError::Command(CommandError::Failed {
            command,
            stdout,
            stderr,
            ..
        }) = &error
        else {
            panic!("unexpected variant: {error:?}");
        };
        assert!(!command.contains("s3cr3t-value"));
        assert!(!stdout.contains("s3cr3t-value"));
        assert!(!stderr.contains("s3cr3t-value"));
        assert!(stderr.contains(REDACTED));
    }

    #[test]
    fn test_redact_nested_source() {
        let error = PublishError::InsufficientPermissions {
            registry: "https://example.com/index.json".to_string(),
            message: "push failed with s3cr3t-value".to_string(),
            source: Some(Box::new(PublishError::Command(failed_command("", "")))),
        }
        .redact("s3cr3t-value");

        assert!(!format!("{error:?}").contains("s3cr3t-value"));
    }

    #[test]
    fn test_redact_empty_secret_is_noop() {
        let error = PublishError::configuration("keep me").redact("");
        assert_eq!(error.to_string(), "Configuration error: keep me");
    }
}
