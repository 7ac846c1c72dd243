//! ShellCommandExecutor: runs one external command line and captures its streams
//!
//! # Behavior
//!
//! - **One process per call**: no retry happens here, callers decide
//! - **Structured failures**: exit code, signal and both streams are kept so
//!   callers can match on tool diagnostics
//! - **Locale normalization**: dotnet/MSBuild are asked for English output
//! - **Timeout control**: optional, the process is killed when it elapses
//!
//! # Example
//!
//! ```rust,no_run
//! use nuget_publisher::core::ProcessRunner;
//! use nuget_publisher::security::ShellCommandExecutor;
//!
//! # async fn example() -> Result<(), nuget_publisher::security::CommandError> {
//! let executor = ShellCommandExecutor::new(std::env::temp_dir())?;
//! let output = executor.run("dotnet --version").await?;
//! println!("{}", output.stdout);
//! # Ok(())
//! # }
//! ```

use crate::core::traits::{ProcessOutput, ProcessRunner};
use aho_corasick::AhoCorasick;
use async_trait::async_trait;
use lazy_static::lazy_static;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Diagnostics printed when another process holds a file open.
///
/// MSBuild's copy codes (MSB3021, MSB3027) also cover permanent failures such as
/// access denied, so only the lock wording itself counts.
const BUSY_FILE_DIAGNOSTICS: &[&str] = &[
    "being used by another process",
    "the process cannot access the file",
    "the file is locked by",
];

/// Characters still special inside a double-quoted shell word
#[cfg(unix)]
const QUOTED_SPECIALS: &[char] = &['\\', '"', '$', '`'];
#[cfg(not(unix))]
const QUOTED_SPECIALS: &[char] = &['"'];

/// Environment forced on every child so diagnostics can be matched in English
const ENGLISH_OUTPUT_ENV: &[(&str, &str)] = &[("DOTNET_CLI_UI_LANGUAGE", "en"), ("VSLANG", "1033")];

lazy_static! {
    static ref BUSY_FILE_MATCHER: AhoCorasick = AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .build(BUSY_FILE_DIAGNOSTICS)
        .expect("busy-file diagnostics are valid patterns");
}

/// Errors that can occur during command execution
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Working directory does not exist or is not accessible
    #[error("Working directory does not exist: {}", .0.display())]
    InvalidWorkingDirectory(PathBuf),

    /// Process could not be started (e.g., shell not found, permission denied)
    #[error("Command could not be started: {message}")]
    SpawnFailed { command: String, message: String },

    /// Process ran and reported failure
    #[error("Command failed (exit code {exit_code:?}, signal {signal:?}): {command}\n{stderr}")]
    Failed {
        command: String,
        exit_code: Option<i32>,
        signal: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// Command exceeded the timeout duration
    #[error("Command timeout after {timeout:?}: {command}")]
    Timeout { command: String, timeout: Duration },
}

impl CommandError {
    pub fn command(&self) -> Option<&str> {
        match self {
            Self::InvalidWorkingDirectory(_) => None,
            Self::SpawnFailed { command, .. }
            | Self::Failed { command, .. }
            | Self::Timeout { command, .. } => Some(command),
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Failed { exit_code, .. } => *exit_code,
            _ => None,
        }
    }

    pub fn signal(&self) -> Option<i32> {
        match self {
            Self::Failed { signal, .. } => *signal,
            _ => None,
        }
    }

    pub fn stdout(&self) -> &str {
        match self {
            Self::Failed { stdout, .. } => stdout,
            _ => "",
        }
    }

    pub fn stderr(&self) -> &str {
        match self {
            Self::Failed { stderr, .. } => stderr,
            _ => "",
        }
    }

    /// Whether the failure was caused by a file held open by another process.
    ///
    /// MSBuild reports errors on stdout, so both streams and the message are searched.
    pub fn is_busy_file(&self) -> bool {
        match self {
            Self::Failed { stdout, stderr, .. } => {
                BUSY_FILE_MATCHER.is_match(stdout) || BUSY_FILE_MATCHER.is_match(stderr)
            }
            Self::SpawnFailed { message, .. } => BUSY_FILE_MATCHER.is_match(message),
            _ => false,
        }
    }

    /// Replace every occurrence of `secret` in the command text and captured streams
    pub fn redact(self, secret: &str) -> Self {
        if secret.is_empty() {
            return self;
        }
        let scrub = |text: String| text.replace(secret, crate::core::error::REDACTED);

        match self {
            Self::InvalidWorkingDirectory(path) => {
                Self::InvalidWorkingDirectory(PathBuf::from(scrub(path.to_string_lossy().into_owned())))
            }
            Self::SpawnFailed { command, message } => Self::SpawnFailed {
                command: scrub(command),
                message: scrub(message),
            },
            Self::Failed {
                command,
                exit_code,
                signal,
                stdout,
                stderr,
            } => Self::Failed {
                command: scrub(command),
                exit_code,
                signal,
                stdout: scrub(stdout),
                stderr: scrub(stderr),
            },
            Self::Timeout { command, timeout } => Self::Timeout {
                command: scrub(command),
                timeout,
            },
        }
    }
}

/// Double-quote one argument for the shell [`ShellCommandExecutor`] runs.
///
/// Credentials and property values end up here, so expansion characters are escaped.
pub fn quote_arg(value: impl std::fmt::Display) -> String {
    let value = value.to_string();
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if QUOTED_SPECIALS.contains(&c) {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// `value` as it appears between the quotes of [`quote_arg`]
pub fn escaped_arg(value: &str) -> String {
    let quoted = quote_arg(value);
    quoted[1..quoted.len() - 1].to_string()
}

/// Shell-backed process runner
#[derive(Debug, Clone)]
pub struct ShellCommandExecutor {
    /// Working directory where commands will be executed
    working_dir: PathBuf,
    /// Optional timeout for command execution
    timeout: Option<Duration>,
}

impl ShellCommandExecutor {
    /// Create a new executor with working directory validation.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::InvalidWorkingDirectory` if the directory does not exist.
    pub fn new<P: AsRef<Path>>(working_dir: P) -> Result<Self, CommandError> {
        let working_dir = working_dir.as_ref().to_path_buf();

        if !working_dir.is_dir() {
            return Err(CommandError::InvalidWorkingDirectory(working_dir));
        }

        Ok(Self {
            working_dir,
            timeout: None,
        })
    }

    /// Executor rooted at the process' current directory
    pub fn current_dir() -> Result<Self, CommandError> {
        let cwd = std::env::current_dir()
            .map_err(|_| CommandError::InvalidWorkingDirectory(PathBuf::from(".")))?;
        Self::new(cwd)
    }

    /// Set command execution timeout.
    ///
    /// Commands exceeding this duration are killed.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = Some(timeout);
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    fn shell_command(&self, command_line: &str) -> Command {
        #[cfg(target_os = "windows")]
        let mut command = {
            let mut command = Command::new("cmd");
            command.arg("/C").arg(command_line);
            command
        };

        #[cfg(not(target_os = "windows"))]
        let mut command = {
            let mut command = Command::new("sh");
            command.arg("-c").arg(command_line);
            command
        };

        command
            .current_dir(&self.working_dir)
            .envs(ENGLISH_OUTPUT_ENV.iter().copied())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl ProcessRunner for ShellCommandExecutor {
    async fn run(&self, command_line: &str) -> Result<ProcessOutput, CommandError> {
        let pending = self.shell_command(command_line).output();

        let output = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, pending).await.map_err(|_| {
                CommandError::Timeout {
                    command: command_line.to_string(),
                    timeout,
                }
            })?,
            None => pending.await,
        }
        .map_err(|e| CommandError::SpawnFailed {
            command: command_line.to_string(),
            message: e.to_string(),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(CommandError::Failed {
                command: command_line.to_string(),
                exit_code: output.status.code(),
                signal: exit_signal(&output.status),
                stdout,
                stderr,
            });
        }

        Ok(ProcessOutput { stdout, stderr })
    }
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(stdout: &str, stderr: &str) -> CommandError {
        CommandError::Failed {
            command: "dotnet msbuild".to_string(),
            exit_code: Some(1),
            signal: None,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }
    }

    #[test]
    fn test_invalid_working_directory() {
        let result = ShellCommandExecutor::new("/nonexistent/directory/that/does/not/exist");
        assert!(
            matches!(result, Err(CommandError::InvalidWorkingDirectory(_))),
            "Should reject non-existent working directory"
        );
    }

    #[test]
    fn test_busy_file_detected_on_stdout() {
        let error = failed(
            "error MSB3027: Could not copy \"obj/Debug/App.dll\" to \"bin/Debug/App.dll\". Exceeded retry count of 10. Failed. The file is locked by: \"VBCSCompiler (4242)\"",
            "",
        );
        assert!(error.is_busy_file());
    }

    #[test]
    fn test_copy_failure_without_lock_is_not_busy_file() {
        let error = failed(
            "error MSB3021: Unable to copy file \"obj/App.dll\" to \"/usr/lib/App.dll\". Access to the path '/usr/lib/App.dll' is denied.",
            "",
        );
        assert!(!error.is_busy_file());
    }

    #[test]
    fn test_busy_file_detected_case_insensitively() {
        let error = failed(
            "",
            "The Process Cannot Access The File 'App.dll' Because It Is Being Used By Another Process.",
        );
        assert!(error.is_busy_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_quote_arg_escapes_expansion() {
        assert_eq!(quote_arg("oy2k$HOME`id`\"x"), r#""oy2k\$HOME\`id\`\"x""#);
        assert_eq!(quote_arg("/src/My App/App.csproj"), "\"/src/My App/App.csproj\"");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_quoted_argument_reaches_process_verbatim() {
        let executor = ShellCommandExecutor::current_dir().unwrap();
        let secret = "a$b`c\"d\\e";

        let output = executor
            .run(&format!("printf %s {}", quote_arg(secret)))
            .await
            .unwrap();

        assert_eq!(output.stdout, secret);
    }

    #[test]
    fn test_other_failures_are_not_busy_file() {
        assert!(!failed("error CS1002: ; expected", "").is_busy_file());
        assert!(
            !CommandError::Timeout {
                command: "dotnet".to_string(),
                timeout: Duration::from_secs(1),
            }
            .is_busy_file()
        );
    }

    #[test]
    fn test_redact_scrubs_streams() {
        let error = failed("key=abc123", "abc123 rejected").redact("abc123");
        assert_eq!(error.stdout(), "key=***");
        assert_eq!(error.stderr(), "*** rejected");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_captures_stdout() {
        let executor = ShellCommandExecutor::new(std::env::temp_dir()).unwrap();
        let output = executor.run("echo hello").await.unwrap();
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_reports_exit_code_and_streams() {
        let executor = ShellCommandExecutor::new(std::env::temp_dir()).unwrap();
        let error = executor
            .run("echo out; echo err 1>&2; exit 3")
            .await
            .unwrap_err();

        assert_eq!(error.exit_code(), Some(3));
        assert_eq!(error.stdout().trim(), "out");
        assert_eq!(error.stderr().trim(), "err");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_forces_english_output() {
        let executor = ShellCommandExecutor::new(std::env::temp_dir()).unwrap();
        let output = executor.run("echo $DOTNET_CLI_UI_LANGUAGE").await.unwrap();
        assert_eq!(output.stdout.trim(), "en");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_with_timeout() {
        let mut executor = ShellCommandExecutor::new(std::env::temp_dir()).unwrap();
        executor.set_timeout(Duration::from_millis(100));

        let result = executor.run("sleep 5").await;
        assert!(matches!(result, Err(CommandError::Timeout { .. })));
    }
}
