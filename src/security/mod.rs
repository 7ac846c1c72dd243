pub mod command_executor;
pub mod credential_validator;
pub mod token_manager;

pub use command_executor::{CommandError, ShellCommandExecutor, escaped_arg, quote_arg};
pub use credential_validator::CredentialValidator;
pub use token_manager::{EnvironmentSource, ResolvedToken, SecureTokenManager};
