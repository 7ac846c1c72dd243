//! Secure token manager with memory-safe handling and masking capabilities
//!
//! Registry credentials come from an ordered list of candidate environment
//! variables. Values are read from the live process environment first, then
//! from an optional `.env` file, and are kept in `secrecy` wrappers so they
//! do not end up in logs by accident.

use crate::core::error::PublishError;
use crate::security::command_executor::escaped_arg;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::path::Path;

/// Immutable snapshot of the variables visible to the publisher
///
/// # Examples
///
/// ```
/// use nuget_publisher::security::EnvironmentSource;
///
/// let env = EnvironmentSource::from_pairs([("NUGET_TOKEN", "abc")]);
/// assert_eq!(env.get("NUGET_TOKEN"), Some("abc"));
/// assert_eq!(env.get("GH_TOKEN"), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct EnvironmentSource {
    process: HashMap<String, String>,
    dotenv: HashMap<String, String>,
}

impl EnvironmentSource {
    /// Snapshot of the current process environment
    pub fn from_process() -> Self {
        Self {
            process: std::env::vars().collect(),
            dotenv: HashMap::new(),
        }
    }

    /// Environment built from explicit pairs (no process variables)
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            process: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            dotenv: HashMap::new(),
        }
    }

    /// Add fallback values from a `.env` file.
    ///
    /// A missing file is not an error; a malformed one is.
    pub fn with_dotenv_file(mut self, path: &Path) -> Result<Self, PublishError> {
        if !path.is_file() {
            tracing::debug!(path = %path.display(), "no .env file");
            return Ok(self);
        }

        let entries = dotenvy::from_path_iter(path).map_err(|e| {
            PublishError::configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        for entry in entries {
            let (key, value) = entry.map_err(|e| {
                PublishError::configuration(format!("Failed to parse {}: {}", path.display(), e))
            })?;
            self.dotenv.insert(key, value);
        }

        tracing::debug!(path = %path.display(), count = self.dotenv.len(), "loaded .env file");
        Ok(self)
    }

    /// Add fallback values as if read from a `.env` file
    pub fn with_dotenv_pairs<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.dotenv
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Look up a variable; empty values count as undefined.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.process
            .get(name)
            .filter(|value| !value.is_empty())
            .or_else(|| self.dotenv.get(name).filter(|value| !value.is_empty()))
            .map(String::as_str)
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// A credential resolved from one of its candidate variables
#[derive(Debug, Clone)]
pub struct ResolvedToken {
    /// Name of the variable that provided the value
    pub env_var: String,
    pub value: SecretString,
}

/// Secure token manager for registry authentication
#[derive(Debug, Clone, Default)]
pub struct SecureTokenManager {
    env: EnvironmentSource,
}

impl SecureTokenManager {
    pub fn new(env: EnvironmentSource) -> Self {
        Self { env }
    }

    pub fn environment(&self) -> &EnvironmentSource {
        &self.env
    }

    /// Return the first candidate that is defined.
    ///
    /// # Errors
    ///
    /// `PublishError::CredentialsUnavailable` listing every attempted name.
    pub fn resolve_first<S: AsRef<str>>(&self, candidates: &[S]) -> Result<ResolvedToken, PublishError> {
        candidates
            .iter()
            .map(AsRef::as_ref)
            .find_map(|name| {
                self.env.get(name).map(|value| ResolvedToken {
                    env_var: name.to_string(),
                    value: SecretString::from(value.to_string()),
                })
            })
            .ok_or_else(|| PublishError::CredentialsUnavailable {
                attempted: candidates.iter().map(|s| s.as_ref().to_string()).collect(),
            })
    }

    /// Checks if any of the candidates is defined
    pub fn has_token<S: AsRef<str>>(&self, candidates: &[S]) -> bool {
        candidates.iter().any(|name| self.env.is_defined(name.as_ref()))
    }

    /// Masks a token for safe logging
    ///
    /// Shows only the first 3 and last 3 characters for identification purposes.
    /// Tokens shorter than 10 characters are fully masked as "****".
    ///
    /// # Examples
    ///
    /// ```
    /// use nuget_publisher::security::SecureTokenManager;
    ///
    /// assert_eq!(SecureTokenManager::mask_token("abcdef123456"), "abc...456");
    /// assert_eq!(SecureTokenManager::mask_token("short"), "****");
    /// ```
    pub fn mask_token(token: &str) -> String {
        if token.chars().count() < 10 {
            return "****".to_string();
        }

        let prefix: String = token.chars().take(3).collect();
        let suffix: String = token
            .chars()
            .rev()
            .take(3)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("{}...{}", prefix, suffix)
    }

    /// Masks every occurrence of `token` in `text` for safe logging
    pub fn mask_token_in_string(text: &str, token: &SecretString) -> String {
        let secret = token.expose_secret();
        if secret.is_empty() {
            return text.to_string();
        }
        let masked = Self::mask_token(secret);
        text.replace(&escaped_arg(secret), &masked)
            .replace(secret, &masked)
    }
}
