//! Credential Validator - rejects tokens that cannot push before any network call
//!
//! Some token formats are known to lack package write access no matter what
//! scopes they were given. Checking the prefix is free; the dummy-package
//! round trip is not.
//!
//! # Example
//!
//! ```
//! use nuget_publisher::security::CredentialValidator;
//!
//! let validator = CredentialValidator::new();
//! assert!(validator.validate_token("github_pat_11ABCDEFG").is_err());
//! assert!(validator.validate_token("ghp_1A2b3C4d5E6f7G8h9I0").is_ok());
//! ```

/// Token prefixes known to be unable to push packages, with the reason
const INCAPABLE_TOKEN_PREFIXES: &[(&str, &str)] = &[(
    "github_pat_",
    "GitHub fine-grained personal access tokens cannot publish packages",
)];

/// Validator for registry credentials
#[derive(Debug, Clone)]
pub struct CredentialValidator {
    incapable_prefixes: Vec<(String, String)>,
}

impl Default for CredentialValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialValidator {
    pub fn new() -> Self {
        Self {
            incapable_prefixes: INCAPABLE_TOKEN_PREFIXES
                .iter()
                .map(|(prefix, reason)| (prefix.to_string(), reason.to_string()))
                .collect(),
        }
    }

    /// Add a prefix that should be rejected
    pub fn with_incapable_prefix(mut self, prefix: &str, reason: &str) -> Self {
        self.incapable_prefixes
            .push((prefix.to_string(), reason.to_string()));
        self
    }

    /// Check the token's shape.
    ///
    /// Returns the rejection reason when the token can never push packages.
    pub fn validate_token(&self, token: &str) -> Result<(), String> {
        match self
            .incapable_prefixes
            .iter()
            .find(|(prefix, _)| token.starts_with(prefix.as_str()))
        {
            Some((prefix, reason)) => Err(format!("{} (token starts with '{}')", reason, prefix)),
            None => Ok(()),
        }
    }
}
