//! Batch Validator - checks write access for many registries
//!
//! Features:
//! - Parallel or sequential validation
//! - Stop on first failure unless `continue_on_error`
//! - Concurrency control
//! - Per-registry outcomes in input order

use crate::core::error::PublishError;
use crate::core::traits::ProcessRunner;
use crate::plugins::registry_info::RegistryInfo;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Batch validation options
#[derive(Debug, Clone)]
pub struct BatchValidateOptions {
    /// Validate one registry at a time (default: parallel)
    pub sequential: bool,

    /// Keep validating after a failure (sequential mode only)
    pub continue_on_error: bool,

    /// Maximum concurrent round trips (default: 3)
    pub max_concurrency: usize,
}

impl Default for BatchValidateOptions {
    fn default() -> Self {
        Self {
            sequential: false,
            continue_on_error: false,
            max_concurrency: 3,
        }
    }
}

/// Outcome of one registry check
#[derive(Debug, Clone)]
pub enum ValidationOutcome {
    Writable,
    Failed(PublishError),
    /// Not attempted because an earlier registry failed
    Skipped,
}

#[derive(Debug, Clone)]
pub struct RegistryValidation {
    pub registry: String,
    pub package_id: String,
    pub outcome: ValidationOutcome,
}

/// Batch validation result
#[derive(Debug, Clone, Default)]
pub struct BatchValidationResult {
    pub validations: Vec<RegistryValidation>,
}

impl BatchValidationResult {
    /// Every registry was checked and is writable
    pub fn success(&self) -> bool {
        self.validations
            .iter()
            .all(|v| matches!(v.outcome, ValidationOutcome::Writable))
    }

    pub fn failed(&self) -> impl Iterator<Item = (&RegistryValidation, &PublishError)> {
        self.validations.iter().filter_map(|v| match &v.outcome {
            ValidationOutcome::Failed(error) => Some((v, error)),
            _ => None,
        })
    }
}

/// BatchValidator - runs `can_push_packages_to_source` across registries
pub struct BatchValidator {
    runner: Arc<dyn ProcessRunner>,
}

impl BatchValidator {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self { runner }
    }

    /// Validate every registry.
    ///
    /// Errors never abort the batch; they are reported per registry.
    pub async fn validate_all(
        &self,
        registries: &[Arc<RegistryInfo>],
        options: &BatchValidateOptions,
    ) -> BatchValidationResult {
        tracing::info!(
            count = registries.len(),
            sequential = options.sequential,
            max_concurrency = options.max_concurrency,
            "validating registry write access"
        );

        let result = if options.sequential {
            self.validate_sequentially(registries, options).await
        } else {
            self.validate_in_parallel(registries, options).await
        };

        for validation in &result.validations {
            match &validation.outcome {
                ValidationOutcome::Writable => {
                    tracing::info!(registry = %validation.registry, package = %validation.package_id, "writable")
                }
                ValidationOutcome::Failed(error) => {
                    tracing::error!(registry = %validation.registry, package = %validation.package_id, %error, "not writable")
                }
                ValidationOutcome::Skipped => {
                    tracing::warn!(registry = %validation.registry, package = %validation.package_id, "skipped")
                }
            }
        }

        result
    }

    async fn validate_sequentially(
        &self,
        registries: &[Arc<RegistryInfo>],
        options: &BatchValidateOptions,
    ) -> BatchValidationResult {
        let mut result = BatchValidationResult::default();
        let mut failed = false;

        for registry in registries {
            let outcome = if failed && !options.continue_on_error {
                ValidationOutcome::Skipped
            } else {
                let outcome = Self::validate_one(registry, self.runner.as_ref()).await;
                failed |= matches!(outcome, ValidationOutcome::Failed(_));
                outcome
            };
            result.validations.push(Self::describe(registry, outcome));
        }

        result
    }

    async fn validate_in_parallel(
        &self,
        registries: &[Arc<RegistryInfo>],
        options: &BatchValidateOptions,
    ) -> BatchValidationResult {
        let semaphore = Arc::new(Semaphore::new(options.max_concurrency.max(1)));
        let mut tasks = Vec::with_capacity(registries.len());

        for registry in registries {
            let semaphore = Arc::clone(&semaphore);
            let registry_for_task = Arc::clone(registry);
            let runner = Arc::clone(&self.runner);

            let task = tokio::spawn(async move {
                // the semaphore is never closed
                let _permit = semaphore.acquire_owned().await.ok();
                Self::validate_one(&registry_for_task, runner.as_ref()).await
            });
            tasks.push((registry, task));
        }

        let mut result = BatchValidationResult::default();
        for (registry, task) in tasks {
            let outcome = task
                .await
                .unwrap_or_else(|e| std::panic::resume_unwind(e.into_panic()));
            result.validations.push(Self::describe(registry, outcome));
        }

        result
    }

    async fn validate_one(registry: &RegistryInfo, runner: &dyn ProcessRunner) -> ValidationOutcome {
        match registry.can_push_packages_to_source(runner).await {
            Ok(true) => ValidationOutcome::Writable,
            Ok(false) => ValidationOutcome::Failed(PublishError::InsufficientPermissions {
                registry: registry.url().to_string(),
                message: "push access was denied".to_string(),
                source: None,
            }),
            Err(error) => ValidationOutcome::Failed(error),
        }
    }

    fn describe(registry: &RegistryInfo, outcome: ValidationOutcome) -> RegistryValidation {
        RegistryValidation {
            registry: registry.url().to_string(),
            package_id: registry.project().properties().package_id().to_string(),
            outcome,
        }
    }
}
