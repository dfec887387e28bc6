//! Apply orchestrator.
//!
//! Applies safe operations one at a time, in plan order. The diff engine
//! already emits operations in dependency order, so sequential execution is
//! enough to keep, e.g., a field addition behind its collection's creation.
//! A failed operation is recorded and the batch continues.

use std::sync::Arc;

use schemasync_core::{Backend, BackendError, MigrationOperation};

use crate::retry::RetryPolicy;

/// An operation that could not be applied.
#[derive(Debug, Clone)]
pub struct FailedOperation {
    /// The operation.
    pub operation: MigrationOperation,
    /// Last error reported for it.
    pub error: BackendError,
    /// Attempts made before giving up.
    pub attempts: u32,
}

/// Outcome of applying a batch of operations.
#[derive(Debug, Clone, Default)]
pub struct ApplyReport {
    /// Operations applied, in order.
    pub applied: Vec<MigrationOperation>,
    /// Operations that failed, in order.
    pub failed: Vec<FailedOperation>,
}

impl ApplyReport {
    /// Check if every operation was applied.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Applies safe operations against a backend.
pub struct ApplyOrchestrator {
    backend: Arc<dyn Backend>,
    retry: RetryPolicy,
}

impl ApplyOrchestrator {
    /// Create an orchestrator.
    pub fn new(backend: Arc<dyn Backend>, retry: RetryPolicy) -> Self {
        Self { backend, retry }
    }

    /// Retry policy used for each operation.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Apply operations sequentially.
    pub async fn apply(&self, operations: &[MigrationOperation]) -> ApplyReport {
        let mut report = ApplyReport::default();

        for operation in operations {
            if operation.kind().is_unsafe_only() {
                tracing::warn!(
                    kind = %operation.kind(),
                    summary = %operation.summary(),
                    "refusing to apply unsafe operation"
                );
                report.failed.push(FailedOperation {
                    operation: operation.clone(),
                    error: BackendError::rejected(format!(
                        "{} operations are never applied automatically",
                        operation.kind()
                    )),
                    attempts: 0,
                });
                continue;
            }

            let outcome = self
                .retry
                .execute(|_| self.backend.apply_operation(operation))
                .await;

            match outcome.result {
                Ok(()) => {
                    tracing::info!(
                        kind = %operation.kind(),
                        attempts = outcome.attempts,
                        "{}",
                        operation.summary()
                    );
                    report.applied.push(operation.clone());
                }
                Err(error) => {
                    tracing::warn!(
                        kind = %operation.kind(),
                        attempts = outcome.attempts,
                        error = %error,
                        "failed: {}",
                        operation.summary()
                    );
                    report.failed.push(FailedOperation {
                        operation: operation.clone(),
                        error,
                        attempts: outcome.attempts,
                    });
                }
            }
        }

        report
    }
}
