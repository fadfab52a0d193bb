//! Ports to the outside world: test generation and isolated execution

use crate::features::smt::domain::SmtModel;
use crate::shared::models::{ExecutionResult, SymbolicState, TestExecutionRequest};
use async_trait::async_trait;

// ============================================================================
// Output Ports (Driven Ports)
// ============================================================================

/// Turns solver models into runnable tests
#[async_trait]
pub trait TestCaseGenerator: Send + Sync {
    /// Seed test for `method` built from default or random arguments
    async fn initial(&self, method: &str) -> Option<TestExecutionRequest>;

    /// Test that drives `method` along `state` using the values in `model`
    async fn generate(
        &self,
        method: &str,
        state: &SymbolicState,
        model: &SmtModel,
    ) -> Option<TestExecutionRequest>;
}

/// Runs a generated test in isolation and reports its trace.
///
/// `None` means the result was lost (transport timeout, dead worker); the
/// caller moves on rather than retrying.
#[async_trait]
pub trait TestExecutor: Send + Sync {
    async fn execute(&self, request: &TestExecutionRequest) -> Option<ExecutionResult>;
}
