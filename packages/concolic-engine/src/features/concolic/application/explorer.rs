//! Per-method concolic exploration loop
//!
//! ```text
//!   seed ─▶ execute ─▶ merge trace ─▶ select ─▶ check ─┬─ sat ─▶ generate ─▶ execute ─▶ …
//!                                        ▲             └─ unsat/unknown ─┐
//!                                        └───────────────────────────────┘
//! ```
//!
//! The loop owns the selector for its method and runs on one task. Every
//! iteration passes through suspension points that observe cancellation, and
//! the whole loop is bounded by the per-method wall-clock budget. Lost
//! executions are skipped; solver or pipeline failures abort this method
//! only.

use crate::config::ConcolicConfig;
use crate::context::AnalysisContext;
use crate::errors::EngineError;
use crate::features::concolic::application::selector::{ContextGuidedSelector, PathSelector};
use crate::features::concolic::domain::{CancellationToken, TestCaseGenerator, TestExecutor};
use crate::features::predicate_state::PredicateState;
use crate::features::smt::application::{BackendFactory, Checker, ConfiguredBackendFactory};
use crate::features::smt::domain::SmtResult;
use crate::shared::models::{ExecutionResult, TestExecutionRequest};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Counters for one explored method
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExplorationReport {
    pub method: String,
    pub iterations: usize,
    pub sat: usize,
    pub unsat: usize,
    pub unknown: usize,
    pub executed: usize,
    /// Executions whose result never arrived
    pub lost: usize,
    pub timed_out: bool,
    pub cancelled: bool,
}

impl ExplorationReport {
    fn new(method: &str) -> Self {
        Self {
            method: method.to_string(),
            ..Self::default()
        }
    }
}

pub struct ConcolicExplorer<'c, F: BackendFactory = ConfiguredBackendFactory> {
    checker: Checker<'c, F>,
    generator: Arc<dyn TestCaseGenerator>,
    executor: Arc<dyn TestExecutor>,
    config: ConcolicConfig,
    cancel: CancellationToken,
}

impl<'c> ConcolicExplorer<'c, ConfiguredBackendFactory> {
    pub fn new(
        ctx: &'c AnalysisContext,
        generator: Arc<dyn TestCaseGenerator>,
        executor: Arc<dyn TestExecutor>,
    ) -> Self {
        Self::with_checker(ctx, Checker::from_context(ctx), generator, executor)
    }
}

impl<'c, F: BackendFactory> ConcolicExplorer<'c, F> {
    pub fn with_checker(
        ctx: &'c AnalysisContext,
        checker: Checker<'c, F>,
        generator: Arc<dyn TestCaseGenerator>,
        executor: Arc<dyn TestExecutor>,
    ) -> Self {
        Self {
            checker,
            generator,
            executor,
            config: ctx.config().concolic.clone(),
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops every exploration run by this explorer
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Selector configured for this explorer
    pub fn selector(&self) -> ContextGuidedSelector {
        ContextGuidedSelector::new(self.config.initial_k)
    }

    /// Explore `method` until the selector runs dry, the iteration limit is
    /// hit, the budget expires or the token is cancelled. Only solver and
    /// pipeline failures are returned as errors.
    pub async fn explore(
        &self,
        method: &str,
        selector: &mut dyn PathSelector,
    ) -> Result<ExplorationReport, EngineError> {
        let mut report = ExplorationReport::new(method);
        let budget = Duration::from_secs(self.config.time_limit_secs);
        let run = self.run(method, selector, &mut report);
        let outcome = tokio::time::timeout(budget, async {
            tokio::select! {
                result = run => result,
                _ = self.cancel.cancelled() => Err(EngineError::Cancelled),
            }
        })
        .await;

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(EngineError::Cancelled)) => {
                info!(method, "exploration cancelled");
                report.cancelled = true;
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                info!(method, budget_secs = self.config.time_limit_secs, "time budget exhausted");
                report.timed_out = true;
            }
        }
        info!(
            method,
            selector = selector.name(),
            iterations = report.iterations,
            executed = report.executed,
            "exploration finished"
        );
        Ok(report)
    }

    /// Explore each method with a fresh selector; a failing method is logged
    /// and skipped
    pub async fn explore_all(&self, methods: &[String]) -> Vec<ExplorationReport> {
        let mut reports = Vec::with_capacity(methods.len());
        for method in methods {
            if self.cancel.is_cancelled() {
                break;
            }
            let mut selector = self.selector();
            match self.explore(method, &mut selector).await {
                Ok(report) => reports.push(report),
                Err(e) => error!(method = %method, error = %e, "exploration failed"),
            }
        }
        reports
    }

    async fn checkpoint(&self) -> Result<(), EngineError> {
        if self.cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        tokio::task::yield_now().await;
        Ok(())
    }

    async fn run(
        &self,
        method: &str,
        selector: &mut dyn PathSelector,
        report: &mut ExplorationReport,
    ) -> Result<(), EngineError> {
        self.checkpoint().await?;
        if selector.is_empty() {
            match self.generator.initial(method).await {
                Some(request) => self.execute_and_merge(&request, selector, report).await,
                None => warn!(method, "no seed test"),
            }
        }
        if selector.is_empty() {
            warn!(method, "no seed trace, nothing to explore");
            return Ok(());
        }

        loop {
            self.checkpoint().await?;
            if self.config.max_iterations > 0 && report.iterations >= self.config.max_iterations {
                debug!(method, "iteration limit reached");
                return Ok(());
            }
            if !selector.has_next() {
                return Ok(());
            }
            let Some(candidate) = selector.next() else {
                return Ok(());
            };
            report.iterations += 1;
            self.checkpoint().await?;

            let state = PredicateState::from_clauses(&candidate.clauses.0);
            let query = PredicateState::from_clauses(&candidate.path.0);
            let model = match self.checker.check(&state, &query)? {
                SmtResult::Sat(model) => {
                    report.sat += 1;
                    model
                }
                SmtResult::Unsat => {
                    report.unsat += 1;
                    continue;
                }
                SmtResult::Unknown(reason) => {
                    debug!(method, reason = %reason, "solver could not decide");
                    report.unknown += 1;
                    continue;
                }
            };

            let Some(request) = self.generator.generate(method, &candidate, &model).await else {
                debug!(method, "no test generated from model");
                continue;
            };
            self.checkpoint().await?;
            self.execute_and_merge(&request, selector, report).await;
        }
    }

    async fn execute_and_merge(
        &self,
        request: &TestExecutionRequest,
        selector: &mut dyn PathSelector,
        report: &mut ExplorationReport,
    ) {
        let Some(result) = self.executor.execute(request).await else {
            warn!(test = %request.test_method, "execution result lost");
            report.lost += 1;
            return;
        };
        report.executed += 1;
        match &result {
            ExecutionResult::ExecutionCompletedResult { completed } => {
                let state = completed.symbolic_state();
                if state.clauses.0.is_empty() {
                    debug!(test = %request.test_method, "run produced no trace");
                } else {
                    selector.add_execution_trace(state);
                }
            }
            ExecutionResult::ExecutionFailedResult { message }
            | ExecutionResult::SetupFailedResult { message }
            | ExecutionResult::ExecutionTimedOutResult { message } => {
                debug!(test = %request.test_method, message = %message, "run did not complete");
            }
        }
    }
}
