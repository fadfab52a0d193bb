//! Checker: pipeline + solver behind one call
//!
//! Every check acquires a fresh backend from the factory and drops it before
//! returning, so solver processes never outlive the query that needed them.
//! Failures carry the state being checked for postmortem dumps.

use crate::config::{SmtConfig, SolverBackendKind};
use crate::context::AnalysisContext;
use crate::errors::EngineError;
use crate::features::predicate_state::PredicateState;
use crate::features::smt::domain::{SmtError, SmtResult, SolverBackend, Verdict};
use crate::features::smt::infrastructure::{
    AstEngine, EnumerativeBackend, SmtExpr, SmtLibBackend, SmtSolver,
};
use crate::features::transform::TransformPipeline;
use crate::shared::models::InstructionRef;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::{debug, info};

// ═══════════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
#[error("{source}\nwhile checking state:\n{state}")]
pub struct CheckerError {
    pub state: PredicateState,
    #[source]
    pub source: EngineError,
}

impl CheckerError {
    pub fn new(state: PredicateState, source: impl Into<EngineError>) -> Self {
        Self {
            state,
            source: source.into(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Ports
// ═══════════════════════════════════════════════════════════════════════════

/// Source of per-instruction predicate states (the bytecode analysis)
pub trait PredicateStateProvider {
    fn instruction_state(&self, instruction: &InstructionRef) -> Option<PredicateState>;
}

impl PredicateStateProvider for FxHashMap<InstructionRef, PredicateState> {
    fn instruction_state(&self, instruction: &InstructionRef) -> Option<PredicateState> {
        self.get(instruction).cloned()
    }
}

/// Creates one backend per check
pub trait BackendFactory {
    type Backend: SolverBackend;

    fn create(&self) -> Result<Self::Backend, SmtError>;
}

// ═══════════════════════════════════════════════════════════════════════════
// Configured backends
// ═══════════════════════════════════════════════════════════════════════════

/// Backend selected by `smt.backend`
pub enum ConfiguredBackend {
    Enumerative(EnumerativeBackend),
    SmtLib(SmtLibBackend),
}

impl SolverBackend for ConfiguredBackend {
    type Engine = AstEngine;

    fn name(&self) -> &'static str {
        match self {
            ConfiguredBackend::Enumerative(b) => b.name(),
            ConfiguredBackend::SmtLib(b) => b.name(),
        }
    }

    fn engine(&mut self) -> &mut AstEngine {
        match self {
            ConfiguredBackend::Enumerative(b) => b.engine(),
            ConfiguredBackend::SmtLib(b) => b.engine(),
        }
    }

    fn check(&mut self, assertions: &[SmtExpr], probes: &[SmtExpr]) -> Result<Verdict, SmtError> {
        match self {
            ConfiguredBackend::Enumerative(b) => b.check(assertions, probes),
            ConfiguredBackend::SmtLib(b) => b.check(assertions, probes),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfiguredBackendFactory {
    config: SmtConfig,
}

impl ConfiguredBackendFactory {
    pub fn new(config: &SmtConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

impl BackendFactory for ConfiguredBackendFactory {
    type Backend = ConfiguredBackend;

    fn create(&self) -> Result<ConfiguredBackend, SmtError> {
        match self.config.backend {
            SolverBackendKind::Enumerative => Ok(ConfiguredBackend::Enumerative(
                EnumerativeBackend::new(self.config.search_budget),
            )),
            SolverBackendKind::Smtlib => SmtLibBackend::spawn(
                &self.config.solver_command,
                &self.config.solver_args,
                self.config.timeout_ms,
            )
            .map(ConfiguredBackend::SmtLib),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Checker
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy)]
enum CheckMode {
    Reachable,
    PathPossible,
    Violated,
}

pub struct Checker<'c, F: BackendFactory = ConfiguredBackendFactory> {
    ctx: &'c AnalysisContext,
    factory: F,
    pipeline: TransformPipeline,
}

impl<'c> Checker<'c, ConfiguredBackendFactory> {
    /// Checker using the backend named in the context's configuration
    pub fn from_context(ctx: &'c AnalysisContext) -> Self {
        let factory = ConfiguredBackendFactory::new(&ctx.config().smt);
        Self::new(ctx, factory)
    }
}

impl<'c, F: BackendFactory> Checker<'c, F> {
    pub fn new(ctx: &'c AnalysisContext, factory: F) -> Self {
        Self {
            ctx,
            pipeline: TransformPipeline::from_config(ctx.config()),
            factory,
        }
    }

    pub fn pipeline(&self) -> &TransformPipeline {
        &self.pipeline
    }

    /// Is `instruction` reachable? `Unknown` when the analysis has no state
    /// for it.
    pub fn check_reachable(
        &self,
        provider: &dyn PredicateStateProvider,
        instruction: &InstructionRef,
    ) -> Result<SmtResult, CheckerError> {
        let Some(state) = provider.instruction_state(instruction) else {
            debug!(instruction = %instruction, "no predicate state");
            return Ok(SmtResult::unknown(format!(
                "no predicate state for {}",
                instruction
            )));
        };
        self.prepare_and_check(&state)
    }

    /// Run the transformation pipeline over `(state, query)`
    pub fn prepare_state(
        &self,
        state: &PredicateState,
        query: &PredicateState,
    ) -> Result<(PredicateState, PredicateState), CheckerError> {
        self.pipeline
            .apply(self.ctx, state, query)
            .map_err(|e| CheckerError::new(state.clone(), e))
    }

    pub fn prepare_and_check(&self, state: &PredicateState) -> Result<SmtResult, CheckerError> {
        self.run(state, &PredicateState::empty(), CheckMode::Reachable)
    }

    /// Reach the end of `state`, then satisfy `query`
    pub fn check(
        &self,
        state: &PredicateState,
        query: &PredicateState,
    ) -> Result<SmtResult, CheckerError> {
        self.run(state, query, CheckMode::PathPossible)
    }

    /// Reach the end of `state` and `query`'s path with one of `query`'s
    /// requirements failing
    pub fn is_violated(
        &self,
        state: &PredicateState,
        query: &PredicateState,
    ) -> Result<SmtResult, CheckerError> {
        self.run(state, query, CheckMode::Violated)
    }

    fn run(
        &self,
        state: &PredicateState,
        query: &PredicateState,
        mode: CheckMode,
    ) -> Result<SmtResult, CheckerError> {
        let (prepared, prepared_query) = self.prepare_state(state, query)?;
        let smt = &self.ctx.config().smt;
        if smt.log_query {
            info!(mode = ?mode, "prepared state:\n{}\nquery:\n{}", prepared, prepared_query);
        }

        let backend = self
            .factory
            .create()
            .map_err(|e| CheckerError::new(prepared.clone(), e))?;
        let mut solver =
            SmtSolver::new(backend, self.ctx.types()).with_formula_logging(smt.log_formulae);
        let result = match mode {
            CheckMode::Reachable => solver.is_reachable(&prepared),
            CheckMode::PathPossible => solver.is_path_possible(&prepared, &prepared_query),
            CheckMode::Violated => solver.is_violated(&prepared, &prepared_query),
        }
        .map_err(|e| CheckerError::new(prepared.clone(), e))?;

        debug!(
            backend = solver.backend_name(),
            mode = ?mode,
            sat = result.is_sat(),
            known = result.known(),
            "check finished"
        );
        Ok(result)
    }
}
