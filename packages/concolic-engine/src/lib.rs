/*
 * Concolic Engine - symbolic side of a concolic test generator
 *
 * Feature-First Hexagonal Architecture:
 * - shared/      : Leaf models (Term, Predicate, Clause, SymbolicState)
 * - features/    : Vertical slices (predicate_state → transform → smt → concolic)
 * - config/      : YAML configuration, presets, validation
 * - context.rs   : AnalysisContext passed to every component
 *
 * The executor side (worker processes, wire protocol) lives in the
 * concolic-executor crate and plugs in through the TestExecutor port.
 */

// Crate-level lint configuration
#![allow(clippy::too_many_arguments)] // Transformer hooks mirror the term shape
#![allow(clippy::type_complexity)] // Pair results of (state, query)
#![allow(clippy::new_without_default)] // Passes are constructed explicitly
#![allow(clippy::module_inception)] // Module naming intentional
#![allow(clippy::should_implement_trait)] // `drop`/`take` on PredicateState are algebra names
#![allow(clippy::upper_case_acronyms)] // SMT opcode naming
#![allow(clippy::match_like_matches_macro)] // Match for readability
#![allow(clippy::collapsible_match)] // Match clarity
#![allow(clippy::single_match)] // Single match for readability

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports - Feature-First Architecture
// ═══════════════════════════════════════════════════════════════════════════

/// Shared models
pub mod shared;

/// Feature modules
pub mod features;

/// Configuration system
pub mod config;

/// Analysis context
pub mod context;

/// Error types
pub mod errors;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports for Public API
// ═══════════════════════════════════════════════════════════════════════════

pub use config::{EngineConfig, Preset};
pub use context::AnalysisContext;
pub use errors::{EngineError, Result};
pub use features::concolic::{
    BfsPathSelector, CancellationToken, ConcolicExplorer, ContextGuidedSelector,
    ExecutionTree, ExplorationReport, PathSelector, TestCaseGenerator, TestExecutor,
};
pub use features::predicate_state::{PredicateState, StateBuilder};
pub use features::smt::{Checker, CheckerError, SmtModel, SmtResult};
pub use features::transform::TransformPipeline;
