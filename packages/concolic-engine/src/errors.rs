//! Error types for concolic-engine
//!
//! Solver verdicts (`Sat`/`Unsat`/`Unknown`) are values, not errors; this
//! covers everything that stops a query or an exploration from finishing.

use crate::config::ConfigError;
use crate::features::smt::application::CheckerError;
use crate::features::smt::domain::SmtError;
use crate::features::transform::domain::PipelineError;
use thiserror::Error;

/// Main error type for concolic-engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Transformation pipeline error
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Solver error
    #[error("Solver error: {0}")]
    Smt(#[from] SmtError),

    /// Failure while checking a specific state
    #[error(transparent)]
    Checker(#[from] Box<CheckerError>),

    /// Test generation or execution could not be set up
    #[error("Execution error: {0}")]
    Execution(String),

    /// Exploration was cancelled from outside
    #[error("Exploration cancelled")]
    Cancelled,
}

impl EngineError {
    pub fn execution(msg: impl Into<String>) -> Self {
        EngineError::Execution(msg.into())
    }

    /// State the failing query was run on, if known
    pub fn failed_state(&self) -> Option<&crate::features::predicate_state::PredicateState> {
        match self {
            EngineError::Checker(err) => Some(&err.state),
            _ => None,
        }
    }
}

impl From<CheckerError> for EngineError {
    fn from(err: CheckerError) -> Self {
        EngineError::Checker(Box::new(err))
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
