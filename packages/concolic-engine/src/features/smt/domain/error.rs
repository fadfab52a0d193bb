//! Solver-layer errors. Sat/Unsat/Unknown are results, not errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SmtError {
    #[error("Sort mismatch in {op}: {lhs} vs {rhs}")]
    SortMismatch {
        op: String,
        lhs: String,
        rhs: String,
    },

    #[error("Unsupported construct: {0}")]
    Unsupported(String),

    #[error("Solver process error: {0}")]
    Process(String),

    #[error("Failed to parse solver output: {0}")]
    Parse(String),

    #[error("Solver I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SmtError {
    pub fn sort_mismatch(op: impl ToString, lhs: impl ToString, rhs: impl ToString) -> Self {
        Self::SortMismatch {
            op: op.to_string(),
            lhs: lhs.to_string(),
            rhs: rhs.to_string(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    pub fn process(msg: impl Into<String>) -> Self {
        Self::Process(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}
