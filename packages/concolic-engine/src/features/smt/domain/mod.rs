//! Solver domain: engine interface, opcodes, verdicts and models

pub mod engine;
pub mod error;
pub mod opcode;
pub mod result;

pub use engine::{mask, sign_extend, RawValue, SmtEngine, SolverBackend, Verdict};
pub use error::SmtError;
pub use opcode::Opcode;
pub use result::{MemoryShape, SmtModel, SmtResult};
