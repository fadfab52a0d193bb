//! Solver infrastructure: the in-crate expression AST, SMT-LIB printing and
//! parsing, bundled backends and the state-to-formula converter

pub mod ast;
pub mod converter;
pub mod smtlib;
pub mod solver;
pub mod solvers;

pub use ast::{AstEngine, SmtExpr, Sort};
pub use converter::{MemoryKey, StateConverter};
pub use solver::{value_term, SmtSolver};
pub use solvers::{EnumerativeBackend, SmtLibBackend};
