//! SMT layer
//!
//! ```text
//! smt
//! ├── domain/          # SmtEngine / SolverBackend ports, Opcode, SmtResult, SmtModel
//! ├── infrastructure/  # AstEngine, SMT-LIB codec, backends, StateConverter, SmtSolver
//! └── application/     # Checker
//! ```
//!
//! Adding a backend means implementing `SolverBackend` over some
//! `SmtEngine`; nothing above the solver needs to change.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{
    BackendFactory, Checker, CheckerError, ConfiguredBackendFactory, PredicateStateProvider,
};
pub use domain::{
    MemoryShape, Opcode, RawValue, SmtEngine, SmtError, SmtModel, SmtResult, SolverBackend,
    Verdict,
};
pub use infrastructure::{AstEngine, EnumerativeBackend, SmtLibBackend, SmtSolver, StateConverter};
