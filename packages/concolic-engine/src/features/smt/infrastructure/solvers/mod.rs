//! Bundled `SolverBackend` implementations

pub mod enumerative;
pub mod process;

pub use enumerative::EnumerativeBackend;
pub use process::SmtLibBackend;
