//! Concolic exploration
//!
//! ```text
//! concolic/
//! ├── domain/          # CancellationToken, TestCaseGenerator / TestExecutor ports
//! ├── infrastructure/  # ExecutionTree, ClauseReverser
//! └── application/     # PathSelector strategies, ConcolicExplorer
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{
    BfsPathSelector, ConcolicExplorer, ContextGuidedSelector, ExplorationReport, PathSelector,
};
pub use domain::{CancellationToken, TestCaseGenerator, TestExecutor};
pub use infrastructure::{ClauseReverser, Context, EdgeKind, ExecutionTree, Vertex};
