//! Concolic application layer: path selection and the exploration loop

pub mod explorer;
pub mod selector;

pub use explorer::{ConcolicExplorer, ExplorationReport};
pub use selector::{BfsPathSelector, ContextGuidedSelector, PathSelector};
