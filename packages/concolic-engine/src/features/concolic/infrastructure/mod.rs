//! Concolic infrastructure: the execution tree and clause reversal

pub mod execution_tree;
pub mod reverser;

pub use execution_tree::{Context, EdgeKind, ExecutionTree, Vertex};
pub use reverser::ClauseReverser;
