//! Feature modules - each feature follows Hexagonal Architecture
//!
//! Each feature contains:
//! - domain/         - Pure types and ports (traits)
//! - infrastructure/ - Implementations of the ports
//! - application/    - Use cases wiring the two together

pub mod predicate_state;
pub mod transform;

// Solver abstraction and the Checker facade
pub mod smt;

// ExecutionTree, path selection, exploration loop
pub mod concolic;
