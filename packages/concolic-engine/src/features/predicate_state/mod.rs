//! Predicate-state algebra
//!
//! Immutable Basic/Chain/Choice trees with map/filter/reverse/slice/simplify
//! and a `StateBuilder` for incremental assembly.

pub mod domain;

pub use domain::{PredicateState, StateBuilder};
