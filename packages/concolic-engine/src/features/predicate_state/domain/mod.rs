//! PredicateState domain: the immutable algebra and its builder

pub mod builder;
pub mod state;

pub use builder::StateBuilder;
pub use state::PredicateState;
