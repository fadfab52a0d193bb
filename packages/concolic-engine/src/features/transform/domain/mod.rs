//! Transformation domain: the pass interfaces and their errors

pub mod error;
pub mod transformer;

pub use error::PipelineError;
pub use transformer::{PairTransformer, Transformer};
