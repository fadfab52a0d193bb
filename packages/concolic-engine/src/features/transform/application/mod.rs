//! Pipeline assembly

pub mod pipeline;

pub use pipeline::{Stage, TransformPipeline};
