//! PredicateState transformation
//!
//! ```text
//! transform
//! ├── domain/          # Transformer / PairTransformer hooks, PipelineError
//! ├── infrastructure/  # the passes
//! └── application/     # TransformPipeline (fixed stage order)
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{Stage, TransformPipeline};
pub use domain::{PairTransformer, PipelineError, Transformer};
pub use infrastructure::{
    BoolTypeAdapter, ConstantPropagator, FloatTypeAdapter, IntrinsicAdapter, MemorySpacer,
    MethodInliner, NullityAnnotator, Optimizer, Slicer,
};
