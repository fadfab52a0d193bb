//! Transformation passes

pub mod bool_adapter;
pub mod constant_propagator;
pub mod float_adapter;
pub mod inliner;
pub mod intrinsics;
pub mod memory_spacer;
pub mod nullity;
pub mod optimizer;
pub mod slicer;
pub mod union_find;

pub use bool_adapter::BoolTypeAdapter;
pub use constant_propagator::ConstantPropagator;
pub use float_adapter::FloatTypeAdapter;
pub use inliner::MethodInliner;
pub use intrinsics::{Intrinsic, IntrinsicAdapter};
pub use memory_spacer::MemorySpacer;
pub use nullity::NullityAnnotator;
pub use optimizer::Optimizer;
pub use slicer::Slicer;
