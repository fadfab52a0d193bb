//! Engine configuration
//!
//! YAML-backed configuration with presets and per-section validation:
//! - `smt`: solver backend and pipeline flags
//! - `transform`: per-pass switches and inlining limits
//! - `concolic`: per-method exploration budget
//! - `executor`: worker pool size and transport timeouts

pub mod engine_config;
pub mod error;
pub mod preset;
pub mod stage_configs;
pub mod validation;

pub use engine_config::EngineConfig;
pub use error::{ConfigError, ConfigResult};
pub use preset::Preset;
pub use stage_configs::{
    ConcolicConfig, ExecutorConfig, InliningConfig, SmtConfig, SolverBackendKind, TransformConfig,
};
pub use validation::Validatable;
