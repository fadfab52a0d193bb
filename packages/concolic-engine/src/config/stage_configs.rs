//! Section-specific configuration types
//!
//! Each engine section has its own configuration struct with validation.

use super::error::{ConfigError, ConfigResult};
use super::preset::Preset;
use super::validation::Validatable;
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

// ============================================================================
// Solver
// ============================================================================

/// Which backend answers satisfiability queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverBackendKind {
    /// In-process bounded search
    #[default]
    Enumerative,
    /// External SMT-LIB v2 solver process
    Smtlib,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtConfig {
    pub backend: SolverBackendKind,

    /// Inline callee states before solving
    #[serde(default = "default_true")]
    pub ps_inlining: bool,

    /// Partition heap terms into memory spaces
    #[serde(default = "default_true")]
    pub memspacing: bool,

    /// Slice states against the query
    pub slicing: bool,

    /// Log the prepared state and query at info level
    pub log_query: bool,

    /// Log every asserted formula at debug level
    pub log_formulae: bool,

    /// Maximum partial assignments explored by the enumerative backend
    /// (1..=100_000_000)
    pub search_budget: u64,

    /// Command and arguments of the SMT-LIB solver process
    pub solver_command: String,
    pub solver_args: Vec<String>,

    /// Solver timeout in milliseconds (0 = unlimited)
    pub timeout_ms: u64,
}

impl Default for SmtConfig {
    fn default() -> Self {
        Self {
            backend: SolverBackendKind::Enumerative,
            ps_inlining: true,
            memspacing: true,
            slicing: false,
            log_query: false,
            log_formulae: false,
            search_budget: 1_000_000,
            solver_command: "z3".to_string(),
            solver_args: vec!["-in".to_string(), "-smt2".to_string()],
            timeout_ms: 10_000,
        }
    }
}

impl SmtConfig {
    pub fn from_preset(preset: Preset) -> Self {
        match preset {
            Preset::Fast => Self {
                ps_inlining: false,
                search_budget: 100_000,
                timeout_ms: 2_000,
                ..Self::default()
            },
            Preset::Balanced => Self::default(),
            Preset::Thorough => Self {
                slicing: true,
                search_budget: 20_000_000,
                timeout_ms: 60_000,
                ..Self::default()
            },
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.search_budget == 0 || self.search_budget > 100_000_000 {
            return Err(ConfigError::range_with_hint(
                "search_budget",
                self.search_budget,
                1,
                100_000_000,
                "Search budget must be finite and non-zero",
            ));
        }
        if self.backend == SolverBackendKind::Smtlib && self.solver_command.trim().is_empty() {
            return Err(ConfigError::validation(
                "smtlib backend selected but solver_command is empty",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Transformation pipeline
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InliningConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum nested inlining depth (0..=64)
    pub max_depth: usize,

    /// Fully qualified `class.method` names never inlined
    pub ignore: Vec<String>,
}

impl Default for InliningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_depth: 5,
            ignore: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    pub inlining: InliningConfig,

    #[serde(default = "default_true")]
    pub intrinsics: bool,

    #[serde(default = "default_true")]
    pub nullity: bool,

    #[serde(default = "default_true")]
    pub bool_adapter: bool,

    #[serde(default = "default_true")]
    pub float_adapter: bool,

    #[serde(default = "default_true")]
    pub constant_propagation: bool,

    #[serde(default = "default_true")]
    pub optimizer: bool,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            inlining: InliningConfig::default(),
            intrinsics: true,
            nullity: true,
            bool_adapter: true,
            float_adapter: true,
            constant_propagation: true,
            optimizer: true,
        }
    }
}

impl TransformConfig {
    pub fn from_preset(preset: Preset) -> Self {
        match preset {
            Preset::Fast => Self {
                inlining: InliningConfig {
                    enabled: false,
                    ..InliningConfig::default()
                },
                ..Self::default()
            },
            Preset::Balanced => Self::default(),
            Preset::Thorough => Self {
                inlining: InliningConfig {
                    max_depth: 10,
                    ..InliningConfig::default()
                },
                ..Self::default()
            },
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.inlining.max_depth > 64 {
            return Err(ConfigError::range_with_hint(
                "inlining.max_depth",
                self.inlining.max_depth,
                0,
                64,
                "Inlining depth beyond 64 explodes state size",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Concolic exploration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcolicConfig {
    /// Wall-clock budget per explored method in seconds (1..=86400)
    pub time_limit_secs: u64,

    /// Maximum selector iterations per method (0 = unlimited)
    pub max_iterations: usize,

    /// Context length the selector starts from (1..=64)
    pub initial_k: usize,
}

impl Default for ConcolicConfig {
    fn default() -> Self {
        Self {
            time_limit_secs: 100,
            max_iterations: 0,
            initial_k: 1,
        }
    }
}

impl ConcolicConfig {
    pub fn from_preset(preset: Preset) -> Self {
        match preset {
            Preset::Fast => Self {
                time_limit_secs: 10,
                max_iterations: 100,
                ..Self::default()
            },
            Preset::Balanced => Self::default(),
            Preset::Thorough => Self {
                time_limit_secs: 600,
                ..Self::default()
            },
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.time_limit_secs == 0 || self.time_limit_secs > 86_400 {
            return Err(ConfigError::range_with_hint(
                "time_limit_secs",
                self.time_limit_secs,
                1,
                86_400,
                "Per-method budget must be between one second and one day",
            ));
        }
        if self.initial_k == 0 || self.initial_k > 64 {
            return Err(ConfigError::range_with_hint(
                "initial_k",
                self.initial_k,
                1,
                64,
                "Contexts need at least one vertex",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Isolated executor
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Worker process count (1..=64)
    pub workers: usize,

    /// Accept/connect timeout in seconds
    pub connection_timeout_secs: u64,

    /// Per-message send/receive timeout in seconds
    pub communication_timeout_secs: u64,

    pub host: String,

    /// Worker binary and its extra arguments; the master passes
    /// `--host <host> --master-port <port>` ahead of them
    pub worker_command: String,
    pub worker_args: Vec<String>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            connection_timeout_secs: 100,
            communication_timeout_secs: 100,
            host: "127.0.0.1".to_string(),
            worker_command: "concolic-worker".to_string(),
            worker_args: Vec::new(),
        }
    }
}

impl ExecutorConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.workers == 0 || self.workers > 64 {
            return Err(ConfigError::range_with_hint(
                "workers",
                self.workers,
                1,
                64,
                "Need at least one worker process",
            ));
        }
        if self.connection_timeout_secs == 0 {
            return Err(ConfigError::range_with_hint(
                "connection_timeout_secs",
                self.connection_timeout_secs,
                1,
                u64::MAX,
                "A zero connection timeout can never accept a peer",
            ));
        }
        if self.communication_timeout_secs == 0 {
            return Err(ConfigError::range_with_hint(
                "communication_timeout_secs",
                self.communication_timeout_secs,
                1,
                u64::MAX,
                "A zero communication timeout drops every message",
            ));
        }
        Ok(())
    }
}

impl Validatable for SmtConfig {
    fn validate(&self) -> ConfigResult<()> {
        SmtConfig::validate(self)
    }

    fn config_name(&self) -> &'static str {
        "SmtConfig"
    }
}

impl Validatable for TransformConfig {
    fn validate(&self) -> ConfigResult<()> {
        TransformConfig::validate(self)
    }

    fn config_name(&self) -> &'static str {
        "TransformConfig"
    }
}

impl Validatable for ConcolicConfig {
    fn validate(&self) -> ConfigResult<()> {
        ConcolicConfig::validate(self)
    }

    fn config_name(&self) -> &'static str {
        "ConcolicConfig"
    }
}

impl Validatable for ExecutorConfig {
    fn validate(&self) -> ConfigResult<()> {
        ExecutorConfig::validate(self)
    }

    fn config_name(&self) -> &'static str {
        "ExecutorConfig"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_valid() {
        assert!(SmtConfig::default().validate().is_ok());
        assert!(TransformConfig::default().validate().is_ok());
        assert!(ConcolicConfig::default().validate().is_ok());
        assert!(ExecutorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_executor_defaults() {
        let cfg = ExecutorConfig::default();
        assert_eq!(cfg.connection_timeout_secs, 100);
        assert_eq!(cfg.communication_timeout_secs, 100);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let cfg = ExecutorConfig {
            workers: 0,
            ..ExecutorConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Range { .. })));
    }

    #[test]
    fn test_smt_flags_default() {
        let cfg = SmtConfig::default();
        assert!(cfg.ps_inlining);
        assert!(cfg.memspacing);
        assert!(!cfg.slicing);
    }
}
