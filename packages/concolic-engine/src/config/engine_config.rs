//! Top-level engine configuration
//!
//! ```yaml
//! version: 1
//! preset: balanced
//! smt:
//!   slicing: true
//! executor:
//!   workers: 4
//! ```
//!
//! Loading starts from the named preset and deep-merges the YAML document
//! over it, so a file only lists the fields it changes.

use super::error::{ConfigError, ConfigResult};
use super::preset::Preset;
use super::stage_configs::{ConcolicConfig, ExecutorConfig, SmtConfig, TransformConfig};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::path::Path;

pub const SUPPORTED_VERSIONS: &[u32] = &[1];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub version: u32,
    pub preset: Preset,
    pub smt: SmtConfig,
    pub transform: TransformConfig,
    pub concolic: ConcolicConfig,
    pub executor: ExecutorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::preset(Preset::Balanced)
    }
}

impl EngineConfig {
    pub fn preset(preset: Preset) -> Self {
        Self {
            version: 1,
            preset,
            smt: SmtConfig::from_preset(preset),
            transform: TransformConfig::from_preset(preset),
            concolic: ConcolicConfig::from_preset(preset),
            executor: ExecutorConfig::default(),
        }
    }

    /// Parse, layer over the named preset, and validate
    pub fn from_yaml(content: &str) -> ConfigResult<Self> {
        let overlay: Value = serde_yaml::from_str(content)?;

        let version = overlay
            .get("version")
            .and_then(Value::as_u64)
            .map(|v| v as u32)
            .unwrap_or(1);
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(ConfigError::UnsupportedVersion {
                found: version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }

        let preset = match overlay.get("preset").and_then(Value::as_str) {
            Some(name) => {
                Preset::from_str(name).map_err(|_| ConfigError::UnknownPreset(name.to_string()))?
            }
            None => Preset::default(),
        };

        let mut base = serde_yaml::to_value(Self::preset(preset))?;
        merge_yaml(&mut base, overlay);
        let config: Self = serde_yaml::from_value(base)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.smt.validate()?;
        self.transform.validate()?;
        self.concolic.validate()?;
        self.executor.validate()?;

        let budget_ms = self.concolic.time_limit_secs.saturating_mul(1000);
        if self.smt.timeout_ms > budget_ms {
            return Err(ConfigError::validation(format!(
                "smt.timeout_ms ({}) exceeds the per-method budget ({} ms)",
                self.smt.timeout_ms, budget_ms
            )));
        }
        Ok(())
    }
}

/// Recursively overlay mappings; scalars and sequences replace
fn merge_yaml(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(slot) => merge_yaml(slot, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
