use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use botgrid_sim::DEFAULT_MOVE_LIMIT;
use serde::{Deserialize, Serialize};

/// Limits applied to every attempt. Missing fields in a config file fall
/// back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    pub timeout_ms: u64,
    pub move_limit: u32,
    /// Lua instructions between deadline checks.
    pub hook_interval: u32,
    pub memory_limit_bytes: usize,
    pub record_trace: bool,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            move_limit: DEFAULT_MOVE_LIMIT,
            hook_interval: 1_000,
            memory_limit_bytes: 16 * 1024 * 1024,
            record_trace: false,
        }
    }
}

impl SandboxConfig {
    pub fn from_json_file(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read sandbox config: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse sandbox config: {}", path.display()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
