//! Runtime configuration and its environment loader.

use std::env;
use std::path::Path;
use std::time::Duration;

use skirmish_core::SchedulerConfig;

use crate::api::{Result, RuntimeError};

/// Runtime configuration shared across the orchestrator and workers.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub scheduler: SchedulerConfig,
    /// Time between two engine ticks.
    pub frame_interval: Duration,
    pub command_buffer_size: usize,
    pub event_buffer_size: usize,
    /// Run hostile detection every frame while out of combat.
    pub auto_scan: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            frame_interval: Duration::from_millis(16),
            command_buffer_size: 32,
            event_buffer_size: 256,
            auto_scan: true,
        }
    }
}

impl RuntimeConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `SKIRMISH_CONFIG` - RON file holding a full scheduler config
    /// - `SKIRMISH_FRAME_MS` - Tick interval in milliseconds (default: 16)
    /// - `SKIRMISH_COMMAND_BUFFER` - Command queue size (default: 32)
    /// - `SKIRMISH_EVENT_BUFFER` - Per-topic event capacity (default: 256)
    /// - `SKIRMISH_SEED` - Initiative seed, overrides the config file
    /// - `SKIRMISH_AUTO_SCAN` - Spot hostiles every frame (default: true)
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(path) = env::var("SKIRMISH_CONFIG") {
            config.scheduler = load_scheduler_config(Path::new(&path))?;
        }
        if let Some(ms) = read_env::<u64>("SKIRMISH_FRAME_MS") {
            config.frame_interval = Duration::from_millis(ms.max(1));
        }
        if let Some(size) = read_env::<usize>("SKIRMISH_COMMAND_BUFFER") {
            config.command_buffer_size = size.max(1);
        }
        if let Some(size) = read_env::<usize>("SKIRMISH_EVENT_BUFFER") {
            config.event_buffer_size = size.max(1);
        }
        if let Some(seed) = read_env::<u64>("SKIRMISH_SEED") {
            config.scheduler.rng_seed = seed;
        }
        if let Some(scan) = read_env::<bool>("SKIRMISH_AUTO_SCAN") {
            config.auto_scan = scan;
        }

        Ok(config)
    }
}

/// Reads a [`SchedulerConfig`] from a RON file. Missing fields keep their
/// defaults.
pub fn load_scheduler_config(path: &Path) -> Result<SchedulerConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        RuntimeError::InvalidConfig(format!("failed to read {}: {}", path.display(), e))
    })?;

    ron::from_str(&content).map_err(|e| {
        RuntimeError::InvalidConfig(format!("failed to parse {}: {}", path.display(), e))
    })
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}
