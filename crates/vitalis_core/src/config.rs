use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VitalisConfig {
    pub engine: EngineConfig,
    pub interpretation: InterpretationConfig,
    pub feedback: FeedbackConfig,
    pub homeostasis: HomeostasisConfig,
}

impl VitalisConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: VitalisConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Try to load from path; if file doesn't exist, return defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("VITALIS_TICK_INTERVAL_MS") {
            if let Ok(n) = v.parse() {
                self.engine.tick_interval_ms = n;
            }
        }
        if let Ok(v) = std::env::var("VITALIS_SNAPSHOT_EVERY") {
            if let Ok(n) = v.parse() {
                self.engine.snapshot_every_ticks = n;
            }
        }
        if let Ok(v) = std::env::var("VITALIS_SNAPSHOT_DIR") {
            self.engine.snapshot_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("VITALIS_SNAPSHOT_RETAIN") {
            if let Ok(n) = v.parse() {
                self.engine.snapshot_retain = n;
            }
        }
        if let Ok(v) = std::env::var("VITALIS_QUEUE_CAPACITY") {
            if let Ok(n) = v.parse() {
                self.engine.queue_capacity = n;
            }
        }
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Wall-clock cadence of the tick loop
    pub tick_interval_ms: u64,
    /// Persist a snapshot every N ticks (0 disables persistence)
    pub snapshot_every_ticks: u64,
    pub snapshot_dir: PathBuf,
    /// Newest snapshot files kept on disk (0 keeps all)
    pub snapshot_retain: usize,
    /// Stimuli beyond this many queued are dropped
    pub queue_capacity: usize,
    /// Integrity lost when a tick body fails
    pub tick_failure_penalty: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            snapshot_every_ticks: 10,
            snapshot_dir: PathBuf::from("snapshots"),
            snapshot_retain: 5,
            queue_capacity: 100,
            tick_failure_penalty: 0.05,
        }
    }
}

impl EngineConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InterpretationConfig {
    /// Below this significance a stimulus is ignored
    pub significance_floor: f32,
}

impl Default for InterpretationConfig {
    fn default() -> Self {
        Self { significance_floor: 0.1 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    pub min_delay_ticks: u32,
    pub max_delay_ticks: u32,
    /// Pending reactions waiting longer than this are dropped
    pub max_wait_ticks: u32,
    pub noise_threshold: f32,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            min_delay_ticks: 3,
            max_delay_ticks: 10,
            max_wait_ticks: 20,
            noise_threshold: 0.001,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HomeostasisConfig {
    /// Fraction of a dimension's range at or below which it counts as depleted
    pub low_resource_threshold: f32,
    /// Fraction of range lost per second while any dimension is depleted
    pub degradation_per_sec: f32,
    pub dampen_vitality_cost: f32,
    pub activation_top_n: usize,
    /// Activated memory above this significance forces a dampen
    pub activation_threshold: f32,
}

impl Default for HomeostasisConfig {
    fn default() -> Self {
        Self {
            low_resource_threshold: 0.05,
            degradation_per_sec: 0.01,
            dampen_vitality_cost: 0.01,
            activation_top_n: 3,
            activation_threshold: 0.5,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
