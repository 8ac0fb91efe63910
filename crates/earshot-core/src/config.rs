//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::constants::{DRIFT_TOLERANCE, PITCH_EPSILON};
use crate::error::{Error, Result};
use crate::math::Pose;

/// What a bounded proxy pool does when every proxy is lent out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionPolicy {
    /// Refuse the request; the requesting voice stays idle and its sound is dropped.
    #[default]
    Refuse,
    /// Take the proxy that was lent out the longest ago.
    StealOldest,
}

/// Proxy pool sizing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum number of proxies (None for unbounded growth).
    pub capacity: Option<usize>,
    /// Policy once `capacity` proxies are lent out.
    pub on_exhausted: ExhaustionPolicy,
}

impl PoolConfig {
    /// Pool that grows on demand.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            capacity: None,
            on_exhausted: ExhaustionPolicy::Refuse,
        }
    }

    /// Pool limited to `capacity` proxies.
    #[must_use]
    pub const fn bounded(capacity: usize, on_exhausted: ExhaustionPolicy) -> Self {
        Self {
            capacity: Some(capacity),
            on_exhausted,
        }
    }
}

/// Virtual audio configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VirtualAudioConfig {
    /// Pose of the reference-frame anchor hosting the native listener.
    pub anchor: Pose,
    /// Proxy pool sizing.
    pub pool: PoolConfig,
    /// Playhead difference (seconds) that triggers drift correction.
    pub drift_tolerance: f32,
    /// Smallest pitch magnitude used for one-shot duration estimates.
    pub pitch_epsilon: f32,
}

impl Default for VirtualAudioConfig {
    fn default() -> Self {
        Self {
            anchor: Pose::IDENTITY,
            pool: PoolConfig::unbounded(),
            drift_tolerance: DRIFT_TOLERANCE,
            pitch_epsilon: PITCH_EPSILON,
        }
    }
}

impl VirtualAudioConfig {
    /// Create a config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML, filling missing fields with defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a TOML file.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Set the anchor pose.
    #[must_use]
    pub const fn with_anchor(mut self, anchor: Pose) -> Self {
        self.anchor = anchor;
        self
    }

    /// Set the pool configuration.
    #[must_use]
    pub const fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    /// Set the drift tolerance.
    #[must_use]
    pub const fn with_drift_tolerance(mut self, seconds: f32) -> Self {
        self.drift_tolerance = seconds;
        self
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.pool.capacity == Some(0) {
            return Err(Error::Config("pool capacity must be at least 1".to_string()));
        }
        if self.drift_tolerance.is_nan() || self.drift_tolerance < 0.0 {
            return Err(Error::Config(format!(
                "drift_tolerance must be non-negative, got {}",
                self.drift_tolerance
            )));
        }
        if self.pitch_epsilon.is_nan() || self.pitch_epsilon <= 0.0 {
            return Err(Error::Config(format!(
                "pitch_epsilon must be positive, got {}",
                self.pitch_epsilon
            )));
        }
        Ok(())
    }
}
