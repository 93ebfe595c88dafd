//! Engine configuration.
//!
//! Loaded from JSON; every field has a default so a partial file (or none
//! at all) is valid.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tuning of the IK priority scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityConfig {
    /// Accumulated priority at which an entity is admitted.
    pub threshold: f32,
    /// Lower bound of the per-tick accumulation rate of a visible entity.
    pub min_rate: f32,
    /// Upper bound of the per-tick accumulation rate.
    pub max_rate: f32,
    /// Squared camera distance at which the unclamped rate equals `dt`.
    pub max_squared_distance: f32,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            min_rate: 0.01,
            max_rate: 0.1,
            max_squared_distance: 25.0 * 25.0,
        }
    }
}

impl PriorityConfig {
    /// Per-tick accumulation rate of a visible entity at `squared_distance`
    /// from the camera.
    #[must_use]
    pub fn rate(&self, squared_distance: f32, dt: f32) -> f32 {
        if squared_distance <= 0.0 || squared_distance.is_nan() {
            return self.max_rate;
        }
        ((self.max_squared_distance / squared_distance) * dt).clamp(self.min_rate, self.max_rate)
    }
}

/// Root configuration of an engine process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Target ticks per second.
    pub tick_rate: u32,
    /// Maximum number of ticks to run (0 = unlimited).
    pub max_ticks: u64,
    /// Capacity of the frame buffer. Component updates that do not fit wait
    /// for a later frame.
    pub max_frame_bytes: usize,
    pub priority: PriorityConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            max_ticks: 0,
            max_frame_bytes: 64 * 1024,
            priority: PriorityConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    /// Seconds per tick.
    #[must_use]
    pub fn tick_seconds(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    /// Wall-clock duration of one tick.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate.max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.max_frame_bytes, 65536);
    }

    #[test]
    fn test_partial_priority_section() {
        let config =
            EngineConfig::from_json_str(r#"{"tick_rate": 30, "priority": {"threshold": 0.5}}"#)
                .unwrap();
        assert_eq!(config.tick_rate, 30);
        assert_eq!(config.priority.threshold, 0.5);
        assert_eq!(config.priority.max_rate, 0.1);
    }

    #[test]
    fn test_rate_is_clamped() {
        let p = PriorityConfig::default();
        assert_eq!(p.rate(1.0, 0.1), p.max_rate);
        assert_eq!(p.rate(1.0e9, 0.1), p.min_rate);
        assert!((p.rate(2500.0, 0.1) - 0.025).abs() < 1e-6);
    }

    #[test]
    fn test_rate_at_camera_position() {
        let p = PriorityConfig::default();
        assert_eq!(p.rate(0.0, 0.016), p.max_rate);
    }

    #[test]
    fn test_tick_interval() {
        let config = EngineConfig {
            tick_rate: 50,
            ..EngineConfig::default()
        };
        assert_eq!(config.tick_interval(), Duration::from_millis(20));
        assert!((config.tick_seconds() - 0.02).abs() < 1e-7);
    }
}
