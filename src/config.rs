//! Engine configuration
//!
//! Scoring weights and heuristic thresholds are product decisions, not
//! algorithmic ones; they are exposed here instead of being hard-coded in the
//! scoring path. Invalid weight sets are rejected at load time.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Weights for the per-event engagement score
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Reward for finishing the content
    pub completion: f64,
    /// Reward for time spent reading (saturating)
    pub duration: f64,
    /// Penalty weight for pause frequency
    pub pause: f64,
    /// Penalty weight for time spent paused
    pub dwell: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            completion: 0.45,
            duration: 0.35,
            pause: 0.12,
            dwell: 0.08,
        }
    }
}

/// Engine-wide configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub weights: ScoringWeights,
    /// Session duration (seconds) at which the duration reward reaches ~63%
    pub duration_target_sec: f64,
    /// EMA factor for blending learning signals, in (0, 1]
    pub signal_smoothing: f64,
    /// Sessions needed before a style classification is attempted
    pub min_sessions_for_style: u64,
    /// Events needed before a non-neutral insight is produced
    pub min_events_for_insight: u64,
    /// Half-life (hours) for insight confidence decay since last activity
    pub confidence_half_life_hours: f64,
    /// Trailing events examined by the trend heuristics
    pub trend_window: usize,
    /// Leaderboard size when the caller does not pass a limit
    pub default_leaderboard_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            duration_target_sec: 1200.0,
            signal_smoothing: 0.3,
            min_sessions_for_style: 3,
            min_events_for_insight: 5,
            confidence_half_life_hours: 72.0,
            trend_window: 10,
            default_leaderboard_limit: 10,
        }
    }
}

impl EngineConfig {
    /// Check the configuration for values the engine cannot score with
    pub fn validate(&self) -> Result<(), EngineError> {
        let w = &self.weights;
        for (name, value) in [
            ("completion", w.completion),
            ("duration", w.duration),
            ("pause", w.pause),
            ("dwell", w.dwell),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(EngineError::Config(format!(
                    "Weight '{}' must be finite and non-negative, got {}",
                    name, value
                )));
            }
        }
        if w.completion + w.duration <= 0.0 {
            return Err(EngineError::Config(
                "At least one reward weight must be positive".to_string(),
            ));
        }
        if !self.duration_target_sec.is_finite() || self.duration_target_sec <= 0.0 {
            return Err(EngineError::Config(format!(
                "duration_target_sec must be positive, got {}",
                self.duration_target_sec
            )));
        }
        if !(self.signal_smoothing > 0.0 && self.signal_smoothing <= 1.0) {
            return Err(EngineError::Config(format!(
                "signal_smoothing must be in (0, 1], got {}",
                self.signal_smoothing
            )));
        }
        if !self.confidence_half_life_hours.is_finite() || self.confidence_half_life_hours <= 0.0 {
            return Err(EngineError::Config(format!(
                "confidence_half_life_hours must be positive, got {}",
                self.confidence_half_life_hours
            )));
        }
        if self.trend_window < 2 {
            return Err(EngineError::Config(
                "trend_window must be at least 2".to_string(),
            ));
        }
        Ok(())
    }

    /// Load and validate a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut config = EngineConfig::default();
        config.weights.pause = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_reward_weights_rejected() {
        let mut config = EngineConfig::default();
        config.weights.completion = 0.0;
        config.weights.duration = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_smoothing_bounds() {
        let mut config = EngineConfig::default();
        config.signal_smoothing = 0.0;
        assert!(config.validate().is_err());

        config.signal_smoothing = 1.0;
        assert!(config.validate().is_ok());

        config.signal_smoothing = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json(r#"{"duration_target_sec": 600.0}"#).unwrap();
        assert_eq!(config.duration_target_sec, 600.0);
        assert_eq!(config.weights.completion, 0.45);
        assert_eq!(config.trend_window, 10);
    }

    #[test]
    fn test_invalid_json_weights_rejected() {
        let result = EngineConfig::from_json(r#"{"weights": {"completion": -1.0}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = EngineConfig::default();
        let json = config.to_json().unwrap();
        let loaded = EngineConfig::from_json(&json).unwrap();
        assert_eq!(loaded.duration_target_sec, config.duration_target_sec);
        assert_eq!(loaded.weights.dwell, config.weights.dwell);
    }
}
