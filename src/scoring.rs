//! Engagement scoring
//!
//! Computes per-session interaction patterns and the engagement score that
//! feeds the rolling per-user aggregate. All weights come from configuration.

use crate::config::{EngineConfig, ScoringWeights};
use crate::types::{LearningSignals, LearningStyle, ReadingEvent, SessionPatterns};

/// Pauses per minute at which the pause load reaches ~63%
const PAUSE_LOAD_SCALE_PER_MIN: f64 = 0.5;

/// Speed changes per minute at which tempo variability reaches ~63%
const TEMPO_SCALE_PER_MIN: f64 = 0.5;

/// Atmosphere changes per minute at which environment sensitivity reaches ~63%
const ATMOSPHERE_SCALE_PER_MIN: f64 = 0.3;

/// Scorer for reading-session events
pub struct EngagementScorer;

impl EngagementScorer {
    /// Derive session patterns and the engagement score for one event
    pub fn score(event: &ReadingEvent, config: &EngineConfig) -> SessionPatterns {
        let pauses_per_min = per_minute(event.pause_count, event.session_duration_sec);
        let pause_time_ratio =
            compute_pause_time_ratio(event.pause_duration_sec, event.session_duration_sec);
        let speed_changes_per_min = per_minute(event.speed_changes, event.session_duration_sec);
        let atmosphere_changes_per_min =
            per_minute(event.atmosphere_changes, event.session_duration_sec);

        let engagement_score = compute_engagement_score(
            event.completed,
            compute_duration_reward(event.session_duration_sec, config.duration_target_sec),
            compute_pause_load(pauses_per_min),
            pause_time_ratio,
            &config.weights,
        );

        SessionPatterns {
            pauses_per_min,
            pause_time_ratio,
            speed_changes_per_min,
            atmosphere_changes_per_min,
            engagement_score,
        }
    }

    /// Instantaneous learning signals for one event, before blending
    pub fn instant_signals(event: &ReadingEvent, patterns: &SessionPatterns) -> LearningSignals {
        LearningSignals {
            focus: compute_focus(patterns.pauses_per_min, patterns.pause_time_ratio),
            tempo_variability: saturate(patterns.speed_changes_per_min, TEMPO_SCALE_PER_MIN),
            environment_sensitivity: saturate(
                patterns.atmosphere_changes_per_min,
                ATMOSPHERE_SCALE_PER_MIN,
            ),
            completion_tendency: if event.completed { 1.0 } else { 0.0 },
        }
    }

    /// Blend new signals into the running profile signals.
    ///
    /// Exponential moving average: `blended = alpha * instant + (1 - alpha) * prev`
    pub fn blend_signals(
        previous: &LearningSignals,
        instant: &LearningSignals,
        alpha: f64,
    ) -> LearningSignals {
        LearningSignals {
            focus: ema(previous.focus, instant.focus, alpha),
            tempo_variability: ema(previous.tempo_variability, instant.tempo_variability, alpha),
            environment_sensitivity: ema(
                previous.environment_sensitivity,
                instant.environment_sensitivity,
                alpha,
            ),
            completion_tendency: ema(
                previous.completion_tendency,
                instant.completion_tendency,
                alpha,
            ),
        }
    }

    /// Classify the dominant learning style from blended signals
    pub fn classify(signals: &LearningSignals, sessions: u64, min_sessions: u64) -> LearningStyle {
        if sessions < min_sessions {
            return LearningStyle::Undetermined;
        }

        if signals.completion_tendency >= 0.6 && signals.focus >= 0.5 {
            LearningStyle::DeepReader
        } else if signals.tempo_variability >= 0.45 && signals.completion_tendency < 0.5 {
            LearningStyle::Skimmer
        } else if signals.environment_sensitivity >= 0.45 {
            LearningStyle::Explorer
        } else if signals.completion_tendency >= 0.6 {
            LearningStyle::DeepReader
        } else {
            LearningStyle::Undetermined
        }
    }
}

/// Events per minute of session time
fn per_minute(count: u32, duration_sec: f64) -> f64 {
    if duration_sec <= 0.0 {
        return 0.0;
    }
    count as f64 / (duration_sec / 60.0)
}

/// Exponential saturation: `1 - exp(-value / scale)`
fn saturate(value: f64, scale: f64) -> f64 {
    (1.0 - (-value / scale).exp()).clamp(0.0, 1.0)
}

/// Compute the duration reward using exponential saturation
///
/// Formula: `1 - exp(-duration / target)`
/// A session at the target duration earns ~63% of the reward, approaching
/// 1.0 asymptotically for marathon sessions.
fn compute_duration_reward(duration_sec: f64, target_sec: f64) -> f64 {
    if duration_sec <= 0.0 {
        return 0.0;
    }
    saturate(duration_sec, target_sec)
}

/// Compute the pause load using exponential saturation
///
/// Formula: `1 - exp(-pauses_per_min / 0.5)`
/// One pause every two minutes maps to ~63% load.
fn compute_pause_load(pauses_per_min: f64) -> f64 {
    saturate(pauses_per_min, PAUSE_LOAD_SCALE_PER_MIN)
}

/// Fraction of the session spent paused
fn compute_pause_time_ratio(pause_duration_sec: f64, session_duration_sec: f64) -> f64 {
    if session_duration_sec <= 0.0 {
        return 0.0;
    }
    (pause_duration_sec / session_duration_sec).clamp(0.0, 1.0)
}

/// Sustained attention: inverse of the combined pause signals
///
/// Formula: `1 - (0.7 * pause_load + 0.3 * pause_time_ratio)`
fn compute_focus(pauses_per_min: f64, pause_time_ratio: f64) -> f64 {
    let pause_load = compute_pause_load(pauses_per_min);
    (1.0 - (0.7 * pause_load + 0.3 * pause_time_ratio)).clamp(0.0, 1.0)
}

/// Compute the engagement score for one session (0-1)
///
/// Formula:
/// ```text
/// score = completion_weight * completed
///       + duration_weight   * duration_reward
///       - pause_weight      * pause_load
///       - dwell_weight      * pause_time_ratio
/// ```
/// The score strictly increases with completion and strictly decreases with
/// pause count for any positive weight set that keeps the result off the
/// clamp floor.
fn compute_engagement_score(
    completed: bool,
    duration_reward: f64,
    pause_load: f64,
    pause_time_ratio: f64,
    weights: &ScoringWeights,
) -> f64 {
    let reward = weights.completion * if completed { 1.0 } else { 0.0 }
        + weights.duration * duration_reward;
    let penalty = weights.pause * pause_load + weights.dwell * pause_time_ratio;
    (reward - penalty).clamp(0.0, 1.0)
}

/// Exponential moving average step
fn ema(previous: f64, current: f64, alpha: f64) -> f64 {
    alpha * current + (1.0 - alpha) * previous
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_event(
        duration_sec: f64,
        completed: bool,
        pause_count: u32,
        pause_duration_sec: f64,
    ) -> ReadingEvent {
        ReadingEvent {
            event_id: "evt".to_string(),
            user_id: "user".to_string(),
            content_id: "book".to_string(),
            session_duration_sec: duration_sec,
            completed,
            pause_count,
            pause_duration_sec,
            speed_changes: 0,
            atmosphere_changes: 0,
            timestamp: Utc::now(),
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_per_minute() {
        // 2 pauses in 10 minutes = 0.2/min
        assert!((per_minute(2, 600.0) - 0.2).abs() < 0.001);
        assert_eq!(per_minute(5, 0.0), 0.0);
    }

    #[test]
    fn test_duration_reward_saturates() {
        // At the target, reward is ~63% (1 - e^-1)
        let at_target = compute_duration_reward(1200.0, 1200.0);
        assert!((at_target - 0.632).abs() < 0.01);

        // Long sessions approach 1
        assert!(compute_duration_reward(12000.0, 1200.0) > 0.99);

        assert_eq!(compute_duration_reward(0.0, 1200.0), 0.0);
    }

    #[test]
    fn test_pause_load() {
        assert!((compute_pause_load(0.0) - 0.0).abs() < 0.001);

        // 0.5 pauses/min maps to ~63% load
        assert!((compute_pause_load(0.5) - 0.632).abs() < 0.01);

        assert!(compute_pause_load(5.0) > 0.99);
    }

    #[test]
    fn test_pause_time_ratio() {
        assert!((compute_pause_time_ratio(45.0, 900.0) - 0.05).abs() < 0.001);
        assert_eq!(compute_pause_time_ratio(10.0, 0.0), 0.0);
        assert_eq!(compute_pause_time_ratio(120.0, 60.0), 1.0);
    }

    #[test]
    fn test_score_increases_with_completion() {
        let config = EngineConfig::default();

        let incomplete = make_event(900.0, false, 1, 30.0);
        let complete = make_event(900.0, true, 1, 30.0);

        let incomplete_score = EngagementScorer::score(&incomplete, &config).engagement_score;
        let complete_score = EngagementScorer::score(&complete, &config).engagement_score;

        assert!(complete_score > incomplete_score);
        assert!(
            (complete_score - incomplete_score - config.weights.completion).abs() < 0.001
        );
    }

    #[test]
    fn test_score_decreases_with_pause_count() {
        let config = EngineConfig::default();

        // Completed sessions with 0, 1, 2 pauses: score strictly decreases
        let scores: Vec<f64> = (0..3u32)
            .map(|pauses| {
                let event = make_event(900.0, true, pauses, 0.0);
                EngagementScorer::score(&event, &config).engagement_score
            })
            .collect();

        assert!(scores[0] > scores[1]);
        assert!(scores[1] > scores[2]);
    }

    #[test]
    fn test_score_bounds() {
        let config = EngineConfig::default();

        // Worst case: zero-length session, maximum pause signals
        let bad = make_event(0.0, false, 100, 0.0);
        let bad_score = EngagementScorer::score(&bad, &config).engagement_score;
        assert!((0.0..=1.0).contains(&bad_score));

        // Best case: long completed session without pauses
        let good = make_event(7200.0, true, 0, 0.0);
        let good_score = EngagementScorer::score(&good, &config).engagement_score;
        assert!((0.0..=1.0).contains(&good_score));
        assert!(good_score > 0.7);
    }

    #[test]
    fn test_instant_signals() {
        let config = EngineConfig::default();
        let mut event = make_event(600.0, true, 0, 0.0);
        event.speed_changes = 5;
        event.atmosphere_changes = 4;

        let patterns = EngagementScorer::score(&event, &config);
        let signals = EngagementScorer::instant_signals(&event, &patterns);

        assert_eq!(signals.completion_tendency, 1.0);
        // No pauses at all: full focus
        assert!((signals.focus - 1.0).abs() < 0.001);
        // 0.5 speed changes/min saturates to ~63%
        assert!((signals.tempo_variability - 0.632).abs() < 0.01);
        assert!(signals.environment_sensitivity > signals.tempo_variability);
    }

    #[test]
    fn test_blend_signals_ema() {
        let previous = LearningSignals {
            focus: 0.8,
            tempo_variability: 0.2,
            environment_sensitivity: 0.1,
            completion_tendency: 1.0,
        };
        let instant = LearningSignals {
            focus: 0.4,
            tempo_variability: 0.6,
            environment_sensitivity: 0.1,
            completion_tendency: 0.0,
        };

        let blended = EngagementScorer::blend_signals(&previous, &instant, 0.3);

        assert!((blended.focus - (0.3 * 0.4 + 0.7 * 0.8)).abs() < 0.001);
        assert!((blended.completion_tendency - 0.7).abs() < 0.001);
        assert!((blended.environment_sensitivity - 0.1).abs() < 0.001);
    }

    #[test]
    fn test_classify_requires_history() {
        let signals = LearningSignals {
            focus: 0.9,
            tempo_variability: 0.1,
            environment_sensitivity: 0.1,
            completion_tendency: 0.9,
        };
        assert_eq!(
            EngagementScorer::classify(&signals, 2, 3),
            LearningStyle::Undetermined
        );
        assert_eq!(
            EngagementScorer::classify(&signals, 3, 3),
            LearningStyle::DeepReader
        );
    }

    #[test]
    fn test_classify_styles() {
        let skimmer = LearningSignals {
            focus: 0.6,
            tempo_variability: 0.7,
            environment_sensitivity: 0.2,
            completion_tendency: 0.2,
        };
        assert_eq!(
            EngagementScorer::classify(&skimmer, 5, 3),
            LearningStyle::Skimmer
        );

        let explorer = LearningSignals {
            focus: 0.4,
            tempo_variability: 0.2,
            environment_sensitivity: 0.8,
            completion_tendency: 0.5,
        };
        assert_eq!(
            EngagementScorer::classify(&explorer, 5, 3),
            LearningStyle::Explorer
        );
    }
}
