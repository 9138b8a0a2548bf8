//! Prediction heuristics
//!
//! Produces a best-effort forward insight from the profile and recent event
//! history. Rule-based: trends over the trailing window pick the insight
//! kind, history depth and staleness set the confidence. Thin history
//! degrades to a neutral insight instead of erroring.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::scoring::EngagementScorer;
use crate::types::{EngagementProfile, InsightKind, LearningStyle, PredictionInsight, ReadingEvent};

/// Confidence reported with a neutral (insufficient-history) insight
const NEUTRAL_CONFIDENCE: f64 = 0.2;

/// Event count at which history saturation reaches ~63%
const HISTORY_SATURATION_EVENTS: f64 = 10.0;

/// Trend magnitude treated as a real shift rather than noise
const TREND_EPSILON: f64 = 0.05;

/// Rule-based insight generator
pub struct InsightEngine;

impl InsightEngine {
    /// Generate an insight for a user from their profile and ordered events.
    ///
    /// Never fails on thin history: users below the configured event minimum
    /// (or without a profile at all) get a neutral insight.
    pub fn generate(
        user_id: &str,
        profile: Option<&EngagementProfile>,
        events: &[&ReadingEvent],
        config: &EngineConfig,
        now: DateTime<Utc>,
    ) -> PredictionInsight {
        let Some(profile) = profile else {
            debug!(user_id, "No profile recorded; degrading to neutral insight");
            return neutral_insight(user_id, now);
        };

        match Self::evaluate(profile, events, config) {
            Ok((kind, text)) => {
                let confidence = compute_confidence(
                    profile.events_scored,
                    profile.last_event_at,
                    now,
                    config.confidence_half_life_hours,
                );
                PredictionInsight {
                    user_id: user_id.to_string(),
                    generated_at: now,
                    kind,
                    text,
                    confidence,
                }
            }
            Err(reason) => {
                debug!(user_id, %reason, "Degrading to neutral insight");
                neutral_insight(user_id, now)
            }
        }
    }

    /// Pick an insight kind from history, or fail with `InsufficientData`.
    fn evaluate(
        profile: &EngagementProfile,
        events: &[&ReadingEvent],
        config: &EngineConfig,
    ) -> Result<(InsightKind, String), EngineError> {
        if profile.events_scored < config.min_events_for_insight
            || events.len() < config.min_events_for_insight as usize
        {
            return Err(EngineError::InsufficientData(format!(
                "{} events recorded, {} required",
                events.len(),
                config.min_events_for_insight
            )));
        }

        let window: Vec<&ReadingEvent> = events
            .iter()
            .rev()
            .take(config.trend_window)
            .rev()
            .copied()
            .collect();

        let scores: Vec<f64> = window
            .iter()
            .map(|e| EngagementScorer::score(e, config).engagement_score)
            .collect();
        let pause_rates: Vec<f64> = window
            .iter()
            .map(|e| {
                if e.session_duration_sec <= 0.0 {
                    0.0
                } else {
                    e.pause_duration_sec / e.session_duration_sec
                }
            })
            .collect();
        let completions: Vec<f64> = window
            .iter()
            .map(|e| if e.completed { 1.0 } else { 0.0 })
            .collect();

        let score_trend = half_trend(&scores);
        let pause_trend = half_trend(&pause_rates);
        let completion_trend = half_trend(&completions);
        let recent_completion = recent_mean(&completions);

        // Falling completion outranks everything; rising pauses with steady
        // completion reads as fatigue rather than disengagement.
        let kind = if completion_trend < -2.0 * TREND_EPSILON
            || (score_trend < -TREND_EPSILON && pause_trend <= TREND_EPSILON)
        {
            InsightKind::DisengagementRisk
        } else if pause_trend > TREND_EPSILON && score_trend < TREND_EPSILON {
            InsightKind::Fatigue
        } else if score_trend > TREND_EPSILON && recent_completion >= 0.5 {
            InsightKind::Momentum
        } else if profile.signals.completion_tendency >= 0.5 {
            InsightKind::HabitForming
        } else {
            InsightKind::Neutral
        };

        Ok((kind, insight_text(kind, profile)))
    }
}

/// Neutral fallback when history is too thin for a directional call
fn neutral_insight(user_id: &str, now: DateTime<Utc>) -> PredictionInsight {
    PredictionInsight {
        user_id: user_id.to_string(),
        generated_at: now,
        kind: InsightKind::Neutral,
        text: "Not enough reading history yet for a prediction. Keep reading and \
               insights will appear here."
            .to_string(),
        confidence: NEUTRAL_CONFIDENCE,
    }
}

/// Mean of the second half minus mean of the first half.
///
/// Positive means the metric is rising over the window.
fn half_trend(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mid = values.len() / 2;
    let first = mean(&values[..mid]);
    let second = mean(&values[mid..]);
    second - first
}

/// Mean of the trailing half of the window
fn recent_mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mid = values.len() / 2;
    mean(&values[mid..])
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Confidence from history depth with staleness decay.
///
/// Formula: `(1 - exp(-events / 10)) * 0.5^(age_hours / half_life)`
/// A user with a deep, recent history approaches full confidence; a stale
/// profile decays toward zero no matter how deep the history is.
fn compute_confidence(
    events_scored: u64,
    last_event_at: DateTime<Utc>,
    now: DateTime<Utc>,
    half_life_hours: f64,
) -> f64 {
    let saturation = 1.0 - (-(events_scored as f64) / HISTORY_SATURATION_EVENTS).exp();
    let age_hours = (now - last_event_at).num_seconds().max(0) as f64 / 3600.0;
    let decay = 0.5_f64.powf(age_hours / half_life_hours);
    (saturation * decay).clamp(0.0, 1.0)
}

fn insight_text(kind: InsightKind, profile: &EngagementProfile) -> String {
    let style_hint = match profile.style {
        LearningStyle::DeepReader => "Long focused sessions are working well for you.",
        LearningStyle::Skimmer => "Short, varied sessions seem to be your rhythm.",
        LearningStyle::Explorer => "Tuning your reading atmosphere keeps you engaged.",
        LearningStyle::Undetermined => "Your reading style is still taking shape.",
    };

    match kind {
        InsightKind::Momentum => format!(
            "Your engagement is climbing; you are likely to finish what you start this week. {}",
            style_hint
        ),
        InsightKind::DisengagementRisk => format!(
            "Your recent sessions show declining engagement; shorter sessions or a fresh \
             title may help before the habit slips. {}",
            style_hint
        ),
        InsightKind::Fatigue => format!(
            "Pauses are taking up more of your sessions lately; expect shorter productive \
             stretches and consider more frequent breaks. {}",
            style_hint
        ),
        InsightKind::HabitForming => format!(
            "Your reading cadence is steady; keeping the current pace should cement the \
             habit. {}",
            style_hint
        ),
        InsightKind::Neutral => format!(
            "No clear trend in your recent reading either way. {}",
            style_hint
        ),
    }
}
