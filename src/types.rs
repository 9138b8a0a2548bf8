//! Core types for the readpulse engine
//!
//! This module defines the data structures that flow through each stage of the
//! engine: recorded events, per-session patterns, rolling profiles, leaderboard
//! projections, and prediction insights.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Ranking time window for leaderboard queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Daily,
    Weekly,
    AllTime,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Daily => "daily",
            Period::Weekly => "weekly",
            Period::AllTime => "all_time",
        }
    }

    /// Parse a period query value (`daily` | `weekly` | `all_time`)
    pub fn parse(value: &str) -> Result<Self, EngineError> {
        match value {
            "daily" => Ok(Period::Daily),
            "weekly" => Ok(Period::Weekly),
            "all_time" => Ok(Period::AllTime),
            other => Err(EngineError::Validation(format!(
                "Unknown period '{}', expected daily, weekly, or all_time",
                other
            ))),
        }
    }

    /// Start of the ranking window as of `now`; `None` means unbounded
    pub fn window_start(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Period::Daily => Some(now - Duration::days(1)),
            Period::Weekly => Some(now - Duration::days(7)),
            Period::AllTime => None,
        }
    }
}

/// A recorded reading-session telemetry event.
///
/// Immutable once appended to the log; every downstream aggregate must be
/// reconstructable from the ordered history of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingEvent {
    /// Unique event identifier (client-supplied idempotency key or assigned)
    pub event_id: String,
    /// Authenticated reader
    pub user_id: String,
    /// Book or chapter being read
    pub content_id: String,
    /// Reading time in seconds
    pub session_duration_sec: f64,
    /// Whether the content was finished in this session
    pub completed: bool,
    /// Number of pauses during the session
    pub pause_count: u32,
    /// Total paused time in seconds
    pub pause_duration_sec: f64,
    /// Number of reading-speed adjustments
    pub speed_changes: u32,
    /// Number of atmosphere/theme adjustments
    pub atmosphere_changes: u32,
    /// Client-reported session end time
    pub timestamp: DateTime<Utc>,
    /// When the recorder accepted the event
    pub recorded_at: DateTime<Utc>,
}

/// Interaction patterns derived from a single session at scoring time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionPatterns {
    /// Pauses per minute of reading
    pub pauses_per_min: f64,
    /// Fraction of the session spent paused (0-1)
    pub pause_time_ratio: f64,
    /// Speed adjustments per minute
    pub speed_changes_per_min: f64,
    /// Atmosphere adjustments per minute
    pub atmosphere_changes_per_min: f64,
    /// Engagement score for this session (0-1)
    pub engagement_score: f64,
}

/// Learning-style signals blended across sessions (all 0-1)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningSignals {
    /// Sustained attention (inverse of pause load)
    pub focus: f64,
    /// How often the reader adjusts pace
    pub tempo_variability: f64,
    /// How often the reader adjusts their environment
    pub environment_sensitivity: f64,
    /// Tendency to finish what was started
    pub completion_tendency: f64,
}

/// Dominant learning style classified from blended signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningStyle {
    /// Long focused sessions, high completion
    DeepReader,
    /// Fast, variable pace, low completion
    Skimmer,
    /// Frequently tunes atmosphere and settings
    Explorer,
    /// Not enough history to tell
    Undetermined,
}

impl Default for LearningStyle {
    fn default() -> Self {
        LearningStyle::Undetermined
    }
}

/// Rolling per-user aggregate, derived from the event log.
///
/// The rolling score is a pure fold over the user's ordered event history;
/// `created_at` is fixed by the first recorded event and is the leaderboard
/// tie-breaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementProfile {
    pub user_id: String,
    /// Accumulated engagement points
    pub rolling_score: f64,
    /// Events folded into this profile
    pub events_scored: u64,
    /// Sessions that finished their content
    pub completed_sessions: u64,
    /// Total reading time in seconds
    pub total_reading_sec: f64,
    pub signals: LearningSignals,
    pub style: LearningStyle,
    pub created_at: DateTime<Utc>,
    pub last_event_at: DateTime<Utc>,
}

/// One row of a ranked leaderboard projection.
///
/// Recomputed wholesale per request; never persisted as a source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub period: Period,
    /// 1-based position
    pub rank: u32,
    pub score: f64,
}

/// Category of a forward-looking insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    /// Engagement is rising
    Momentum,
    /// Engagement is declining
    DisengagementRisk,
    /// Pauses are growing; the reader may be overextending
    Fatigue,
    /// Steady cadence is forming
    HabitForming,
    /// Not enough history for a directional call
    Neutral,
}

/// Best-effort forward insight produced from a profile and recent history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionInsight {
    pub user_id: String,
    pub generated_at: DateTime<Utc>,
    pub kind: InsightKind,
    pub text: String,
    /// Confidence in the insight (0-1)
    pub confidence: f64,
}

// ============================================================================
// Response payloads
// ============================================================================

/// Producer metadata stamped on every response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMeta {
    pub producer: String,
    pub version: String,
    pub instance_id: String,
    pub computed_at_utc: String,
}

/// Echo of the recorded session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub event_id: String,
    pub content_id: String,
    pub duration_sec: f64,
    pub completed: bool,
    pub pause_count: u32,
    pub pause_duration_sec: f64,
    pub speed_changes: u32,
    pub atmosphere_changes: u32,
    /// True when an idempotency key matched an already-recorded event
    pub duplicate: bool,
}

/// Updated learning state after folding the event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningSummary {
    pub signals: LearningSignals,
    pub style: LearningStyle,
    pub rolling_score: f64,
    pub events_scored: u64,
}

/// What a tracking submission produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedSummary {
    pub session: SessionSummary,
    pub patterns: SessionPatterns,
    pub learning: LearningSummary,
}

/// Body of a successful `POST track-behavior`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackResponse {
    pub success: bool,
    pub tracked: TrackedSummary,
    pub meta: ResponseMeta,
}

/// Body of a successful `GET leaderboard`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardResponse {
    pub success: bool,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub period: Period,
    pub meta: ResponseMeta,
}

/// Body of a successful insight request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightResponse {
    pub success: bool,
    pub insight: PredictionInsight,
    pub meta: ResponseMeta,
}
