//! Response encoding
//!
//! Builds the API response payloads served by the embedding web layer,
//! stamped with producer metadata and an instance id for provenance.

use chrono::Utc;
use uuid::Uuid;

use crate::error::EngineError;
use crate::types::{
    EngagementProfile, InsightResponse, LeaderboardEntry, LeaderboardResponse, LearningSummary,
    Period, PredictionInsight, ReadingEvent, ResponseMeta, SessionPatterns, SessionSummary,
    TrackResponse, TrackedSummary,
};
use crate::{ENGINE_VERSION, PRODUCER_NAME};

/// Encoder for API response payloads
pub struct ResponseEncoder {
    instance_id: String,
}

impl Default for ResponseEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Build the `POST track-behavior` response body
    pub fn track_response(
        &self,
        event: &ReadingEvent,
        patterns: &SessionPatterns,
        profile: &EngagementProfile,
        duplicate: bool,
    ) -> TrackResponse {
        TrackResponse {
            success: true,
            tracked: TrackedSummary {
                session: SessionSummary {
                    event_id: event.event_id.clone(),
                    content_id: event.content_id.clone(),
                    duration_sec: event.session_duration_sec,
                    completed: event.completed,
                    pause_count: event.pause_count,
                    pause_duration_sec: event.pause_duration_sec,
                    speed_changes: event.speed_changes,
                    atmosphere_changes: event.atmosphere_changes,
                    duplicate,
                },
                patterns: patterns.clone(),
                learning: LearningSummary {
                    signals: profile.signals.clone(),
                    style: profile.style,
                    rolling_score: profile.rolling_score,
                    events_scored: profile.events_scored,
                },
            },
            meta: self.meta(),
        }
    }

    /// Build the `GET leaderboard` response body
    pub fn leaderboard_response(
        &self,
        leaderboard: Vec<LeaderboardEntry>,
        period: Period,
    ) -> LeaderboardResponse {
        LeaderboardResponse {
            success: true,
            leaderboard,
            period,
            meta: self.meta(),
        }
    }

    /// Build the insight response body
    pub fn insight_response(&self, insight: PredictionInsight) -> InsightResponse {
        InsightResponse {
            success: true,
            insight,
            meta: self.meta(),
        }
    }

    /// Serialize any response payload to JSON
    pub fn to_json<T: serde::Serialize>(&self, payload: &T) -> Result<String, EngineError> {
        serde_json::to_string_pretty(payload).map_err(EngineError::Json)
    }

    fn meta(&self) -> ResponseMeta {
        ResponseMeta {
            producer: PRODUCER_NAME.to_string(),
            version: ENGINE_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
            computed_at_utc: Utc::now().to_rfc3339(),
        }
    }
}
