//! Pipeline orchestration
//!
//! This module provides the public API for the readpulse engine: parse and
//! validate a submission, append it to the log, fold it into the profile,
//! and build the response. Read paths (leaderboard, insight) run against the
//! current snapshot and never mutate state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::encoder::ResponseEncoder;
use crate::error::EngineError;
use crate::leaderboard::LeaderboardRanker;
use crate::prediction::InsightEngine;
use crate::profile::ProfileStore;
use crate::recorder::{AppendOutcome, EventLog};
use crate::schema::TrackSubmission;
use crate::scoring::EngagementScorer;
use crate::types::{
    InsightResponse, LeaderboardResponse, Period, ReadingEvent, TrackResponse,
};

/// Track a single submission with a fresh engine (stateless, one-shot).
///
/// Useful for tests and fire-and-forget tooling; production callers keep an
/// [`EngagementProcessor`] alive so scores accumulate.
pub fn track_once(submission_json: &str, config: &EngineConfig) -> Result<TrackResponse, EngineError> {
    let mut processor = EngagementProcessor::with_config(config.clone())?;
    processor.track(submission_json)
}

/// Durable snapshot of the engine state: the event log plus the profile
/// projection derived from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EngineState {
    log: EventLog,
    profiles: ProfileStore,
}

/// Stateful engine: validated ingestion, rolling aggregation, leaderboards,
/// and insights over one event log.
pub struct EngagementProcessor {
    config: EngineConfig,
    log: EventLog,
    profiles: ProfileStore,
    encoder: ResponseEncoder,
}

impl Default for EngagementProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl EngagementProcessor {
    /// Create a processor with default configuration
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            log: EventLog::new(),
            profiles: ProfileStore::new(),
            encoder: ResponseEncoder::new(),
        }
    }

    /// Create a processor with a validated configuration
    pub fn with_config(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            config,
            log: EventLog::new(),
            profiles: ProfileStore::new(),
            encoder: ResponseEncoder::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn event_count(&self) -> usize {
        self.log.len()
    }

    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }

    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    /// Track a raw submission: validate, record, aggregate, respond.
    ///
    /// Rejected submissions mutate nothing. A duplicate idempotency key is
    /// acknowledged against the already-recorded state without a second
    /// append.
    pub fn track(&mut self, submission_json: &str) -> Result<TrackResponse, EngineError> {
        let submission = TrackSubmission::parse(submission_json)?;
        let event = submission.into_event(Utc::now())?;
        self.track_event(event)
    }

    /// Track an already-validated domain event
    pub fn track_event(&mut self, event: ReadingEvent) -> Result<TrackResponse, EngineError> {
        let patterns = EngagementScorer::score(&event, &self.config);

        match self.log.append(event.clone()) {
            AppendOutcome::Appended => {
                let profile = self.profiles.apply_event(&event, &patterns, &self.config);
                Ok(self
                    .encoder
                    .track_response(&event, &patterns, profile, false))
            }
            AppendOutcome::Duplicate => {
                // The original append already updated the profile; respond
                // from current state without folding the event twice.
                let profile = self.profiles.get(&event.user_id).ok_or_else(|| {
                    warn!(
                        user_id = %event.user_id,
                        event_id = %event.event_id,
                        "Recorded event has no profile; log and projection disagree"
                    );
                    EngineError::Storage(format!(
                        "No profile for user '{}' despite recorded event",
                        event.user_id
                    ))
                })?;
                Ok(self.encoder.track_response(&event, &patterns, profile, true))
            }
        }
    }

    /// Track and serialize the response in one call
    pub fn track_to_json(&mut self, submission_json: &str) -> Result<String, EngineError> {
        let response = self.track(submission_json)?;
        self.encoder.to_json(&response)
    }

    /// Rank the leaderboard for a period as of now
    pub fn leaderboard(&self, period: Period, limit: Option<usize>) -> LeaderboardResponse {
        self.leaderboard_at(period, limit, Utc::now())
    }

    /// Rank the leaderboard as of an explicit instant
    pub fn leaderboard_at(
        &self,
        period: Period,
        limit: Option<usize>,
        now: DateTime<Utc>,
    ) -> LeaderboardResponse {
        let limit = limit.unwrap_or(self.config.default_leaderboard_limit);
        let entries =
            LeaderboardRanker::rank(&self.profiles, &self.log, &self.config, period, limit, now);
        self.encoder.leaderboard_response(entries, period)
    }

    /// Generate a forward-looking insight for a user as of now
    pub fn insight(&self, user_id: &str) -> Result<InsightResponse, EngineError> {
        self.insight_at(user_id, Utc::now())
    }

    /// Generate an insight as of an explicit instant
    pub fn insight_at(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<InsightResponse, EngineError> {
        if user_id.is_empty() {
            return Err(EngineError::AuthenticationRequired(
                "user_id is missing".to_string(),
            ));
        }

        let events: Vec<&ReadingEvent> = self.log.events_for_user(user_id).collect();
        let insight = InsightEngine::generate(
            user_id,
            self.profiles.get(user_id),
            &events,
            &self.config,
            now,
        );
        Ok(self.encoder.insight_response(insight))
    }

    /// Serialize the engine state (log + profiles) for persistence
    pub fn save_state(&self) -> Result<String, EngineError> {
        let state = EngineState {
            log: self.log.clone(),
            profiles: self.profiles.clone(),
        };
        serde_json::to_string(&state).map_err(EngineError::Json)
    }

    /// Restore engine state from a snapshot produced by [`save_state`].
    ///
    /// The profile projection in the snapshot is trusted as-is; call
    /// [`rebuild_profiles`] afterwards to re-derive it from the log.
    ///
    /// [`save_state`]: EngagementProcessor::save_state
    /// [`rebuild_profiles`]: EngagementProcessor::rebuild_profiles
    pub fn load_state(&mut self, json: &str) -> Result<(), EngineError> {
        let mut state: EngineState = serde_json::from_str(json)
            .map_err(|e| EngineError::Storage(format!("Failed to load engine state: {}", e)))?;
        // The idempotency index is not part of the wire format
        state.log.reindex();

        info!(
            events = state.log.len(),
            profiles = state.profiles.len(),
            "Engine state loaded"
        );
        self.log = state.log;
        self.profiles = state.profiles;
        Ok(())
    }

    /// Re-derive every profile by replaying the event log in order.
    ///
    /// The log is the source of truth; this restores the invariant that the
    /// projection is a pure function of it.
    pub fn rebuild_profiles(&mut self) {
        self.profiles = ProfileStore::rebuild_from_log(&self.log, &self.config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InsightKind, LearningStyle};
    use pretty_assertions::assert_eq;

    fn submission(user_id: &str, content_id: &str, completed: bool, pauses: u32) -> String {
        format!(
            r#"{{
                "user_id": "{}",
                "content_id": "{}",
                "session_duration": 900.0,
                "completed": {},
                "pause_count": {},
                "pause_duration": {}
            }}"#,
            user_id,
            content_id,
            completed,
            pauses,
            pauses as f64 * 15.0
        )
    }

    #[test]
    fn test_track_records_and_responds() {
        let mut processor = EngagementProcessor::new();

        let response = processor
            .track(&submission("alice", "book-1", true, 1))
            .unwrap();

        assert!(response.success);
        assert!(!response.tracked.session.duplicate);
        assert_eq!(response.tracked.learning.events_scored, 1);
        assert!(response.tracked.patterns.engagement_score > 0.0);
        assert_eq!(processor.event_count(), 1);
        assert_eq!(processor.profile_count(), 1);
    }

    #[test]
    fn test_track_without_user_rejects_and_mutates_nothing() {
        let mut processor = EngagementProcessor::new();

        let result = processor.track(r#"{"content_id": "book-1", "session_duration": 60.0}"#);

        assert!(matches!(
            result,
            Err(EngineError::AuthenticationRequired(_))
        ));
        assert_eq!(processor.event_count(), 0);
        assert_eq!(processor.profile_count(), 0);
    }

    #[test]
    fn test_track_without_content_rejects_and_mutates_nothing() {
        let mut processor = EngagementProcessor::new();

        let result = processor.track(r#"{"user_id": "alice", "session_duration": 60.0}"#);

        assert!(matches!(result, Err(EngineError::Validation(_))));
        assert_eq!(processor.event_count(), 0);
    }

    #[test]
    fn test_malformed_json_rejected() {
        let mut processor = EngagementProcessor::new();
        assert!(matches!(
            processor.track("not json"),
            Err(EngineError::Parse(_))
        ));
    }

    #[test]
    fn test_duplicate_event_id_acknowledged_once() {
        let mut processor = EngagementProcessor::new();
        let body = r#"{
            "user_id": "alice",
            "content_id": "book-1",
            "session_duration": 900.0,
            "completed": true,
            "event_id": "retry-key-1"
        }"#;

        let first = processor.track(body).unwrap();
        let second = processor.track(body).unwrap();

        assert!(!first.tracked.session.duplicate);
        assert!(second.tracked.session.duplicate);
        // The retry did not score a second time
        assert_eq!(processor.event_count(), 1);
        assert_eq!(second.tracked.learning.events_scored, 1);
        assert_eq!(
            second.tracked.learning.rolling_score,
            first.tracked.learning.rolling_score
        );
    }

    #[test]
    fn test_rolling_score_is_replayable() {
        let mut processor = EngagementProcessor::new();

        for i in 0..6 {
            processor
                .track(&submission("alice", &format!("book-{}", i), i % 2 == 0, i))
                .unwrap();
        }
        let live_score = processor.profiles().get("alice").unwrap().rolling_score;
        let live_signals = processor.profiles().get("alice").unwrap().signals.clone();

        processor.rebuild_profiles();

        let replayed = processor.profiles().get("alice").unwrap();
        assert_eq!(replayed.rolling_score, live_score);
        assert_eq!(replayed.signals, live_signals);
    }

    #[test]
    fn test_leaderboard_empty_when_no_profiles() {
        let processor = EngagementProcessor::new();
        let response = processor.leaderboard(Period::Daily, None);

        assert!(response.success);
        assert!(response.leaderboard.is_empty());
        assert_eq!(response.period, Period::Daily);
    }

    #[test]
    fn test_leaderboard_ranks_users() {
        let mut processor = EngagementProcessor::new();

        for i in 0..3 {
            processor
                .track(&submission("alice", &format!("book-{}", i), true, 0))
                .unwrap();
        }
        processor
            .track(&submission("bob", "book-0", false, 4))
            .unwrap();

        let response = processor.leaderboard(Period::AllTime, Some(10));
        assert_eq!(response.leaderboard.len(), 2);
        assert_eq!(response.leaderboard[0].user_id, "alice");
        assert_eq!(response.leaderboard[0].rank, 1);
    }

    #[test]
    fn test_insight_neutral_below_threshold() {
        let mut processor = EngagementProcessor::new();
        processor
            .track(&submission("alice", "book-1", true, 0))
            .unwrap();

        let response = processor.insight("alice").unwrap();
        assert!(response.success);
        assert_eq!(response.insight.kind, InsightKind::Neutral);
    }

    #[test]
    fn test_insight_for_unknown_user_is_neutral() {
        let processor = EngagementProcessor::new();
        let response = processor.insight("nobody").unwrap();
        assert_eq!(response.insight.kind, InsightKind::Neutral);
    }

    #[test]
    fn test_insight_requires_user_id() {
        let processor = EngagementProcessor::new();
        assert!(matches!(
            processor.insight(""),
            Err(EngineError::AuthenticationRequired(_))
        ));
    }

    #[test]
    fn test_insight_with_history_is_directional() {
        let mut processor = EngagementProcessor::new();
        for i in 0..8 {
            processor
                .track(&submission("alice", &format!("book-{}", i), true, 1))
                .unwrap();
        }

        let response = processor.insight("alice").unwrap();
        assert_ne!(response.insight.kind, InsightKind::Neutral);
        assert!(response.insight.confidence > 0.2);
    }

    #[test]
    fn test_state_roundtrip() {
        let mut processor = EngagementProcessor::new();
        processor
            .track(&submission("alice", "book-1", true, 0))
            .unwrap();
        processor
            .track(&submission("bob", "book-2", false, 2))
            .unwrap();

        let snapshot = processor.save_state().unwrap();

        let mut restored = EngagementProcessor::new();
        restored.load_state(&snapshot).unwrap();

        assert_eq!(restored.event_count(), 2);
        assert_eq!(restored.profile_count(), 2);
        assert_eq!(
            restored.profiles().get("alice").unwrap(),
            processor.profiles().get("alice").unwrap()
        );
    }

    #[test]
    fn test_loaded_state_keeps_idempotency() {
        let mut processor = EngagementProcessor::new();
        let body = r#"{
            "user_id": "alice",
            "content_id": "book-1",
            "session_duration": 900.0,
            "event_id": "retry-key-1"
        }"#;
        processor.track(body).unwrap();

        let snapshot = processor.save_state().unwrap();
        let mut restored = EngagementProcessor::new();
        restored.load_state(&snapshot).unwrap();

        let response = restored.track(body).unwrap();
        assert!(response.tracked.session.duplicate);
        assert_eq!(restored.event_count(), 1);
    }

    #[test]
    fn test_track_once_stateless() {
        let config = EngineConfig::default();
        let response = track_once(&submission("alice", "book-1", true, 0), &config).unwrap();

        assert!(response.success);
        assert_eq!(response.tracked.learning.events_scored, 1);
        assert_eq!(response.tracked.learning.style, LearningStyle::Undetermined);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.weights.completion = f64::NAN;
        assert!(EngagementProcessor::with_config(config).is_err());
    }
}
