//! Engagement profile store
//!
//! One rolling profile per user, mutated only through a single
//! read-modify-write per event. Profiles are derived state: the store can be
//! rebuilt from the event log and must match the live copy exactly.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::recorder::EventLog;
use crate::scoring::EngagementScorer;
use crate::types::{EngagementProfile, LearningSignals, LearningStyle, ReadingEvent, SessionPatterns};

impl EngagementProfile {
    /// Empty profile anchored at the first recorded event
    pub fn start(user_id: &str, created_at: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            rolling_score: 0.0,
            events_scored: 0,
            completed_sessions: 0,
            total_reading_sec: 0.0,
            signals: LearningSignals::default(),
            style: LearningStyle::Undetermined,
            created_at,
            last_event_at: created_at,
        }
    }

    /// Fold one scored event into the profile.
    ///
    /// Deterministic: the resulting profile depends only on the prior state,
    /// the event, and the configuration.
    pub fn apply(&mut self, event: &ReadingEvent, patterns: &SessionPatterns, config: &EngineConfig) {
        self.rolling_score += patterns.engagement_score;
        self.events_scored += 1;
        if event.completed {
            self.completed_sessions += 1;
        }
        self.total_reading_sec += event.session_duration_sec;

        let instant = EngagementScorer::instant_signals(event, patterns);
        self.signals = if self.events_scored == 1 {
            instant
        } else {
            EngagementScorer::blend_signals(&self.signals, &instant, config.signal_smoothing)
        };
        self.style = EngagementScorer::classify(
            &self.signals,
            self.events_scored,
            config.min_sessions_for_style,
        );

        self.last_event_at = event.recorded_at;
    }
}

/// Store of rolling engagement profiles keyed by user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileStore {
    profiles: HashMap<String, EngagementProfile>,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn get(&self, user_id: &str) -> Option<&EngagementProfile> {
        self.profiles.get(user_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EngagementProfile> {
        self.profiles.values()
    }

    /// Apply one scored event as a single read-modify-write.
    ///
    /// The store owns the map and the mutation happens entirely under this
    /// call; callers never read a profile, modify it, and write it back.
    pub fn apply_event(
        &mut self,
        event: &ReadingEvent,
        patterns: &SessionPatterns,
        config: &EngineConfig,
    ) -> &EngagementProfile {
        let profile = self
            .profiles
            .entry(event.user_id.clone())
            .or_insert_with(|| EngagementProfile::start(&event.user_id, event.recorded_at));
        profile.apply(event, patterns, config);

        debug!(
            user_id = %event.user_id,
            rolling_score = profile.rolling_score,
            events_scored = profile.events_scored,
            "Profile updated"
        );
        profile
    }

    /// Rebuild the whole store by replaying the event log in order.
    ///
    /// The rolling score is a pure function of the ordered event history, so
    /// the result matches a live store that folded the same events.
    pub fn rebuild_from_log(log: &EventLog, config: &EngineConfig) -> Self {
        let mut store = Self::new();
        for event in log.events() {
            let patterns = EngagementScorer::score(event, config);
            store.apply_event(event, &patterns, config);
        }
        info!(
            events = log.len(),
            profiles = store.len(),
            "Profile store rebuilt from event log"
        );
        store
    }

    /// Load a store from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize the store to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
