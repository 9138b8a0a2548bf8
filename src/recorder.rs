//! Append-only event log
//!
//! The log is the source of truth for everything downstream: profiles and
//! leaderboards are projections over it and must be reconstructable from it.
//! Events are immutable once appended.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::ReadingEvent;

/// Result of an append attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Event was recorded
    Appended,
    /// An event with the same id was already recorded; nothing was written
    Duplicate,
}

/// Append-only store of recorded reading events
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<ReadingEvent>,
    /// Idempotency index over event ids; rebuilt on load
    #[serde(skip)]
    id_index: HashSet<String>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event unless its id was already recorded.
    ///
    /// Duplicate ids come from client retries; the first recording wins and
    /// the replay is acknowledged without a second append.
    pub fn append(&mut self, event: ReadingEvent) -> AppendOutcome {
        if self.id_index.contains(&event.event_id) {
            debug!(
                event_id = %event.event_id,
                user_id = %event.user_id,
                "Duplicate submission acknowledged without append"
            );
            return AppendOutcome::Duplicate;
        }

        debug!(
            event_id = %event.event_id,
            user_id = %event.user_id,
            content_id = %event.content_id,
            "Event appended"
        );
        self.id_index.insert(event.event_id.clone());
        self.events.push(event);
        AppendOutcome::Appended
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// All events in append order
    pub fn events(&self) -> &[ReadingEvent] {
        &self.events
    }

    /// One user's events in append order
    pub fn events_for_user<'a>(
        &'a self,
        user_id: &'a str,
    ) -> impl Iterator<Item = &'a ReadingEvent> {
        self.events.iter().filter(move |e| e.user_id == user_id)
    }

    /// Events whose session timestamp falls at or after `start`.
    ///
    /// `None` means unbounded (all-time).
    pub fn events_in_window(
        &self,
        start: Option<DateTime<Utc>>,
    ) -> impl Iterator<Item = &ReadingEvent> {
        self.events
            .iter()
            .filter(move |e| match start {
                Some(cutoff) => e.timestamp >= cutoff,
                None => true,
            })
    }

    /// Rebuild the idempotency index from the recorded events.
    ///
    /// Required after any deserialization path that bypasses [`from_json`],
    /// since the index is not part of the wire format.
    ///
    /// [`from_json`]: EventLog::from_json
    pub fn reindex(&mut self) {
        self.id_index = self.events.iter().map(|e| e.event_id.clone()).collect();
    }

    /// Load a log from JSON, rebuilding the idempotency index
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut log: Self = serde_json::from_str(json)?;
        log.reindex();
        Ok(log)
    }

    /// Serialize the log to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
