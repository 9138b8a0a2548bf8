//! read.track.v1 schema definition
//!
//! A tracking submission is the raw body of `POST track-behavior`. The shape
//! is strict: unrecognized fields are rejected rather than silently coerced,
//! and validation runs before any state is touched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;
use crate::types::ReadingEvent;

/// Current submission schema version
pub const SCHEMA_VERSION: &str = "read.track.v1";

/// Raw tracking submission as sent by a reading client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrackSubmission {
    /// Authenticated reader; absent or empty means unauthenticated
    #[serde(default)]
    pub user_id: Option<String>,
    /// Book or chapter identifier
    #[serde(default)]
    pub content_id: Option<String>,
    /// Reading time in seconds
    pub session_duration: f64,
    /// Whether the content was finished in this session
    #[serde(default)]
    pub completed: bool,
    /// Number of pauses during the session
    #[serde(default)]
    pub pause_count: u32,
    /// Total paused time in seconds
    #[serde(default)]
    pub pause_duration: f64,
    /// Number of reading-speed adjustments
    #[serde(default)]
    pub speed_changes: u32,
    /// Number of atmosphere/theme adjustments
    #[serde(default)]
    pub atmosphere_changes: u32,
    /// Client session end time; the recorder stamps receive time when absent
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Client idempotency key for safe retries
    #[serde(default)]
    pub event_id: Option<String>,
}

impl TrackSubmission {
    /// Parse a single submission from JSON
    pub fn parse(json: &str) -> Result<Self, EngineError> {
        serde_json::from_str(json)
            .map_err(|e| EngineError::Parse(format!("Failed to parse submission: {}", e)))
    }

    /// Parse NDJSON (newline-delimited JSON) containing submissions
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<Self>, EngineError> {
        let mut submissions = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<Self>(trimmed) {
                Ok(submission) => submissions.push(submission),
                Err(e) => {
                    return Err(EngineError::Parse(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(submissions)
    }

    /// Validate the submission without recording anything.
    ///
    /// A missing reader identity is an authentication failure (401); every
    /// other defect is a validation failure (4xx).
    pub fn validate(&self) -> Result<(), EngineError> {
        match self.user_id.as_deref() {
            None | Some("") => {
                return Err(EngineError::AuthenticationRequired(
                    "user_id is missing".to_string(),
                ));
            }
            Some(_) => {}
        }

        match self.content_id.as_deref() {
            None | Some("") => {
                return Err(EngineError::Validation(
                    "content_id is required".to_string(),
                ));
            }
            Some(_) => {}
        }

        if !self.session_duration.is_finite() || self.session_duration < 0.0 {
            return Err(EngineError::Validation(format!(
                "session_duration must be finite and non-negative, got {}",
                self.session_duration
            )));
        }

        if !self.pause_duration.is_finite() || self.pause_duration < 0.0 {
            return Err(EngineError::Validation(format!(
                "pause_duration must be finite and non-negative, got {}",
                self.pause_duration
            )));
        }

        if self.pause_duration > self.session_duration {
            return Err(EngineError::Validation(format!(
                "pause_duration ({}) cannot exceed session_duration ({})",
                self.pause_duration, self.session_duration
            )));
        }

        if let Some(event_id) = self.event_id.as_deref() {
            if event_id.is_empty() {
                return Err(EngineError::Validation(
                    "event_id must be non-empty when present".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Validate and convert into an immutable domain event.
    ///
    /// Assigns an event id when the client did not supply one and stamps the
    /// recording time.
    pub fn into_event(self, now: DateTime<Utc>) -> Result<ReadingEvent, EngineError> {
        self.validate()?;

        Ok(ReadingEvent {
            event_id: self
                .event_id
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            // validate() guarantees both ids are present and non-empty
            user_id: self.user_id.unwrap_or_default(),
            content_id: self.content_id.unwrap_or_default(),
            session_duration_sec: self.session_duration,
            completed: self.completed,
            pause_count: self.pause_count,
            pause_duration_sec: self.pause_duration,
            speed_changes: self.speed_changes,
            atmosphere_changes: self.atmosphere_changes,
            timestamp: self.timestamp.unwrap_or(now),
            recorded_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "user_id": "user-42",
            "content_id": "book-7",
            "session_duration": 900.0,
            "completed": true,
            "pause_count": 2,
            "pause_duration": 45.0,
            "speed_changes": 1,
            "atmosphere_changes": 0,
            "timestamp": "2024-03-01T20:30:00Z"
        }"#
    }

    #[test]
    fn test_parse_valid_submission() {
        let submission = TrackSubmission::parse(sample_json()).unwrap();
        assert_eq!(submission.user_id.as_deref(), Some("user-42"));
        assert_eq!(submission.pause_count, 2);
        assert!(submission.validate().is_ok());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let json = r#"{
            "user_id": "user-42",
            "content_id": "book-7",
            "session_duration": 900.0,
            "reading_mood": "cozy"
        }"#;
        assert!(TrackSubmission::parse(json).is_err());
    }

    #[test]
    fn test_missing_user_id_is_authentication_error() {
        let json = r#"{"content_id": "book-7", "session_duration": 60.0}"#;
        let submission = TrackSubmission::parse(json).unwrap();
        match submission.validate() {
            Err(EngineError::AuthenticationRequired(_)) => {}
            other => panic!("Expected AuthenticationRequired, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_user_id_is_authentication_error() {
        let json = r#"{"user_id": "", "content_id": "book-7", "session_duration": 60.0}"#;
        let submission = TrackSubmission::parse(json).unwrap();
        assert!(matches!(
            submission.validate(),
            Err(EngineError::AuthenticationRequired(_))
        ));
    }

    #[test]
    fn test_missing_content_id_is_validation_error() {
        let json = r#"{"user_id": "user-42", "session_duration": 60.0}"#;
        let submission = TrackSubmission::parse(json).unwrap();
        assert!(matches!(
            submission.validate(),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn test_negative_duration_rejected() {
        let json = r#"{"user_id": "u", "content_id": "c", "session_duration": -5.0}"#;
        let submission = TrackSubmission::parse(json).unwrap();
        assert!(matches!(
            submission.validate(),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn test_pause_exceeding_session_rejected() {
        let json = r#"{
            "user_id": "u",
            "content_id": "c",
            "session_duration": 60.0,
            "pause_duration": 120.0
        }"#;
        let submission = TrackSubmission::parse(json).unwrap();
        assert!(matches!(
            submission.validate(),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn test_into_event_assigns_id_and_stamps() {
        let now = Utc::now();
        let submission = TrackSubmission::parse(sample_json()).unwrap();
        let event = submission.into_event(now).unwrap();

        assert!(!event.event_id.is_empty());
        assert_eq!(event.recorded_at, now);
        // Client timestamp preserved
        assert_eq!(event.timestamp.to_rfc3339(), "2024-03-01T20:30:00+00:00");
    }

    #[test]
    fn test_into_event_defaults_timestamp_to_now() {
        let now = Utc::now();
        let json = r#"{"user_id": "u", "content_id": "c", "session_duration": 60.0}"#;
        let submission = TrackSubmission::parse(json).unwrap();
        let event = submission.into_event(now).unwrap();
        assert_eq!(event.timestamp, now);
    }

    #[test]
    fn test_into_event_keeps_client_event_id() {
        let now = Utc::now();
        let json = r#"{
            "user_id": "u",
            "content_id": "c",
            "session_duration": 60.0,
            "event_id": "retry-key-1"
        }"#;
        let submission = TrackSubmission::parse(json).unwrap();
        let event = submission.into_event(now).unwrap();
        assert_eq!(event.event_id, "retry-key-1");
    }

    #[test]
    fn test_parse_ndjson() {
        let ndjson = format!(
            "{}\n\n{}\n",
            r#"{"user_id": "a", "content_id": "c1", "session_duration": 60.0}"#,
            r#"{"user_id": "b", "content_id": "c2", "session_duration": 120.0}"#
        );
        let submissions = TrackSubmission::parse_ndjson(&ndjson).unwrap();
        assert_eq!(submissions.len(), 2);
        assert_eq!(submissions[1].user_id.as_deref(), Some("b"));
    }

    #[test]
    fn test_parse_ndjson_reports_line_number() {
        let ndjson = "{\"user_id\": \"a\", \"content_id\": \"c\", \"session_duration\": 60.0}\nnot json\n";
        let err = TrackSubmission::parse_ndjson(ndjson).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
