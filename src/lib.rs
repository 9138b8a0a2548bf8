//! Readpulse - reading engagement compute engine
//!
//! Readpulse turns raw reading telemetry into engagement scores, leaderboard
//! rankings, and forward-looking insights through a deterministic pipeline:
//! submission validation → durable append → scoring → rolling aggregation →
//! response encoding.
//!
//! ## Modules
//!
//! - **Recorder**: validated, idempotent, append-only event log
//! - **Scoring**: configurable per-session engagement scores and
//!   learning-style signals
//! - **Leaderboard**: stable top-N rankings over daily/weekly/all-time windows
//! - **Prediction**: rule-based forward insights with staleness-decayed
//!   confidence

pub mod config;
pub mod encoder;
pub mod error;
pub mod leaderboard;
pub mod pipeline;
pub mod prediction;
pub mod profile;
pub mod recorder;
pub mod schema;
pub mod scoring;
pub mod types;

pub use config::{EngineConfig, ScoringWeights};
pub use error::EngineError;
pub use pipeline::{track_once, EngagementProcessor};
pub use prediction::InsightEngine;
pub use profile::ProfileStore;
pub use recorder::{AppendOutcome, EventLog};
pub use schema::{TrackSubmission, SCHEMA_VERSION};
pub use types::{
    EngagementProfile, InsightKind, LeaderboardEntry, LearningStyle, Period, PredictionInsight,
    ReadingEvent,
};

/// Engine version embedded in all response payloads
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for response payloads
pub const PRODUCER_NAME: &str = "readpulse";
