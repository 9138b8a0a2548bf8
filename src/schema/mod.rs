//! read.track.v1 submission schema
//!
//! This module defines the wire-facing shape of a tracking submission and the
//! validation applied at the ingestion boundary before anything is recorded.

mod submission;

pub use submission::*;
