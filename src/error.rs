//! Error types for the readpulse engine

use thiserror::Error;

/// Errors that can occur while ingesting, aggregating, or serving telemetry
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("Invalid submission: {0}")]
    Validation(String),

    #[error("Failed to parse payload: {0}")]
    Parse(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage failure: {0}")]
    Storage(String),

    #[error("Insufficient history: {0}")]
    InsufficientData(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl EngineError {
    /// HTTP status the embedding web layer should surface for this error.
    ///
    /// Prediction degrades to a neutral insight before `InsufficientData`
    /// can reach a response, so its mapping only matters to callers that
    /// bypass the degradation path.
    pub fn http_status(&self) -> u16 {
        match self {
            EngineError::AuthenticationRequired(_) => 401,
            EngineError::Validation(_) | EngineError::Parse(_) | EngineError::Json(_) => 422,
            EngineError::InsufficientData(_) => 422,
            EngineError::Storage(_) | EngineError::Config(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            EngineError::AuthenticationRequired("no session".into()).http_status(),
            401
        );
        assert_eq!(
            EngineError::Validation("content_id is required".into()).http_status(),
            422
        );
        assert_eq!(EngineError::Storage("disk full".into()).http_status(), 500);
    }
}
