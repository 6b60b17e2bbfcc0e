// error.rs
//
// Engine error taxonomy. A single source's failure is isolated: per-source
// state is marked failed with its error while other sources continue.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::TranscriptionPhase;

#[derive(Debug, Clone, Error)]
pub enum TranscriptionError {
    /// Missing credentials or model not loaded. Constructed by provider
    /// implementations to fail fast before any job starts.
    #[error("transcription not configured: {0}")]
    Configuration(String),

    /// Network or transcription failure from the provider. Recoverable by
    /// retry at the caller's discretion, never auto-retried by the engine.
    #[error("transcription provider failed: {0}")]
    Provider(String),

    /// Audio file unreadable or missing. Degrades the affected source only.
    #[error("audio file unreadable: {0}")]
    Io(String),

    /// Diarization or embedding extraction failure. Always non-fatal: the
    /// matching stage is skipped and provider speaker labels kept unmatched.
    #[error("speaker matching failed: {0}")]
    Matching(String),

    /// The job was cancelled before this source finished.
    #[error("transcription cancelled")]
    Cancelled,
}

impl TranscriptionError {
    /// IO failure for a specific path.
    pub fn io(path: &std::path::Path, err: std::io::Error) -> Self {
        Self::Io(format!("{}: {}", path.display(), err))
    }
}

/// A per-source failure, carrying the phase at which it occurred and the
/// raw provider message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceError {
    pub phase: TranscriptionPhase,
    pub message: String,
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (during {})", self.message, self.phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = TranscriptionError::Provider("rate limited".to_string());
        assert_eq!(err.to_string(), "transcription provider failed: rate limited");

        let err = TranscriptionError::io(
            std::path::Path::new("/tmp/missing.wav"),
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        assert!(err.to_string().contains("/tmp/missing.wav"));
    }

    #[test]
    fn test_source_error_display() {
        let err = SourceError {
            phase: TranscriptionPhase::Uploading,
            message: "connection reset".to_string(),
        };
        assert_eq!(err.to_string(), "connection reset (during uploading)");
    }
}
