// types.rs
//
// Core transcript data types shared across the engine.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed dimensionality for speaker voice embeddings.
pub const EMBEDDING_DIM: usize = 256;

/// Default cosine-similarity threshold for matching a voice against the
/// known-speaker library.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.45;

/// Matches below this confidence are flagged low-confidence but still
/// returned as the best available match.
pub const LOW_CONFIDENCE_FLOOR: f32 = 0.5;

/// Palette for per-session speaker colors, assigned by speaker index.
pub const SPEAKER_COLORS: [&str; 8] = [
    "#4F8EF7", "#F2994A", "#27AE60", "#9B51E0", "#EB5757", "#2D9CDB", "#F2C94C", "#6FCF97",
];

/// Color for a per-session speaker index.
pub fn speaker_color(index: usize) -> &'static str {
    SPEAKER_COLORS[index % SPEAKER_COLORS.len()]
}

/// Check that an embedding has the expected dimensionality.
/// Anything else is treated as absent/invalid.
pub fn is_valid_embedding(embedding: &[f32]) -> bool {
    embedding.len() == EMBEDDING_DIM
}

/// One physical audio origin within a session.
///
/// Variant order is the deterministic merge priority: microphone before
/// system before unknown.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AudioSource {
    Microphone,
    System,
    Unknown,
}

impl std::fmt::Display for AudioSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Microphone => write!(f, "microphone"),
            Self::System => write!(f, "system"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A single transcribed utterance.
///
/// Immutable once produced, except for `speaker_id`/`source` reassignment
/// during offsetting and identity resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub id: Uuid,
    /// Seconds from the start of the source audio.
    pub timestamp: f64,
    pub text: String,
    /// Per-source speaker number before merge, globally unique after.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker_id: Option<u32>,
    pub source: AudioSource,
}

impl TranscriptSegment {
    pub fn new(
        timestamp: f64,
        text: impl Into<String>,
        speaker_id: Option<u32>,
        source: AudioSource,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            text: text.into(),
            speaker_id,
            source,
        }
    }
}

/// One distinct voice detected within a single source's job output.
/// Ephemeral: becomes part of a session transcript, never persisted alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Speaker {
    pub id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub color: String,
    /// Raw voice embedding, never exposed to serialized output.
    #[serde(skip_serializing, default)]
    pub embedding: Option<Vec<f32>>,
}

impl Speaker {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            name: None,
            color: speaker_color(id as usize).to_string(),
            embedding: None,
        }
    }

    /// The embedding, only when it has the expected dimensionality.
    pub fn valid_embedding(&self) -> Option<&[f32]> {
        self.embedding
            .as_deref()
            .filter(|e| is_valid_embedding(e))
    }
}

/// Phase of a transcription job. The ordering is total:
/// preparing < uploading < processing < parsing < completed, with failed
/// terminal from any phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptionPhase {
    Preparing,
    Uploading,
    Processing,
    Parsing,
    Completed,
    Failed,
}

impl TranscriptionPhase {
    /// Position in the total phase ordering.
    pub fn rank(self) -> u8 {
        match self {
            Self::Preparing => 0,
            Self::Uploading => 1,
            Self::Processing => 2,
            Self::Parsing => 3,
            Self::Completed => 4,
            Self::Failed => 5,
        }
    }

    /// Terminal phases are sticky: once reached, further updates for that
    /// source are ignored.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for TranscriptionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Preparing => write!(f, "preparing"),
            Self::Uploading => write!(f, "uploading"),
            Self::Processing => write!(f, "processing"),
            Self::Parsing => write!(f, "parsing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Per-chunk state reported by chunked (cloud) providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkPhase {
    Pending,
    Uploading,
    Processing,
    Completed,
    Failed,
}

/// Progress of one upload chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkProgress {
    pub index: u32,
    pub phase: ChunkPhase,
}

/// Progress snapshot for one transcription job or source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionProgressInfo {
    pub phase: TranscriptionPhase,
    /// Fractional progress in [0, 1] within the current phase.
    pub upload_progress: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    pub chunk_progresses: Vec<ChunkProgress>,
    pub total_chunks: u32,
    pub completed_chunks: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TranscriptionProgressInfo {
    /// Fresh info at the given phase with no file metadata.
    pub fn phase(phase: TranscriptionPhase) -> Self {
        Self {
            phase,
            upload_progress: 0.0,
            file_name: None,
            file_size: None,
            chunk_progresses: Vec::new(),
            total_chunks: 0,
            completed_chunks: 0,
            message: None,
        }
    }

    /// Initial `preparing` info carrying file metadata.
    pub fn preparing(file_name: impl Into<String>, file_size: u64) -> Self {
        let mut info = Self::phase(TranscriptionPhase::Preparing);
        info.file_name = Some(file_name.into());
        info.file_size = Some(file_size);
        info
    }

    /// Terminal `completed` info.
    pub fn completed() -> Self {
        let mut info = Self::phase(TranscriptionPhase::Completed);
        info.upload_progress = 1.0;
        info
    }

    /// Terminal `failed` info carrying a human-readable message.
    pub fn failed(message: impl Into<String>) -> Self {
        let mut info = Self::phase(TranscriptionPhase::Failed);
        info.message = Some(message.into());
        info
    }
}

/// A speaker resolved against the known-speaker library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakerMatch {
    pub speaker_id: u32,
    pub matched_profile_id: Uuid,
    /// Similarity-derived confidence in [0, 1].
    pub confidence: f32,
}

impl SpeakerMatch {
    /// Below the floor the match is still the best available, just flagged.
    pub fn is_low_confidence(&self) -> bool {
        self.confidence < LOW_CONFIDENCE_FLOOR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_ordering_is_total() {
        let ordered = [
            TranscriptionPhase::Preparing,
            TranscriptionPhase::Uploading,
            TranscriptionPhase::Processing,
            TranscriptionPhase::Parsing,
            TranscriptionPhase::Completed,
        ];
        for pair in ordered.windows(2) {
            assert!(pair[0].rank() < pair[1].rank());
        }
        // Failed outranks every other phase so it is reachable from any of them
        for phase in ordered {
            assert!(TranscriptionPhase::Failed.rank() > phase.rank());
        }
    }

    #[test]
    fn test_terminal_phases() {
        assert!(TranscriptionPhase::Completed.is_terminal());
        assert!(TranscriptionPhase::Failed.is_terminal());
        assert!(!TranscriptionPhase::Parsing.is_terminal());
    }

    #[test]
    fn test_embedding_validation() {
        assert!(is_valid_embedding(&vec![0.0; EMBEDDING_DIM]));
        assert!(!is_valid_embedding(&vec![0.0; EMBEDDING_DIM - 1]));
        assert!(!is_valid_embedding(&[]));

        let mut speaker = Speaker::new(0);
        speaker.embedding = Some(vec![0.5; 128]);
        assert!(speaker.valid_embedding().is_none());
        speaker.embedding = Some(vec![0.5; EMBEDDING_DIM]);
        assert!(speaker.valid_embedding().is_some());
    }

    #[test]
    fn test_speaker_colors_cycle() {
        assert_eq!(speaker_color(0), speaker_color(SPEAKER_COLORS.len()));
        assert_ne!(speaker_color(0), speaker_color(1));
    }

    #[test]
    fn test_source_merge_priority() {
        assert!(AudioSource::Microphone < AudioSource::System);
        assert!(AudioSource::System < AudioSource::Unknown);
    }

    #[test]
    fn test_serde_source_values() {
        let json = serde_json::to_string(&AudioSource::Microphone).unwrap();
        assert_eq!(json, "\"microphone\"");
        let json = serde_json::to_string(&TranscriptionPhase::Uploading).unwrap();
        assert_eq!(json, "\"uploading\"");
    }
}
