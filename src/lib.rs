// lib.rs
//
// transcript-core: an in-process engine that turns one or two simultaneous
// audio capture streams into a single time-ordered transcript with
// consistent, library-resolved speaker identities.

pub mod diarization;
pub mod engine;
pub mod error;
pub mod profiles;
pub mod transcription;
pub mod types;

// Re-export the host-facing API
pub use engine::{EngineConfig, SessionTranscript, TranscriptionEngine};
pub use error::{SourceError, TranscriptionError};
pub use transcription::{
    merge_sources, JobOptions, JobRunner, MergedTranscript, ProgressAggregator, ProgressEvent,
    ProgressSink, ProgressSnapshot, ProviderKind, ProviderOutput, ProviderProgress, SourceAudio,
    SourceTranscript, TranscriptionProvider,
};
pub use diarization::{DiarizationResult, DiarizationService, LocalSpeakerProfile, SpeakerSpan};
pub use profiles::{
    InMemoryProfileStore, KnownSpeaker, ProfileQuality, ProfileStore, VoiceProfile,
    VoiceProfileTrainer, VoiceTrainingRecord,
};
pub use types::{
    AudioSource, ChunkPhase, ChunkProgress, Speaker, SpeakerMatch, TranscriptSegment,
    TranscriptionPhase, TranscriptionProgressInfo, DEFAULT_SIMILARITY_THRESHOLD, EMBEDDING_DIM,
};
