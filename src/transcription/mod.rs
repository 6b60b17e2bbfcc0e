// transcription/mod.rs
//
// Transcription pipeline: provider abstraction, per-source job runner,
// progress aggregation, and transcript merging.
//
// Module structure:
// - provider.rs: TranscriptionProvider trait, progress signal types
// - progress.rs: ProgressAggregator state machine
// - runner.rs: per-source sequential job driver
// - merge.rs: speaker-ID offsetting and chronological merge

pub mod merge;
pub mod progress;
pub mod provider;
pub mod runner;

pub use merge::{merge_sources, MergedTranscript, SourceTranscript};
pub use progress::{ProgressAggregator, ProgressSnapshot, PROGRESS_EPSILON};
pub use provider::{
    ProgressSink, ProviderKind, ProviderOutput, ProviderProgress, TranscriptionProvider,
};
pub use runner::{JobOptions, JobRunner, ProgressEvent, SourceAudio, SourceOutput, SourceReport};
