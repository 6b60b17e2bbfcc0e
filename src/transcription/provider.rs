// transcription/provider.rs
//
// Transcription provider abstraction. Concrete providers (cloud chunked
// upload, local model) live outside this crate and are consumed through
// this trait; the engine treats them polymorphically.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TranscriptionError;
use crate::types::{ChunkPhase, Speaker, TranscriptSegment, TranscriptionPhase};

/// Which family a provider belongs to. Only the cloud path gets the
/// post-transcription diarization matching sub-step; local providers
/// diarize inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Cloud,
    Local,
}

/// Progress signal emitted by a provider while a job is in flight.
#[derive(Debug, Clone)]
pub enum ProviderProgress {
    /// Overall phase change, with fractional progress where known.
    Phase {
        phase: TranscriptionPhase,
        upload_progress: f32,
    },
    /// Per-chunk state from chunked (cloud) providers.
    Chunk {
        index: u32,
        total: u32,
        phase: ChunkPhase,
    },
}

/// Callback handed to a provider for progress reporting. Callbacks may
/// arrive on arbitrary worker threads; the runner serializes them into the
/// progress aggregator.
pub type ProgressSink = Arc<dyn Fn(ProviderProgress) + Send + Sync>;

/// Final output of one provider job: ordered segments plus the distinct
/// voices the provider detected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderOutput {
    pub segments: Vec<TranscriptSegment>,
    pub speakers: Vec<Speaker>,
}

#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    /// Human-readable provider name for logging.
    fn name(&self) -> &str;

    fn kind(&self) -> ProviderKind;

    /// Transcribe one audio file. Implementations emit progress through
    /// `progress` and fail with a detailed, user-presentable description.
    async fn transcribe(
        &self,
        audio_path: &Path,
        language: Option<&str>,
        diarization: bool,
        progress: ProgressSink,
    ) -> Result<ProviderOutput, TranscriptionError>;
}
