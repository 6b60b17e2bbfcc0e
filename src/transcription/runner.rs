// transcription/runner.rs
//
// Drives one transcription job per audio source, sequentially. One
// source's failure never aborts the others; every progress callback is
// serialized through the aggregator before anything observes it.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::diarization::matcher::match_provider_speakers;
use crate::diarization::service::DiarizationService;
use crate::error::{SourceError, TranscriptionError};
use crate::profiles::store::ProfileStore;
use crate::transcription::merge::SourceTranscript;
use crate::transcription::progress::ProgressAggregator;
use crate::transcription::provider::{
    ProgressSink, ProviderKind, ProviderProgress, TranscriptionProvider,
};
use crate::types::{
    AudioSource, ChunkPhase, ChunkProgress, SpeakerMatch, TranscriptionPhase,
    TranscriptionProgressInfo,
};

/// One audio file to transcribe, tagged with its origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceAudio {
    pub path: PathBuf,
    pub source: AudioSource,
}

/// Options for one job run.
#[derive(Debug, Clone)]
pub struct JobOptions {
    pub language: Option<String>,
    pub diarization_enabled: bool,
    pub similarity_threshold: f32,
}

/// Per-source job output: the tagged transcript plus any library matches
/// resolved during the parsing sub-stage.
#[derive(Debug, Clone)]
pub struct SourceOutput {
    pub transcript: SourceTranscript,
    pub matches: Vec<SpeakerMatch>,
}

/// Result of one source's job.
#[derive(Debug, Clone)]
pub struct SourceReport {
    pub source: AudioSource,
    pub result: Result<SourceOutput, SourceError>,
}

/// Progress event forwarded to the caller after the aggregator accepts it.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub source: AudioSource,
    pub info: TranscriptionProgressInfo,
}

pub struct JobRunner {
    provider: Arc<dyn TranscriptionProvider>,
    diarization: Option<Arc<dyn DiarizationService>>,
    store: Arc<dyn ProfileStore>,
    aggregator: Arc<ProgressAggregator>,
}

impl JobRunner {
    pub fn new(
        provider: Arc<dyn TranscriptionProvider>,
        diarization: Option<Arc<dyn DiarizationService>>,
        store: Arc<dyn ProfileStore>,
        aggregator: Arc<ProgressAggregator>,
    ) -> Self {
        Self {
            provider,
            diarization,
            store,
            aggregator,
        }
    }

    /// Run one job per source, sequentially. Returns one report per input
    /// source in input order.
    pub async fn run(
        &self,
        sources: &[SourceAudio],
        options: &JobOptions,
        cancel: &CancellationToken,
        events: Option<&UnboundedSender<ProgressEvent>>,
    ) -> Vec<SourceReport> {
        self.aggregator.begin(sources.iter().map(|s| s.source));
        info!(
            "Starting transcription job: {} source(s) via {}",
            sources.len(),
            self.provider.name()
        );

        let mut reports = Vec::with_capacity(sources.len());
        for source in sources {
            if cancel.is_cancelled() {
                reports.push(self.fail_source(
                    source.source,
                    TranscriptionError::Cancelled,
                    events,
                ));
                continue;
            }
            reports.push(self.run_source(source, options, cancel, events).await);
        }
        reports
    }

    async fn run_source(
        &self,
        source: &SourceAudio,
        options: &JobOptions,
        cancel: &CancellationToken,
        events: Option<&UnboundedSender<ProgressEvent>>,
    ) -> SourceReport {
        let metadata = match std::fs::metadata(&source.path) {
            Ok(metadata) => metadata,
            Err(err) => {
                return self.fail_source(
                    source.source,
                    TranscriptionError::io(&source.path, err),
                    events,
                );
            }
        };
        let file_name = source
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| source.path.display().to_string());

        let tracker = Arc::new(SourceProgressTracker {
            aggregator: self.aggregator.clone(),
            source: source.source,
            file_name: file_name.clone(),
            file_size: metadata.len(),
            events: events.cloned(),
            chunks: Mutex::new(Vec::new()),
        });
        tracker.push_phase(TranscriptionPhase::Preparing, 0.0);

        let sink: ProgressSink = {
            let tracker = tracker.clone();
            Arc::new(move |progress| tracker.apply(progress))
        };

        let transcribed = tokio::select! {
            _ = cancel.cancelled() => Err(TranscriptionError::Cancelled),
            result = self.provider.transcribe(
                &source.path,
                options.language.as_deref(),
                options.diarization_enabled,
                sink,
            ) => result,
        };

        let mut output = match transcribed {
            Ok(output) => output,
            Err(err) => return self.fail_source(source.source, err, events),
        };

        // Tag every returned segment with its origin
        for segment in &mut output.segments {
            segment.source = source.source;
        }

        // Diarization matching sub-step: cloud path only, I/O-bound, and
        // never fatal to the source.
        let mut matches = Vec::new();
        if options.diarization_enabled && self.provider.kind() == ProviderKind::Cloud {
            if let Some(diarization) = &self.diarization {
                tracker.push_phase(TranscriptionPhase::Parsing, 1.0);
                match diarization.process_audio_file(&source.path).await {
                    Ok(result) => {
                        let profiles = self.store.list_profiles();
                        let resolution = match_provider_speakers(
                            &output.segments,
                            &result,
                            &profiles,
                            options.similarity_threshold,
                        );
                        // Carry resolved local embeddings on the speakers
                        // for downstream feedback training
                        for speaker in &mut output.speakers {
                            if let Some(embedding) = resolution.embeddings.get(&speaker.id) {
                                speaker.embedding = Some(embedding.clone());
                            }
                        }
                        matches = resolution.matches;
                    }
                    Err(err) => {
                        let err = TranscriptionError::Matching(format!("{:#}", err));
                        warn!("Diarization matching skipped for {}: {}", source.source, err);
                    }
                }
            }
        }

        tracker.push_phase(TranscriptionPhase::Completed, 1.0);
        info!(
            "Source {} completed: {} segments, {} speakers, {} matched",
            source.source,
            output.segments.len(),
            output.speakers.len(),
            matches.len()
        );

        SourceReport {
            source: source.source,
            result: Ok(SourceOutput {
                transcript: SourceTranscript {
                    source: source.source,
                    segments: output.segments,
                    speakers: output.speakers,
                },
                matches,
            }),
        }
    }

    /// Mark a source failed (at whatever phase it had reached) and keep
    /// going with the next one.
    fn fail_source(
        &self,
        source: AudioSource,
        err: TranscriptionError,
        events: Option<&UnboundedSender<ProgressEvent>>,
    ) -> SourceReport {
        let phase = self
            .aggregator
            .source(source)
            .map(|info| info.phase)
            .unwrap_or(TranscriptionPhase::Preparing);
        let message = err.to_string();
        warn!("Source {} failed during {}: {}", source, phase, message);

        let info = TranscriptionProgressInfo::failed(message.clone());
        if self.aggregator.update(source, info.clone()) {
            if let Some(events) = events {
                let _ = events.send(ProgressEvent { source, info });
            }
        }

        SourceReport {
            source,
            result: Err(SourceError { phase, message }),
        }
    }
}

/// Translates provider-native progress into aggregator updates for one
/// source. Chunk callbacks may arrive concurrently; chunk state is folded
/// under a lock and stale updates are dropped by the aggregator.
struct SourceProgressTracker {
    aggregator: Arc<ProgressAggregator>,
    source: AudioSource,
    file_name: String,
    file_size: u64,
    events: Option<UnboundedSender<ProgressEvent>>,
    chunks: Mutex<Vec<ChunkProgress>>,
}

impl SourceProgressTracker {
    fn apply(&self, progress: ProviderProgress) {
        match progress {
            ProviderProgress::Phase {
                phase,
                upload_progress,
            } => self.push_phase(phase, upload_progress),
            ProviderProgress::Chunk {
                index,
                total,
                phase,
            } => self.push_chunk(index, total, phase),
        }
    }

    fn push_phase(&self, phase: TranscriptionPhase, upload_progress: f32) {
        let info = self.build(phase, upload_progress);
        self.submit(info);
    }

    fn push_chunk(&self, index: u32, total: u32, phase: ChunkPhase) {
        let (completed, snapshot) = {
            let mut chunks = self.chunks.lock().unwrap();
            while chunks.len() < total as usize {
                let index = chunks.len() as u32;
                chunks.push(ChunkProgress {
                    index,
                    phase: ChunkPhase::Pending,
                });
            }
            if let Some(chunk) = chunks.get_mut(index as usize) {
                chunk.phase = phase;
            }
            let completed = chunks
                .iter()
                .filter(|c| c.phase == ChunkPhase::Completed)
                .count() as u32;
            (completed, chunks.clone())
        };

        // Chunk callbacks keep the source's current phase; the aggregator's
        // gating already prevents any regression.
        let current = self
            .aggregator
            .source(self.source)
            .map(|info| info.phase)
            .unwrap_or(TranscriptionPhase::Uploading);
        let fraction = if total > 0 {
            completed as f32 / total as f32
        } else {
            0.0
        };

        let mut info = self.build(current, fraction);
        info.chunk_progresses = snapshot;
        info.total_chunks = total;
        info.completed_chunks = completed;
        self.submit(info);
    }

    fn build(&self, phase: TranscriptionPhase, upload_progress: f32) -> TranscriptionProgressInfo {
        let mut info = TranscriptionProgressInfo::phase(phase);
        info.upload_progress = upload_progress.clamp(0.0, 1.0);
        info.file_name = Some(self.file_name.clone());
        info.file_size = Some(self.file_size);
        info
    }

    fn submit(&self, info: TranscriptionProgressInfo) {
        if self.aggregator.update(self.source, info.clone()) {
            if let Some(events) = &self.events {
                let _ = events.send(ProgressEvent {
                    source: self.source,
                    info,
                });
            }
        }
    }
}
