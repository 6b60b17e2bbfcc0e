// engine.rs
//
// TranscriptionEngine: the single entry point a host application drives.
// Runs per-source jobs, merges them into one transcript, resolves speaker
// identities against the known-voice library, and feeds confirmed matches
// back into profile training. All collaborators are injected, so tests
// substitute in-memory fakes.

use std::sync::Arc;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::diarization::service::DiarizationService;
use crate::error::SourceError;
use crate::profiles::store::ProfileStore;
use crate::profiles::trainer::VoiceProfileTrainer;
use crate::transcription::merge::{merge_sources, SourceTranscript};
use crate::transcription::progress::{ProgressAggregator, ProgressSnapshot};
use crate::transcription::provider::TranscriptionProvider;
use crate::transcription::runner::{JobOptions, JobRunner, ProgressEvent, SourceAudio};
use crate::types::{
    AudioSource, Speaker, SpeakerMatch, TranscriptSegment, DEFAULT_SIMILARITY_THRESHOLD,
};

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Language hint passed through to the provider.
    pub language: Option<String>,
    pub diarization_enabled: bool,
    /// Similarity threshold for matching voices against the library.
    pub similarity_threshold: f32,
    /// Propagate confident matches into profile training after a session.
    pub train_on_match: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            language: None,
            diarization_enabled: true,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            train_on_match: true,
        }
    }
}

/// Final session output: one time-ordered transcript with collision-free,
/// library-resolved speakers, plus whatever went wrong per source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTranscript {
    pub session_id: Uuid,
    pub segments: Vec<TranscriptSegment>,
    pub speakers: Vec<Speaker>,
    /// Library matches in merged speaker numbering.
    pub matches: Vec<SpeakerMatch>,
    pub source_errors: Vec<(AudioSource, SourceError)>,
}

pub struct TranscriptionEngine {
    provider: Arc<dyn TranscriptionProvider>,
    diarization: Option<Arc<dyn DiarizationService>>,
    store: Arc<dyn ProfileStore>,
    aggregator: Arc<ProgressAggregator>,
    trainer: VoiceProfileTrainer,
    config: EngineConfig,
}

impl TranscriptionEngine {
    pub fn new(
        provider: Arc<dyn TranscriptionProvider>,
        diarization: Option<Arc<dyn DiarizationService>>,
        store: Arc<dyn ProfileStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            provider,
            diarization,
            trainer: VoiceProfileTrainer::new(store.clone()),
            store,
            aggregator: Arc::new(ProgressAggregator::new()),
            config,
        }
    }

    /// Read-only progress view, safe to poll from any thread while a job
    /// is running.
    pub fn progress(&self) -> ProgressSnapshot {
        self.aggregator.snapshot()
    }

    pub fn trainer(&self) -> &VoiceProfileTrainer {
        &self.trainer
    }

    /// Transcribe all of a session's sources into one merged, resolved
    /// transcript. Cancelling the token stops work between and inside
    /// provider calls; per-source failures are collected, never fatal.
    pub async fn transcribe_session(
        &self,
        session_id: Uuid,
        sources: &[SourceAudio],
        cancel: &CancellationToken,
        events: Option<&UnboundedSender<ProgressEvent>>,
    ) -> SessionTranscript {
        let runner = JobRunner::new(
            self.provider.clone(),
            self.diarization.clone(),
            self.store.clone(),
            self.aggregator.clone(),
        );
        let options = JobOptions {
            language: self.config.language.clone(),
            diarization_enabled: self.config.diarization_enabled,
            similarity_threshold: self.config.similarity_threshold,
        };

        let reports = runner.run(sources, &options, cancel, events).await;

        let mut transcripts: Vec<SourceTranscript> = Vec::new();
        let mut per_source_matches: Vec<(AudioSource, Vec<SpeakerMatch>)> = Vec::new();
        let mut source_errors = Vec::new();
        for report in reports {
            match report.result {
                Ok(output) => {
                    per_source_matches.push((report.source, output.matches));
                    transcripts.push(output.transcript);
                }
                Err(err) => source_errors.push((report.source, err)),
            }
        }

        let merged = merge_sources(&transcripts);

        // Remap per-source matches into the merged speaker numbering
        let mut matches: Vec<SpeakerMatch> = Vec::new();
        for (source, source_matches) in per_source_matches {
            let offset = merged.offsets.get(&source).copied().unwrap_or(0);
            for mut matched in source_matches {
                matched.speaker_id += offset;
                matches.push(matched);
            }
        }

        let mut speakers = merged.speakers;
        self.apply_matches(&matches, &mut speakers);
        if self.config.train_on_match {
            self.train_on_matches(session_id, &matches, &speakers).await;
        }

        info!(
            "Session {} transcribed: {} segments, {} speakers ({} matched), {} failed source(s)",
            session_id,
            merged.segments.len(),
            speakers.len(),
            matches.len(),
            source_errors.len()
        );

        SessionTranscript {
            session_id,
            segments: merged.segments,
            speakers,
            matches,
            source_errors,
        }
    }

    /// Assign known-speaker names and colors to matched speakers and bump
    /// library usage counts.
    fn apply_matches(&self, matches: &[SpeakerMatch], speakers: &mut [Speaker]) {
        for matched in matches {
            let Some(known) = self.store.known_speaker(matched.matched_profile_id) else {
                warn!(
                    "Matched profile {} has no known speaker entry",
                    matched.matched_profile_id
                );
                continue;
            };
            if let Some(speaker) = speakers.iter_mut().find(|s| s.id == matched.speaker_id) {
                speaker.name = Some(known.name.clone());
                speaker.color = known.color.clone();
            }
            if let Err(err) = self.store.touch_known_speaker(known.id) {
                warn!("Failed to bump usage for speaker {}: {:#}", known.id, err);
            }
        }
    }

    /// Feedback loop: confident matches contribute their session embedding
    /// to the matched profile. Low-confidence matches are surfaced only.
    async fn train_on_matches(
        &self,
        session_id: Uuid,
        matches: &[SpeakerMatch],
        speakers: &[Speaker],
    ) {
        for matched in matches {
            if matched.is_low_confidence() {
                continue;
            }
            let Some(embedding) = speakers
                .iter()
                .find(|s| s.id == matched.speaker_id)
                .and_then(|s| s.valid_embedding())
            else {
                continue;
            };
            match self
                .trainer
                .train_from_embedding(matched.matched_profile_id, session_id, embedding)
                .await
            {
                Ok(true) => {}
                Ok(false) => warn!(
                    "Feedback training skipped for profile {}",
                    matched.matched_profile_id
                ),
                Err(err) => warn!(
                    "Feedback training failed for profile {}: {:#}",
                    matched.matched_profile_id, err
                ),
            }
        }
    }
}
