// profiles/trainer.rs
//
// Incremental voice profile training. Each training event folds one
// embedding into the profile's running mean and appends an immutable
// audit record; writes for the same speaker are serialized so racing
// training events never lose updates.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use dashmap::DashMap;
use log::{info, warn};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::diarization::service::DiarizationService;
use crate::profiles::store::ProfileStore;
use crate::profiles::types::{VoiceProfile, VoiceTrainingRecord};
use crate::types::is_valid_embedding;

pub struct VoiceProfileTrainer {
    store: Arc<dyn ProfileStore>,
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl VoiceProfileTrainer {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self {
            store,
            locks: DashMap::new(),
        }
    }

    /// Train from an assigned session: re-reads the audio and extracts an
    /// embedding for the speaker's segment ranges. The canonical path.
    pub async fn train_from_session(
        &self,
        speaker_id: Uuid,
        session_id: Uuid,
        audio_path: &Path,
        ranges: &[(f64, f64)],
        diarization: &dyn DiarizationService,
    ) -> Result<bool> {
        if self.store.known_speaker(speaker_id).is_none() {
            bail!("Known speaker not found: {}", speaker_id);
        }

        let embedding = diarization
            .extract_embedding(audio_path, ranges)
            .await
            .context("embedding extraction failed")?;
        let duration: f64 = ranges.iter().map(|(s, e)| (e - s).max(0.0)).sum();

        self.apply(speaker_id, session_id, &embedding, duration, ranges.to_vec(), true)
            .await
    }

    /// Train from a bare embedding, e.g. one propagated from auto-identify.
    /// No audio I/O; the record is appended with zero duration.
    pub async fn train_from_embedding(
        &self,
        speaker_id: Uuid,
        session_id: Uuid,
        embedding: &[f32],
    ) -> Result<bool> {
        if self.store.known_speaker(speaker_id).is_none() {
            bail!("Known speaker not found: {}", speaker_id);
        }

        self.apply(speaker_id, session_id, embedding, 0.0, Vec::new(), false)
            .await
    }

    /// Delete a speaker's profile and every training record for it.
    pub async fn reset_profile(&self, speaker_id: Uuid) -> Result<()> {
        let lock = self.lock_for(speaker_id);
        let _guard = lock.lock().await;

        self.store.delete_profile(speaker_id)?;
        self.store.delete_training_records(speaker_id)?;
        info!("Reset voice profile for speaker {}", speaker_id);
        Ok(())
    }

    fn lock_for(&self, speaker_id: Uuid) -> Arc<Mutex<()>> {
        self.locks
            .entry(speaker_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn apply(
        &self,
        speaker_id: Uuid,
        session_id: Uuid,
        embedding: &[f32],
        duration_secs: f64,
        segment_ranges: Vec<(f64, f64)>,
        features_extracted: bool,
    ) -> Result<bool> {
        if !is_valid_embedding(embedding) {
            warn!(
                "Rejecting training sample for {}: embedding has {} dimensions",
                speaker_id,
                embedding.len()
            );
            return Ok(false);
        }

        let lock = self.lock_for(speaker_id);
        let _guard = lock.lock().await;

        let profile = match self.store.profile(speaker_id) {
            Some(mut profile) => {
                if is_valid_embedding(&profile.embedding) {
                    // Running mean over all contributing embeddings
                    let n = profile.sample_count as f32;
                    profile.embedding = profile
                        .embedding
                        .iter()
                        .zip(embedding.iter())
                        .map(|(old, new)| (old * n + new) / (n + 1.0))
                        .collect();
                } else {
                    profile.embedding = embedding.to_vec();
                }
                profile.sample_count += 1;
                profile.total_duration_secs += duration_secs;
                profile.updated_at = chrono::Utc::now();
                profile
            }
            None => {
                let mut profile = VoiceProfile::new(embedding.to_vec());
                profile.total_duration_secs = duration_secs;
                profile
            }
        };

        let quality = profile.quality();
        let samples = profile.sample_count;
        self.store.set_profile(speaker_id, profile)?;
        self.store.append_training_record(
            speaker_id,
            VoiceTrainingRecord {
                session_id,
                trained_at: chrono::Utc::now(),
                segment_ranges,
                features_extracted,
            },
        )?;

        info!(
            "Trained profile for {} ({} samples, +{:.1}s, quality {:?})",
            speaker_id, samples, duration_secs, quality
        );
        Ok(true)
    }
}
