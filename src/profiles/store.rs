// profiles/store.rs
//
// Voice profile store interface, keyed by KnownSpeaker id. Hosts persist
// this however they like; the in-memory implementation backs tests and
// sessions without persistence.

use anyhow::{anyhow, Result};
use dashmap::DashMap;
use log::{debug, info};
use uuid::Uuid;

use crate::profiles::types::{KnownSpeaker, VoiceProfile, VoiceTrainingRecord};

pub trait ProfileStore: Send + Sync {
    fn known_speaker(&self, id: Uuid) -> Option<KnownSpeaker>;
    fn upsert_known_speaker(&self, speaker: KnownSpeaker) -> Result<()>;
    /// Bump a known speaker's usage count after a session resolves them.
    fn touch_known_speaker(&self, id: Uuid) -> Result<()>;

    fn profile(&self, speaker_id: Uuid) -> Option<VoiceProfile>;
    fn set_profile(&self, speaker_id: Uuid, profile: VoiceProfile) -> Result<()>;
    fn delete_profile(&self, speaker_id: Uuid) -> Result<()>;
    /// All trained profiles with their known-speaker ids.
    fn list_profiles(&self) -> Vec<(Uuid, VoiceProfile)>;

    fn append_training_record(&self, speaker_id: Uuid, record: VoiceTrainingRecord) -> Result<()>;
    fn training_records(&self, speaker_id: Uuid) -> Vec<VoiceTrainingRecord>;
    fn delete_training_records(&self, speaker_id: Uuid) -> Result<()>;
}

/// Concurrent in-memory profile store.
#[derive(Default)]
pub struct InMemoryProfileStore {
    speakers: DashMap<Uuid, KnownSpeaker>,
    profiles: DashMap<Uuid, VoiceProfile>,
    records: DashMap<Uuid, Vec<VoiceTrainingRecord>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileStore for InMemoryProfileStore {
    fn known_speaker(&self, id: Uuid) -> Option<KnownSpeaker> {
        self.speakers.get(&id).map(|s| s.clone())
    }

    fn upsert_known_speaker(&self, speaker: KnownSpeaker) -> Result<()> {
        info!("Storing known speaker '{}' ({})", speaker.name, speaker.id);
        self.speakers.insert(speaker.id, speaker);
        Ok(())
    }

    fn touch_known_speaker(&self, id: Uuid) -> Result<()> {
        let mut speaker = self
            .speakers
            .get_mut(&id)
            .ok_or_else(|| anyhow!("Known speaker not found: {}", id))?;
        speaker.usage_count += 1;
        debug!("Speaker '{}' now used {} times", speaker.name, speaker.usage_count);
        Ok(())
    }

    fn profile(&self, speaker_id: Uuid) -> Option<VoiceProfile> {
        self.profiles.get(&speaker_id).map(|p| p.clone())
    }

    fn set_profile(&self, speaker_id: Uuid, profile: VoiceProfile) -> Result<()> {
        self.profiles.insert(speaker_id, profile);
        Ok(())
    }

    fn delete_profile(&self, speaker_id: Uuid) -> Result<()> {
        self.profiles.remove(&speaker_id);
        Ok(())
    }

    fn list_profiles(&self) -> Vec<(Uuid, VoiceProfile)> {
        self.profiles
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    fn append_training_record(&self, speaker_id: Uuid, record: VoiceTrainingRecord) -> Result<()> {
        self.records.entry(speaker_id).or_default().push(record);
        Ok(())
    }

    fn training_records(&self, speaker_id: Uuid) -> Vec<VoiceTrainingRecord> {
        self.records
            .get(&speaker_id)
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn delete_training_records(&self, speaker_id: Uuid) -> Result<()> {
        self.records.remove(&speaker_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_known_speaker_roundtrip() {
        let store = InMemoryProfileStore::new();
        let speaker = KnownSpeaker::new("Ada", "#4F8EF7");
        let id = speaker.id;
        store.upsert_known_speaker(speaker).unwrap();

        let loaded = store.known_speaker(id).unwrap();
        assert_eq!(loaded.name, "Ada");
        assert_eq!(loaded.usage_count, 0);
    }

    #[test]
    fn test_touch_increments_usage() {
        let store = InMemoryProfileStore::new();
        let speaker = KnownSpeaker::new("Ada", "#4F8EF7");
        let id = speaker.id;
        store.upsert_known_speaker(speaker).unwrap();

        store.touch_known_speaker(id).unwrap();
        store.touch_known_speaker(id).unwrap();
        assert_eq!(store.known_speaker(id).unwrap().usage_count, 2);

        assert!(store.touch_known_speaker(Uuid::new_v4()).is_err());
    }

    #[test]
    fn test_profile_lifecycle() {
        let store = InMemoryProfileStore::new();
        let id = Uuid::new_v4();
        assert!(store.profile(id).is_none());

        store
            .set_profile(id, VoiceProfile::new(vec![0.1; 256]))
            .unwrap();
        assert!(store.profile(id).is_some());
        assert_eq!(store.list_profiles().len(), 1);

        store.delete_profile(id).unwrap();
        assert!(store.profile(id).is_none());
    }

    #[test]
    fn test_training_records_append_only() {
        let store = InMemoryProfileStore::new();
        let id = Uuid::new_v4();

        for i in 0..3 {
            store
                .append_training_record(
                    id,
                    VoiceTrainingRecord {
                        session_id: Uuid::new_v4(),
                        trained_at: Utc::now(),
                        segment_ranges: vec![(i as f64, i as f64 + 1.0)],
                        features_extracted: true,
                    },
                )
                .unwrap();
        }
        assert_eq!(store.training_records(id).len(), 3);

        store.delete_training_records(id).unwrap();
        assert!(store.training_records(id).is_empty());
    }
}
