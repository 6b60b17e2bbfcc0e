// profiles/types.rs
//
// Persisted voice-library data model: known speakers, trained voice
// profiles, and the training audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A speaker in the persisted library of known voices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnownSpeaker {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_characteristics: Option<String>,
    /// How many times this speaker was resolved in a session.
    pub usage_count: u32,
}

impl KnownSpeaker {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            color: color.into(),
            voice_characteristics: None,
            usage_count: 0,
        }
    }
}

/// Derived training quality of a voice profile. Never stored; always
/// computed from the profile statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileQuality {
    Low,
    Medium,
    High,
}

/// The trained voice representation of one known speaker. Statistics are
/// a strict aggregate over all training records for that speaker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceProfile {
    /// Running component-wise mean of all contributing embeddings.
    #[serde(skip_serializing, default)]
    pub embedding: Vec<f32>,
    pub sample_count: u32,
    pub total_duration_secs: f64,
    pub updated_at: DateTime<Utc>,
}

impl VoiceProfile {
    pub fn new(embedding: Vec<f32>) -> Self {
        Self {
            embedding,
            sample_count: 1,
            total_duration_secs: 0.0,
            updated_at: Utc::now(),
        }
    }

    pub fn quality(&self) -> ProfileQuality {
        if self.total_duration_secs >= 120.0 || self.sample_count >= 8 {
            ProfileQuality::High
        } else if self.total_duration_secs >= 45.0 || self.sample_count >= 4 {
            ProfileQuality::Medium
        } else {
            ProfileQuality::Low
        }
    }
}

/// Audit record for one training event. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceTrainingRecord {
    pub session_id: Uuid,
    pub trained_at: DateTime<Utc>,
    /// Ordered (start, end) second ranges the sample was extracted from.
    pub segment_ranges: Vec<(f64, f64)>,
    /// False for bare-embedding training with no audio re-read.
    pub features_extracted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(sample_count: u32, total_duration_secs: f64) -> VoiceProfile {
        VoiceProfile {
            embedding: Vec::new(),
            sample_count,
            total_duration_secs,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_quality_tiers() {
        assert_eq!(profile(1, 10.0).quality(), ProfileQuality::Low);
        assert_eq!(profile(3, 44.9).quality(), ProfileQuality::Low);

        // Either threshold alone is enough for medium
        assert_eq!(profile(2, 50.0).quality(), ProfileQuality::Medium);
        assert_eq!(profile(4, 10.0).quality(), ProfileQuality::Medium);

        // Samples threshold met even though duration is not
        assert_eq!(profile(8, 30.0).quality(), ProfileQuality::High);
        assert_eq!(profile(2, 120.0).quality(), ProfileQuality::High);
    }
}
