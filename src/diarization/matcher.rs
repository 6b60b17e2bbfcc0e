// diarization/matcher.rs
//
// Speaker embedding matcher: cosine similarity against the trained-profile
// library, and overlap mapping of provider speaker IDs onto local
// diarization labels.

use std::collections::HashMap;

use log::debug;
use uuid::Uuid;

use crate::diarization::service::DiarizationResult;
use crate::profiles::types::VoiceProfile;
use crate::types::{is_valid_embedding, SpeakerMatch, TranscriptSegment};

/// Cosine similarity between two embeddings. Mismatched or empty vectors
/// score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Match one voice embedding against the profile library.
///
/// Returns the best match at or above `threshold`, or `None` for an
/// unknown speaker. Profiles without a valid 256-length embedding are
/// skipped.
pub fn identify(
    speaker_id: u32,
    embedding: &[f32],
    profiles: &[(Uuid, VoiceProfile)],
    threshold: f32,
) -> Option<SpeakerMatch> {
    if !is_valid_embedding(embedding) {
        return None;
    }

    let mut best: Option<(Uuid, f32)> = None;
    for (profile_id, profile) in profiles {
        if !is_valid_embedding(&profile.embedding) {
            continue;
        }
        let similarity = cosine_similarity(embedding, &profile.embedding);
        if best.map_or(true, |(_, s)| similarity > s) {
            best = Some((*profile_id, similarity));
        }
    }

    let (matched_profile_id, similarity) = best.filter(|(_, s)| *s >= threshold)?;
    let matched = SpeakerMatch {
        speaker_id,
        matched_profile_id,
        confidence: similarity.clamp(0.0, 1.0),
    };
    if matched.is_low_confidence() {
        debug!(
            "Speaker {} matched profile {} with low confidence {:.2}",
            speaker_id, matched_profile_id, matched.confidence
        );
    }
    Some(matched)
}

/// Outcome of mapping provider speakers onto the profile library.
#[derive(Debug, Clone, Default)]
pub struct SpeakerResolution {
    /// Library matches, ordered by provider speaker id.
    pub matches: Vec<SpeakerMatch>,
    /// Local diarization embedding per resolved provider speaker id, kept
    /// for downstream feedback training.
    pub embeddings: HashMap<u32, Vec<f32>>,
}

/// Map each provider speaker ID onto a local diarization label and match
/// the label's embedding against the profile library.
///
/// Only the first occurrence of a provider speaker ID resolves a mapping:
/// its segment timestamp is looked up in the diarization spans with
/// carry-forward semantics, and subsequent segments with the same ID reuse
/// the result. Unresolvable speakers stay unmatched.
pub fn match_provider_speakers(
    segments: &[TranscriptSegment],
    diarization: &DiarizationResult,
    profiles: &[(Uuid, VoiceProfile)],
    threshold: f32,
) -> SpeakerResolution {
    let mut seen: HashMap<u32, Option<SpeakerMatch>> = HashMap::new();
    let mut embeddings: HashMap<u32, Vec<f32>> = HashMap::new();

    for segment in segments {
        let Some(speaker_id) = segment.speaker_id else {
            continue;
        };
        if seen.contains_key(&speaker_id) {
            continue;
        }

        let local = diarization
            .speaker_at_time(segment.timestamp)
            .and_then(|label| diarization.speaker_profiles.get(label));
        let matched = local.and_then(|profile| {
            embeddings.insert(speaker_id, profile.embedding.clone());
            identify(speaker_id, &profile.embedding, profiles, threshold)
        });
        seen.insert(speaker_id, matched);
    }

    let mut matches: Vec<SpeakerMatch> = seen.into_values().flatten().collect();
    matches.sort_by_key(|m| m.speaker_id);

    debug!(
        "Resolved {} of {} provider speakers against {} profiles",
        matches.len(),
        embeddings.len(),
        profiles.len()
    );

    SpeakerResolution {
        matches,
        embeddings,
    }
}
