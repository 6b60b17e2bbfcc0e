// transcription/merge.rs
//
// Combines per-source segment lists into one chronologically ordered
// transcript, applying a deterministic speaker-ID offset per source so
// merged speaker IDs never collide.

use std::collections::{HashMap, HashSet};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::types::{AudioSource, Speaker, TranscriptSegment};

/// Offset gap between microphone numbering and everything else.
const SOURCE_OFFSET_GAP: u32 = 1000;

/// Per-source transcription output fed into the merger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceTranscript {
    pub source: AudioSource,
    pub segments: Vec<TranscriptSegment>,
    pub speakers: Vec<Speaker>,
}

/// Merged transcript plus the offset that was applied to each source, so
/// callers can remap per-source speaker references into merged numbering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedTranscript {
    pub segments: Vec<TranscriptSegment>,
    pub speakers: Vec<Speaker>,
    pub offsets: HashMap<AudioSource, u32>,
}

/// Merge per-source results into one transcript.
///
/// Sources are processed in fixed priority order (microphone, system,
/// unknown). Microphone IDs stay 0-based; the first non-microphone source
/// is offset past the microphone maximum plus a 1000 gap, and each
/// subsequent source past the previous maximum. Segments are stable-sorted
/// by timestamp, so equal timestamps keep their per-source emission order.
pub fn merge_sources(results: &[SourceTranscript]) -> MergedTranscript {
    let mut ordered: Vec<&SourceTranscript> = results.iter().collect();
    ordered.sort_by_key(|r| r.source);

    let mut segments = Vec::new();
    let mut speakers: Vec<Speaker> = Vec::new();
    let mut seen_ids: HashSet<u32> = HashSet::new();
    let mut offsets = HashMap::new();

    let mut offset: u32 = 0;
    let mut gap_applied = false;

    for result in ordered {
        let source_offset = if result.source == AudioSource::Microphone {
            0
        } else {
            if !gap_applied {
                offset += SOURCE_OFFSET_GAP;
                gap_applied = true;
            }
            offset
        };
        offsets.insert(result.source, source_offset);

        let mut max_assigned: Option<u32> = None;
        for speaker in &result.speakers {
            let id = speaker.id + source_offset;
            max_assigned = Some(max_assigned.map_or(id, |m| m.max(id)));
            // Union de-duplicated by id only; name-based merging is the
            // identity-resolution step's job, not ours.
            if seen_ids.insert(id) {
                let mut speaker = speaker.clone();
                speaker.id = id;
                speakers.push(speaker);
            }
        }

        for segment in &result.segments {
            let mut segment = segment.clone();
            segment.source = result.source;
            segment.speaker_id = segment.speaker_id.map(|id| {
                let id = id + source_offset;
                max_assigned = Some(max_assigned.map_or(id, |m| m.max(id)));
                id
            });
            segments.push(segment);
        }

        if let Some(max) = max_assigned {
            offset = offset.max(max + 1);
        }
        debug!(
            "Merged {} segments from {} (offset {})",
            result.segments.len(),
            result.source,
            source_offset
        );
    }

    // Vec::sort_by is stable: ties never reorder across sources.
    segments.sort_by(|a, b| {
        a.timestamp
            .partial_cmp(&b.timestamp)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    MergedTranscript {
        segments,
        speakers,
        offsets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript(
        source: AudioSource,
        speaker_ids: &[u32],
        segments: &[(f64, &str, Option<u32>)],
    ) -> SourceTranscript {
        SourceTranscript {
            source,
            speakers: speaker_ids.iter().map(|&id| Speaker::new(id)).collect(),
            segments: segments
                .iter()
                .map(|&(ts, text, sp)| TranscriptSegment::new(ts, text, sp, source))
                .collect(),
        }
    }

    #[test]
    fn test_two_source_merge_offsets_system_speakers() {
        let mic = transcript(
            AudioSource::Microphone,
            &[0, 1],
            &[(0.0, "hello", Some(0)), (2.0, "hi there", Some(1))],
        );
        let system = transcript(AudioSource::System, &[0], &[(1.0, "from the call", Some(0))]);

        let merged = merge_sources(&[system.clone(), mic.clone()]);

        assert_eq!(merged.segments.len(), 3);
        // System speaker 0 remapped to 1000 + (max mic id + 1) = 1002
        assert_eq!(merged.offsets[&AudioSource::System], 1002);
        let system_segment = merged
            .segments
            .iter()
            .find(|s| s.source == AudioSource::System)
            .unwrap();
        assert_eq!(system_segment.speaker_id, Some(1002));

        let ids: HashSet<u32> = merged.speakers.iter().map(|s| s.id).collect();
        assert_eq!(ids, HashSet::from([0, 1, 1002]));
    }

    #[test]
    fn test_segments_sorted_by_timestamp() {
        let mic = transcript(
            AudioSource::Microphone,
            &[0],
            &[(5.0, "late", Some(0)), (9.0, "later", Some(0))],
        );
        let system = transcript(
            AudioSource::System,
            &[0],
            &[(1.0, "early", Some(0)), (7.0, "mid", Some(0))],
        );

        let merged = merge_sources(&[mic, system]);
        let times: Vec<f64> = merged.segments.iter().map(|s| s.timestamp).collect();
        assert_eq!(times, vec![1.0, 5.0, 7.0, 9.0]);
    }

    #[test]
    fn test_equal_timestamps_keep_source_priority_order() {
        let mic = transcript(AudioSource::Microphone, &[0], &[(3.0, "mic says", Some(0))]);
        let system = transcript(AudioSource::System, &[0], &[(3.0, "system says", Some(0))]);

        // Input order reversed; merge order must still be deterministic
        let merged = merge_sources(&[system, mic]);
        assert_eq!(merged.segments[0].text, "mic says");
        assert_eq!(merged.segments[1].text, "system says");
    }

    #[test]
    fn test_no_microphone_source_uses_base_offset() {
        let system = transcript(AudioSource::System, &[0, 1], &[(0.0, "only system", Some(1))]);
        let merged = merge_sources(&[system]);

        assert_eq!(merged.offsets[&AudioSource::System], 1000);
        let ids: HashSet<u32> = merged.speakers.iter().map(|s| s.id).collect();
        assert_eq!(ids, HashSet::from([1000, 1001]));
        assert_eq!(merged.segments[0].speaker_id, Some(1001));
    }

    #[test]
    fn test_unknown_source_offset_past_system() {
        let mic = transcript(AudioSource::Microphone, &[0], &[(0.0, "a", Some(0))]);
        let system = transcript(AudioSource::System, &[0], &[(1.0, "b", Some(0))]);
        let unknown = transcript(AudioSource::Unknown, &[0], &[(2.0, "c", Some(0))]);

        let merged = merge_sources(&[unknown, system, mic]);
        let ids: HashSet<u32> = merged.speakers.iter().map(|s| s.id).collect();
        // mic 0 -> 0, system 0 -> 1001, unknown 0 -> 1002: all distinct
        assert_eq!(ids.len(), 3);
        assert!(merged.offsets[&AudioSource::Unknown] > merged.offsets[&AudioSource::System]);
    }

    #[test]
    fn test_speakerless_segments_pass_through() {
        let mic = transcript(AudioSource::Microphone, &[], &[(0.0, "no speaker", None)]);
        let merged = merge_sources(&[mic]);
        assert_eq!(merged.segments[0].speaker_id, None);
        assert!(merged.speakers.is_empty());
    }

    #[test]
    fn test_merged_ids_never_collide() {
        let mic = transcript(
            AudioSource::Microphone,
            &[0, 1, 2],
            &[(0.0, "a", Some(2))],
        );
        let system = transcript(
            AudioSource::System,
            &[0, 1, 2, 3],
            &[(0.5, "b", Some(3))],
        );
        let merged = merge_sources(&[mic, system]);

        let ids: Vec<u32> = merged.speakers.iter().map(|s| s.id).collect();
        let unique: HashSet<u32> = ids.iter().copied().collect();
        assert_eq!(ids.len(), unique.len());
        // Every system id sits at or above 1000 + max mic id + 1
        for id in ids {
            assert!(id <= 2 || id >= 1003);
        }
    }
}
