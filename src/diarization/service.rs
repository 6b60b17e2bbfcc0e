// diarization/service.rs
//
// Consumed local diarization interface. A concrete implementation
// (segmentation + speaker embedding models) lives outside this crate;
// the engine only needs spans, per-speaker embeddings, and range-based
// embedding extraction for profile training.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One diarized time span attributed to a local speaker label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakerSpan {
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
    /// Local diarization label (e.g. "speaker_0").
    pub label: String,
}

/// Aggregate voice data for one local diarization label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalSpeakerProfile {
    pub label: String,
    #[serde(skip_serializing, default)]
    pub embedding: Vec<f32>,
    pub total_speech_secs: f64,
}

/// Result of diarizing one audio file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiarizationResult {
    pub speaker_count: usize,
    pub speaker_profiles: HashMap<String, LocalSpeakerProfile>,
    pub spans: Vec<SpeakerSpan>,
}

impl DiarizationResult {
    /// Label active at `time`, with carry-forward semantics: when no span
    /// covers the timestamp, the most recent preceding span wins.
    pub fn speaker_at_time(&self, time: f64) -> Option<&str> {
        let mut covering: Option<&SpeakerSpan> = None;
        let mut preceding: Option<&SpeakerSpan> = None;

        for span in &self.spans {
            if span.start <= time && time <= span.end {
                if covering.map_or(true, |c| span.start >= c.start) {
                    covering = Some(span);
                }
            } else if span.end <= time && preceding.map_or(true, |p| span.end > p.end) {
                preceding = Some(span);
            }
        }

        covering.or(preceding).map(|s| s.label.as_str())
    }
}

#[async_trait]
pub trait DiarizationService: Send + Sync {
    /// Diarize a whole audio file into labeled spans and per-label voice
    /// embeddings. This is I/O-bound: the file is re-read from disk.
    async fn process_audio_file(&self, path: &Path) -> Result<DiarizationResult>;

    /// Extract one voice embedding from the given time ranges of a file,
    /// for profile training.
    async fn extract_embedding(&self, path: &Path, ranges: &[(f64, f64)]) -> Result<Vec<f32>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with_spans(spans: &[(f64, f64, &str)]) -> DiarizationResult {
        DiarizationResult {
            speaker_count: 0,
            speaker_profiles: HashMap::new(),
            spans: spans
                .iter()
                .map(|&(start, end, label)| SpeakerSpan {
                    start,
                    end,
                    label: label.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_covering_span_wins() {
        let result = result_with_spans(&[(0.0, 2.0, "speaker_0"), (2.5, 5.0, "speaker_1")]);
        assert_eq!(result.speaker_at_time(1.0), Some("speaker_0"));
        assert_eq!(result.speaker_at_time(3.0), Some("speaker_1"));
    }

    #[test]
    fn test_carry_forward_between_spans() {
        let result = result_with_spans(&[(0.0, 2.0, "speaker_0"), (4.0, 6.0, "speaker_1")]);
        // Gap between spans: most recent preceding span carries forward
        assert_eq!(result.speaker_at_time(3.0), Some("speaker_0"));
        assert_eq!(result.speaker_at_time(7.0), Some("speaker_1"));
    }

    #[test]
    fn test_no_preceding_span() {
        let result = result_with_spans(&[(5.0, 8.0, "speaker_0")]);
        assert_eq!(result.speaker_at_time(1.0), None);
    }

    #[test]
    fn test_unsorted_spans() {
        let result = result_with_spans(&[(4.0, 6.0, "speaker_1"), (0.0, 2.0, "speaker_0")]);
        assert_eq!(result.speaker_at_time(3.0), Some("speaker_0"));
        assert_eq!(result.speaker_at_time(5.0), Some("speaker_1"));
    }
}
