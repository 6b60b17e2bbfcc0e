// transcription/progress.rs
//
// Progress aggregator: merges asynchronous per-source progress callbacks
// into one monotonically advancing status. All mutation is serialized
// through the internal lock; snapshots are safe for concurrent readers.

use std::collections::HashMap;
use std::sync::Mutex;

use log::debug;
use serde::Serialize;

use crate::types::{AudioSource, TranscriptionPhase, TranscriptionProgressInfo};

/// Same-phase numeric regressions smaller than this are absorbed; anything
/// larger is rejected as a stale callback from a concurrent chunk upload.
pub const PROGRESS_EPSILON: f32 = 0.01;

/// Read-only view of the aggregator state.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall: Option<TranscriptionProgressInfo>,
    pub sources: HashMap<AudioSource, TranscriptionProgressInfo>,
}

#[derive(Default)]
struct AggregatorState {
    overall: Option<TranscriptionProgressInfo>,
    sources: HashMap<AudioSource, TranscriptionProgressInfo>,
}

/// One overall `TranscriptionProgressInfo` plus one per source, advancing
/// monotonically: regressive phase updates are discarded and terminal
/// states are sticky per source.
#[derive(Default)]
pub struct ProgressAggregator {
    inner: Mutex<AggregatorState>,
}

impl ProgressAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all state for a fresh job restart. This is the only way a
    /// displayed phase ever goes backwards.
    pub fn reset(&self) {
        let mut state = self.inner.lock().unwrap();
        *state = AggregatorState::default();
    }

    /// Reset and seed every source of the upcoming job at `preparing`, so
    /// the derived overall status never reads completed while a later
    /// source has yet to start.
    pub fn begin(&self, sources: impl IntoIterator<Item = AudioSource>) {
        let mut state = self.inner.lock().unwrap();
        *state = AggregatorState::default();
        for source in sources {
            state.sources.insert(
                source,
                TranscriptionProgressInfo::phase(TranscriptionPhase::Preparing),
            );
        }
        recompute_overall(&mut state);
    }

    /// Apply an incoming per-source update. Returns false when the update
    /// is rejected (stale, regressive, or the source is already terminal).
    pub fn update(&self, source: AudioSource, incoming: TranscriptionProgressInfo) -> bool {
        let mut state = self.inner.lock().unwrap();
        if let Some(current) = state.sources.get(&source) {
            if !accepts(current, &incoming) {
                debug!(
                    "Discarding stale progress for {}: {} (stored: {})",
                    source, incoming.phase, current.phase
                );
                return false;
            }
        }
        state.sources.insert(source, incoming);
        recompute_overall(&mut state);
        true
    }

    /// Current info for one source.
    pub fn source(&self, source: AudioSource) -> Option<TranscriptionProgressInfo> {
        self.inner.lock().unwrap().sources.get(&source).cloned()
    }

    /// Derived overall info across all sources.
    pub fn overall(&self) -> Option<TranscriptionProgressInfo> {
        self.inner.lock().unwrap().overall.clone()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let state = self.inner.lock().unwrap();
        ProgressSnapshot {
            overall: state.overall.clone(),
            sources: state.sources.clone(),
        }
    }
}

/// Monotonic gating: reject earlier-ranked phases outright, and same-phase
/// numeric regressions beyond the epsilon. Terminal stored state rejects
/// everything.
fn accepts(current: &TranscriptionProgressInfo, incoming: &TranscriptionProgressInfo) -> bool {
    if current.phase.is_terminal() {
        return false;
    }
    let (cur, inc) = (current.phase.rank(), incoming.phase.rank());
    if inc < cur {
        return false;
    }
    if inc == cur {
        if incoming.upload_progress + PROGRESS_EPSILON < current.upload_progress {
            return false;
        }
        if incoming.completed_chunks < current.completed_chunks {
            return false;
        }
    }
    true
}

/// Overall status derivation: the minimum-ranked phase among non-failed
/// sources, mean fractional progress, summed chunk counters. Completed only
/// once every source is terminal; failed only when every source failed.
fn recompute_overall(state: &mut AggregatorState) {
    if state.sources.is_empty() {
        state.overall = None;
        return;
    }

    let infos: Vec<&TranscriptionProgressInfo> = state.sources.values().collect();
    let all_failed = infos
        .iter()
        .all(|i| i.phase == TranscriptionPhase::Failed);
    let all_terminal = infos.iter().all(|i| i.phase.is_terminal());

    let phase = if all_failed {
        TranscriptionPhase::Failed
    } else if all_terminal {
        TranscriptionPhase::Completed
    } else {
        infos
            .iter()
            .filter(|i| i.phase != TranscriptionPhase::Failed)
            .map(|i| i.phase)
            .min_by_key(|p| p.rank())
            .unwrap_or(TranscriptionPhase::Preparing)
    };

    let mut candidate = TranscriptionProgressInfo::phase(phase);
    candidate.upload_progress =
        infos.iter().map(|i| i.upload_progress).sum::<f32>() / infos.len() as f32;
    candidate.total_chunks = infos.iter().map(|i| i.total_chunks).sum();
    candidate.completed_chunks = infos.iter().map(|i| i.completed_chunks).sum();

    // The derived overall obeys the same monotonic gating as sources do.
    if let Some(current) = &state.overall {
        if !accepts(current, &candidate) {
            return;
        }
    }
    state.overall = Some(candidate);
}
