// Speaker diarization module
// Matches voice embeddings against the trained-profile library and maps
// provider speaker IDs onto local diarization labels.

pub mod matcher;
pub mod service;

pub use matcher::{cosine_similarity, identify, match_provider_speakers, SpeakerResolution};
pub use service::{DiarizationResult, DiarizationService, LocalSpeakerProfile, SpeakerSpan};
