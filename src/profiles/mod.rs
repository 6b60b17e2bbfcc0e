// Voice profile module
// Persisted known-speaker library: store interface, data model, and
// incremental profile training.

pub mod store;
pub mod trainer;
pub mod types;

pub use store::{InMemoryProfileStore, ProfileStore};
pub use trainer::VoiceProfileTrainer;
pub use types::{KnownSpeaker, ProfileQuality, VoiceProfile, VoiceTrainingRecord};
