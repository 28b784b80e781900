pub mod presidio;
pub mod whisper;

use std::path::Path;

use async_trait::async_trait;

use crate::error::EngineError;
use crate::models::{PiiEntity, TranscriptionResult};

pub use presidio::{PresidioAnalyzer, PresidioAnonymizer, PresidioConfig};
pub use whisper::{WhisperApiClient, WhisperConfig};

/// Speech-to-text collaborator. Words must be chronologically ordered and
/// non-overlapping; the text need not literally equal their concatenation.
#[async_trait]
pub trait TranscriptionEngine: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> Result<TranscriptionResult, EngineError>;
}

/// PII detection collaborator. May return overlapping spans; scores in
/// [0, 1]. `entity_types` is a hint — engines may narrow early, but the
/// core filter re-applies the constraint regardless.
#[async_trait]
pub trait DetectionEngine: Send + Sync {
    async fn detect(
        &self,
        text: &str,
        language: &str,
        entity_types: Option<&[String]>,
    ) -> Result<Vec<PiiEntity>, EngineError>;
}

/// Anonymization collaborator: replaces each entity span per its
/// configured operator and returns the redacted text. The core never needs
/// the engine's own offset mapping; timestamps are computed against the
/// original text independently.
#[async_trait]
pub trait AnonymizationEngine: Send + Sync {
    async fn anonymize(&self, text: &str, entities: &[PiiEntity]) -> Result<String, EngineError>;
}
