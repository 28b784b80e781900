pub mod align;
pub mod engines;
pub mod error;
pub mod models;
pub mod pipeline;

pub use align::{MatcherConfig, OffsetIndex, OffsetMatcher, TolerantMatcher};
pub use engines::{
    AnonymizationEngine, DetectionEngine, PresidioAnalyzer, PresidioAnonymizer, PresidioConfig,
    TranscriptionEngine, WhisperApiClient, WhisperConfig,
};
pub use error::{EngineError, RedactionError, Stage};
pub use models::{
    Finding, PiiEntity, RedactionResult, TranscriptionResult, Word, ENTITY_TYPE_CATALOG,
};
pub use pipeline::{AudioRedactor, CancelToken, RedactionConfig};
