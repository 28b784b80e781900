use std::fmt;

use thiserror::Error;

/// Pipeline stages, in execution order. Failures carry the stage they
/// occurred in so callers can attribute errors without string parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Invoking the speech-to-text engine.
    Transcribing,
    /// Invoking the PII detection engine.
    Detecting,
    /// Applying the score/type entity filter.
    Filtering,
    /// Invoking the anonymization engine.
    Anonymizing,
    /// Building the word offset index and resolving timestamps.
    Aligning,
}

impl Stage {
    /// The stage label used in events and logging.
    pub fn label(self) -> &'static str {
        match self {
            Self::Transcribing => "transcribing",
            Self::Detecting => "detecting",
            Self::Filtering => "filtering",
            Self::Anonymizing => "anonymizing",
            Self::Aligning => "aligning",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Failure of a single external engine call. Adapters map transport and
/// payload problems into this type; the orchestrator wraps it with the
/// stage it happened in.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("engine returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid engine payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Other(String),
}

impl EngineError {
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// Errors a redaction request can end with.
///
/// Engine failures are fatal and never retried here; retry policy belongs to
/// the calling infrastructure. Alignment problems are NOT errors — a
/// degraded index only suppresses audio timestamps (see
/// [`crate::align::OffsetIndex::is_degraded`]).
#[derive(Debug, Error)]
pub enum RedactionError {
    /// Bad request parameters, rejected before any engine is called.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("transcription failed: {0}")]
    Transcription(#[source] EngineError),
    #[error("pii detection failed: {0}")]
    Detection(#[source] EngineError),
    #[error("anonymization failed: {0}")]
    Anonymization(#[source] EngineError),
    /// The request was cancelled before entering `stage`.
    #[error("cancelled before {stage}")]
    Cancelled { stage: Stage },
    /// Writing redacted output to disk failed.
    #[error("output io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RedactionError {
    /// The stage this error is attributed to, when one applies.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::InvalidConfig(_) | Self::Io(_) => None,
            Self::Transcription(_) => Some(Stage::Transcribing),
            Self::Detection(_) => Some(Stage::Detecting),
            Self::Anonymization(_) => Some(Stage::Anonymizing),
            Self::Cancelled { stage } => Some(*stage),
        }
    }
}
