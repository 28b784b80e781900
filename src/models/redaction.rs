use serde::{Deserialize, Serialize};

use crate::models::entity::Finding;

/// The complete outcome of one redaction request.
///
/// Assembled exactly once by the orchestrator and immutable afterward.
/// `original_text` exists only to let callers locate findings; collaborators
/// must not persist it beyond this result's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedactionResult {
    /// The transcript as the speech-to-text engine produced it
    pub original_text: String,
    /// The transcript with PII replaced by the anonymization engine
    pub redacted_text: String,
    /// Retained PII detections, in detection order
    pub pii_findings: Vec<Finding>,
    /// Language of the transcript
    pub language: String,
}

impl RedactionResult {
    /// Number of findings that carry a resolved audio time range
    pub fn timed_finding_count(&self) -> usize {
        self.pii_findings.iter().filter(|f| f.has_audio()).count()
    }
}
