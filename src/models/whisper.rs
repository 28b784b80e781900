use serde::{Deserialize, Serialize};

use crate::models::transcript::{sanitize_words, TranscriptionResult, Word};

/// Root response from a Whisper-style transcription API (verbose_json)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WhisperResponse {
    pub text: String,
    #[serde(default)]
    pub language: Option<String>,
    /// Word timings at the top level (OpenAI-style `timestamp_granularities[]=word`)
    #[serde(default)]
    pub words: Vec<WhisperWord>,
    /// Segment list; some deployments nest word timings here instead
    #[serde(default)]
    pub segments: Vec<WhisperSegment>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WhisperSegment {
    pub text: String,
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub words: Vec<WhisperWord>,
}

/// A single timed word as the engine reports it, before sanitization
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WhisperWord {
    /// The recognized text, often with leading whitespace (" Hello,")
    pub word: String,
    /// Start timestamp in seconds
    pub start: f64,
    /// End timestamp in seconds
    pub end: f64,
}

impl WhisperResponse {
    /// Flatten word timings: top-level words when present, otherwise the
    /// concatenation of per-segment words in segment order.
    pub fn flat_words(&self) -> Vec<WhisperWord> {
        if !self.words.is_empty() {
            return self.words.clone();
        }
        self.segments
            .iter()
            .flat_map(|s| s.words.iter().cloned())
            .collect()
    }

    /// Convert into the validated transcription model, applying the
    /// ingestion rules (trimming, malformed-record dropping).
    pub fn into_transcription(self) -> TranscriptionResult {
        let words: Vec<Word> = self
            .flat_words()
            .into_iter()
            .map(|w| Word::new(w.word, w.start, w.end))
            .collect();

        TranscriptionResult {
            text: self.text.trim().to_string(),
            words: sanitize_words(words),
            language: self.language.unwrap_or_default(),
        }
    }
}
