use serde::{Deserialize, Serialize};
use tracing::warn;

/// A single spoken word with its audio timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    /// The recognized text - immutable, never changed by the pipeline
    pub text: String,
    /// Start of the word in the audio, in seconds
    pub start: f64,
    /// End of the word in the audio, in seconds
    pub end: f64,
}

impl Word {
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }

    /// Duration of this word in seconds
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// One transcription of one audio input, produced by the speech-to-text
/// engine and immutable afterward.
///
/// `text` is semantically the join of `words`, but byte identity is NOT
/// guaranteed: transcription formatting may inject punctuation, change
/// casing, or segment differently. The offset index (crate::align) exists
/// to absorb exactly that drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResult {
    /// The full transcript text, the coordinate system for PII offsets
    pub text: String,
    /// Timed words in chronological order
    pub words: Vec<Word>,
    /// Language reported by the engine (may be empty if not reported)
    #[serde(default)]
    pub language: String,
}

impl TranscriptionResult {
    /// Total number of timed words
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Audio duration covered by the timed words, in seconds
    pub fn duration(&self) -> f64 {
        match (self.words.first(), self.words.last()) {
            (Some(first), Some(last)) => (last.end - first.start).max(0.0),
            _ => 0.0,
        }
    }
}

/// Validate words arriving from an external engine, dropping records the
/// alignment layer cannot trust.
///
/// Word text is trimmed (Whisper emits words like " Hello,"); words that are
/// empty after trimming, or carry non-finite or inverted timings, are dropped
/// with a warning. A non-monotonic sequence is logged but tolerated: the
/// offset index is built in text order and never relies on time order.
pub fn sanitize_words(words: Vec<Word>) -> Vec<Word> {
    let mut sanitized: Vec<Word> = Vec::with_capacity(words.len());

    for mut word in words {
        let trimmed = word.text.trim();
        if trimmed.is_empty() {
            warn!("dropping empty word at {:.2}s", word.start);
            continue;
        }
        if !word.start.is_finite() || !word.end.is_finite() || word.start < 0.0 {
            warn!("dropping word {:?} with malformed timing", trimmed);
            continue;
        }
        if word.end < word.start {
            warn!(
                "dropping word {:?} with inverted timing {:.2}..{:.2}",
                trimmed, word.start, word.end
            );
            continue;
        }
        if trimmed.len() != word.text.len() {
            word.text = trimmed.to_string();
        }
        sanitized.push(word);
    }

    let out_of_order = sanitized
        .windows(2)
        .filter(|pair| pair[1].start < pair[0].start)
        .count();
    if out_of_order > 0 {
        warn!(
            "word sequence has {} non-monotonic start times; keeping text order",
            out_of_order
        );
    }

    sanitized
}
