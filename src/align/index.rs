use tracing::{debug, warn};

use crate::models::Word;

/// Configuration for the tolerant matcher
#[derive(Debug, Clone)]
pub struct MatcherConfig {
    /// How far past the cursor to search for each word, in characters.
    /// `None` searches the remaining text.
    pub lookahead: Option<usize>,
    /// Minimum fraction of words that must be located for the index to be
    /// considered reliable; below it the index is marked degraded.
    pub min_match_fraction: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            lookahead: None,
            min_match_fraction: 0.5,
        }
    }
}

/// One located word: its character span in the transcript text and the
/// index of the word it belongs to. Spans are half-open, in character
/// (Unicode scalar) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordSpan {
    pub char_start: usize,
    pub char_end: usize,
    pub word_index: usize,
}

/// A monotonic table mapping transcript character positions to word indices.
///
/// Built once per transcription; spans are sorted by `char_start` and never
/// overlap, so interval queries can binary-search. A degraded index located
/// too few words to be trusted and disables timestamp resolution for the
/// whole request.
#[derive(Debug, Clone)]
pub struct OffsetIndex {
    spans: Vec<WordSpan>,
    total_words: usize,
    degraded: bool,
}

impl OffsetIndex {
    pub fn spans(&self) -> &[WordSpan] {
        &self.spans
    }

    /// Number of words the matcher managed to locate
    pub fn matched_words(&self) -> usize {
        self.spans.len()
    }

    /// Number of words the matcher was given
    pub fn total_words(&self) -> usize {
        self.total_words
    }

    /// Whether too few words were located for timestamps to be reliable
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// All spans strictly intersecting the half-open interval
    /// `[start, end)`. Boundary-touching spans with zero overlap are
    /// excluded.
    pub fn intersecting(&self, start: usize, end: usize) -> &[WordSpan] {
        if start >= end {
            return &[];
        }
        // First span whose end reaches past `start`; spans are sorted by
        // char_start and non-overlapping, so char_end is sorted too.
        let lo = self.spans.partition_point(|s| s.char_end <= start);
        let hi = self.spans.partition_point(|s| s.char_start < end);
        &self.spans[lo..hi]
    }
}

/// Alignment strategy: locate each timed word's character span in the
/// transcript text. Implementations may be stricter or fuzzier; the resolver
/// and orchestrator only ever see the resulting [`OffsetIndex`].
pub trait OffsetMatcher: Send + Sync {
    fn align(&self, words: &[Word], text: &str) -> OffsetIndex;
}

/// Default matcher: exact reconstruction when word concatenation equals the
/// text, falling back to a two-cursor scan that absorbs injected
/// punctuation, repeated separators, and casing drift.
#[derive(Debug, Clone, Default)]
pub struct TolerantMatcher {
    pub config: MatcherConfig,
}

impl TolerantMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    /// Single O(n) pass assuming `text` is exactly the words joined by one
    /// space. Returns None on any divergence.
    fn exact_spans(words: &[Word], chars: &[char]) -> Option<Vec<WordSpan>> {
        let joined_len: usize =
            words.iter().map(|w| w.text.chars().count()).sum::<usize>() + words.len() - 1;
        if joined_len != chars.len() {
            return None;
        }

        let mut spans = Vec::with_capacity(words.len());
        let mut pos = 0usize;
        for (idx, word) in words.iter().enumerate() {
            if idx > 0 {
                if chars.get(pos) != Some(&' ') {
                    return None;
                }
                pos += 1;
            }
            let word_chars: Vec<char> = word.text.chars().collect();
            if chars[pos..].len() < word_chars.len() || chars[pos..pos + word_chars.len()] != word_chars[..] {
                return None;
            }
            spans.push(WordSpan {
                char_start: pos,
                char_end: pos + word_chars.len(),
                word_index: idx,
            });
            pos += word_chars.len();
        }
        Some(spans)
    }

    /// Case-insensitive match of `word` against `chars` at `pos`
    fn matches_at(chars: &[char], pos: usize, word: &[char]) -> bool {
        if pos + word.len() > chars.len() {
            return false;
        }
        chars[pos..pos + word.len()]
            .iter()
            .zip(word.iter())
            .all(|(a, b)| a.eq_ignore_ascii_case(b) || a.to_lowercase().eq(b.to_lowercase()))
    }

    /// Two-cursor fallback: for each word in order, scan forward from the
    /// cursor to the first position where the word matches, skipping
    /// characters the transcription formatter injected. Unlocatable words
    /// are skipped; alignment degrades for that word only.
    fn tolerant_spans(&self, words: &[Word], chars: &[char]) -> Vec<WordSpan> {
        let mut spans: Vec<WordSpan> = Vec::with_capacity(words.len());
        let mut cursor = 0usize;

        for (idx, word) in words.iter().enumerate() {
            let word_chars: Vec<char> = word.text.chars().collect();
            if word_chars.is_empty() {
                continue;
            }

            let window_end = match self.config.lookahead {
                Some(lookahead) => (cursor + lookahead).min(chars.len()),
                None => chars.len(),
            };

            let found = (cursor..window_end)
                .find(|&pos| Self::matches_at(chars, pos, &word_chars));

            match found {
                Some(start) => {
                    spans.push(WordSpan {
                        char_start: start,
                        char_end: start + word_chars.len(),
                        word_index: idx,
                    });
                    cursor = start + word_chars.len();
                }
                None => {
                    debug!(
                        "word {} ({:?}) not found within lookahead, skipping",
                        idx, word.text
                    );
                }
            }
        }

        spans
    }
}

impl OffsetMatcher for TolerantMatcher {
    fn align(&self, words: &[Word], text: &str) -> OffsetIndex {
        let chars: Vec<char> = text.chars().collect();

        if words.is_empty() {
            // Nothing to align; empty is not the same as degraded
            return OffsetIndex {
                spans: Vec::new(),
                total_words: 0,
                degraded: false,
            };
        }

        if let Some(spans) = Self::exact_spans(words, &chars) {
            debug!("exact reconstruction matched all {} words", words.len());
            return OffsetIndex {
                spans,
                total_words: words.len(),
                degraded: false,
            };
        }

        let spans = self.tolerant_spans(words, &chars);
        let fraction = spans.len() as f64 / words.len() as f64;
        let degraded = fraction < self.config.min_match_fraction;

        if degraded {
            warn!(
                "offset index degraded: located {}/{} words ({:.0}% < {:.0}% minimum)",
                spans.len(),
                words.len(),
                fraction * 100.0,
                self.config.min_match_fraction * 100.0
            );
        } else {
            debug!(
                "tolerant matcher located {}/{} words",
                spans.len(),
                words.len()
            );
        }

        OffsetIndex {
            spans,
            total_words: words.len(),
            degraded,
        }
    }
}
