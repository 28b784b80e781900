use serde::{Deserialize, Serialize};
use tracing::warn;

/// Entity type strings the filter accepts, matching the detection engine's
/// catalog. Requests naming a type outside this list are rejected up front
/// rather than silently matching nothing.
pub const ENTITY_TYPE_CATALOG: &[&str] = &[
    "PERSON",
    "PHONE_NUMBER",
    "EMAIL_ADDRESS",
    "CREDIT_CARD",
    "CRYPTO",
    "DATE_TIME",
    "IBAN_CODE",
    "IP_ADDRESS",
    "NRP",
    "LOCATION",
    "MEDICAL_LICENSE",
    "URL",
    "US_BANK_NUMBER",
    "US_DRIVER_LICENSE",
    "US_ITIN",
    "US_PASSPORT",
    "US_SSN",
    "UK_NHS",
    "SG_NRIC_FIN",
    "AU_ABN",
    "AU_ACN",
    "AU_TFN",
    "AU_MEDICARE",
    "IN_PAN",
    "IN_AADHAAR",
];

/// Whether `entity_type` is part of the fixed catalog
pub fn is_known_entity_type(entity_type: &str) -> bool {
    ENTITY_TYPE_CATALOG.contains(&entity_type)
}

/// One PII span reported by the detection engine.
///
/// `start`/`end` are character (Unicode scalar) positions into the transcript
/// text, half-open — the detection engine's native coordinate system. Spans
/// from different recognizers may overlap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiiEntity {
    /// Detected type, e.g. "PERSON" or "PHONE_NUMBER"
    pub entity_type: String,
    /// Start character offset into the transcript text (inclusive)
    pub start: usize,
    /// End character offset into the transcript text (exclusive)
    pub end: usize,
    /// Detection confidence in [0, 1]
    pub score: f64,
    /// The matched text
    #[serde(default)]
    pub text: String,
}

impl PiiEntity {
    pub fn new(entity_type: impl Into<String>, start: usize, end: usize, score: f64) -> Self {
        Self {
            entity_type: entity_type.into(),
            start,
            end,
            score,
            text: String::new(),
        }
    }

    /// Length of the span in characters
    pub fn char_len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }
}

/// One reported PII detection, optionally annotated with the audio time
/// range in which it was spoken. Audio fields are present only when
/// timestamp resolution succeeded for this entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub entity_type: String,
    pub text: String,
    pub score: f64,
    pub start: usize,
    pub end: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_start: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_end: Option<f64>,
}

impl Finding {
    /// Build a finding from a detected entity, without audio timing
    pub fn from_entity(entity: &PiiEntity) -> Self {
        Self {
            entity_type: entity.entity_type.clone(),
            text: entity.text.clone(),
            score: entity.score,
            start: entity.start,
            end: entity.end,
            audio_start: None,
            audio_end: None,
        }
    }

    /// Whether this finding carries a resolved audio time range
    pub fn has_audio(&self) -> bool {
        self.audio_start.is_some() && self.audio_end.is_some()
    }
}

/// Slice `text` by character offsets, clamping to the text bounds
pub fn char_slice(text: &str, start: usize, end: usize) -> String {
    text.chars()
        .skip(start)
        .take(end.saturating_sub(start))
        .collect()
}

/// Validate entities arriving from the detection engine against `text`.
///
/// Entities with inverted or out-of-range spans, or scores outside [0, 1],
/// are dropped with a warning; they would poison the alignment math.
/// Relative order of the survivors is preserved, and missing entity text is
/// backfilled from the transcript.
pub fn sanitize_entities(entities: Vec<PiiEntity>, text: &str) -> Vec<PiiEntity> {
    let char_len = text.chars().count();
    let mut sanitized = Vec::with_capacity(entities.len());

    for mut entity in entities {
        if entity.start >= entity.end || entity.end > char_len {
            warn!(
                "dropping {} entity with invalid span {}..{} (text has {} chars)",
                entity.entity_type, entity.start, entity.end, char_len
            );
            continue;
        }
        if !entity.score.is_finite() || !(0.0..=1.0).contains(&entity.score) {
            warn!(
                "dropping {} entity with out-of-range score {}",
                entity.entity_type, entity.score
            );
            continue;
        }
        if entity.text.is_empty() {
            entity.text = char_slice(text, entity.start, entity.end);
        }
        sanitized.push(entity);
    }

    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_lookup() {
        assert!(is_known_entity_type("PERSON"));
        assert!(is_known_entity_type("PHONE_NUMBER"));
        assert!(!is_known_entity_type("FLYING_SAUCER"));
        assert!(!is_known_entity_type("person"));
    }

    #[test]
    fn test_char_slice_unicode() {
        let text = "Héllo wörld";
        assert_eq!(char_slice(text, 0, 5), "Héllo");
        assert_eq!(char_slice(text, 6, 11), "wörld");
        // Clamped, never panics
        assert_eq!(char_slice(text, 6, 99), "wörld");
        assert_eq!(char_slice(text, 99, 120), "");
    }

    #[test]
    fn test_sanitize_drops_invalid_spans() {
        let text = "Call John";
        let entities = vec![
            PiiEntity::new("PERSON", 5, 9, 0.9),
            PiiEntity::new("PERSON", 7, 7, 0.9),
            PiiEntity::new("PERSON", 5, 50, 0.9),
            PiiEntity::new("PERSON", 0, 4, 1.5),
        ];

        let sanitized = sanitize_entities(entities, text);

        assert_eq!(sanitized.len(), 1);
        assert_eq!(sanitized[0].start, 5);
        assert_eq!(sanitized[0].text, "John");
    }

    #[test]
    fn test_sanitize_keeps_provided_text() {
        let text = "Call John";
        let mut entity = PiiEntity::new("PERSON", 5, 9, 0.9);
        entity.text = "JOHN".to_string();

        let sanitized = sanitize_entities(vec![entity], text);

        assert_eq!(sanitized[0].text, "JOHN");
    }

    #[test]
    fn test_finding_from_entity() {
        let mut entity = PiiEntity::new("PHONE_NUMBER", 19, 27, 0.85);
        entity.text = "555-1234".to_string();

        let finding = Finding::from_entity(&entity);

        assert_eq!(finding.entity_type, "PHONE_NUMBER");
        assert_eq!(finding.text, "555-1234");
        assert!(!finding.has_audio());
    }
}
