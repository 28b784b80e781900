use tracing::debug;

use crate::error::RedactionError;
use crate::models::{is_known_entity_type, PiiEntity};

/// Validate filter parameters without touching any entities.
///
/// The orchestrator calls this before transcription starts so a bad
/// threshold or unknown entity type fails fast, before any engine is paid
/// for.
pub fn validate_filter(
    score_threshold: f64,
    allowed_types: Option<&[String]>,
) -> Result<(), RedactionError> {
    if !score_threshold.is_finite() || !(0.0..=1.0).contains(&score_threshold) {
        return Err(RedactionError::InvalidConfig(format!(
            "score_threshold must be in [0, 1], got {score_threshold}"
        )));
    }
    if let Some(types) = allowed_types {
        for entity_type in types {
            if !is_known_entity_type(entity_type) {
                return Err(RedactionError::InvalidConfig(format!(
                    "unknown entity type {entity_type:?}"
                )));
            }
        }
    }
    Ok(())
}

/// Narrow detected entities to those meeting the score threshold and, when
/// a type filter is set, one of the allowed types. Relative order is
/// preserved and entities are never mutated.
pub fn filter_entities(
    entities: Vec<PiiEntity>,
    score_threshold: f64,
    allowed_types: Option<&[String]>,
) -> Result<Vec<PiiEntity>, RedactionError> {
    validate_filter(score_threshold, allowed_types)?;

    let before = entities.len();
    let retained: Vec<PiiEntity> = entities
        .into_iter()
        .filter(|e| {
            e.score >= score_threshold
                && allowed_types
                    .map(|types| types.iter().any(|t| t == &e.entity_type))
                    .unwrap_or(true)
        })
        .collect();

    debug!(
        "filter retained {}/{} entities (threshold {})",
        retained.len(),
        before,
        score_threshold
    );
    Ok(retained)
}
