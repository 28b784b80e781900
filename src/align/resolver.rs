use tracing::debug;

use crate::align::index::OffsetIndex;
use crate::models::{PiiEntity, Word};

/// Resolve the audio time range in which an entity was spoken.
///
/// Returns `(first intersecting word's start, last intersecting word's end)`
/// under strict half-open intersection: a word span `[ws, we)` intersects
/// the entity span `[start, end)` iff `ws < end && we > start`, so
/// boundary-touching spans with zero overlap never count. Returns `None`
/// when no indexed word intersects (the entity fell in an unmatched gap) or
/// when the index is degraded — a degraded index disables resolution for
/// every entity rather than timestamping some and not others.
pub fn resolve_timestamps(
    index: &OffsetIndex,
    words: &[Word],
    entity: &PiiEntity,
) -> Option<(f64, f64)> {
    if index.is_degraded() {
        return None;
    }

    let hits = index.intersecting(entity.start, entity.end);
    let (first, last) = match (hits.first(), hits.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            debug!(
                "no indexed word intersects {} entity at {}..{}",
                entity.entity_type, entity.start, entity.end
            );
            return None;
        }
    };

    let start_word = words.get(first.word_index)?;
    let end_word = words.get(last.word_index)?;
    Some((start_word.start, end_word.end))
}
