//! Delta resolution: which discovered voices still need a streaming release.

use tracing::debug;

use crate::voice::Voice;

/// Keep the discovered voices with no published record matching on the
/// exact (config, checkpoint, etag) tuple. A pure function: the same
/// inputs always yield the same delta, in discovery order.
///
/// An empty `published` baseline (nothing released yet) makes every
/// discovered voice new. The scan is O(discovered × published); both sets
/// stay in the dozens-to-hundreds range.
pub fn resolve_delta(discovered: &[Voice], published: &[Voice]) -> Vec<Voice> {
    discovered
        .iter()
        .filter(|voice| {
            let already = published.iter().any(|p| p.same_artifact(voice));
            if already {
                debug!(voice = %voice.name, "Already published, skipping");
            }
            !already
        })
        .cloned()
        .collect()
}
