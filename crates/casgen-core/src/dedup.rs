//! Deduplication of generated checkpoints.
//!
//! Candidates are filtered both against the externally supplied reference
//! set and against earlier-accepted candidates of the same call: first
//! occurrence wins, later near-duplicates are dropped. The scan is O(n·m)
//! in reference size × candidate count; both stay in the hundreds in
//! practice, so no blocking/prefix index is kept.

use crate::similarity::is_similar;

/// Remove candidates similar (≥ `threshold`) to any reference item or to
/// any candidate already accepted into the output.
///
/// The output is a subsequence of `candidates` in original order. The
/// reference set itself is never filtered.
pub fn remove_duplicates(
    candidates: &[String],
    reference: &[String],
    threshold: f64,
) -> Vec<String> {
    let mut accepted: Vec<String> = Vec::new();

    for candidate in candidates {
        let duplicate = reference
            .iter()
            .chain(accepted.iter())
            .any(|kept| is_similar(candidate, kept, threshold));
        if duplicate {
            tracing::debug!(candidate = %candidate, "dropping near-duplicate checkpoint");
        } else {
            accepted.push(candidate.clone());
        }
    }

    accepted
}
