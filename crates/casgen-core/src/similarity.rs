//! Fuzzy text similarity.
//!
//! Two checkpoints are duplicates when their normalized edit-similarity
//! ratio, computed over case-folded strings, reaches a threshold. The
//! comparison is symmetric and reflexive for non-empty strings.

/// Minimum ratio above which two strings count as duplicates.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.85;

/// Normalized edit-similarity ratio in `[0, 1]`, case-insensitive.
///
/// Empty-string semantics are explicit rather than delegated: two empty
/// strings are fully similar (1.0), so vacuous items never slip through the
/// dedup as "new"; an empty string is never similar to a non-empty one.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.0,
        (false, false) => strsim::normalized_levenshtein(&a.to_lowercase(), &b.to_lowercase()),
    }
}

/// True iff the similarity ratio of `a` and `b` reaches `threshold`.
pub fn is_similar(a: &str, b: &str, threshold: f64) -> bool {
    similarity_ratio(a, b) >= threshold
}
