//! Partitioning of generation input.
//!
//! Two units of work exist: a window of raw document text (one LLM call per
//! window) and a batch of already-discrete items such as rules (one call per
//! batch). Both are pure partitions: no overlap, no trimming, concatenation
//! reconstructs the input exactly.

use crate::error::{Error, Result};

/// Split `text` into contiguous windows of at most `max_len` characters.
///
/// Boundaries are raw character positions; sentences and words are not
/// respected. Slicing is done on `char`s so multi-byte text never splits a
/// code point. Empty text yields an empty vector (zero iterations
/// downstream, not an error).
pub fn chunk_text(text: &str, max_len: usize) -> Result<Vec<String>> {
    if max_len == 0 {
        return Err(Error::Configuration(
            "chunk size must be at least 1".to_string(),
        ));
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0usize;

    for ch in text.chars() {
        current.push(ch);
        count += 1;
        if count == max_len {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    Ok(chunks)
}

/// Group `items` into ordered sub-sequences of at most `batch_size` elements.
///
/// Order within and across batches matches the input; concatenating the
/// batches reconstructs the input exactly.
pub fn batch_items<T: Clone>(items: &[T], batch_size: usize) -> Result<Vec<Vec<T>>> {
    if batch_size == 0 {
        return Err(Error::Configuration(
            "batch size must be at least 1".to_string(),
        ));
    }

    Ok(items.chunks(batch_size).map(|b| b.to_vec()).collect())
}
