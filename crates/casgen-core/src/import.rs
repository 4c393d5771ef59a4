//! Import of externally supplied checkpoints.
//!
//! A prior document's checkpoints arrive as raw extracted text; a line is
//! accepted as a checkpoint only when it starts with a recognized marker.
//! The marker set is configurable; the default set mirrors the documents
//! seen so far and is not assumed exhaustive. When several patterns could
//! match, the first registered one wins.

use crate::error::{Error, Result};
use regex::Regex;

/// Default marker patterns, tried in order: numbered list (`1.` / `2)`),
/// bullet characters, French verification cue words.
const DEFAULT_MARKERS: [&str; 3] = [
    r"^\d+[.)]\s+",
    r"^[•►]\s+",
    r"(?i)^(?:vérifier|verifier|s['’]?assurer)\s+",
];

/// Line-start marker recognizer for imported checkpoint text.
pub struct CheckpointRecognizer {
    markers: Vec<Regex>,
}

impl Default for CheckpointRecognizer {
    fn default() -> Self {
        Self {
            // Literal patterns, compilation cannot fail.
            markers: DEFAULT_MARKERS
                .iter()
                .map(|p| Regex::new(p).unwrap())
                .collect(),
        }
    }
}

impl CheckpointRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recognizer with no default markers; combine with [`with_marker`].
    ///
    /// [`with_marker`]: Self::with_marker
    pub fn empty() -> Self {
        Self { markers: Vec::new() }
    }

    /// Append a marker pattern. The pattern should anchor at line start;
    /// the matched prefix is stripped from accepted lines.
    pub fn with_marker(mut self, pattern: &str) -> Result<Self> {
        let re = Regex::new(pattern)
            .map_err(|e| Error::Configuration(format!("invalid marker pattern {pattern:?}: {e}")))?;
        self.markers.push(re);
        Ok(self)
    }

    /// Accept `line` iff a marker matches at its start; returns the line
    /// with the marker prefix stripped, or `None`.
    pub fn recognize(&self, line: &str) -> Option<String> {
        let line = line.trim();
        for marker in &self.markers {
            if let Some(m) = marker.find(line) {
                if m.start() == 0 {
                    let stripped = line[m.end()..].trim();
                    if !stripped.is_empty() {
                        return Some(stripped.to_string());
                    }
                    return None;
                }
            }
        }
        None
    }

    /// Split `raw_text` into lines and keep the recognized checkpoints, in
    /// line order. The result is used as the dedup reference set and is
    /// never deduplicated against its own contents.
    pub fn parse(&self, raw_text: &str) -> Vec<String> {
        raw_text
            .lines()
            .filter_map(|line| self.recognize(line))
            .collect()
    }
}

/// [`CheckpointRecognizer::parse`] with the default marker set.
pub fn parse_existing_checkpoints(raw_text: &str) -> Vec<String> {
    CheckpointRecognizer::default().parse(raw_text)
}
