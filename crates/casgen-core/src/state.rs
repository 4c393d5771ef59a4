//! Caller-owned session state.
//!
//! One [`PipelineState`] per interactive session: created empty, mutated
//! only through stage commits, dropped at session end. Nothing is persisted
//! across process restarts and no global singleton exists; the caller
//! passes the state to each stage run explicitly.

use serde::Serialize;

/// A business rule extracted from document text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    pub text: String,
}

impl Rule {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Where a checkpoint came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Provenance {
    /// Imported from a prior/reference document; dedup ground truth,
    /// never removed.
    Existing,
    /// Produced by a generation run of this session.
    Generated,
}

/// A verifiable assertion derived from a rule or from document text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Checkpoint {
    pub text: String,
    pub provenance: Provenance,
}

/// A test case generated from one checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestCase {
    /// The checkpoint this case was generated from.
    pub checkpoint: String,
    /// Free-form body (typically markdown) returned by the generator.
    pub body: String,
}

/// The stage outputs plus the imported reference checkpoints.
///
/// Generated checkpoints are stored per producing path (from-text and
/// from-rules) so each path can replace its own output on re-run without
/// clobbering the other's.
///
/// Invariants maintained by the commit methods:
/// - `checkpoints()` is always the existing partition followed by the
///   generated partitions, in stored order;
/// - existing checkpoints are never removed by deduplication;
/// - re-running a stage fully replaces that stage's output: rules and test
///   cases wholesale, each checkpoint path its own generated partition.
///   Running one checkpoint path after the other therefore still
///   accumulates distinct points.
#[derive(Debug, Default, Serialize)]
pub struct PipelineState {
    text: String,
    rules: Vec<Rule>,
    existing_checkpoints: Vec<String>,
    text_checkpoints: Vec<String>,
    rule_checkpoints: Vec<String>,
    test_cases: Vec<TestCase>,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the extracted document text.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the imported reference set. Intentionally not deduplicated
    /// against its own contents.
    pub fn set_existing_checkpoints(&mut self, points: Vec<String>) {
        self.existing_checkpoints = points;
    }

    pub fn existing_checkpoints(&self) -> &[String] {
        &self.existing_checkpoints
    }

    /// Checkpoints accepted by the from-text path.
    pub fn text_checkpoints(&self) -> &[String] {
        &self.text_checkpoints
    }

    /// Checkpoints accepted by the from-rules path.
    pub fn rule_checkpoints(&self) -> &[String] {
        &self.rule_checkpoints
    }

    /// All generated checkpoints, from-text partition first.
    pub fn generated_checkpoints(&self) -> Vec<String> {
        self.text_checkpoints
            .iter()
            .chain(self.rule_checkpoints.iter())
            .cloned()
            .collect()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule_texts(&self) -> Vec<String> {
        self.rules.iter().map(|r| r.text.clone()).collect()
    }

    pub fn test_cases(&self) -> &[TestCase] {
        &self.test_cases
    }

    /// Existing-first merged view of the checkpoint set.
    pub fn checkpoints(&self) -> Vec<Checkpoint> {
        self.existing_checkpoints
            .iter()
            .map(|text| Checkpoint {
                text: text.clone(),
                provenance: Provenance::Existing,
            })
            .chain(
                self.text_checkpoints
                    .iter()
                    .chain(self.rule_checkpoints.iter())
                    .map(|text| Checkpoint {
                        text: text.clone(),
                        provenance: Provenance::Generated,
                    }),
            )
            .collect()
    }

    /// Merged checkpoint texts, existing-first.
    pub fn checkpoint_texts(&self) -> Vec<String> {
        self.existing_checkpoints
            .iter()
            .chain(self.text_checkpoints.iter())
            .chain(self.rule_checkpoints.iter())
            .cloned()
            .collect()
    }

    /// Full replacement of the rules stage output.
    pub(crate) fn commit_rules(&mut self, rules: Vec<String>) {
        self.rules = rules.into_iter().map(Rule::new).collect();
    }

    /// Full replacement of the from-text path's generated partition.
    pub(crate) fn commit_text_checkpoints(&mut self, points: Vec<String>) {
        self.text_checkpoints = points;
    }

    /// Full replacement of the from-rules path's generated partition.
    pub(crate) fn commit_rule_checkpoints(&mut self, points: Vec<String>) {
        self.rule_checkpoints = points;
    }

    /// Full replacement of the test-case stage output.
    pub(crate) fn commit_test_cases(&mut self, cases: Vec<TestCase>) {
        self.test_cases = cases;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoints_are_existing_first() {
        let mut state = PipelineState::new();
        state.set_existing_checkpoints(vec!["ancien".to_string()]);
        state.commit_text_checkpoints(vec!["nouveau".to_string()]);

        let merged = state.checkpoints();
        assert_eq!(merged[0].text, "ancien");
        assert_eq!(merged[0].provenance, Provenance::Existing);
        assert_eq!(merged[1].text, "nouveau");
        assert_eq!(merged[1].provenance, Provenance::Generated);
    }

    #[test]
    fn committing_rules_replaces_prior_rules() {
        let mut state = PipelineState::new();
        state.commit_rules(vec!["r1".to_string(), "r2".to_string()]);
        state.commit_rules(vec!["r3".to_string()]);
        assert_eq!(state.rule_texts(), vec!["r3"]);
    }

    #[test]
    fn checkpoint_paths_replace_only_their_own_partition() {
        let mut state = PipelineState::new();
        state.commit_text_checkpoints(vec!["a".to_string()]);
        state.commit_rule_checkpoints(vec!["b".to_string()]);
        assert_eq!(state.generated_checkpoints(), ["a", "b"]);

        state.commit_text_checkpoints(vec!["c".to_string()]);
        assert_eq!(state.generated_checkpoints(), ["c", "b"]);
    }
}
