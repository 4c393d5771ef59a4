//! Stage orchestrator.
//!
//! Each stage run partitions its input, invokes the external generation
//! function once per partition in order, aggregates the per-partition
//! results in a run-local buffer, and commits atomically at the end. A
//! failed partition aborts the remaining ones and discards the buffer;
//! state committed by earlier runs is untouched, so the caller can simply
//! re-invoke the stage.
//!
//! Calls are strictly sequential and blocking: external call ordering must
//! stay deterministic for progress reporting, and the commit is
//! atomic-at-end so there is nothing to gain from fan-out. Progress is
//! reported through registered event handlers; handlers return `()` so
//! reporting can neither fail nor abort a run.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::chunk::{batch_items, chunk_text};
use crate::dedup::remove_duplicates;
use crate::error::{Error, GenerationError, Result};
use crate::state::{PipelineState, TestCase};
use crate::{DEFAULT_BATCH_SIZE, DEFAULT_CHUNK_SIZE, DEFAULT_SIMILARITY_THRESHOLD};

/// External generation boundary.
///
/// Implemented by the LLM client crate; mocked in tests. Each method maps
/// one text unit (a chunk, a batch of rules, or a single checkpoint) to an
/// ordered sequence of generated strings.
pub trait Generator {
    fn generate_rules(&self, chunk: &str) -> std::result::Result<Vec<String>, GenerationError>;
    fn generate_checkpoints(
        &self,
        items: &[String],
    ) -> std::result::Result<Vec<String>, GenerationError>;
    fn generate_test_cases(
        &self,
        items: &[String],
    ) -> std::result::Result<Vec<String>, GenerationError>;
}

/// The four stage runs the orchestrator can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Stage {
    Rules,
    CheckpointsFromText,
    CheckpointsFromRules,
    TestCases,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Rules => "règles de gestion",
            Stage::CheckpointsFromText => "points de contrôle (texte)",
            Stage::CheckpointsFromRules => "points de contrôle (règles)",
            Stage::TestCases => "cas de test",
        }
    }
}

/// Lifecycle of a stage: `Idle → Running → {Completed, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StageStatus {
    Idle,
    Running,
    Completed,
    Failed,
}

/// Events emitted synchronously during a stage run.
#[derive(Debug, Clone, Serialize)]
pub enum StageEvent {
    Started {
        stage: Stage,
        total_partitions: usize,
    },
    PartitionDone {
        stage: Stage,
        processed: usize,
        total: usize,
    },
    Completed {
        stage: Stage,
        produced: usize,
    },
    Failed {
        stage: Stage,
        message: String,
    },
}

/// Callback for stage events.
pub type StageEventHandler = Box<dyn Fn(&StageEvent)>;

/// Partitioning and dedup knobs for a session.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Character window for chunking raw text.
    pub chunk_size: usize,
    /// Batch size when generating from discrete items (rules).
    pub batch_size: usize,
    /// Minimum similarity ratio treated as duplicate.
    pub similarity_threshold: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

impl PipelineConfig {
    fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Configuration(
                "chunk size must be at least 1".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(Error::Configuration(
                "batch size must be at least 1".to_string(),
            ));
        }
        if !(self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0) {
            return Err(Error::Configuration(format!(
                "similarity threshold must be in (0, 1], got {}",
                self.similarity_threshold
            )));
        }
        Ok(())
    }
}

/// Drives the stage runs against a caller-owned [`PipelineState`].
///
/// One orchestrator per session; stage runs must be serialized by the
/// caller (the state is touched by exactly one in-flight run at a time).
pub struct Orchestrator<G> {
    generator: G,
    config: PipelineConfig,
    handlers: Vec<StageEventHandler>,
    statuses: BTreeMap<Stage, StageStatus>,
}

impl<G: Generator> Orchestrator<G> {
    /// Rejects invalid partition sizes and thresholds eagerly.
    pub fn new(generator: G, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            generator,
            config,
            handlers: Vec::new(),
            statuses: BTreeMap::new(),
        })
    }

    /// Register a progress/event handler.
    pub fn on_event<F>(&mut self, handler: F)
    where
        F: Fn(&StageEvent) + 'static,
    {
        self.handlers.push(Box::new(handler));
    }

    pub fn status(&self, stage: Stage) -> StageStatus {
        self.statuses.get(&stage).copied().unwrap_or(StageStatus::Idle)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn emit(&self, event: StageEvent) {
        for handler in &self.handlers {
            handler(&event);
        }
    }

    fn set_status(&mut self, stage: Stage, status: StageStatus) {
        self.statuses.insert(stage, status);
    }

    /// Run the partitioned calls for one stage, collecting per-partition
    /// outputs. The first failed partition aborts the rest; the partial
    /// buffer is dropped by the caller.
    fn run_partitions<F>(
        &self,
        stage: Stage,
        total: usize,
        mut call: F,
    ) -> std::result::Result<Vec<Vec<String>>, GenerationError>
    where
        F: FnMut(usize) -> std::result::Result<Vec<String>, GenerationError>,
    {
        self.emit(StageEvent::Started {
            stage,
            total_partitions: total,
        });

        let mut outputs = Vec::with_capacity(total);
        for index in 0..total {
            let items = call(index)?;
            tracing::debug!(
                stage = stage.label(),
                partition = index + 1,
                total,
                produced = items.len(),
                "partition processed"
            );
            outputs.push(items);
            self.emit(StageEvent::PartitionDone {
                stage,
                processed: index + 1,
                total,
            });
        }
        Ok(outputs)
    }

    fn fail(&mut self, stage: Stage, error: GenerationError) -> Error {
        tracing::warn!(stage = stage.label(), error = %error, "stage run aborted");
        self.set_status(stage, StageStatus::Failed);
        self.emit(StageEvent::Failed {
            stage,
            message: error.to_string(),
        });
        Error::Generation(error)
    }

    fn complete(&mut self, stage: Stage, produced: usize) {
        tracing::info!(stage = stage.label(), produced, "stage run committed");
        self.set_status(stage, StageStatus::Completed);
        self.emit(StageEvent::Completed { stage, produced });
    }

    /// Rules stage: chunk the document text, generate rules per chunk,
    /// strip blank entries, commit as the full replacement of the rules.
    ///
    /// Returns the number of committed rules.
    pub fn run_rules(&mut self, state: &mut PipelineState) -> Result<usize> {
        let chunks = chunk_text(state.text(), self.config.chunk_size)?;
        let stage = Stage::Rules;
        self.set_status(stage, StageStatus::Running);

        let outcome = {
            let generator = &self.generator;
            self.run_partitions(stage, chunks.len(), |i| generator.generate_rules(&chunks[i]))
        };

        match outcome {
            Ok(outputs) => {
                let rules: Vec<String> = outputs
                    .into_iter()
                    .flatten()
                    .map(|r| r.trim().to_string())
                    .filter(|r| !r.is_empty())
                    .collect();
                let produced = rules.len();
                state.commit_rules(rules);
                self.complete(stage, produced);
                Ok(produced)
            }
            Err(e) => Err(self.fail(stage, e)),
        }
    }

    /// Checkpoints stage, from raw text: same chunking as the rules stage,
    /// one `generate_checkpoints([chunk])` call per chunk.
    ///
    /// Returns the number of newly accepted (non-duplicate) checkpoints.
    pub fn run_checkpoints_from_text(&mut self, state: &mut PipelineState) -> Result<usize> {
        let chunks = chunk_text(state.text(), self.config.chunk_size)?;
        let stage = Stage::CheckpointsFromText;
        self.set_status(stage, StageStatus::Running);

        let outcome = {
            let generator = &self.generator;
            self.run_partitions(stage, chunks.len(), |i| {
                generator.generate_checkpoints(&chunks[i..i + 1])
            })
        };

        match outcome {
            Ok(outputs) => Ok(self.commit_checkpoints(stage, state, outputs)),
            Err(e) => Err(self.fail(stage, e)),
        }
    }

    /// Checkpoints stage, from the committed rules: batches of
    /// `batch_size` rules, one call per batch. Shares the commit rule
    /// with the text path, so running one path after the other
    /// accumulates distinct checkpoints without re-introducing duplicates.
    pub fn run_checkpoints_from_rules(&mut self, state: &mut PipelineState) -> Result<usize> {
        let batches = batch_items(&state.rule_texts(), self.config.batch_size)?;
        let stage = Stage::CheckpointsFromRules;
        self.set_status(stage, StageStatus::Running);

        let outcome = {
            let generator = &self.generator;
            self.run_partitions(stage, batches.len(), |i| {
                generator.generate_checkpoints(&batches[i])
            })
        };

        match outcome {
            Ok(outputs) => Ok(self.commit_checkpoints(stage, state, outputs)),
            Err(e) => Err(self.fail(stage, e)),
        }
    }

    /// Shared commit rule for both checkpoint paths: dedup the aggregated
    /// candidates against the existing set and the other path's accepted
    /// points, then replace this path's generated partition. Replacement
    /// keeps a re-run from accumulating its own earlier output, while the
    /// two paths still accumulate relative to each other.
    fn commit_checkpoints(
        &mut self,
        stage: Stage,
        state: &mut PipelineState,
        outputs: Vec<Vec<String>>,
    ) -> usize {
        let candidates: Vec<String> = outputs.into_iter().flatten().collect();
        let other_path = match stage {
            Stage::CheckpointsFromText => state.rule_checkpoints(),
            Stage::CheckpointsFromRules => state.text_checkpoints(),
            _ => unreachable!("only checkpoint stages commit checkpoints"),
        };
        let reference: Vec<String> = state
            .existing_checkpoints()
            .iter()
            .chain(other_path.iter())
            .cloned()
            .collect();
        let new_points =
            remove_duplicates(&candidates, &reference, self.config.similarity_threshold);
        let produced = new_points.len();
        match stage {
            Stage::CheckpointsFromText => state.commit_text_checkpoints(new_points),
            _ => state.commit_rule_checkpoints(new_points),
        }
        self.complete(stage, produced);
        produced
    }

    /// Test-case stage: one generation call per stored checkpoint
    /// (existing + generated, in their stored order) so the committed
    /// cases stay index-aligned with the checkpoints that produced them.
    pub fn run_test_cases(&mut self, state: &mut PipelineState) -> Result<usize> {
        let checkpoints = state.checkpoint_texts();
        let stage = Stage::TestCases;
        self.set_status(stage, StageStatus::Running);

        let outcome = {
            let generator = &self.generator;
            self.run_partitions(stage, checkpoints.len(), |i| {
                generator.generate_test_cases(&checkpoints[i..i + 1])
            })
        };

        match outcome {
            Ok(outputs) => {
                let cases: Vec<TestCase> = checkpoints
                    .iter()
                    .zip(outputs)
                    .map(|(checkpoint, body)| TestCase {
                        checkpoint: checkpoint.clone(),
                        body: body.join("\n\n"),
                    })
                    .collect();
                let produced = cases.len();
                state.commit_test_cases(cases);
                self.complete(stage, produced);
                Ok(produced)
            }
            Err(e) => Err(self.fail(stage, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::is_similar;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Scripted generator: returns canned items per call, optionally
    /// failing on a given 1-based call index per method.
    #[derive(Default)]
    struct MockGenerator {
        rules_calls: RefCell<usize>,
        checkpoint_calls: RefCell<usize>,
        test_case_calls: RefCell<usize>,
        fail_rules_on: Option<usize>,
        checkpoint_script: Vec<Vec<String>>,
    }

    impl MockGenerator {
        fn with_checkpoint_script(script: &[&[&str]]) -> Self {
            Self {
                checkpoint_script: script
                    .iter()
                    .map(|items| items.iter().map(|s| s.to_string()).collect())
                    .collect(),
                ..Self::default()
            }
        }
    }

    impl Generator for MockGenerator {
        fn generate_rules(
            &self,
            chunk: &str,
        ) -> std::result::Result<Vec<String>, GenerationError> {
            let mut calls = self.rules_calls.borrow_mut();
            *calls += 1;
            if Some(*calls) == self.fail_rules_on {
                return Err(GenerationError::Api("quota exceeded".to_string()));
            }
            Ok(vec![
                format!("règle {} de {}", calls, chunk.chars().take(4).collect::<String>()),
                "   ".to_string(), // blank entry, must be stripped
            ])
        }

        fn generate_checkpoints(
            &self,
            _items: &[String],
        ) -> std::result::Result<Vec<String>, GenerationError> {
            let mut calls = self.checkpoint_calls.borrow_mut();
            let out = self
                .checkpoint_script
                .get(*calls)
                .cloned()
                .unwrap_or_default();
            *calls += 1;
            Ok(out)
        }

        fn generate_test_cases(
            &self,
            items: &[String],
        ) -> std::result::Result<Vec<String>, GenerationError> {
            *self.test_case_calls.borrow_mut() += 1;
            Ok(vec![format!("## Cas de test\nPoint : {}", items[0])])
        }
    }

    fn small_config() -> PipelineConfig {
        PipelineConfig {
            chunk_size: 10,
            batch_size: 2,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }

    #[test]
    fn invalid_config_is_rejected_eagerly() {
        let bad = PipelineConfig {
            chunk_size: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            Orchestrator::new(MockGenerator::default(), bad),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn rules_run_strips_blanks_and_replaces_prior_output() {
        let mut orchestrator =
            Orchestrator::new(MockGenerator::default(), small_config()).unwrap();
        let mut state = PipelineState::new();
        state.set_text("a".repeat(25)); // 3 chunks of ≤ 10

        let produced = orchestrator.run_rules(&mut state).unwrap();
        assert_eq!(produced, 3); // one non-blank rule per chunk
        assert_eq!(state.rules().len(), 3);
        assert_eq!(orchestrator.status(Stage::Rules), StageStatus::Completed);

        // Second run fully replaces the first.
        orchestrator.run_rules(&mut state).unwrap();
        assert_eq!(state.rules().len(), 3);
    }

    #[test]
    fn failed_partition_leaves_previously_committed_rules_untouched() {
        let mut orchestrator =
            Orchestrator::new(MockGenerator::default(), small_config()).unwrap();
        let mut state = PipelineState::new();
        state.set_text("a".repeat(25));
        orchestrator.run_rules(&mut state).unwrap();
        let committed = state.rule_texts();

        // New orchestrator whose generator fails on chunk 2 of 3.
        let failing = MockGenerator {
            fail_rules_on: Some(2),
            ..MockGenerator::default()
        };
        let mut orchestrator = Orchestrator::new(failing, small_config()).unwrap();
        let result = orchestrator.run_rules(&mut state);

        assert!(matches!(result, Err(Error::Generation(_))));
        assert_eq!(orchestrator.status(Stage::Rules), StageStatus::Failed);
        assert_eq!(state.rule_texts(), committed);
    }

    #[test]
    fn checkpoint_commit_is_existing_first_and_dedup_holds() {
        let generator = MockGenerator::with_checkpoint_script(&[&[
            "Vérifier que le solde est positif.", // near-dupe of existing
            "Vérifier que l'utilisateur est connecté",
        ]]);
        let mut orchestrator = Orchestrator::new(generator, small_config()).unwrap();
        let mut state = PipelineState::new();
        state.set_text("cahier des"); // one chunk
        state.set_existing_checkpoints(vec!["Vérifier que le solde est positif".to_string()]);

        let produced = orchestrator.run_checkpoints_from_text(&mut state).unwrap();
        assert_eq!(produced, 1);

        let merged = state.checkpoint_texts();
        assert_eq!(merged[0], "Vérifier que le solde est positif");
        assert_eq!(merged[1], "Vérifier que l'utilisateur est connecté");
        for new_point in &state.generated_checkpoints() {
            for existing in state.existing_checkpoints() {
                assert!(!is_similar(new_point, existing, DEFAULT_SIMILARITY_THRESHOLD));
            }
        }
    }

    #[test]
    fn rerunning_a_checkpoint_path_replaces_its_own_output() {
        let generator = MockGenerator::with_checkpoint_script(&[
            &["Vérifier que le solde est positif"],
            &["Vérifier la limite quotidienne de retrait"],
        ]);
        let mut orchestrator = Orchestrator::new(generator, small_config()).unwrap();
        let mut state = PipelineState::new();
        state.set_text("cahier des"); // one chunk, one call per run

        orchestrator.run_checkpoints_from_text(&mut state).unwrap();
        orchestrator.run_checkpoints_from_text(&mut state).unwrap();

        // The second run's output stands alone; the first run's points are
        // not silently accumulated.
        assert_eq!(
            state.generated_checkpoints(),
            ["Vérifier la limite quotidienne de retrait"]
        );
    }

    #[test]
    fn rerunning_one_path_keeps_the_other_paths_output() {
        let generator = MockGenerator::with_checkpoint_script(&[
            &["Vérifier que l'utilisateur est connecté"], // from-text run
            &["Vérifier la limite de retrait"],           // from-rules run 1
            &["Vérifier la date de validité"],            // from-rules run 2
        ]);
        let mut orchestrator = Orchestrator::new(generator, small_config()).unwrap();
        let mut state = PipelineState::new();
        state.set_text("cahier des");
        state.commit_rules(vec!["r1".to_string()]);

        orchestrator.run_checkpoints_from_text(&mut state).unwrap();
        orchestrator.run_checkpoints_from_rules(&mut state).unwrap();
        orchestrator.run_checkpoints_from_rules(&mut state).unwrap();

        assert_eq!(
            state.generated_checkpoints(),
            [
                "Vérifier que l'utilisateur est connecté",
                "Vérifier la date de validité"
            ]
        );
    }

    #[test]
    fn second_checkpoint_path_does_not_reintroduce_accepted_points() {
        let generator = MockGenerator::with_checkpoint_script(&[
            // from-text chunk
            &["Vérifier que l'utilisateur est connecté"],
            // from-rules batch: one duplicate of the accepted point, one new
            &[
                "Vérifier que l'utilisateur est connecté.",
                "Vérifier la limite de retrait",
            ],
        ]);
        let mut orchestrator = Orchestrator::new(generator, small_config()).unwrap();
        let mut state = PipelineState::new();
        state.set_text("cahier des");
        state.commit_rules(vec!["r1".to_string()]);

        orchestrator.run_checkpoints_from_text(&mut state).unwrap();
        let produced = orchestrator.run_checkpoints_from_rules(&mut state).unwrap();

        assert_eq!(produced, 1);
        assert_eq!(
            state.generated_checkpoints(),
            [
                "Vérifier que l'utilisateur est connecté",
                "Vérifier la limite de retrait"
            ]
        );
    }

    #[test]
    fn test_cases_align_one_to_one_with_checkpoints() {
        let mut orchestrator =
            Orchestrator::new(MockGenerator::default(), small_config()).unwrap();
        let mut state = PipelineState::new();
        state.set_existing_checkpoints(vec!["ancien point".to_string()]);
        state.commit_text_checkpoints(vec!["nouveau point".to_string()]);

        let produced = orchestrator.run_test_cases(&mut state).unwrap();
        assert_eq!(produced, 2);

        let checkpoints = state.checkpoint_texts();
        assert_eq!(state.test_cases().len(), checkpoints.len());
        for (case, checkpoint) in state.test_cases().iter().zip(&checkpoints) {
            assert_eq!(&case.checkpoint, checkpoint);
            assert!(case.body.contains(checkpoint.as_str()));
        }
    }

    #[test]
    fn events_report_progress_per_partition() {
        let events: Rc<RefCell<Vec<StageEvent>>> = Rc::default();
        let sink = Rc::clone(&events);

        let mut orchestrator =
            Orchestrator::new(MockGenerator::default(), small_config()).unwrap();
        orchestrator.on_event(move |event| sink.borrow_mut().push(event.clone()));

        let mut state = PipelineState::new();
        state.set_text("a".repeat(15)); // 2 chunks
        orchestrator.run_rules(&mut state).unwrap();

        let events = events.borrow();
        assert!(matches!(
            events[0],
            StageEvent::Started { total_partitions: 2, .. }
        ));
        assert!(matches!(
            events[1],
            StageEvent::PartitionDone { processed: 1, total: 2, .. }
        ));
        assert!(matches!(
            events[2],
            StageEvent::PartitionDone { processed: 2, total: 2, .. }
        ));
        assert!(matches!(events[3], StageEvent::Completed { .. }));
    }

    #[test]
    fn empty_text_commits_empty_rules_without_error() {
        let mut orchestrator =
            Orchestrator::new(MockGenerator::default(), small_config()).unwrap();
        let mut state = PipelineState::new();

        let produced = orchestrator.run_rules(&mut state).unwrap();
        assert_eq!(produced, 0);
        assert_eq!(orchestrator.status(Stage::Rules), StageStatus::Completed);
    }
}
