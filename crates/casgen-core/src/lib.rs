//! Casgen core: staged generation-and-deduplication pipeline
//!
//! Turns an extracted requirements document into three stage outputs,
//! strictly forward:
//!
//! ```text
//! raw text ──► business rules ──► checkpoints ──► test cases
//!                                     ▲
//!                    imported existing checkpoints (dedup reference)
//! ```
//!
//! The crate owns the logic that is worth testing:
//! - chunking long documents into LLM-sized windows ([`chunk_text`]) and
//!   fixed-size batches of discrete items ([`batch_items`]),
//! - fuzzy text similarity at a threshold ([`is_similar`]),
//! - order-preserving deduplication of generated checkpoints against an
//!   externally supplied reference set ([`remove_duplicates`]),
//! - the stage orchestrator ([`Orchestrator`]) driving sequential external
//!   generation calls with progress events and atomic commits,
//! - the caller-owned session state ([`PipelineState`]).
//!
//! The LLM call itself, document text extraction, and file export are
//! external collaborators behind the [`Generator`] trait and the sibling
//! crates; this crate never performs I/O.

pub mod chunk;
pub mod dedup;
pub mod error;
pub mod import;
pub mod pipeline;
pub mod similarity;
pub mod state;

pub use chunk::{batch_items, chunk_text};
pub use dedup::remove_duplicates;
pub use error::{Error, GenerationError, Result};
pub use import::{parse_existing_checkpoints, CheckpointRecognizer};
pub use pipeline::{
    Generator, Orchestrator, PipelineConfig, Stage, StageEvent, StageEventHandler, StageStatus,
};
pub use similarity::{is_similar, similarity_ratio, DEFAULT_SIMILARITY_THRESHOLD};
pub use state::{Checkpoint, PipelineState, Provenance, Rule, TestCase};

/// Default character window for chunking raw document text.
pub const DEFAULT_CHUNK_SIZE: usize = 4000;

/// Default batch size when the generation unit is a set of discrete items.
pub const DEFAULT_BATCH_SIZE: usize = 5;
