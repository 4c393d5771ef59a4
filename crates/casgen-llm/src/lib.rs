//! Generation backend for the casgen pipeline.
//!
//! Wraps an Azure-OpenAI-style chat-completions endpoint behind the
//! [`casgen_core::Generator`] trait. The LLM is untrusted and opaque from
//! the core's point of view: one text unit plus credentials in, an ordered
//! list of strings out. Calls are blocking and strictly sequential; the
//! orchestrator relies on call ordering for deterministic progress
//! reporting.

pub mod client;
pub mod config;
pub mod prompts;

pub use client::{parse_item_list, LlmClient};
pub use config::{LlmConfig, ModelName};
