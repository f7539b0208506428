//! Checkpointed, resumable contract risk-analysis workflow engine
//!
//! The engine drives validation, risk analysis, quality critique, a
//! bounded refinement loop, an optional human-review suspension, and
//! summarization over one shared `WorkflowState` per thread, persisting
//! a checkpoint after every stage transition.

pub mod api;
pub mod arbiter;
pub mod checkpoint;
pub mod config;
pub mod db;
pub mod engine;
pub mod extract;
pub mod interrupt;
pub mod llm;
pub mod prompts;
pub mod router;
pub mod stages;
pub mod state;
