//! Build orchestration for the roadmap content pipeline.
//!
//! Ties the concept library, track resolution and glossary indexing together
//! into end-to-end runs ([`pipeline::run_build`], [`pipeline::validate_project`])
//! and derives the search index, graph data and build manifest. Also hosts
//! the one-time [`migrate`] from inline concepts to the shared library.

pub mod assembler;
pub mod graph;
pub mod migrate;
pub mod pipeline;
pub mod search;

pub use pipeline::{
    BuildResult, PipelineConfig, ProgressReporter, ResolvedContent, SilentProgress,
    ValidationReport, render_outputs, resolve_content, run_build, validate_project,
};
