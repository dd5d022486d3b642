//! Shared types, error model, and configuration for the roadmap content pipeline.
//!
//! This crate is the foundation depended on by all other roadmap crates.
//! It provides:
//! - [`RoadmapError`]: the unified error type
//! - Content types ([`SourceTrack`], [`ResolvedTrack`], [`ConceptEntry`], [`DomainDocument`])
//! - Configuration ([`AppConfig`], [`ProjectConfig`], config loading)
//! - YAML source reading helpers

pub mod config;
pub mod error;
pub mod source;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BuildConfig, CONFIG_FILE_NAME, DomainRule, GlossaryConfig, MigrateConfig,
    PathsConfig, ProjectConfig, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{Result, RoadmapError};
pub use source::{file_stem, list_yaml_files, read_yaml};
pub use types::{
    Concept, ConceptDefinition, ConceptEntry, ConceptOverride, ConceptRef, DEFAULT_TRACK_ORDER,
    DomainDocument, DomainMeta, Extra, Prerequisite, ResolvedTrack, Resource, Section,
    SourceTrack, Topic, Track, TrackFile, TrackMeta,
};
