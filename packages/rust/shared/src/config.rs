//! Project configuration for the roadmap content pipeline.
//!
//! Config lives at `<project>/roadmap.toml`. A missing file means defaults.
//! Relative paths inside the file resolve against the file's directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, RoadmapError};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "roadmap.toml";

// ---------------------------------------------------------------------------
// Config structs (matching roadmap.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Source and output locations.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Build stage switches.
    #[serde(default)]
    pub build: BuildConfig,

    /// Glossary indexing policy.
    #[serde(default)]
    pub glossary: GlossaryConfig,

    /// Inline → library migration settings.
    #[serde(default)]
    pub migrate: MigrateConfig,
}

/// `[paths]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory of concept domain files.
    #[serde(default = "default_concepts_dir")]
    pub concepts_dir: PathBuf,

    /// Directory of track files using `ref:` syntax.
    #[serde(default = "default_tracks_dir")]
    pub tracks_dir: PathBuf,

    /// Directory of legacy inline-concept track files (migration input).
    #[serde(default = "default_legacy_dir")]
    pub legacy_dir: PathBuf,

    /// Glossary source document.
    #[serde(default = "default_glossary_file")]
    pub glossary_file: PathBuf,

    /// Where generated JSON is written.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            concepts_dir: default_concepts_dir(),
            tracks_dir: default_tracks_dir(),
            legacy_dir: default_legacy_dir(),
            glossary_file: default_glossary_file(),
            output_dir: default_output_dir(),
        }
    }
}

impl PathsConfig {
    /// Anchor every relative path at `root`.
    pub fn resolve_against(&self, root: &Path) -> Self {
        let anchor = |p: &PathBuf| if p.is_absolute() { p.clone() } else { root.join(p) };
        Self {
            concepts_dir: anchor(&self.concepts_dir),
            tracks_dir: anchor(&self.tracks_dir),
            legacy_dir: anchor(&self.legacy_dir),
            glossary_file: anchor(&self.glossary_file),
            output_dir: anchor(&self.output_dir),
        }
    }
}

fn default_concepts_dir() -> PathBuf {
    "content/concepts".into()
}
fn default_tracks_dir() -> PathBuf {
    "content/tracks".into()
}
fn default_legacy_dir() -> PathBuf {
    "content".into()
}
fn default_glossary_file() -> PathBuf {
    "content/_glossary.yaml".into()
}
fn default_output_dir() -> PathBuf {
    "src/data".into()
}

/// `[build]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Track slugs that are never built (templates, samples).
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,

    /// Write `concept-library.json`.
    #[serde(default = "default_true")]
    pub emit_concept_library: bool,

    /// Write `search-index.json`.
    #[serde(default = "default_true")]
    pub emit_search_index: bool,

    /// Write `graph-data.json`.
    #[serde(default = "default_true")]
    pub emit_graph: bool,

    /// URL prefix for track pages in the search index.
    #[serde(default = "default_route_prefix")]
    pub route_prefix: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            exclude: default_exclude(),
            emit_concept_library: true,
            emit_search_index: true,
            emit_graph: true,
            route_prefix: default_route_prefix(),
        }
    }
}

impl BuildConfig {
    /// Whether a track slug should be built.
    pub fn includes(&self, slug: &str) -> bool {
        !self.exclude.iter().any(|e| e == slug)
    }
}

fn default_exclude() -> Vec<String> {
    vec!["sample".into(), "_glossary".into()]
}
fn default_true() -> bool {
    true
}
fn default_route_prefix() -> String {
    "/roadmaps".into()
}

/// `[glossary]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlossaryConfig {
    /// Fail when two terms claim the same lookup key instead of letting the
    /// later term win.
    #[serde(default)]
    pub strict_lookup: bool,
}

/// `[migrate]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrateConfig {
    /// Migration report location (relative to the project root).
    #[serde(default = "default_report_file")]
    pub report_file: PathBuf,

    /// Domain used when no rule matches.
    #[serde(default = "default_fallback_domain")]
    pub fallback_domain: String,

    /// Preferred domains first; used when a concept occurs in several domains.
    #[serde(default)]
    pub domain_priority: Vec<String>,

    /// `_meta.description` for each generated domain file.
    #[serde(default)]
    pub domain_descriptions: BTreeMap<String, String>,

    /// Ordered assignment rules; first match wins.
    #[serde(default)]
    pub domain_rules: Vec<DomainRule>,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            report_file: default_report_file(),
            fallback_domain: default_fallback_domain(),
            domain_priority: Vec::new(),
            domain_descriptions: BTreeMap::new(),
            domain_rules: Vec::new(),
        }
    }
}

fn default_report_file() -> PathBuf {
    "migration-report.json".into()
}
fn default_fallback_domain() -> String {
    "uncategorized".into()
}

/// `[[migrate.domain_rules]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainRule {
    /// Track slug this rule applies to; any track when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track: Option<String>,

    /// Case-insensitive regex tested against the section ID; any section when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_pattern: Option<String>,

    /// Domain assigned on match.
    pub domain: String,
}

// ---------------------------------------------------------------------------
// Loaded config (file contents + where it came from)
// ---------------------------------------------------------------------------

/// A config together with the project root its paths are relative to.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    /// Project root (directory holding `roadmap.toml`).
    pub root: PathBuf,
    /// Parsed configuration.
    pub config: AppConfig,
}

impl ProjectConfig {
    /// Paths with every relative entry resolved against the project root.
    pub fn paths(&self) -> PathsConfig {
        self.config.paths.resolve_against(&self.root)
    }

    /// Migration report path resolved against the project root.
    pub fn report_path(&self) -> PathBuf {
        let report = &self.config.migrate.report_file;
        if report.is_absolute() {
            report.clone()
        } else {
            self.root.join(report)
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Path to the config file for a project root.
pub fn config_file_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE_NAME)
}

/// Load the project config. Returns defaults if the file does not exist.
pub fn load_config(root: &Path) -> Result<ProjectConfig> {
    let path = config_file_path(root);

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(ProjectConfig {
            root: root.to_path_buf(),
            config: AppConfig::default(),
        });
    }

    load_config_from(&path)
}

/// Load the config from a specific file; its directory becomes the project root.
pub fn load_config_from(path: &Path) -> Result<ProjectConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| RoadmapError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| RoadmapError::config(format!("failed to parse {}: {e}", path.display())))?;

    let root = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

    Ok(ProjectConfig { root, config })
}

/// Write a default config file into `root`. Refuses to overwrite.
/// Returns the path to the created file.
pub fn init_config(root: &Path) -> Result<PathBuf> {
    let path = config_file_path(root);
    if path.exists() {
        return Err(RoadmapError::config(format!(
            "{} already exists",
            path.display()
        )));
    }

    std::fs::create_dir_all(root).map_err(|e| RoadmapError::io(root, e))?;

    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| RoadmapError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| RoadmapError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
