//! End-to-end build: library → resolved tracks → glossary → derived indexes
//! → output directory.
//!
//! Every stage runs in memory first. Nothing is written until all stages
//! have succeeded, so a fatal error never leaves a half-built output.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use roadmap_glossary::{GlossaryIndexer, GlossaryOutput, build_glossary, load_glossary};
use roadmap_library::{
    ConceptLibrary, check_topic_ids, find_duplicate_topic_ids, find_unresolved, load_library,
    load_tracks, load_tracks_partial, resolve_track,
};
use roadmap_shared::{
    BuildConfig, Concept, ConceptEntry, GlossaryConfig, PathsConfig, Prerequisite, ProjectConfig,
    Result, RoadmapError, TrackFile,
};

use crate::assembler::{
    self, BuildCounts, BuildManifest, CONCEPT_LIBRARY_FILE, GLOSSARY_FILE, GRAPH_FILE,
    OutputFile, RESERVED_OUTPUTS, SEARCH_INDEX_FILE, track_file_name,
};
use crate::graph::build_graph;
use crate::search::build_search_index;

/// Configuration for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Source and output locations, already resolved against the project root.
    pub paths: PathsConfig,
    pub build: BuildConfig,
    pub glossary: GlossaryConfig,
    /// Recorded in the build manifest.
    pub tool_version: String,
}

impl PipelineConfig {
    pub fn from_project(project: &ProjectConfig, tool_version: impl Into<String>) -> Self {
        Self {
            paths: project.paths(),
            build: project.config.build.clone(),
            glossary: project.config.glossary.clone(),
            tool_version: tool_version.into(),
        }
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each track is resolved.
    fn track_resolved(&self, slug: &str, current: usize, total: usize);
    /// Called after each output file is written.
    fn file_written(&self, path: &str, current: usize, total: usize);
    /// Called once with a one-line summary when the run completes.
    fn done(&self, summary: &str);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn track_resolved(&self, _slug: &str, _current: usize, _total: usize) {}
    fn file_written(&self, _path: &str, _current: usize, _total: usize) {}
    fn done(&self, _summary: &str) {}
}

// ---------------------------------------------------------------------------
// In-memory stages
// ---------------------------------------------------------------------------

/// Everything the build derives from sources, before rendering.
#[derive(Debug)]
pub struct ResolvedContent {
    pub library: ConceptLibrary,
    pub tracks: Vec<TrackFile<Concept>>,
    /// `None` when the glossary source is missing.
    pub glossary: Option<GlossaryOutput>,
}

impl ResolvedContent {
    pub fn counts(&self) -> BuildCounts {
        let topics = self.tracks.iter().map(|t| t.track.topics().count()).sum();
        let concepts = self
            .tracks
            .iter()
            .flat_map(|t| t.track.topics())
            .map(|(_, topic)| topic.concepts.len())
            .sum();
        BuildCounts {
            tracks: self.tracks.len(),
            topics,
            concepts,
            glossary_terms: self.glossary.as_ref().map(|g| g.terms.len()),
        }
    }
}

fn check_reserved_slugs<C>(tracks: &[TrackFile<C>]) -> Result<()> {
    for file in tracks {
        let name = track_file_name(&file.slug);
        if RESERVED_OUTPUTS.contains(&name.as_str()) {
            return Err(RoadmapError::validation(format!(
                "track \"{}\" would overwrite the generated {name}",
                file.slug
            )));
        }
    }
    Ok(())
}

/// Load, validate and resolve all content, and index the glossary.
#[instrument(skip_all, fields(tracks_dir = %config.paths.tracks_dir.display()))]
pub fn resolve_content(
    config: &PipelineConfig,
    progress: &dyn ProgressReporter,
) -> Result<ResolvedContent> {
    progress.phase("Loading concept library");
    let library = load_library(&config.paths.concepts_dir)?;

    progress.phase("Loading tracks");
    let sources = load_tracks(&config.paths.tracks_dir, &config.build)?;
    check_topic_ids(&sources)?;
    check_reserved_slugs(&sources)?;

    progress.phase("Resolving concept references");
    let total = sources.len();
    let mut tracks = Vec::with_capacity(total);
    for (i, source) in sources.iter().enumerate() {
        tracks.push(resolve_track(source, &library)?);
        progress.track_resolved(&source.slug, i + 1, total);
    }

    progress.phase("Indexing glossary");
    let glossary = match build_glossary(&config.paths.glossary_file, &tracks, &config.glossary) {
        Ok(output) => Some(output),
        Err(e) if !e.is_fatal() => {
            warn!(error = %e, "skipping glossary");
            None
        }
        Err(e) => return Err(e),
    };

    Ok(ResolvedContent {
        library,
        tracks,
        glossary,
    })
}

/// Render every output document, in write order.
pub fn render_outputs(content: &ResolvedContent, build: &BuildConfig) -> Result<Vec<OutputFile>> {
    let mut files = Vec::new();

    for file in &content.tracks {
        files.push(OutputFile::json(track_file_name(&file.slug), &file.track)?);
    }

    if let Some(glossary) = &content.glossary {
        files.push(OutputFile::json(GLOSSARY_FILE, glossary)?);
    }

    let exported = content.library.export();
    if build.emit_concept_library {
        files.push(OutputFile::json(CONCEPT_LIBRARY_FILE, &exported)?);
    }

    if build.emit_search_index {
        let index = build_search_index(
            content.glossary.as_ref(),
            &exported,
            &content.tracks,
            &build.route_prefix,
        );
        files.push(OutputFile::json(SEARCH_INDEX_FILE, &index)?);
    }

    if build.emit_graph {
        files.push(OutputFile::json(GRAPH_FILE, &build_graph(&content.tracks))?);
    }

    Ok(files)
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

/// Result of a build.
#[derive(Debug)]
pub struct BuildResult {
    pub output_dir: PathBuf,
    pub manifest: BuildManifest,
    pub elapsed: Duration,
}

/// Run the full build and write all outputs.
#[instrument(skip_all, fields(output_dir = %config.paths.output_dir.display()))]
pub fn run_build(config: &PipelineConfig, progress: &dyn ProgressReporter) -> Result<BuildResult> {
    let start = Instant::now();
    info!("starting build");

    let content = resolve_content(config, progress)?;

    progress.phase("Rendering outputs");
    let files = render_outputs(&content, &config.build)?;

    progress.phase("Writing outputs");
    let assembled = assembler::assemble(
        &config.paths.output_dir,
        &files,
        content.counts(),
        &config.tool_version,
    )?;
    for (i, file) in files.iter().enumerate() {
        progress.file_written(&file.filename, i + 1, files.len());
    }

    let result = BuildResult {
        output_dir: assembled.output_dir,
        manifest: assembled.manifest,
        elapsed: start.elapsed(),
    };

    let counts = &result.manifest.counts;
    info!(
        tracks = counts.tracks,
        topics = counts.topics,
        concepts = counts.concepts,
        glossary_terms = ?counts.glossary_terms,
        elapsed_ms = result.elapsed.as_millis() as u64,
        "build complete"
    );
    progress.done(&format!(
        "{} tracks, {} topics, {} concepts",
        counts.tracks, counts.topics, counts.concepts
    ));

    Ok(result)
}

// ---------------------------------------------------------------------------
// Validate
// ---------------------------------------------------------------------------

/// Findings of a validation run.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub tracks: usize,
    pub concepts: usize,
    /// `None` when the glossary is missing or invalid.
    pub glossary_terms: Option<usize>,
    /// Conditions that would make a build fail.
    pub problems: Vec<RoadmapError>,
    /// Conditions a build tolerates.
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Check library, tracks and glossary without writing anything.
///
/// Unlike a build, keeps going after a problem so every issue is reported.
#[instrument(skip_all)]
pub fn validate_project(config: &PipelineConfig, progress: &dyn ProgressReporter) -> ValidationReport {
    let mut report = ValidationReport::default();

    progress.phase("Checking concept library");
    let library = match load_library(&config.paths.concepts_dir) {
        Ok(library) => {
            report.concepts = library.len();
            Some(library)
        }
        Err(e) => {
            report.problems.push(e);
            None
        }
    };

    progress.phase("Checking tracks");
    let tracks: Vec<TrackFile<ConceptEntry>> =
        match load_tracks_partial(&config.paths.tracks_dir, &config.build) {
            Ok((tracks, failures)) => {
                report.problems.extend(failures);
                tracks
            }
            Err(e) => {
                report.problems.push(e);
                Vec::new()
            }
        };
    report.tracks = tracks.len();

    for (topic, slugs) in find_duplicate_topic_ids(&tracks) {
        report.problems.push(RoadmapError::DuplicateTopicId {
            topic,
            tracks: slugs,
        });
    }
    if let Err(e) = check_reserved_slugs(&tracks) {
        report.problems.push(e);
    }
    if let Some(library) = &library {
        for file in &tracks {
            report
                .problems
                .extend(find_unresolved(file, library).into_iter().map(RoadmapError::from));
        }
    }
    report.warnings.extend(dangling_prerequisites(&tracks));

    progress.phase("Checking glossary");
    match load_glossary(&config.paths.glossary_file)
        .and_then(|entries| GlossaryIndexer::new(entries, &config.glossary))
    {
        Ok(indexer) => report.glossary_terms = Some(indexer.term_count()),
        Err(e) if !e.is_fatal() => report.warnings.push(e.to_string()),
        Err(e) => report.problems.push(e),
    }

    info!(
        problems = report.problems.len(),
        warnings = report.warnings.len(),
        "validation complete"
    );
    progress.done(&format!(
        "{} problem(s), {} warning(s)",
        report.problems.len(),
        report.warnings.len()
    ));
    report
}

/// Linked prerequisites whose target topic does not exist.
fn dangling_prerequisites<C>(tracks: &[TrackFile<C>]) -> Vec<String> {
    let known: std::collections::HashSet<String> = tracks
        .iter()
        .flat_map(|f| f.track.topics().map(move |(_, t)| format!("{}/{}", f.slug, t.id)))
        .collect();

    let mut warnings = Vec::new();
    for file in tracks {
        for (_, topic) in file.track.topics() {
            for raw in &topic.prerequisites {
                if let Some(node) = Prerequisite::parse(raw).node_id() {
                    if !known.contains(&node) {
                        warnings.push(format!(
                            "{}/{}: prerequisite \"{raw}\" points at an unknown topic",
                            file.slug, topic.id
                        ));
                    }
                }
            }
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn fixture_config(output_dir: PathBuf) -> PipelineConfig {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures");
        PipelineConfig {
            paths: PathsConfig {
                concepts_dir: root.join("content/concepts"),
                tracks_dir: root.join("content/tracks"),
                legacy_dir: root.join("legacy"),
                glossary_file: root.join("content/_glossary.yaml"),
                output_dir,
            },
            build: BuildConfig::default(),
            glossary: GlossaryConfig::default(),
            tool_version: "0.1.0-test".into(),
        }
    }

    fn temp_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("roadmap-{label}-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn resolve_content_from_fixtures() {
        let content = resolve_content(&fixture_config(PathBuf::new()), &SilentProgress).unwrap();
        let counts = content.counts();

        assert_eq!(counts.tracks, 2);
        assert_eq!(counts.topics, 6);
        assert_eq!(counts.glossary_terms, Some(4));
        assert_eq!(content.library.len(), 6);
    }

    #[test]
    fn render_respects_emit_flags() {
        let content = resolve_content(&fixture_config(PathBuf::new()), &SilentProgress).unwrap();
        let build = BuildConfig {
            emit_search_index: false,
            emit_graph: false,
            ..BuildConfig::default()
        };
        let names: Vec<String> = render_outputs(&content, &build)
            .unwrap()
            .into_iter()
            .map(|f| f.filename)
            .collect();
        assert_eq!(
            names,
            vec!["core.json", "fundamentals.json", GLOSSARY_FILE, CONCEPT_LIBRARY_FILE]
        );
    }

    #[test]
    fn missing_glossary_skips_glossary_output() {
        let mut config = fixture_config(PathBuf::new());
        config.paths.glossary_file = PathBuf::from("/nonexistent/_glossary.yaml");

        let content = resolve_content(&config, &SilentProgress).unwrap();
        assert!(content.glossary.is_none());

        let files = render_outputs(&content, &config.build).unwrap();
        assert!(files.iter().all(|f| f.filename != GLOSSARY_FILE));
    }

    #[test]
    fn malformed_glossary_aborts_without_writing() {
        let dir = temp_dir("malformed-glossary");
        let glossary = dir.join("_glossary.yaml");
        write(&glossary, "definitions: []\n");

        let mut config = fixture_config(dir.join("out"));
        config.paths.glossary_file = glossary;

        let err = run_build(&config, &SilentProgress).unwrap_err();
        assert!(matches!(err, RoadmapError::MalformedGlossary { .. }));
        assert!(!dir.join("out").exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn unresolved_reference_aborts_without_writing() {
        let dir = temp_dir("unresolved");
        write(
            &dir.join("tracks/broken.yaml"),
            r#"
sections:
  - id: s
    title: S
    items:
      - id: lonely
        title: Lonely
        concepts:
          - ref: nonexistent-id
"#,
        );

        let mut config = fixture_config(dir.join("out"));
        config.paths.tracks_dir = dir.join("tracks");

        let err = run_build(&config, &SilentProgress).unwrap_err();
        assert!(matches!(
            err,
            RoadmapError::UnresolvedReference { ref reference, .. } if reference == "nonexistent-id"
        ));
        assert!(!dir.join("out").exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn reserved_track_slug_is_rejected() {
        let dir = temp_dir("reserved");
        write(&dir.join("tracks/search-index.yaml"), "sections: []\n");

        let mut config = fixture_config(dir.join("out"));
        config.paths.tracks_dir = dir.join("tracks");

        let err = resolve_content(&config, &SilentProgress).unwrap_err();
        assert!(err.to_string().contains("search-index.json"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn validate_fixtures_reports_only_warnings() {
        let report = validate_project(&fixture_config(PathBuf::new()), &SilentProgress);
        assert!(report.is_ok(), "unexpected problems: {:?}", report.problems);
        assert_eq!(report.tracks, 2);
        assert_eq!(report.concepts, 6);
        assert_eq!(report.glossary_terms, Some(4));
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("advanced/not-a-topic"));
    }

    #[test]
    fn validate_reports_other_tracks_past_a_parse_error() {
        let dir = temp_dir("validate-parse");
        write(&dir.join("tracks/a.yaml"), "sections: [unclosed\n");
        write(
            &dir.join("tracks/b.yaml"),
            "sections:\n  - id: s\n    title: S\n    items:\n      - id: lonely\n        title: Lonely\n        concepts:\n          - ref: nonexistent-id\n",
        );

        let mut config = fixture_config(dir.join("out"));
        config.paths.tracks_dir = dir.join("tracks");

        let report = validate_project(&config, &SilentProgress);
        assert_eq!(report.tracks, 1);
        assert_eq!(report.problems.len(), 2);
        assert!(report
            .problems
            .iter()
            .any(|p| matches!(p, RoadmapError::Parse { .. })));
        assert!(report.problems.iter().any(|p| matches!(
            p,
            RoadmapError::UnresolvedReference { reference, .. } if reference == "nonexistent-id"
        )));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn validate_collects_every_problem() {
        let dir = temp_dir("validate");
        let track = |topic: &str, reference: &str| {
            format!(
                "sections:\n  - id: s\n    title: S\n    items:\n      - id: {topic}\n        title: T\n        concepts:\n          - ref: {reference}\n"
            )
        };
        write(&dir.join("tracks/a.yaml"), &track("shared", "missing-one"));
        write(&dir.join("tracks/b.yaml"), &track("shared", "missing-two"));
        write(&dir.join("_glossary.yaml"), "terms: {}\n");

        let mut config = fixture_config(dir.join("out"));
        config.paths.tracks_dir = dir.join("tracks");
        config.paths.glossary_file = dir.join("_glossary.yaml");

        let report = validate_project(&config, &SilentProgress);
        assert!(!report.is_ok());
        let unresolved = report
            .problems
            .iter()
            .filter(|p| matches!(p, RoadmapError::UnresolvedReference { .. }))
            .count();
        assert_eq!(unresolved, 2);
        assert!(report
            .problems
            .iter()
            .any(|p| matches!(p, RoadmapError::DuplicateTopicId { tracks, .. } if tracks.len() == 2)));
        assert!(report
            .problems
            .iter()
            .any(|p| matches!(p, RoadmapError::MalformedGlossary { .. })));
        assert!(!dir.join("out").exists());
        std::fs::remove_dir_all(&dir).ok();
    }
}
