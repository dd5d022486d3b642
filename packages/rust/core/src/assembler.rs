//! Output directory assembler.
//!
//! Takes fully rendered output documents and writes them to the output
//! directory, each through a temporary sibling that is renamed into place,
//! then records their checksums in `build-manifest.json`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use roadmap_shared::{Result, RoadmapError};

/// Manifest schema version written to `build-manifest.json`.
pub const MANIFEST_SCHEMA_VERSION: u32 = 1;

pub const MANIFEST_FILE: &str = "build-manifest.json";
pub const GLOSSARY_FILE: &str = "_glossary.json";
pub const CONCEPT_LIBRARY_FILE: &str = "concept-library.json";
pub const SEARCH_INDEX_FILE: &str = "search-index.json";
pub const GRAPH_FILE: &str = "graph-data.json";

/// Output names a track slug must not shadow.
pub const RESERVED_OUTPUTS: &[&str] = &[
    MANIFEST_FILE,
    GLOSSARY_FILE,
    CONCEPT_LIBRARY_FILE,
    SEARCH_INDEX_FILE,
    GRAPH_FILE,
];

/// Output file name for a resolved track.
pub fn track_file_name(slug: &str) -> String {
    format!("{slug}.json")
}

/// A rendered output document waiting to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub filename: String,
    pub content: String,
}

impl OutputFile {
    /// Render `data` as pretty-printed JSON.
    pub fn json<T: Serialize>(filename: impl Into<String>, data: &T) -> Result<Self> {
        let filename = filename.into();
        let content = serde_json::to_string_pretty(data).map_err(|e| {
            RoadmapError::Serialization(format!("{filename}: JSON serialization failed: {e}"))
        })?;
        Ok(Self { filename, content })
    }
}

/// Metadata for a single written file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    pub filename: String,
    pub sha256: String,
    pub size_bytes: usize,
}

/// What a build contained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildCounts {
    pub tracks: usize,
    pub topics: usize,
    pub concepts: usize,
    /// `None` when the glossary was skipped.
    pub glossary_terms: Option<usize>,
}

/// Contents of `build-manifest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildManifest {
    pub schema_version: u32,
    pub build_id: Uuid,
    pub tool_version: String,
    pub generated_at: DateTime<Utc>,
    pub counts: BuildCounts,
    pub files: Vec<ArtifactMeta>,
}

/// Output from a successful assembly.
#[derive(Debug, Clone)]
pub struct AssembleResult {
    pub output_dir: PathBuf,
    pub manifest: BuildManifest,
}

/// Write every file, then the manifest describing them.
///
/// ```text
/// <output_dir>/
/// ├── <track>.json ...
/// ├── _glossary.json         (when a glossary was built)
/// ├── concept-library.json
/// ├── search-index.json
/// ├── graph-data.json
/// └── build-manifest.json    (written last)
/// ```
#[instrument(skip_all, fields(output_dir = %output_dir.display(), files = files.len()))]
pub fn assemble(
    output_dir: &Path,
    files: &[OutputFile],
    counts: BuildCounts,
    tool_version: &str,
) -> Result<AssembleResult> {
    std::fs::create_dir_all(output_dir).map_err(|e| RoadmapError::io(output_dir, e))?;

    let mut metas = Vec::with_capacity(files.len());
    for file in files {
        write_atomic(&output_dir.join(&file.filename), file.content.as_bytes())?;
        debug!(file = %file.filename, size = file.content.len(), "wrote output");
        metas.push(artifact_meta(file));
    }

    let manifest = BuildManifest {
        schema_version: MANIFEST_SCHEMA_VERSION,
        build_id: Uuid::now_v7(),
        tool_version: tool_version.to_string(),
        generated_at: Utc::now(),
        counts,
        files: metas,
    };
    let rendered = OutputFile::json(MANIFEST_FILE, &manifest)?;
    write_atomic(&output_dir.join(MANIFEST_FILE), rendered.content.as_bytes())?;

    info!(
        files = manifest.files.len(),
        build_id = %manifest.build_id,
        "output assembly complete"
    );

    Ok(AssembleResult {
        output_dir: output_dir.to_path_buf(),
        manifest,
    })
}

/// Read back a manifest and check every listed file against its checksum.
pub fn verify_output(output_dir: &Path) -> Result<BuildManifest> {
    let manifest_path = output_dir.join(MANIFEST_FILE);
    let content = std::fs::read_to_string(&manifest_path)
        .map_err(|e| RoadmapError::io(&manifest_path, e))?;
    let manifest: BuildManifest = serde_json::from_str(&content)
        .map_err(|e| RoadmapError::validation(format!("invalid {MANIFEST_FILE}: {e}")))?;

    if manifest.schema_version != MANIFEST_SCHEMA_VERSION {
        return Err(RoadmapError::validation(format!(
            "unsupported schema_version: {} (expected {})",
            manifest.schema_version, MANIFEST_SCHEMA_VERSION
        )));
    }

    for file in &manifest.files {
        let path = output_dir.join(&file.filename);
        let bytes = std::fs::read(&path).map_err(|e| RoadmapError::io(&path, e))?;
        if sha256_hex(&bytes) != file.sha256 {
            return Err(RoadmapError::validation(format!(
                "{} does not match its recorded checksum",
                file.filename
            )));
        }
    }

    Ok(manifest)
}

/// Write to `.{name}.tmp` beside the target, then rename over it.
pub fn write_atomic(target: &Path, content: &[u8]) -> Result<()> {
    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    let name = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| RoadmapError::validation(format!("invalid output path {}", target.display())))?;
    let temp = dir.join(format!(".{name}.tmp"));

    std::fs::write(&temp, content).map_err(|e| RoadmapError::io(&temp, e))?;
    std::fs::rename(&temp, target).map_err(|e| RoadmapError::io(target, e))?;
    Ok(())
}

fn artifact_meta(file: &OutputFile) -> ArtifactMeta {
    ArtifactMeta {
        filename: file.filename.clone(),
        sha256: sha256_hex(file.content.as_bytes()),
        size_bytes: file.content.len(),
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
