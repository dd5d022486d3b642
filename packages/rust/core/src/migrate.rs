//! One-time migration from inline concepts to the shared concept library.
//!
//! Legacy tracks carry every concept inline. Migration groups concepts that
//! share a normalised name, picks canonical text for each, files them into
//! domain files and rewrites the tracks to reference them by ID. Legacy
//! sources are only ever read.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use regex::{Regex, RegexBuilder};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use roadmap_library::load_tracks;
use roadmap_shared::{
    ConceptDefinition, ConceptEntry, ConceptOverride, ConceptRef, DomainDocument, DomainMeta,
    MigrateConfig, ProjectConfig, Result, RoadmapError, TrackFile, list_yaml_files,
};

use crate::assembler::write_atomic;
use crate::pipeline::ProgressReporter;

// ---------------------------------------------------------------------------
// Names and IDs
// ---------------------------------------------------------------------------

fn is_apostrophe(c: char) -> bool {
    matches!(c, '\'' | '`' | '\u{2018}' | '\u{2019}')
}

/// Key under which concept names are considered the same concept.
///
/// Lowercase, apostrophes removed, anything outside `[a-z0-9_]` treated as a
/// separator, separators collapsed to single spaces.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| !is_apostrophe(*c))
        .collect::<String>()
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Kebab-case ID for a concept name, with `&` and common Greek letters
/// spelled out.
pub fn name_to_id(name: &str) -> String {
    let mut spelled = String::with_capacity(name.len());
    for c in name.to_lowercase().chars() {
        match c {
            c if is_apostrophe(c) => {}
            '&' => spelled.push_str("and"),
            'π' => spelled.push_str("pi"),
            'ω' | 'Ω' => spelled.push_str("omega"),
            'μ' | 'µ' => spelled.push_str("mu"),
            'α' => spelled.push_str("alpha"),
            'β' => spelled.push_str("beta"),
            'θ' => spelled.push_str("theta"),
            'φ' => spelled.push_str("phi"),
            'δ' => spelled.push_str("delta"),
            'ε' => spelled.push_str("epsilon"),
            c => spelled.push(c),
        }
    }

    spelled
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Hands out unique IDs, suffixing `-2`, `-3`, ... when a base ID is
/// already owned by a different concept.
#[derive(Debug, Default)]
pub struct IdAllocator {
    owners: HashMap<String, String>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an ID for `owner` (a normalised concept key).
    pub fn allocate(&mut self, base: &str, owner: &str) -> String {
        let base = if base.is_empty() { "concept" } else { base };
        let mut id = base.to_string();
        let mut suffix = 2;
        while self.owners.get(&id).is_some_and(|o| o != owner) {
            id = format!("{base}-{suffix}");
            suffix += 1;
        }
        self.owners.insert(id.clone(), owner.to_string());
        id
    }
}

// ---------------------------------------------------------------------------
// Domain assignment
// ---------------------------------------------------------------------------

struct CompiledRule {
    track: Option<String>,
    section: Option<Regex>,
    domain: String,
}

impl CompiledRule {
    fn matches(&self, track: &str, section: &str) -> bool {
        self.track.as_deref().is_none_or(|t| t == track)
            && self.section.as_ref().is_none_or(|re| re.is_match(section))
    }
}

/// Ordered domain rules plus the priority used when a concept's
/// occurrences land in different domains.
pub struct DomainAssigner {
    rules: Vec<CompiledRule>,
    fallback: String,
    priority: Vec<String>,
}

impl DomainAssigner {
    pub fn new(config: &MigrateConfig) -> Result<Self> {
        let rules = config
            .domain_rules
            .iter()
            .map(|rule| {
                let section = rule
                    .section_pattern
                    .as_deref()
                    .map(|p| {
                        RegexBuilder::new(p).case_insensitive(true).build().map_err(|e| {
                            RoadmapError::config(format!("invalid section_pattern {p:?}: {e}"))
                        })
                    })
                    .transpose()?;
                Ok(CompiledRule {
                    track: rule.track.clone(),
                    section,
                    domain: rule.domain.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            rules,
            fallback: config.fallback_domain.clone(),
            priority: config.domain_priority.clone(),
        })
    }

    /// First matching rule's domain, or the fallback.
    pub fn assign(&self, track: &str, section: &str) -> &str {
        self.rules
            .iter()
            .find(|r| r.matches(track, section))
            .map_or(self.fallback.as_str(), |r| r.domain.as_str())
    }

    /// The preferred of two domains. A domain missing from the priority list
    /// loses to one that is listed; `current` wins ties.
    pub fn prefer<'a>(&self, current: &'a str, candidate: &'a str) -> &'a str {
        let rank = |d: &str| self.priority.iter().position(|p| p == d);
        match (rank(current), rank(candidate)) {
            (None, _) => candidate,
            (_, None) => current,
            (Some(a), Some(b)) if a <= b => current,
            _ => candidate,
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationSummary {
    pub tracks_processed: usize,
    pub unique_concepts: usize,
    pub domains_created: usize,
    pub multi_track_concepts: usize,
    pub overrides_created: usize,
    pub id_conflicts: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackStats {
    pub total_concept_slots: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiTrackConcept {
    pub id: String,
    pub name: String,
    pub domain: String,
    pub occurrences: usize,
    pub tracks: Vec<String>,
    pub has_canonical_notes: bool,
    pub override_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideRecord {
    pub concept_id: String,
    pub concept_name: String,
    pub track: String,
    pub topic_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdConflict {
    pub id: String,
    pub base_name: String,
    pub base: String,
}

/// Everything the migration decided, written as `migration-report.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub summary: MigrationSummary,
    pub track_stats: BTreeMap<String, TrackStats>,
    pub domains: BTreeMap<String, Vec<String>>,
    pub multi_track_concepts: Vec<MultiTrackConcept>,
    pub overrides: Vec<OverrideRecord>,
    pub id_conflicts: Vec<IdConflict>,
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

struct CanonicalConcept {
    key: String,
    name: String,
    notes: Option<String>,
    domain: String,
    id: String,
    tracks: Vec<String>,
    occurrences: usize,
}

fn is_blank(notes: Option<&str>) -> bool {
    notes.is_none_or(|n| n.trim().is_empty())
}

/// Whether the canonical notes already say what the track's notes say.
fn covered_by(track_notes: Option<&str>, canonical: Option<&str>) -> bool {
    let Some(notes) = track_notes.filter(|n| !n.trim().is_empty()) else {
        return true;
    };
    let canonical = canonical.unwrap_or("");
    notes.trim() == canonical.trim() || canonical.contains(notes.trim())
}

/// In-memory result of a migration, ready to be written.
#[derive(Debug, Clone)]
pub struct MigrationPlan {
    /// Domain name → generated domain document.
    pub domains: BTreeMap<String, DomainDocument>,
    /// Tracks rewritten to reference the library.
    pub tracks: Vec<TrackFile<ConceptEntry>>,
    pub report: MigrationReport,
}

/// Compute the library and rewritten tracks for a set of legacy tracks.
///
/// Tracks are processed in the order given. Entries that are already
/// references pass through untouched.
#[instrument(skip_all, fields(tracks = tracks.len()))]
pub fn plan_migration(
    mut tracks: Vec<TrackFile<ConceptEntry>>,
    config: &MigrateConfig,
) -> Result<MigrationPlan> {
    let assigner = DomainAssigner::new(config)?;

    // Group inline concepts by normalised name, in first-seen order.
    let mut concepts: Vec<CanonicalConcept> = Vec::new();
    let mut by_key: HashMap<String, usize> = HashMap::new();

    for file in &tracks {
        for section in &file.track.sections {
            let domain = assigner.assign(&file.slug, &section.id);
            for topic in &section.items {
                for entry in &topic.concepts {
                    let ConceptEntry::Inline(concept) = entry else {
                        continue;
                    };
                    let key = normalize_name(&concept.name);

                    let Some(index) = by_key.get(&key).copied() else {
                        by_key.insert(key.clone(), concepts.len());
                        concepts.push(CanonicalConcept {
                            key,
                            name: concept.name.clone(),
                            notes: concept.notes.clone(),
                            domain: domain.to_string(),
                            id: String::new(),
                            tracks: vec![file.slug.clone()],
                            occurrences: 1,
                        });
                        continue;
                    };

                    let canonical = &mut concepts[index];
                    canonical.occurrences += 1;
                    if !canonical.tracks.contains(&file.slug) {
                        canonical.tracks.push(file.slug.clone());
                    }
                    if concept.name.chars().count() > canonical.name.chars().count() {
                        canonical.name = concept.name.clone();
                    }
                    if let Some(notes) = concept.notes.as_deref().filter(|n| !n.trim().is_empty()) {
                        let current = canonical.notes.as_deref().map_or(0, |n| n.trim().len());
                        if is_blank(canonical.notes.as_deref()) || notes.trim().len() > current {
                            canonical.notes = Some(notes.to_string());
                        }
                    }
                    canonical.domain = assigner.prefer(&canonical.domain, domain).to_string();
                }
            }
        }
    }

    // IDs, in first-seen order.
    let mut allocator = IdAllocator::new();
    let mut id_conflicts = Vec::new();
    for concept in &mut concepts {
        let base = name_to_id(&concept.name);
        concept.id = allocator.allocate(&base, &concept.key);
        if concept.id != base {
            warn!(name = %concept.name, id = %concept.id, "concept ID collision, suffix added");
            id_conflicts.push(IdConflict {
                id: concept.id.clone(),
                base_name: concept.name.clone(),
                base,
            });
        }
    }

    // Domain documents.
    let mut domains: BTreeMap<String, DomainDocument> = BTreeMap::new();
    for concept in &concepts {
        let document = domains
            .entry(concept.domain.clone())
            .or_insert_with(|| DomainDocument {
                meta: Some(DomainMeta {
                    domain: Some(concept.domain.clone()),
                    description: Some(
                        config
                            .domain_descriptions
                            .get(&concept.domain)
                            .cloned()
                            .unwrap_or_else(|| format!("Concepts in the {} domain", concept.domain)),
                    ),
                }),
                concepts: BTreeMap::new(),
            });
        document.concepts.insert(
            concept.id.clone(),
            ConceptDefinition {
                id: concept.id.clone(),
                name: concept.name.clone(),
                notes: concept.notes.clone().filter(|n| !n.trim().is_empty()),
                tags: Vec::new(),
                prerequisites: Vec::new(),
            },
        );
    }

    // Rewrite tracks.
    let mut overrides = Vec::new();
    let mut track_stats = BTreeMap::new();
    for file in &mut tracks {
        let mut slots = 0;
        for section in &mut file.track.sections {
            for topic in &mut section.items {
                slots += topic.concepts.len();
                for entry in &mut topic.concepts {
                    let ConceptEntry::Inline(concept) = entry else {
                        continue;
                    };
                    let Some(canonical) = by_key
                        .get(&normalize_name(&concept.name))
                        .map(|&i| &concepts[i])
                    else {
                        continue;
                    };
                    if !concept.extra.is_empty() {
                        warn!(
                            track = %file.slug,
                            topic = %topic.id,
                            concept = %concept.name,
                            "dropping extra fields from migrated concept"
                        );
                    }

                    let rewritten = if covered_by(concept.notes.as_deref(), canonical.notes.as_deref()) {
                        ConceptEntry::reference(&canonical.id)
                    } else {
                        overrides.push(OverrideRecord {
                            concept_id: canonical.id.clone(),
                            concept_name: canonical.name.clone(),
                            track: file.slug.clone(),
                            topic_id: topic.id.clone(),
                            reason: "notes_differ".into(),
                        });
                        ConceptEntry::Reference(ConceptRef {
                            reference: canonical.id.clone(),
                            overrides: Some(ConceptOverride {
                                notes_replace: concept.notes.clone(),
                                context_note: None,
                            }),
                        })
                    };
                    *entry = rewritten;
                }
            }
        }
        track_stats.insert(file.slug.clone(), TrackStats { total_concept_slots: slots });
    }

    let multi_track_concepts: Vec<MultiTrackConcept> = concepts
        .iter()
        .filter(|c| c.tracks.len() > 1)
        .map(|c| MultiTrackConcept {
            id: c.id.clone(),
            name: c.name.clone(),
            domain: c.domain.clone(),
            occurrences: c.occurrences,
            tracks: c.tracks.clone(),
            has_canonical_notes: !is_blank(c.notes.as_deref()),
            override_count: overrides.iter().filter(|o| o.concept_id == c.id).count(),
        })
        .collect();

    let report = MigrationReport {
        summary: MigrationSummary {
            tracks_processed: tracks.len(),
            unique_concepts: concepts.len(),
            domains_created: domains.len(),
            multi_track_concepts: multi_track_concepts.len(),
            overrides_created: overrides.len(),
            id_conflicts: id_conflicts.len(),
        },
        track_stats,
        domains: domains
            .iter()
            .map(|(name, doc)| (name.clone(), doc.concepts.keys().cloned().collect()))
            .collect(),
        multi_track_concepts,
        overrides,
        id_conflicts,
    };

    info!(
        concepts = report.summary.unique_concepts,
        domains = report.summary.domains_created,
        overrides = report.summary.overrides_created,
        "migration planned"
    );

    Ok(MigrationPlan {
        domains,
        tracks,
        report,
    })
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Render a generated domain file, with a short header comment.
pub fn render_domain(domain: &str, document: &DomainDocument) -> Result<String> {
    let body = serde_yaml::to_string(document)
        .map_err(|e| RoadmapError::Serialization(format!("{domain}.yaml: {e}")))?;
    Ok(format!(
        "# Concept library: {domain}\n# Generated by `roadmap migrate`. Review and edit as needed.\n{body}"
    ))
}

/// Render a rewritten track file, with a short header comment.
pub fn render_track(file: &TrackFile<ConceptEntry>) -> Result<String> {
    let body = serde_yaml::to_string(&file.track)
        .map_err(|e| RoadmapError::Serialization(format!("{}.yaml: {e}", file.slug)))?;
    Ok(format!(
        "# {} track\n# Concepts reference the shared concept library.\n{body}",
        file.track.title_or(&file.slug)
    ))
}

/// Result of a completed migration run.
#[derive(Debug, Clone)]
pub struct MigrationResult {
    pub summary: MigrationSummary,
    pub concepts_dir: PathBuf,
    pub tracks_dir: PathBuf,
    pub report_path: PathBuf,
}

/// Read legacy tracks, plan the migration, and write domain files, rewritten
/// tracks and the report.
///
/// Refuses to write into a concepts directory that already has domain files
/// unless `force` is set.
#[instrument(skip_all, fields(root = %project.root.display()))]
pub fn run_migration(
    project: &ProjectConfig,
    force: bool,
    progress: &dyn ProgressReporter,
) -> Result<MigrationResult> {
    let paths = project.paths();

    progress.phase("Reading legacy tracks");
    let legacy = load_tracks(&paths.legacy_dir, &project.config.build)?;
    if legacy.is_empty() {
        return Err(RoadmapError::validation(format!(
            "no legacy tracks found in {}",
            paths.legacy_dir.display()
        )));
    }

    if paths.concepts_dir.is_dir() && !force {
        let existing = list_yaml_files(&paths.concepts_dir, |_| true)?;
        if !existing.is_empty() {
            return Err(RoadmapError::config(format!(
                "{} already contains {} domain file(s); pass --force to overwrite",
                paths.concepts_dir.display(),
                existing.len()
            )));
        }
    }

    progress.phase("Building concept library");
    let plan = plan_migration(legacy, &project.config.migrate)?;

    // Render everything before the first write.
    let mut outputs = Vec::new();
    for (domain, document) in &plan.domains {
        outputs.push((
            paths.concepts_dir.join(format!("{domain}.yaml")),
            render_domain(domain, document)?,
        ));
    }
    for file in &plan.tracks {
        outputs.push((
            paths.tracks_dir.join(format!("{}.yaml", file.slug)),
            render_track(file)?,
        ));
    }
    let report_path = project.report_path();
    let report = serde_json::to_string_pretty(&plan.report)
        .map_err(|e| RoadmapError::Serialization(format!("migration report: {e}")))?;
    outputs.push((report_path.clone(), report));

    progress.phase("Writing library and tracks");
    for dir in [&paths.concepts_dir, &paths.tracks_dir] {
        std::fs::create_dir_all(dir).map_err(|e| RoadmapError::io(dir, e))?;
    }
    if let Some(parent) = report_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| RoadmapError::io(parent, e))?;
    }
    let total = outputs.len();
    for (i, (path, content)) in outputs.iter().enumerate() {
        write_atomic(path, content.as_bytes())?;
        debug!(path = %path.display(), "wrote migration output");
        progress.file_written(&path.display().to_string(), i + 1, total);
    }

    let summary = plan.report.summary.clone();
    progress.done(&format!(
        "{} concepts in {} domains, {} overrides",
        summary.unique_concepts, summary.domains_created, summary.overrides_created
    ));

    Ok(MigrationResult {
        summary,
        concepts_dir: paths.concepts_dir,
        tracks_dir: paths.tracks_dir,
        report_path,
    })
}
