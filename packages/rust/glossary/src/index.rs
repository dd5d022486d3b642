//! Glossary loading and the cross-reference index.
//!
//! Terms come from a single YAML file with a top-level `terms` sequence.
//! Each term gets a slug ID and a list of the topics whose text mentions it,
//! found by whole-word, case-insensitive matching against every term and
//! acronym.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use roadmap_shared::{
    Concept, GlossaryConfig, Result, RoadmapError, Section, Topic, TrackFile, read_yaml,
};

use crate::lookup::{LookupTable, TermMatcher};
use crate::slug::slugify;

/// Category assigned to terms that declare none.
pub const DEFAULT_CATEGORY: &str = "general";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A term as written in the glossary source.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GlossaryEntry {
    pub term: String,
    #[serde(default)]
    pub acronyms: Vec<String>,
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    #[serde(default)]
    pub definition: Option<String>,
    #[serde(default)]
    pub see_also: Vec<String>,
}

/// One topic that mentions a term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    pub track: String,
    pub track_title: String,
    pub topic_id: String,
    pub topic_title: String,
    pub section_id: String,
    pub section_title: String,
}

/// An output term with defaults filled in and its occurrences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlossaryTerm {
    pub id: String,
    pub term: String,
    pub acronyms: Vec<String>,
    pub categories: Vec<String>,
    pub definition: String,
    pub see_also: Vec<String>,
    pub appears_in: Vec<Occurrence>,
}

impl GlossaryTerm {
    fn from_entry(entry: GlossaryEntry) -> Self {
        Self {
            id: slugify(&entry.term),
            categories: entry
                .categories
                .unwrap_or_else(|| vec![DEFAULT_CATEGORY.to_string()]),
            definition: entry.definition.unwrap_or_default(),
            term: entry.term,
            acronyms: entry.acronyms,
            see_also: entry.see_also,
            appears_in: Vec::new(),
        }
    }
}

/// The serialized `_glossary.json` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlossaryOutput {
    pub terms: Vec<GlossaryTerm>,
    pub lookup: LookupTable,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Read the glossary source.
///
/// A missing file is reported as [`RoadmapError::MissingGlossary`], which
/// callers treat as "skip the glossary". A file without a `terms` sequence is
/// [`RoadmapError::MalformedGlossary`].
pub fn load_glossary(path: &Path) -> Result<Vec<GlossaryEntry>> {
    if !path.is_file() {
        return Err(RoadmapError::MissingGlossary {
            path: path.to_path_buf(),
        });
    }

    let document: serde_yaml::Value = read_yaml(path)?;
    let malformed = |message: String| RoadmapError::MalformedGlossary {
        path: path.to_path_buf(),
        message,
    };

    let terms = match document.get("terms") {
        Some(terms @ serde_yaml::Value::Sequence(_)) => terms.clone(),
        _ => return Err(malformed("missing \"terms\" array".into())),
    };

    let entries: Vec<GlossaryEntry> =
        serde_yaml::from_value(terms).map_err(|e| malformed(e.to_string()))?;
    debug!(path = %path.display(), terms = entries.len(), "glossary source loaded");
    Ok(entries)
}

/// Turn source entries into output terms, rejecting IDs that collide.
pub fn prepare_terms(entries: Vec<GlossaryEntry>) -> Result<Vec<GlossaryTerm>> {
    let mut seen: HashMap<String, String> = HashMap::new();
    let mut terms = Vec::with_capacity(entries.len());

    for entry in entries {
        let term = GlossaryTerm::from_entry(entry);
        if term.id.is_empty() {
            return Err(RoadmapError::validation(format!(
                "glossary term \"{}\" has no characters usable in an ID",
                term.term
            )));
        }
        if let Some(first) = seen.get(&term.id) {
            return Err(RoadmapError::DuplicateTermId {
                id: term.id,
                first: first.clone(),
                second: term.term,
            });
        }
        seen.insert(term.id.clone(), term.term.clone());
        terms.push(term);
    }

    Ok(terms)
}

// ---------------------------------------------------------------------------
// Indexing
// ---------------------------------------------------------------------------

/// The text a topic is scanned against: description, outcomes, then concept
/// names and concept notes, joined by single spaces.
pub fn topic_scan_text(topic: &Topic<Concept>) -> String {
    let names = topic.concepts.iter().map(|c| c.name.as_str());
    let notes = topic
        .concepts
        .iter()
        .map(|c| c.notes.as_deref().unwrap_or(""));

    std::iter::once(topic.description.as_str())
        .chain(topic.outcomes.iter().map(String::as_str))
        .chain(names)
        .chain(notes)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Accumulates occurrences across resolved tracks.
pub struct GlossaryIndexer {
    terms: Vec<GlossaryTerm>,
    positions: HashMap<String, usize>,
    lookup: LookupTable,
    matcher: TermMatcher,
}

impl GlossaryIndexer {
    pub fn new(entries: Vec<GlossaryEntry>, config: &GlossaryConfig) -> Result<Self> {
        let terms = prepare_terms(entries)?;
        let lookup = LookupTable::build(&terms, config.strict_lookup)?;
        let matcher = TermMatcher::new(&lookup)?;
        let positions = terms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();

        Ok(Self {
            terms,
            positions,
            lookup,
            matcher,
        })
    }

    pub fn lookup(&self) -> &LookupTable {
        &self.lookup
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// Record every topic of a track.
    pub fn scan_track(&mut self, file: &TrackFile<Concept>) {
        let title = file.track.title_or(&file.slug);
        for (section, topic) in file.track.topics() {
            self.scan_topic(&file.slug, title, section, topic);
        }
    }

    /// Record a single topic. A term is listed at most once per
    /// `(track, topic)` pair however often it matches.
    pub fn scan_topic(
        &mut self,
        slug: &str,
        track_title: &str,
        section: &Section<Concept>,
        topic: &Topic<Concept>,
    ) {
        let text = topic_scan_text(topic);
        for id in self.matcher.find_terms(&text) {
            let Some(&index) = self.positions.get(id) else {
                continue;
            };
            let term = &mut self.terms[index];
            let already = term
                .appears_in
                .iter()
                .any(|o| o.track == slug && o.topic_id == topic.id);
            if already {
                continue;
            }
            term.appears_in.push(Occurrence {
                track: slug.to_string(),
                track_title: track_title.to_string(),
                topic_id: topic.id.clone(),
                topic_title: topic.title.clone(),
                section_id: section.id.clone(),
                section_title: section.title.clone(),
            });
        }
    }

    pub fn finish(self) -> GlossaryOutput {
        GlossaryOutput {
            terms: self.terms,
            lookup: self.lookup,
        }
    }
}

/// Load the glossary at `path` and index it against resolved tracks.
///
/// Tracks are scanned in the order given.
#[instrument(skip_all, fields(path = %path.display(), tracks = tracks.len()))]
pub fn build_glossary(
    path: &Path,
    tracks: &[TrackFile<Concept>],
    config: &GlossaryConfig,
) -> Result<GlossaryOutput> {
    let entries = load_glossary(path)?;
    let mut indexer = GlossaryIndexer::new(entries, config)?;
    for track in tracks {
        indexer.scan_track(track);
    }
    let output = indexer.finish();

    info!(
        terms = output.terms.len(),
        lookup_keys = output.lookup.len(),
        "glossary indexed"
    );
    Ok(output)
}
