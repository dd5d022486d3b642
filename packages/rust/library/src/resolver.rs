//! Track resolver: collapses every concept entry to a concrete record.
//!
//! Inline entries pass through untouched. References are looked up in the
//! [`ConceptLibrary`] and have their override (if any) applied. A reference
//! to an unknown ID aborts resolution of the whole track.

use tracing::{debug, instrument};

use roadmap_shared::{
    Concept, ConceptEntry, ConceptRef, ResolvedTrack, Result, RoadmapError, Section, SourceTrack,
    Topic, Track, TrackFile,
};

use crate::loader::ConceptLibrary;

/// Separator between library notes and an appended context note.
const NOTE_SEPARATOR: &str = "\n\n";

/// A reference that the library cannot satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedRef {
    pub track: String,
    pub topic: String,
    pub reference: String,
}

impl From<UnresolvedRef> for RoadmapError {
    fn from(r: UnresolvedRef) -> Self {
        Self::UnresolvedReference {
            track: r.track,
            topic: r.topic,
            reference: r.reference,
        }
    }
}

/// Resolve one track file against the library.
#[instrument(skip_all, fields(track = %file.slug))]
pub fn resolve_track(
    file: &TrackFile<ConceptEntry>,
    library: &ConceptLibrary,
) -> Result<TrackFile<Concept>> {
    let track = resolve_document(&file.slug, &file.track, library)?;

    debug!(topics = track.topics().count(), "track resolved");

    Ok(TrackFile {
        slug: file.slug.clone(),
        path: file.path.clone(),
        track,
    })
}

/// Resolve a track document. `slug` is only used in error reports.
pub fn resolve_document(
    slug: &str,
    track: &SourceTrack,
    library: &ConceptLibrary,
) -> Result<ResolvedTrack> {
    let mut sections = Vec::with_capacity(track.sections.len());

    for section in &track.sections {
        let mut items = Vec::with_capacity(section.items.len());

        for topic in &section.items {
            let unresolved = |reference: String| {
                RoadmapError::from(UnresolvedRef {
                    track: slug.to_string(),
                    topic: topic.id.clone(),
                    reference,
                })
            };
            let concepts = topic
                .concepts
                .iter()
                .map(|entry| resolve_entry(entry, library).map_err(unresolved))
                .collect::<Result<Vec<_>>>()?;

            items.push(Topic {
                id: topic.id.clone(),
                title: topic.title.clone(),
                description: topic.description.clone(),
                prerequisites: topic.prerequisites.clone(),
                outcomes: topic.outcomes.clone(),
                concepts,
                resources: topic.resources.clone(),
                optional: topic.optional,
                extra: topic.extra.clone(),
            });
        }

        sections.push(Section {
            id: section.id.clone(),
            title: section.title.clone(),
            items,
            extra: section.extra.clone(),
        });
    }

    Ok(Track {
        meta: track.meta.clone(),
        sections,
        extra: track.extra.clone(),
    })
}

/// Resolve a single entry. On failure returns the missing ID.
pub fn resolve_entry(
    entry: &ConceptEntry,
    library: &ConceptLibrary,
) -> std::result::Result<Concept, String> {
    match entry {
        ConceptEntry::Inline(concept) => Ok(concept.clone()),
        ConceptEntry::Reference(ConceptRef {
            reference,
            overrides,
        }) => {
            let definition = library.get(reference).ok_or_else(|| reference.clone())?;
            let library_notes = definition.notes.as_deref();

            let notes = match overrides {
                Some(o) => match (&o.notes_replace, &o.context_note) {
                    (Some(replacement), _) => non_empty(replacement),
                    (None, Some(context)) => join_notes(library_notes, context),
                    (None, None) => library_notes.and_then(non_empty),
                },
                None => library_notes.and_then(non_empty),
            };

            Ok(Concept::new(definition.name.clone(), notes))
        }
    }
}

/// Every unresolved reference in a track, in source order.
pub fn find_unresolved(
    file: &TrackFile<ConceptEntry>,
    library: &ConceptLibrary,
) -> Vec<UnresolvedRef> {
    file.track
        .topics()
        .flat_map(|(_, topic)| {
            topic.concepts.iter().filter_map(move |entry| match entry {
                ConceptEntry::Reference(r) if !library.contains(&r.reference) => {
                    Some(UnresolvedRef {
                        track: file.slug.clone(),
                        topic: topic.id.clone(),
                        reference: r.reference.clone(),
                    })
                }
                _ => None,
            })
        })
        .collect()
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

/// Library notes followed by a context note, either side omitted if empty.
fn join_notes(base: Option<&str>, context: &str) -> Option<String> {
    let parts: Vec<&str> = [base.unwrap_or(""), context]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect();

    (!parts.is_empty()).then(|| parts.join(NOTE_SEPARATOR))
}
