//! Content data model: concept library, tracks, and resolved track output.
//!
//! Tracks are generic over their concept type so that the same structure
//! describes both source documents ([`SourceTrack`], whose concepts are
//! [`ConceptEntry`] values) and resolved documents ([`ResolvedTrack`], whose
//! concepts are plain [`Concept`] records).

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Unrecognised keys carried through from source to output unchanged.
pub type Extra = BTreeMap<String, Value>;

/// Fallback sort order for tracks that do not declare one.
pub const DEFAULT_TRACK_ORDER: i64 = 999;

// ---------------------------------------------------------------------------
// Concept library
// ---------------------------------------------------------------------------

/// A canonical teaching concept from a domain file.
///
/// The `id` is the mapping key in the domain file, filled in by the loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConceptDefinition {
    #[serde(skip)]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prerequisites: Vec<String>,
}

/// The `_meta` block of a domain file. Documentation only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One domain source document (`content/concepts/<domain>.yaml`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainDocument {
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<DomainMeta>,
    pub concepts: BTreeMap<String, ConceptDefinition>,
}

// ---------------------------------------------------------------------------
// Concept entries
// ---------------------------------------------------------------------------

/// A concrete concept record: the only concept shape in resolved output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Pass-through fields such as `pdf`.
    #[serde(flatten)]
    pub extra: Extra,
}

impl Concept {
    /// A record with just a name and optional notes.
    pub fn new(name: impl Into<String>, notes: Option<String>) -> Self {
        Self {
            name: name.into(),
            notes,
            extra: Extra::new(),
        }
    }
}

/// Per-occurrence modification of a referenced concept's notes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConceptOverride {
    /// Replaces the library notes entirely. An empty value clears them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes_replace: Option<String>,
    /// Appended to the library notes after a blank line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_note: Option<String>,
}

/// A pointer from a track into the concept library.
#[derive(Debug, Clone, PartialEq)]
pub struct ConceptRef {
    pub reference: String,
    pub overrides: Option<ConceptOverride>,
}

/// A concept as written in a source track.
///
/// Entries carrying a non-empty `name` are inline; otherwise `ref` is
/// required. An inline entry drops any stray `ref`/`override` keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawConceptEntry", into = "RawConceptEntry")]
pub enum ConceptEntry {
    Inline(Concept),
    Reference(ConceptRef),
}

impl ConceptEntry {
    /// Bare reference with no override.
    pub fn reference(id: impl Into<String>) -> Self {
        Self::Reference(ConceptRef {
            reference: id.into(),
            overrides: None,
        })
    }
}

/// Wire shape of a [`ConceptEntry`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawConceptEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    reference: Option<String>,
    #[serde(rename = "override", default, skip_serializing_if = "Option::is_none")]
    overrides: Option<ConceptOverride>,
    #[serde(flatten)]
    extra: Extra,
}

impl TryFrom<RawConceptEntry> for ConceptEntry {
    type Error = String;

    fn try_from(raw: RawConceptEntry) -> std::result::Result<Self, Self::Error> {
        match (raw.name, raw.reference) {
            (Some(name), _) if !name.is_empty() => Ok(Self::Inline(Concept {
                name,
                notes: raw.notes,
                extra: raw.extra,
            })),
            (_, Some(reference)) => Ok(Self::Reference(ConceptRef {
                reference,
                overrides: raw.overrides,
            })),
            _ => Err("concept entry needs either a non-empty `name` or a `ref`".to_string()),
        }
    }
}

impl From<ConceptEntry> for RawConceptEntry {
    fn from(entry: ConceptEntry) -> Self {
        match entry {
            ConceptEntry::Inline(concept) => Self {
                name: Some(concept.name),
                notes: concept.notes,
                reference: None,
                overrides: None,
                extra: concept.extra,
            },
            ConceptEntry::Reference(r) => Self {
                name: None,
                notes: None,
                reference: Some(r.reference),
                overrides: r.overrides,
                extra: Extra::new(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tracks
// ---------------------------------------------------------------------------

/// Track-level metadata (`meta:` block).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackMeta {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// External learning resource link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub label: String,
    pub url: String,
    #[serde(flatten)]
    pub extra: Extra,
}

/// A single learning unit within a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic<C> {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prerequisites: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outcomes: Vec<String>,
    #[serde(default = "Vec::new", skip_serializing_if = "Vec::is_empty")]
    pub concepts: Vec<C>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<Resource>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Named grouping of topics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section<C> {
    pub id: String,
    pub title: String,
    #[serde(default = "Vec::new")]
    pub items: Vec<Topic<C>>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Top-level content unit; one track is one output document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track<C> {
    #[serde(default)]
    pub meta: TrackMeta,
    #[serde(default = "Vec::new")]
    pub sections: Vec<Section<C>>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// A track as authored, before concept resolution.
pub type SourceTrack = Track<ConceptEntry>;

/// A track whose concepts have all been collapsed to [`Concept`] records.
pub type ResolvedTrack = Track<Concept>;

impl<C> Track<C> {
    /// Every topic in source order, paired with its section.
    pub fn topics(&self) -> impl Iterator<Item = (&Section<C>, &Topic<C>)> {
        self.sections
            .iter()
            .flat_map(|section| section.items.iter().map(move |topic| (section, topic)))
    }

    /// Display title, falling back to the slug when `meta.title` is empty.
    pub fn title_or<'a>(&'a self, slug: &'a str) -> &'a str {
        if self.meta.title.is_empty() {
            slug
        } else {
            &self.meta.title
        }
    }

    /// Declared order, or [`DEFAULT_TRACK_ORDER`].
    pub fn order(&self) -> i64 {
        self.meta.order.unwrap_or(DEFAULT_TRACK_ORDER)
    }
}

/// A track document together with its slug (file stem) and source path.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackFile<C> {
    pub slug: String,
    pub path: PathBuf,
    pub track: Track<C>,
}

// ---------------------------------------------------------------------------
// Prerequisites
// ---------------------------------------------------------------------------

/// A parsed prerequisite string.
///
/// `"track/topic-id/Display Name"` is a link; anything without a `/` is
/// free text describing outside knowledge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prerequisite<'a> {
    Link {
        track: &'a str,
        topic: &'a str,
        label: &'a str,
    },
    Text(&'a str),
}

impl<'a> Prerequisite<'a> {
    pub fn parse(raw: &'a str) -> Self {
        let mut parts = raw.splitn(3, '/');
        match (parts.next(), parts.next()) {
            (Some(track), Some(topic)) => Self::Link {
                track,
                topic,
                label: parts.next().unwrap_or(""),
            },
            _ => Self::Text(raw),
        }
    }

    /// Graph node ID (`track/topic`) for link prerequisites.
    pub fn node_id(&self) -> Option<String> {
        match self {
            Self::Link { track, topic, .. } => Some(format!("{track}/{topic}")),
            Self::Text(_) => None,
        }
    }
}
