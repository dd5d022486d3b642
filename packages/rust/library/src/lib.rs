//! Concept library loading and track resolution.
//!
//! - [`load_library`] reads domain files into a deduplicated [`ConceptLibrary`]
//! - [`resolve_track`] collapses every concept entry in a track to a plain record
//! - [`load_tracks`] / [`check_topic_ids`] discover and validate track files

pub mod loader;
pub mod resolver;
pub mod tracks;

pub use loader::{ConceptLibrary, ExportedConcept, LibraryEntry, load_library};
pub use resolver::{UnresolvedRef, find_unresolved, resolve_document, resolve_entry, resolve_track};
pub use tracks::{check_topic_ids, find_duplicate_topic_ids, load_tracks, load_tracks_partial};
