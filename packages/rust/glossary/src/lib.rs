//! Glossary cross-reference indexing.
//!
//! - [`build_glossary`] loads the glossary source and records which topics
//!   mention each term
//! - [`LookupTable`] maps every term and acronym to its term ID
//! - [`GlossaryLinker`] marks term occurrences in rendered text; the build
//!   does not call it, page renderers build one from the `lookup` table of
//!   `_glossary.json` and wrap their own HTML

pub mod index;
pub mod lookup;
pub mod slug;
pub mod wrap;

pub use index::{
    DEFAULT_CATEGORY, GlossaryEntry, GlossaryIndexer, GlossaryOutput, GlossaryTerm, Occurrence,
    build_glossary, load_glossary, prepare_terms, topic_scan_text,
};
pub use lookup::{LookupTable, TermMatcher};
pub use slug::slugify;
pub use wrap::{GlossaryLinker, SKIP_TAGS, escape_html};
