//! Concept library loader.
//!
//! Reads every domain file and flattens them into one mapping keyed by
//! concept ID. IDs must be unique across the whole library, not just within
//! a domain: the first file (in file-name order) to define an ID owns it and
//! any later definition is fatal.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use roadmap_shared::{
    ConceptDefinition, DomainDocument, Result, RoadmapError, file_stem, list_yaml_files,
    read_yaml,
};

/// Domain files that are never loaded (templates).
const SKIP_DOMAIN_FILES: &[&str] = &["sample"];

/// A library concept plus where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryEntry {
    pub definition: ConceptDefinition,
    /// Domain name (`_meta.domain`, else the file stem).
    pub domain: String,
    /// Domain file that defined it.
    pub source: PathBuf,
}

/// Flat, deduplicated concept store.
#[derive(Debug, Clone, Default)]
pub struct ConceptLibrary {
    entries: BTreeMap<String, LibraryEntry>,
    domain_count: usize,
}

/// One record of `concept-library.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportedConcept {
    pub id: String,
    pub name: String,
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub tags: Vec<String>,
}

impl ConceptLibrary {
    /// Build a library from already-parsed domain documents.
    ///
    /// Documents are consumed in the order given; callers pass them sorted.
    pub fn from_documents(
        documents: impl IntoIterator<Item = (PathBuf, DomainDocument)>,
    ) -> Result<Self> {
        let mut library = Self::default();

        for (path, document) in documents {
            let domain = document
                .meta
                .as_ref()
                .and_then(|m| m.domain.clone())
                .or_else(|| file_stem(&path).map(str::to_string))
                .unwrap_or_default();

            let count = document.concepts.len();
            for (id, mut definition) in document.concepts {
                if definition.name.is_empty() {
                    return Err(RoadmapError::validation(format!(
                        "concept \"{id}\" in {} has an empty name",
                        path.display()
                    )));
                }
                definition.id = id.clone();

                match library.entries.entry(id) {
                    Entry::Occupied(existing) => {
                        return Err(RoadmapError::DuplicateConceptId {
                            id: existing.key().clone(),
                            first: existing.get().source.clone(),
                            second: path,
                        });
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(LibraryEntry {
                            definition,
                            domain: domain.clone(),
                            source: path.clone(),
                        });
                    }
                }
            }

            library.domain_count += 1;
            debug!(domain = %domain, concepts = count, path = %path.display(), "loaded domain");
        }

        Ok(library)
    }

    /// Look up a concept definition by ID.
    pub fn get(&self, id: &str) -> Option<&ConceptDefinition> {
        self.entries.get(id).map(|e| &e.definition)
    }

    /// Look up a full library entry (definition, domain, source) by ID.
    pub fn entry(&self, id: &str) -> Option<&LibraryEntry> {
        self.entries.get(id)
    }

    /// Whether an ID is defined.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Entries sorted by concept ID.
    pub fn iter(&self) -> impl Iterator<Item = &LibraryEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of domain files that contributed.
    pub fn domain_count(&self) -> usize {
        self.domain_count
    }

    /// Records for `concept-library.json`, sorted by ID.
    pub fn export(&self) -> Vec<ExportedConcept> {
        self.iter()
            .map(|e| ExportedConcept {
                id: e.definition.id.clone(),
                name: e.definition.name.clone(),
                domain: e.domain.clone(),
                notes: e.definition.notes.clone().filter(|n| !n.is_empty()),
                tags: e.definition.tags.clone(),
            })
            .collect()
    }
}

/// Load every domain file in `dir`.
///
/// A missing directory yields an empty library (tracks may still be fully
/// inline). Files starting with `_` and template files are skipped.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub fn load_library(dir: &Path) -> Result<ConceptLibrary> {
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "concept directory not found, library is empty");
        return Ok(ConceptLibrary::default());
    }

    let files = list_yaml_files(dir, |stem| {
        !stem.starts_with('_') && !SKIP_DOMAIN_FILES.contains(&stem)
    })?;

    let mut documents = Vec::with_capacity(files.len());
    for path in files {
        let document: DomainDocument = read_yaml(&path)?;
        documents.push((path, document));
    }

    let library = ConceptLibrary::from_documents(documents)?;

    info!(
        concepts = library.len(),
        domains = library.domain_count(),
        "concept library loaded"
    );

    Ok(library)
}

#[cfg(test)]
mod tests {
    use super::*;
    use roadmap_shared::DomainMeta;

    fn definition(name: &str, notes: Option<&str>) -> ConceptDefinition {
        ConceptDefinition {
            id: String::new(),
            name: name.into(),
            notes: notes.map(Into::into),
            tags: vec![],
            prerequisites: vec![],
        }
    }

    fn document(domain: Option<&str>, concepts: &[(&str, &str)]) -> DomainDocument {
        DomainDocument {
            meta: domain.map(|d| DomainMeta {
                domain: Some(d.into()),
                description: None,
            }),
            concepts: concepts
                .iter()
                .map(|(id, name)| ((*id).to_string(), definition(name, None)))
                .collect(),
        }
    }

    #[test]
    fn merges_domains_into_one_mapping() {
        let library = ConceptLibrary::from_documents(vec![
            (
                PathBuf::from("concepts/circuit-analysis.yaml"),
                document(Some("circuit-analysis"), &[("ohms-law", "Ohm's Law"), ("kcl", "KCL")]),
            ),
            (
                PathBuf::from("concepts/mathematics.yaml"),
                document(None, &[("phasors", "Phasors")]),
            ),
        ])
        .expect("load");

        assert_eq!(library.len(), 3);
        assert_eq!(library.domain_count(), 2);
        assert_eq!(library.get("ohms-law").map(|d| d.id.as_str()), Some("ohms-law"));
        assert_eq!(library.entry("phasors").unwrap().domain, "mathematics");
        assert_eq!(library.entry("kcl").unwrap().domain, "circuit-analysis");
        assert!(!library.contains("nonexistent-id"));
    }

    #[test]
    fn duplicate_id_across_files_is_fatal() {
        let err = ConceptLibrary::from_documents(vec![
            (
                PathBuf::from("concepts/a.yaml"),
                document(None, &[("ohms-law", "Ohm's Law")]),
            ),
            (
                PathBuf::from("concepts/b.yaml"),
                document(None, &[("ohms-law", "Ohms Law (dup)")]),
            ),
        ])
        .unwrap_err();

        match err {
            RoadmapError::DuplicateConceptId { id, first, second } => {
                assert_eq!(id, "ohms-law");
                assert_eq!(first, PathBuf::from("concepts/a.yaml"));
                assert_eq!(second, PathBuf::from("concepts/b.yaml"));
            }
            other => panic!("expected DuplicateConceptId, got {other:?}"),
        }
    }

    #[test]
    fn empty_name_is_rejected() {
        let err = ConceptLibrary::from_documents(vec![(
            PathBuf::from("concepts/a.yaml"),
            document(None, &[("blank", "")]),
        )])
        .unwrap_err();
        assert!(err.to_string().contains("\"blank\""));
    }

    #[test]
    fn export_is_sorted_and_drops_empty_notes() {
        let mut doc = document(None, &[("zener", "Zener Diode")]);
        doc.concepts
            .insert("bjt".into(), definition("BJT", Some("")));
        let library =
            ConceptLibrary::from_documents(vec![(PathBuf::from("electronics.yaml"), doc)])
                .expect("load");

        let exported = library.export();
        assert_eq!(exported[0].id, "bjt");
        assert!(exported[0].notes.is_none());
        assert_eq!(exported[1].domain, "electronics");
    }

    #[test]
    fn load_fixture_library() {
        let library = load_library(Path::new("../../../fixtures/content/concepts")).expect("load");
        assert!(library.contains("ohms-law"));
        assert_eq!(library.get("ohms-law").unwrap().notes.as_deref(), Some("V = IR"));
        // sample.yaml and _schema-like files are skipped
        assert!(!library.contains("sample-concept"));
    }

    #[test]
    fn missing_directory_gives_empty_library() {
        let library = load_library(Path::new("/nonexistent/concepts")).expect("load");
        assert!(library.is_empty());
    }

    #[test]
    fn duplicate_fixture_files_fail() {
        let dir = std::env::temp_dir().join(format!(
            "roadmap-loader-test-{}",
            uuid::Uuid::now_v7()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("alpha.yaml"),
            "concepts:\n  ohms-law:\n    name: Ohm's Law\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("beta.yaml"),
            "concepts:\n  ohms-law:\n    name: Ohm's Law again\n",
        )
        .unwrap();

        let err = load_library(&dir).unwrap_err();
        assert!(matches!(err, RoadmapError::DuplicateConceptId { ref second, .. } if second.ends_with("beta.yaml")));

        std::fs::remove_dir_all(&dir).ok();
    }
}
