//! Flat search index over glossary terms, library concepts, tracks, topics
//! and per-track concepts.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;

use roadmap_glossary::{GlossaryOutput, Occurrence};
use roadmap_library::ExportedConcept;
use roadmap_shared::{Concept, TrackFile};

/// One row of `search-index.json`, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SearchEntry {
    Glossary {
        id: String,
        name: String,
        acronyms: Vec<String>,
        definition: String,
        categories: Vec<String>,
        see_also: Vec<String>,
        appears_in: Vec<Occurrence>,
    },
    #[serde(rename = "concept")]
    LibraryConcept {
        id: String,
        name: String,
        domain: String,
        tags: Vec<String>,
        content: String,
    },
    Track {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        slug: String,
        path: String,
    },
    Topic {
        name: String,
        description: String,
        track: String,
        #[serde(rename = "trackSlug")]
        track_slug: String,
        path: String,
    },
    #[serde(rename = "concept")]
    TrackConcept {
        name: String,
        topic: String,
        #[serde(rename = "topicId")]
        topic_id: String,
        track: String,
        #[serde(rename = "trackSlug")]
        track_slug: String,
        path: String,
        content: String,
    },
}

/// Build the index in its fixed order: glossary, library, then tracks.
pub fn build_search_index(
    glossary: Option<&GlossaryOutput>,
    library: &[ExportedConcept],
    tracks: &[TrackFile<Concept>],
    route_prefix: &str,
) -> Vec<SearchEntry> {
    let mut index = Vec::new();

    if let Some(glossary) = glossary {
        index.extend(glossary.terms.iter().map(|t| SearchEntry::Glossary {
            id: t.id.clone(),
            name: t.term.clone(),
            acronyms: t.acronyms.clone(),
            definition: t.definition.clone(),
            categories: t.categories.clone(),
            see_also: t.see_also.clone(),
            appears_in: t.appears_in.clone(),
        }));
    }

    index.extend(library.iter().map(|c| SearchEntry::LibraryConcept {
        id: c.id.clone(),
        name: c.name.clone(),
        domain: c.domain.clone(),
        tags: c.tags.clone(),
        content: c.notes.clone().unwrap_or_default(),
    }));

    let prefix = route_prefix.trim_end_matches('/');
    for file in tracks {
        let slug = &file.slug;
        let title = file.track.title_or(slug);
        let track_path = format!("{prefix}/{slug}/");

        index.push(SearchEntry::Track {
            name: title.to_string(),
            description: file.track.meta.description.clone(),
            slug: slug.clone(),
            path: track_path.clone(),
        });

        for (_, topic) in file.track.topics() {
            index.push(SearchEntry::Topic {
                name: topic.title.clone(),
                description: topic.description.clone(),
                track: title.to_string(),
                track_slug: slug.clone(),
                path: format!("{track_path}#{}", topic.id),
            });

            for concept in &topic.concepts {
                index.push(SearchEntry::TrackConcept {
                    name: concept.name.clone(),
                    topic: topic.title.clone(),
                    topic_id: topic.id.clone(),
                    track: title.to_string(),
                    track_slug: slug.clone(),
                    path: format!(
                        "{track_path}?concept={}#{}",
                        encode_uri_component(&concept.name),
                        topic.id
                    ),
                    content: concept.notes.clone().unwrap_or_default(),
                });
            }
        }
    }

    index
}

/// Bytes `encodeURIComponent` escapes: everything except
/// `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a query value the way a browser's `encodeURIComponent` does.
pub fn encode_uri_component(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn track() -> TrackFile<Concept> {
        TrackFile {
            slug: "fundamentals".into(),
            path: PathBuf::from("fundamentals.yaml"),
            track: serde_yaml::from_str(
                r#"
meta:
  title: Fundamentals
  description: Start here.
sections:
  - id: dc
    title: DC
    items:
      - id: dc-circuits
        title: DC Circuits
        description: Constant sources.
        concepts:
          - name: Ohm's Law
            notes: V = IR
          - name: Thévenin & Norton
"#,
            )
            .unwrap(),
        }
    }

    #[test]
    fn encode_matches_browser_behaviour() {
        assert_eq!(encode_uri_component("Ohm's Law"), "Ohm's%20Law");
        assert_eq!(encode_uri_component("a/b?c=d&e"), "a%2Fb%3Fc%3Dd%26e");
        assert_eq!(encode_uri_component("Thévenin"), "Th%C3%A9venin");
        assert_eq!(encode_uri_component("(x)*!~._-"), "(x)*!~._-");
        assert_eq!(encode_uri_component("50% + ω"), "50%25%20%2B%20%CF%89");
    }

    #[test]
    fn entries_follow_fixed_order() {
        let library = vec![ExportedConcept {
            id: "ohms-law".into(),
            name: "Ohm's Law".into(),
            domain: "circuit-analysis".into(),
            notes: Some("V = IR".into()),
            tags: vec!["dc".into()],
        }];
        let index = build_search_index(None, &library, &[track()], "/roadmaps");

        let kinds: Vec<String> = index
            .iter()
            .map(|e| serde_json::to_value(e).unwrap()["type"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(kinds, vec!["concept", "track", "topic", "concept", "concept"]);
    }

    #[test]
    fn paths_and_field_names() {
        let index = build_search_index(None, &[], &[track()], "/roadmaps/");
        let json = serde_json::to_value(&index).unwrap();

        assert_eq!(json[0]["path"], "/roadmaps/fundamentals/");
        assert_eq!(json[0]["description"], "Start here.");
        assert_eq!(json[1]["path"], "/roadmaps/fundamentals/#dc-circuits");
        assert_eq!(json[1]["trackSlug"], "fundamentals");
        assert_eq!(
            json[2]["path"],
            "/roadmaps/fundamentals/?concept=Ohm's%20Law#dc-circuits"
        );
        assert_eq!(json[2]["topicId"], "dc-circuits");
        assert_eq!(json[2]["content"], "V = IR");
        assert_eq!(json[3]["content"], "");
        assert_eq!(
            json[3]["path"],
            "/roadmaps/fundamentals/?concept=Th%C3%A9venin%20%26%20Norton#dc-circuits"
        );
    }
}
