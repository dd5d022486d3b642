//! Topic dependency graph for the visual roadmap view.

use std::collections::HashSet;

use serde::Serialize;

use roadmap_shared::{Concept, Prerequisite, TrackFile};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    /// `{track}/{topic}`
    pub id: String,
    pub label: String,
    pub track: String,
    pub section: String,
    pub section_title: String,
    /// `{topic}:{concept name}` per concept, used as progress keys.
    pub concept_keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphTrack {
    pub slug: String,
    pub title: String,
    pub order: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub tracks: Vec<GraphTrack>,
}

/// Build nodes for every topic, then edges for every linked prerequisite
/// whose source topic exists.
pub fn build_graph(tracks: &[TrackFile<Concept>]) -> GraphData {
    let mut nodes = Vec::new();
    let mut graph_tracks = Vec::with_capacity(tracks.len());

    for file in tracks {
        graph_tracks.push(GraphTrack {
            slug: file.slug.clone(),
            title: file.track.title_or(&file.slug).to_string(),
            order: file.track.order(),
        });

        for (section, topic) in file.track.topics() {
            nodes.push(GraphNode {
                id: format!("{}/{}", file.slug, topic.id),
                label: topic.title.clone(),
                track: file.slug.clone(),
                section: section.id.clone(),
                section_title: section.title.clone(),
                concept_keys: topic
                    .concepts
                    .iter()
                    .map(|c| format!("{}:{}", topic.id, c.name))
                    .collect(),
            });
        }
    }

    let known: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    let mut edges = Vec::new();
    for file in tracks {
        for (_, topic) in file.track.topics() {
            let target = format!("{}/{}", file.slug, topic.id);
            for raw in &topic.prerequisites {
                let Some(source) = Prerequisite::parse(raw).node_id() else {
                    continue;
                };
                if known.contains(source.as_str()) {
                    edges.push(GraphEdge {
                        source,
                        target: target.clone(),
                    });
                }
            }
        }
    }

    graph_tracks.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.slug.cmp(&b.slug)));

    GraphData {
        nodes,
        edges,
        tracks: graph_tracks,
    }
}
