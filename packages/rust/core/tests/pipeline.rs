//! Full builds over the fixture project and a minimal scratch project.

use std::path::{Path, PathBuf};

use serde_json::{Value, json};

use roadmap_core::assembler::{MANIFEST_FILE, verify_output};
use roadmap_core::{PipelineConfig, SilentProgress, run_build};
use roadmap_shared::{BuildConfig, GlossaryConfig, PathsConfig};

fn temp_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("roadmap-it-{label}-{}", uuid::Uuid::now_v7()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn fixture_config(output_dir: PathBuf) -> PipelineConfig {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures");
    PipelineConfig {
        paths: PathsConfig {
            concepts_dir: root.join("content/concepts"),
            tracks_dir: root.join("content/tracks"),
            legacy_dir: root.join("legacy"),
            glossary_file: root.join("content/_glossary.yaml"),
            output_dir,
        },
        build: BuildConfig::default(),
        glossary: GlossaryConfig::default(),
        tool_version: "0.1.0-test".into(),
    }
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

fn topic<'a>(track: &'a Value, id: &str) -> &'a Value {
    track["sections"]
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|s| s["items"].as_array().unwrap())
        .find(|t| t["id"] == id)
        .unwrap()
}

fn term<'a>(glossary: &'a Value, id: &str) -> &'a Value {
    glossary["terms"]
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["id"] == id)
        .unwrap()
}

#[test]
fn fixture_build_writes_every_output() {
    let out = temp_dir("fixture").join("data");
    let result = run_build(&fixture_config(out.clone()), &SilentProgress).unwrap();

    let names: Vec<&str> = result
        .manifest
        .files
        .iter()
        .map(|f| f.filename.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "core.json",
            "fundamentals.json",
            "_glossary.json",
            "concept-library.json",
            "search-index.json",
            "graph-data.json",
        ]
    );
    assert!(out.join(MANIFEST_FILE).exists());
    assert!(!out.join("sample.json").exists());
    verify_output(&out).unwrap();

    std::fs::remove_dir_all(out.parent().unwrap()).ok();
}

#[test]
fn resolved_tracks_contain_only_concrete_concepts() {
    let out = temp_dir("resolved");
    run_build(&fixture_config(out.clone()), &SilentProgress).unwrap();

    let fundamentals = read_json(&out.join("fundamentals.json"));
    assert_eq!(
        topic(&fundamentals, "dc-circuits")["concepts"][0],
        json!({"name": "Ohm's Law", "notes": "V = IR"})
    );
    assert_eq!(
        topic(&fundamentals, "network-theorems")["concepts"][0],
        json!({"name": "Thévenin's Theorem", "notes": "Pairs naturally with source transformation."})
    );

    let core = read_json(&out.join("core.json"));
    let concepts = &topic(&core, "ac-circuits")["concepts"];
    assert_eq!(
        concepts[0]["notes"],
        "A sinusoid represented as a rotating complex number.\n\nOnly valid for a single frequency."
    );
    assert_eq!(concepts[1], json!({"name": "Ohm's Law", "notes": "V = IZ"}));
    assert_eq!(concepts[2]["name"], "Impedance");

    for name in ["core.json", "fundamentals.json"] {
        let text = std::fs::read_to_string(out.join(name)).unwrap();
        assert!(!text.contains("\"ref\""), "{name} still has a ref");
        assert!(!text.contains("\"override\""), "{name} still has an override");
    }

    std::fs::remove_dir_all(&out).ok();
}

#[test]
fn glossary_occurrences_respect_word_boundaries() {
    let out = temp_dir("glossary");
    run_build(&fixture_config(out.clone()), &SilentProgress).unwrap();
    let glossary = read_json(&out.join("_glossary.json"));

    let ohm = &term(&glossary, "ohms-law")["appears_in"];
    assert_eq!(ohm.as_array().unwrap().len(), 2);
    assert_eq!(ohm[0]["track"], "core");
    assert_eq!(ohm[0]["topicId"], "ac-circuits");
    assert_eq!(ohm[1]["track"], "fundamentals");
    assert_eq!(ohm[1]["trackTitle"], "Fundamentals");
    assert_eq!(ohm[1]["sectionTitle"], "DC Analysis");

    // "AM" appears in am-radio, never inside "program" in embedded-basics.
    let am = term(&glossary, "amplitude-modulation")["appears_in"]
        .as_array()
        .unwrap();
    assert_eq!(am.len(), 1);
    assert_eq!(am[0]["topicId"], "am-radio");

    assert_eq!(glossary["lookup"]["kvl"], "kirchhoffs-voltage-law");
    assert_eq!(glossary["lookup"]["z"], "impedance");
    assert_eq!(term(&glossary, "impedance")["categories"], json!(["general"]));

    std::fs::remove_dir_all(&out).ok();
}

#[test]
fn search_index_and_graph_are_derived_from_resolved_tracks() {
    let out = temp_dir("derived");
    run_build(&fixture_config(out.clone()), &SilentProgress).unwrap();

    let index = read_json(&out.join("search-index.json"));
    let entries = index.as_array().unwrap();
    assert_eq!(entries[0]["type"], "glossary");
    assert_eq!(entries[4]["type"], "concept");
    assert_eq!(entries[4]["id"], "complex-numbers");
    assert_eq!(entries[4]["domain"], "mathematics");
    assert!(entries.iter().any(|e| e["type"] == "topic"
        && e["path"] == "/roadmaps/fundamentals/#network-theorems"));

    let library = read_json(&out.join("concept-library.json"));
    let ids: Vec<&str> = library
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert_eq!(
        ids,
        vec!["complex-numbers", "kcl", "kvl", "ohms-law", "phasors", "thevenin-theorem"]
    );

    let graph = read_json(&out.join("graph-data.json"));
    assert_eq!(graph["nodes"].as_array().unwrap().len(), 6);
    assert_eq!(graph["edges"].as_array().unwrap().len(), 3);
    assert_eq!(graph["tracks"][0]["slug"], "fundamentals");

    std::fs::remove_dir_all(&out).ok();
}

#[test]
fn repeated_builds_are_byte_identical() {
    let root = temp_dir("idempotent");
    let first = run_build(&fixture_config(root.join("a")), &SilentProgress).unwrap();
    let second = run_build(&fixture_config(root.join("b")), &SilentProgress).unwrap();

    assert_eq!(first.manifest.files, second.manifest.files);
    assert_ne!(first.manifest.build_id, second.manifest.build_id);
    for file in &first.manifest.files {
        assert_eq!(
            std::fs::read(root.join("a").join(&file.filename)).unwrap(),
            std::fs::read(root.join("b").join(&file.filename)).unwrap(),
            "{} differs between builds",
            file.filename
        );
    }

    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn single_reference_scenario() {
    let root = temp_dir("scenario");
    let write = |rel: &str, content: &str| {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    };
    write(
        "concepts/circuits.yaml",
        "concepts:\n  ohms-law:\n    name: Ohm's Law\n    notes: V=IR\n",
    );
    write(
        "tracks/basics.yaml",
        "sections:\n  - id: s\n    title: S\n    items:\n      - id: t\n        title: T\n        concepts:\n          - ref: ohms-law\n",
    );
    write("_glossary.yaml", "terms:\n  - term: Ohm's Law\n    acronyms: []\n");

    let config = PipelineConfig {
        paths: PathsConfig {
            concepts_dir: root.join("concepts"),
            tracks_dir: root.join("tracks"),
            legacy_dir: root.join("legacy"),
            glossary_file: root.join("_glossary.yaml"),
            output_dir: root.join("out"),
        },
        build: BuildConfig::default(),
        glossary: GlossaryConfig::default(),
        tool_version: "0.1.0-test".into(),
    };
    run_build(&config, &SilentProgress).unwrap();

    let track = read_json(&root.join("out/basics.json"));
    assert_eq!(
        topic(&track, "t")["concepts"],
        json!([{"name": "Ohm's Law", "notes": "V=IR"}])
    );

    let glossary = read_json(&root.join("out/_glossary.json"));
    let occurrences = term(&glossary, "ohms-law")["appears_in"].as_array().unwrap();
    assert_eq!(occurrences.len(), 1);
    assert_eq!(occurrences[0]["track"], "basics");
    assert_eq!(occurrences[0]["topicId"], "t");

    std::fs::remove_dir_all(&root).ok();
}
