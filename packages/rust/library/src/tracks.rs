//! Track discovery and cross-track validation.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info, instrument};

use roadmap_shared::{
    BuildConfig, ConceptEntry, Result, RoadmapError, TrackFile, file_stem, list_yaml_files,
    read_yaml,
};

/// Load every track file in `dir` that the build config includes, sorted by slug.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub fn load_tracks(dir: &Path, build: &BuildConfig) -> Result<Vec<TrackFile<ConceptEntry>>> {
    let files = list_yaml_files(dir, |stem| build.includes(stem))?;

    let tracks = files
        .iter()
        .map(|path| load_track_file(path))
        .collect::<Result<Vec<_>>>()?;

    info!(tracks = tracks.len(), "tracks loaded");
    Ok(tracks)
}

/// Like [`load_tracks`], but a file that fails to read or parse is returned
/// as an error next to the tracks that loaded. Only an unreadable directory
/// fails the call.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub fn load_tracks_partial(
    dir: &Path,
    build: &BuildConfig,
) -> Result<(Vec<TrackFile<ConceptEntry>>, Vec<RoadmapError>)> {
    let files = list_yaml_files(dir, |stem| build.includes(stem))?;

    let mut tracks = Vec::with_capacity(files.len());
    let mut failures = Vec::new();
    for path in &files {
        match load_track_file(path) {
            Ok(track) => tracks.push(track),
            Err(e) => failures.push(e),
        }
    }

    info!(tracks = tracks.len(), failed = failures.len(), "tracks loaded");
    Ok((tracks, failures))
}

fn load_track_file(path: &Path) -> Result<TrackFile<ConceptEntry>> {
    let slug = file_stem(path)
        .ok_or_else(|| {
            RoadmapError::validation(format!("bad track file name: {}", path.display()))
        })?
        .to_string();
    let track = read_yaml(path)?;
    debug!(%slug, "loaded track");
    Ok(TrackFile {
        slug,
        path: path.to_path_buf(),
        track,
    })
}

/// Topic IDs that occur more than once across all tracks, with the slug of
/// every track containing each occurrence. Sorted by topic ID.
pub fn find_duplicate_topic_ids<C>(tracks: &[TrackFile<C>]) -> Vec<(String, Vec<String>)> {
    let mut seen: BTreeMap<&str, Vec<String>> = BTreeMap::new();

    for file in tracks {
        for (_, topic) in file.track.topics() {
            seen.entry(topic.id.as_str())
                .or_default()
                .push(file.slug.clone());
        }
    }

    seen.into_iter()
        .filter(|(_, slugs)| slugs.len() > 1)
        .map(|(id, slugs)| (id.to_string(), slugs))
        .collect()
}

/// Fail on the first duplicated topic ID.
pub fn check_topic_ids<C>(tracks: &[TrackFile<C>]) -> Result<()> {
    match find_duplicate_topic_ids(tracks).into_iter().next() {
        Some((topic, tracks)) => Err(RoadmapError::DuplicateTopicId { topic, tracks }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn file(slug: &str, yaml: &str) -> TrackFile<ConceptEntry> {
        TrackFile {
            slug: slug.into(),
            path: PathBuf::from(format!("{slug}.yaml")),
            track: serde_yaml::from_str(yaml).expect("parse"),
        }
    }

    const ONE_TOPIC: &str = r#"
sections:
  - id: s
    title: S
    items:
      - { id: phasors, title: Phasors }
"#;

    #[test]
    fn unique_ids_pass() {
        let tracks = vec![
            file("core", ONE_TOPIC),
            file("advanced", &ONE_TOPIC.replace("phasors", "state-space")),
        ];
        assert!(check_topic_ids(&tracks).is_ok());
    }

    #[test]
    fn duplicate_within_one_track() {
        let yaml = r#"
sections:
  - id: a
    title: A
    items: [{ id: filters, title: Filters }]
  - id: b
    title: B
    items: [{ id: filters, title: Filters Again }]
"#;
        let err = check_topic_ids(&[file("core", yaml)]).unwrap_err();
        match err {
            RoadmapError::DuplicateTopicId { topic, tracks } => {
                assert_eq!(topic, "filters");
                assert_eq!(tracks, vec!["core", "core"]);
            }
            other => panic!("expected DuplicateTopicId, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_across_tracks() {
        let tracks = vec![file("core", ONE_TOPIC), file("fundamentals", ONE_TOPIC)];
        let dups = find_duplicate_topic_ids(&tracks);
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].0, "phasors");
        assert_eq!(dups[0].1, vec!["core", "fundamentals"]);
    }

    #[test]
    fn load_fixture_tracks_skips_excluded() {
        let tracks = load_tracks(
            Path::new("../../../fixtures/content/tracks"),
            &BuildConfig::default(),
        )
        .expect("load");
        let slugs: Vec<_> = tracks.iter().map(|t| t.slug.as_str()).collect();
        assert_eq!(slugs, vec!["core", "fundamentals"]);
    }

    #[test]
    fn partial_load_keeps_good_tracks() {
        let dir = std::env::temp_dir().join(format!("roadmap-tracks-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("a.yaml"), "sections: [unclosed\n").unwrap();
        std::fs::write(dir.join("b.yaml"), ONE_TOPIC).unwrap();

        assert!(load_tracks(&dir, &BuildConfig::default()).is_err());

        let (tracks, failures) = load_tracks_partial(&dir, &BuildConfig::default()).unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].slug, "b");
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0], RoadmapError::Parse { .. }));

        std::fs::remove_dir_all(&dir).ok();
    }
}
