//! Reading structured source documents from disk.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::error::{Result, RoadmapError};

/// Read and parse a YAML document, reporting the file on any failure.
pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| RoadmapError::io(path, e))?;
    serde_yaml::from_str(&content).map_err(|e| RoadmapError::parse(path, e.to_string()))
}

/// List `*.yaml` files directly inside `dir`, sorted by file name.
///
/// `keep` receives the file stem and decides whether the file is included.
pub fn list_yaml_files(dir: &Path, keep: impl Fn(&str) -> bool) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| RoadmapError::io(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| RoadmapError::io(dir, e))?.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("yaml") {
            continue;
        }
        if file_stem(&path).is_some_and(&keep) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// File stem as UTF-8, if it has one.
pub fn file_stem(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|s| s.to_str())
}
