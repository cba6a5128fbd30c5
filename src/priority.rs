use crate::dates::{PriorityKey, extract_priority};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct RankedFolder {
    /// 1-based position in the processing order.
    pub rank: usize,
    pub name: String,
    pub path: PathBuf,
    #[serde(serialize_with = "serialize_key")]
    pub priority: PriorityKey,
}

/// Order folders most-recent-first.
///
/// The sort is stable: folders with equal keys (including all undated ones)
/// keep their input order, so an unchanged tree always yields the same order.
pub fn prioritize(folders: Vec<(String, PathBuf)>) -> Vec<RankedFolder> {
    let mut keyed: Vec<(String, PathBuf, PriorityKey)> = folders
        .into_iter()
        .map(|(name, path)| {
            let key = extract_priority(&name);
            (name, path, key)
        })
        .collect();

    keyed.sort_by(|a, b| b.2.cmp(&a.2));

    keyed
        .into_iter()
        .enumerate()
        .map(|(i, (name, path, priority))| RankedFolder {
            rank: i + 1,
            name,
            path,
            priority,
        })
        .collect()
}

/// Convenience for directory paths; the folder name is the last path component.
/// Folders whose name is not valid UTF-8 are skipped, since their output
/// directory could not be named after them.
pub fn prioritize_paths(paths: Vec<PathBuf>) -> Vec<RankedFolder> {
    prioritize(
        paths
            .into_iter()
            .filter_map(|p| match p.file_name().and_then(|s| s.to_str()) {
                Some(name) => Some((name.to_string(), p)),
                None => {
                    warn!("skipping folder with a non UTF-8 name: {}", p.display());
                    None
                }
            })
            .collect(),
    )
}

pub fn log_ranking(ranked: &[RankedFolder]) {
    info!("=== folders by date, newest first ===");
    for f in ranked {
        info!("{:2}. {} (date: {})", f.rank, f.name, f.priority);
    }
    info!("=====================================");
}

fn serialize_key<S: serde::Serializer>(key: &PriorityKey, s: S) -> Result<S::Ok, S::Error> {
    match key {
        PriorityKey::Dated(d) => s.serialize_some(&d.to_string()),
        PriorityKey::Unknown => s.serialize_none(),
    }
}
