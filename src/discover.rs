use crate::{config::Config, dates::PriorityKey, priority::RankedFolder};
use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One input document.
#[derive(Debug, Clone, Serialize)]
pub struct WorkItem {
    pub path: PathBuf,
    /// File stem; names the item's output directory.
    pub name: String,
    pub lang: String,
}

/// A directory of documents sharing one output directory and one priority.
#[derive(Debug, Clone)]
pub struct FolderGroup {
    pub name: String,
    pub path: PathBuf,
    pub priority: PriorityKey,
    pub items: Vec<WorkItem>,
}

impl FolderGroup {
    pub fn output_dir(&self, output_root: &Path) -> PathBuf {
        output_root.join(&self.name)
    }
}

/// List the group directories directly under `input_root`, sorted by name.
pub fn list_group_dirs(input_root: &Path) -> Result<Vec<PathBuf>> {
    if !input_root.is_dir() {
        return Err(anyhow!(
            "input root does not exist or is not a directory: {}",
            input_root.display()
        ));
    }

    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(input_root)
        .with_context(|| format!("read_dir {}", input_root.display()))?
    {
        let entry = entry.with_context(|| format!("read_dir entry in {}", input_root.display()))?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();

    if dirs.is_empty() {
        warn!("no group directories found under {}", input_root.display());
    } else {
        info!("found {} group directories under {}", dirs.len(), input_root.display());
    }
    Ok(dirs)
}

/// Scan one ranked group directory. Nested directories are ignored.
pub fn scan_group(cfg: &Config, folder: &RankedFolder) -> Result<FolderGroup> {
    let name = &folder.name;
    let dir = folder.path.as_path();

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("read_dir {}", dir.display()))? {
        let path = entry
            .with_context(|| format!("read_dir entry in {}", dir.display()))?
            .path();
        if path.is_file() && is_document(cfg, &path) {
            files.push(path);
        }
    }
    files.sort();

    let mut seen = HashSet::new();
    let mut items = Vec::with_capacity(files.len());
    for path in files {
        let stem = match (path.to_str(), path.file_stem().and_then(|s| s.to_str())) {
            (Some(_), Some(stem)) => stem.to_string(),
            _ => {
                warn!("group {name}: skipping non UTF-8 path {}", path.display());
                continue;
            }
        };
        if !seen.insert(stem.clone()) {
            warn!(
                "group {name}: {} shares the name {stem:?} with an earlier document; ignoring it",
                path.display()
            );
            continue;
        }
        debug!("group {name}: found {}", path.display());
        items.push(WorkItem {
            path,
            name: stem,
            lang: cfg.converter.lang.clone(),
        });
    }

    Ok(FolderGroup {
        name: name.clone(),
        path: dir.to_path_buf(),
        priority: folder.priority,
        items,
    })
}

fn is_document(cfg: &Config, path: &Path) -> bool {
    let Some(file_name) = path.file_name().and_then(|s| s.to_str()) else {
        return false;
    };
    if !cfg.discovery.include_hidden && file_name.starts_with('.') {
        return false;
    }
    let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
        return false;
    };
    cfg.discovery
        .document_extensions
        .iter()
        .any(|want| want.trim_start_matches('.').eq_ignore_ascii_case(ext))
}
