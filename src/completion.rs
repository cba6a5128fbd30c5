//! Idempotent resume: decide from the output tree alone whether a document
//! was already converted by an earlier run.
//!
//! Results live at `{group_output}/{name}/{pipeline_subdir}/`. Only presence is
//! checked, never content, so a doubtful directory is always reprocessed.

use crate::config::{CompletionMode, Config};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CompletionStatus {
    Complete,
    /// No output directory for the item.
    Missing,
    /// Output directory exists but the pipeline subdirectory does not.
    NoPipelineDir,
    /// Pipeline subdirectory exists but lacks the required result files.
    Incomplete { missing: Vec<String> },
}

impl CompletionStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, CompletionStatus::Complete)
    }
}

pub fn result_dir(cfg: &Config, group_output: &Path, name: &str) -> PathBuf {
    group_output
        .join(name)
        .join(&cfg.completion.pipeline_subdir)
}

pub fn check(cfg: &Config, group_output: &Path, name: &str) -> CompletionStatus {
    let item_dir = group_output.join(name);
    if !item_dir.is_dir() {
        return CompletionStatus::Missing;
    }

    let dir = result_dir(cfg, group_output, name);
    if !dir.is_dir() {
        debug!("{name}: pipeline directory missing: {}", dir.display());
        return CompletionStatus::NoPipelineDir;
    }

    let present = result_files(&dir);

    match cfg.completion.mode {
        CompletionMode::AnyResult => {
            let any = present.iter().any(|f| has_result_extension(cfg, f));
            if any {
                CompletionStatus::Complete
            } else {
                CompletionStatus::Incomplete {
                    missing: cfg
                        .completion
                        .result_extensions
                        .iter()
                        .map(|e| format!("*.{}", e.trim_start_matches('.')))
                        .collect(),
                }
            }
        }
        CompletionMode::AllEnabledArtifacts => {
            let expected = cfg.output.expected_artifacts(name);
            // With every dump toggle off there is nothing to require.
            if expected.is_empty() {
                return if present.iter().any(|f| has_result_extension(cfg, f)) {
                    CompletionStatus::Complete
                } else {
                    CompletionStatus::Incomplete { missing: Vec::new() }
                };
            }
            let missing: Vec<String> = expected
                .into_iter()
                .filter(|want| !present.contains(want))
                .collect();
            if missing.is_empty() {
                CompletionStatus::Complete
            } else {
                CompletionStatus::Incomplete { missing }
            }
        }
    }
}

/// Names of the non-empty regular files in `dir`. Unreadable entries are ignored.
fn result_files(dir: &Path) -> Vec<String> {
    let Ok(rd) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    rd.filter_map(|e| e.ok())
        .filter(|e| {
            e.metadata()
                .map(|m| m.is_file() && m.len() > 0)
                .unwrap_or(false)
        })
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect()
}

fn has_result_extension(cfg: &Config, file_name: &str) -> bool {
    let Some(ext) = Path::new(file_name).extension().and_then(|s| s.to_str()) else {
        return false;
    };
    cfg.completion
        .result_extensions
        .iter()
        .any(|want| want.trim_start_matches('.').eq_ignore_ascii_case(ext))
}
