//! Whole-run control flow: rank folders, drop finished documents, batch the
//! rest and drive them through the converter, one folder at a time.

use crate::{
    batch_plan::BatchPlan,
    completion::{self, CompletionStatus},
    config::Config,
    converter::Converter,
    discover::{self, FolderGroup, WorkItem},
    driver::{Driver, GroupError, GroupOutcome},
    priority::{self, RankedFolder},
    report::{GroupReport, GroupStatus, RunReport, RunStats},
    util::{ensure_dir, now_rfc3339, sha256_hex},
};
use anyhow::{Context, Result};
use serde::Serialize;
use std::num::NonZeroUsize;
use std::path::Path;
use tracing::{error, info, warn};

/// Process every folder under `input_root`. Item and folder failures are
/// contained and reported; only setup problems (unreadable input root,
/// uncreatable output root) return `Err`.
pub fn run<C: Converter>(
    cfg: &Config,
    input_root: &Path,
    output_root: &Path,
    driver: &Driver<C>,
) -> Result<RunReport> {
    let started = now_rfc3339();
    ensure_dir(output_root)?;

    let dirs = discover::list_group_dirs(input_root)?;
    let ranked = priority::prioritize_paths(dirs);
    priority::log_ranking(&ranked);

    let mut stats = RunStats::default();
    let mut groups = Vec::with_capacity(ranked.len());

    for (idx, folder) in ranked.iter().enumerate() {
        let report = if driver.throttle().is_cancelled() {
            let mut r = GroupReport::new(folder.rank, &folder.name, date_label(folder));
            r.status = GroupStatus::Cancelled;
            r
        } else {
            info!("folder {}/{}: {}", idx + 1, ranked.len(), folder.name);
            process_folder(cfg, folder, output_root, driver)
        };

        let more_follow = idx + 1 < ranked.len();
        if report.batches_run > 0 && more_follow {
            driver.throttle().between_groups();
        }

        stats.record(&report);
        groups.push(report);
    }

    stats.log_summary();

    Ok(RunReport {
        run_name: cfg.global.run_name.clone(),
        started,
        finished: now_rfc3339(),
        config_sha256: sha256_hex(cfg.normalized_for_hash().as_bytes()),
        input_root: input_root.display().to_string(),
        output_root: output_root.display().to_string(),
        cancelled: driver.throttle().is_cancelled(),
        totals: stats,
        groups,
    })
}

/// Scan, filter, batch and convert one folder. Never fails; the outcome is in the report.
pub fn process_folder<C: Converter>(
    cfg: &Config,
    folder: &RankedFolder,
    output_root: &Path,
    driver: &Driver<C>,
) -> GroupReport {
    let mut report = GroupReport::new(folder.rank, &folder.name, date_label(folder));

    let group = match discover::scan_group(cfg, folder) {
        Ok(g) => g,
        Err(err) => {
            let err = GroupError::Scan {
                path: folder.path.clone(),
                message: format!("{err:#}"),
            };
            error!("{err}");
            report.status = GroupStatus::Failed;
            report.error = Some(err.to_string());
            return report;
        }
    };

    report.discovered = group.items.len() as u64;
    if group.items.is_empty() {
        warn!("folder {}: no documents found, skipping", group.name);
        report.status = GroupStatus::Empty;
        return report;
    }
    info!("folder {}: {} documents found", group.name, group.items.len());

    let out_dir = group.output_dir(output_root);
    if let Err(source) = std::fs::create_dir_all(&out_dir) {
        let err = GroupError::OutputDir {
            path: out_dir,
            source,
        };
        error!("folder {}: {err}", group.name);
        report.failed = report.discovered;
        report.failed_items = group.items.iter().map(|i| i.name.clone()).collect();
        report.status = GroupStatus::Failed;
        report.error = Some(err.to_string());
        return report;
    }

    let (pending, skipped) = filter_pending(cfg, &group, &out_dir);
    report.skipped = skipped;
    if skipped > 0 {
        info!("folder {}: skipped {skipped} already converted documents", group.name);
    }
    if pending.is_empty() {
        info!("folder {}: all documents already converted, skipping folder", group.name);
        report.status = GroupStatus::AlreadyComplete;
        return report;
    }

    let plan = BatchPlan::partition(pending, batch_size(cfg));
    report.batches_planned = plan.batches.len() as u64;

    let outcome = driver.run_group(&group.name, &out_dir, &plan, &mut report);
    report.status = match outcome {
        GroupOutcome::Finished if report.failed > 0 => GroupStatus::CompletedWithFailures,
        GroupOutcome::Finished => GroupStatus::Completed,
        GroupOutcome::Abandoned(err) => {
            report.error = Some(err.to_string());
            GroupStatus::Failed
        }
        GroupOutcome::Cancelled => GroupStatus::Cancelled,
    };
    info!(
        "folder {} done: processed={} failed={} skipped={}",
        group.name, report.processed, report.failed, report.skipped
    );
    report
}

/// Split a folder's documents into those still to convert and a count of finished ones.
pub fn filter_pending(cfg: &Config, group: &FolderGroup, out_dir: &Path) -> (Vec<WorkItem>, u64) {
    if !cfg.global.skip_completed {
        return (group.items.clone(), 0);
    }

    let mut pending = Vec::with_capacity(group.items.len());
    let mut skipped = 0u64;
    for item in &group.items {
        match completion::check(cfg, out_dir, &item.name) {
            CompletionStatus::Complete => {
                info!("  done: {} already has results, skipping", item.name);
                skipped += 1;
            }
            CompletionStatus::Missing => pending.push(item.clone()),
            partial => {
                info!(
                    "  redo: {} has an output directory without usable results ({partial:?})",
                    item.name
                );
                pending.push(item.clone());
            }
        }
    }
    (pending, skipped)
}

#[derive(Debug, Clone, Serialize)]
pub struct FolderPlan {
    #[serde(flatten)]
    pub folder: RankedFolder,
    pub discovered: usize,
    pub complete: usize,
    pub pending: usize,
    pub batch_sizes: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What `run` would do, without creating directories or calling the converter.
pub fn plan(cfg: &Config, input_root: &Path, output_root: &Path) -> Result<Vec<FolderPlan>> {
    let dirs = discover::list_group_dirs(input_root)
        .with_context(|| format!("listing folders under {}", input_root.display()))?;
    let ranked = priority::prioritize_paths(dirs);

    Ok(ranked
        .into_iter()
        .map(|folder| match discover::scan_group(cfg, &folder) {
            Ok(group) => {
                let out_dir = group.output_dir(output_root);
                let discovered = group.items.len();
                let (pending, skipped) = filter_pending(cfg, &group, &out_dir);
                let batches = BatchPlan::partition(pending, batch_size(cfg));
                FolderPlan {
                    folder,
                    discovered,
                    complete: skipped as usize,
                    pending: batches.item_count,
                    batch_sizes: batches.sizes(),
                    error: None,
                }
            }
            Err(err) => FolderPlan {
                folder,
                discovered: 0,
                complete: 0,
                pending: 0,
                batch_sizes: Vec::new(),
                error: Some(format!("{err:#}")),
            },
        })
        .collect())
}

pub fn write_report(cfg: &Config, output_root: &Path, report: &RunReport) -> Result<()> {
    let path = output_root.join(&cfg.output.run_report_filename);
    std::fs::write(&path, serde_json::to_string_pretty(report)?)
        .with_context(|| format!("writing run report: {}", path.display()))?;
    info!("run report written to {}", path.display());
    Ok(())
}

fn batch_size(cfg: &Config) -> NonZeroUsize {
    NonZeroUsize::new(cfg.batching.batch_size).unwrap_or(NonZeroUsize::MIN)
}

fn date_label(folder: &RankedFolder) -> Option<String> {
    (!folder.priority.is_unknown()).then(|| folder.priority.to_string())
}
