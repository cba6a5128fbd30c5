use crate::{
    batch_plan::{Batch, BatchPlan},
    config::Config,
    converter::{ConvertBatch, ConvertItem, Converter, ItemResult, ParseOptions},
    probe,
    report::GroupReport,
    throttle::Throttle,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Converted {
        pages: Option<u32>,
        artifacts: Vec<String>,
    },
    /// The converter reported the document as failed.
    Failed(String),
    /// The document could not be read; it was never sent.
    Unreadable(String),
    /// The converter returned no result for the document.
    MissingResult,
}

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// False when every item was unreadable and the converter was not called.
    pub invoked: bool,
    pub items: Vec<(String, ItemOutcome)>,
}

#[derive(Debug, Error)]
pub enum GroupError {
    #[error("failed to scan folder {path}: {message}")]
    Scan { path: PathBuf, message: String },

    #[error("failed to create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("output path is not valid UTF-8: {}", path.display())]
    NonUtf8Path { path: PathBuf },

    #[error("converter failed on batch {batch}: {message}")]
    Converter { batch: usize, message: String },
}

#[derive(Debug)]
pub enum GroupOutcome {
    /// Every batch was handed to the converter; individual items may still have failed.
    Finished,
    /// The folder was given up; the remaining items count as failed.
    Abandoned(GroupError),
    /// Cancellation stopped the folder; the remaining items count as cancelled.
    Cancelled,
}

/// Feeds a folder's batches to the converter, one call per batch, and keeps
/// item, batch and folder failures inside their own boundaries.
pub struct Driver<C: Converter> {
    cfg: Config,
    converter: C,
    throttle: Throttle,
}

impl<C: Converter> Driver<C> {
    pub fn new(cfg: &Config, converter: C, throttle: Throttle) -> Self {
        Self {
            cfg: cfg.clone(),
            converter,
            throttle,
        }
    }

    pub fn throttle(&self) -> &Throttle {
        &self.throttle
    }

    /// Run every batch of `plan` for the folder `name`, writing into `output_dir`.
    /// Counts land in `report`; the caller decides the folder's final status.
    pub fn run_group(
        &self,
        name: &str,
        output_dir: &Path,
        plan: &BatchPlan,
        report: &mut GroupReport,
    ) -> GroupOutcome {
        let total = plan.batches.len();
        info!(
            "folder {name}: {} documents in {total} batches of up to {}",
            plan.item_count, plan.batch_size
        );

        let mut previous_invoked = false;
        for (pos, batch) in plan.batches.iter().enumerate() {
            if previous_invoked {
                self.throttle.between_batches();
            }
            if self.throttle.is_cancelled() {
                let rest = remaining_items(&plan.batches[pos..]);
                warn!("folder {name}: cancelled with {rest} documents not attempted");
                report.cancelled += rest;
                return GroupOutcome::Cancelled;
            }

            info!(
                "folder {name}: batch {}/{total}, documents {}-{}",
                pos + 1,
                batch.first_item,
                batch.last_item
            );

            match self.run_batch(batch, output_dir) {
                Ok(outcome) => {
                    previous_invoked = outcome.invoked;
                    if outcome.invoked {
                        report.batches_run += 1;
                    }
                    tally(name, &outcome, report);
                }
                Err(err) => {
                    report.batches_run += 1;
                    let rest = remaining_items(&plan.batches[pos..]);
                    if self.throttle.is_cancelled() {
                        warn!("folder {name}: batch {} interrupted: {err}", pos + 1);
                        report.cancelled += rest;
                        return GroupOutcome::Cancelled;
                    }
                    error!("folder {name}: abandoning folder, {rest} documents unfinished: {err}");
                    report.failed += rest;
                    report.failed_items.extend(
                        plan.batches[pos..]
                            .iter()
                            .flat_map(|b| b.items.iter().map(|i| i.name.clone())),
                    );
                    return GroupOutcome::Abandoned(err);
                }
            }
        }

        GroupOutcome::Finished
    }

    /// Probe, convert and classify one batch. `Err` when the converter call itself fails
    /// or the output directory cannot be passed to it.
    pub fn run_batch(&self, batch: &Batch, output_dir: &Path) -> Result<BatchOutcome, GroupError> {
        let Some(output_str) = output_dir.to_str() else {
            return Err(GroupError::NonUtf8Path {
                path: output_dir.to_path_buf(),
            });
        };

        let mut unreadable: HashMap<&str, String> = HashMap::new();
        let mut send = Vec::with_capacity(batch.len());

        for item in &batch.items {
            match probe::probe_item(&self.cfg, item) {
                Ok(p) => {
                    debug!("{} readable, {} bytes", p.name, p.file_bytes);
                    send.push(ConvertItem {
                        name: p.name,
                        path: p.path,
                        lang: item.lang.clone(),
                    });
                }
                Err(err) => {
                    error!("cannot read {}: {err:#}", item.name);
                    unreadable.insert(item.name.as_str(), format!("{err:#}"));
                }
            }
        }

        let mut by_name: HashMap<String, ItemResult> = HashMap::new();
        let invoked = !send.is_empty();

        if invoked {
            let req = ConvertBatch {
                output_dir: output_str.to_string(),
                batch_index: batch.index,
                items: send,
                options: ParseOptions::from_config(&self.cfg),
            };

            let out = self
                .converter
                .convert(&req)
                .map_err(|e| GroupError::Converter {
                    batch: batch.index + 1,
                    message: format!("{e:#}"),
                })?;

            for r in out.results {
                if !req.items.iter().any(|i| i.name == r.name) {
                    warn!(
                        "converter returned a result for unknown document {:?}; ignoring",
                        r.name
                    );
                    continue;
                }
                by_name.insert(r.name.clone(), r);
            }
        } else {
            warn!("batch {} has no readable documents; skipping", batch.index + 1);
        }

        let items = batch
            .items
            .iter()
            .map(|item| {
                let outcome = if let Some(msg) = unreadable.remove(item.name.as_str()) {
                    ItemOutcome::Unreadable(msg)
                } else {
                    match by_name.remove(&item.name) {
                        Some(r) if r.ok => ItemOutcome::Converted {
                            pages: r.pages,
                            artifacts: r.artifacts,
                        },
                        Some(r) => ItemOutcome::Failed(
                            r.error.unwrap_or_else(|| "converter reported failure".into()),
                        ),
                        None => ItemOutcome::MissingResult,
                    }
                };
                (item.name.clone(), outcome)
            })
            .collect();

        Ok(BatchOutcome {
            invoked,
            items,
        })
    }
}

fn tally(group: &str, outcome: &BatchOutcome, report: &mut GroupReport) {
    for (name, o) in &outcome.items {
        match o {
            ItemOutcome::Converted { pages, artifacts } => {
                info!("folder {group}: {name} converted");
                debug!(
                    "folder {group}: {name} pages={} artifacts={artifacts:?}",
                    pages.map_or_else(|| "?".to_string(), |p| p.to_string())
                );
                report.processed += 1;
            }
            ItemOutcome::Failed(msg) => {
                error!("folder {group}: {name} failed: {msg}");
                report.failed += 1;
                report.failed_items.push(name.clone());
            }
            ItemOutcome::Unreadable(_) => {
                report.failed += 1;
                report.failed_items.push(name.clone());
            }
            ItemOutcome::MissingResult => {
                error!("folder {group}: {name} has no result from the converter");
                report.failed += 1;
                report.failed_items.push(name.clone());
            }
        }
    }
}

fn remaining_items(batches: &[Batch]) -> u64 {
    batches.iter().map(|b| b.len() as u64).sum()
}
