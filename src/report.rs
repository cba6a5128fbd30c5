use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    /// No documents in the folder.
    Empty,
    /// Every document already had results.
    AlreadyComplete,
    /// Every dispatched document converted.
    Completed,
    /// The converter ran but reported some documents as failed.
    CompletedWithFailures,
    /// The folder was abandoned part-way or could not be scanned.
    Failed,
    /// The run was interrupted before or during this folder.
    Cancelled,
}

/// One record per folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupReport {
    pub rank: usize,
    pub name: String,
    pub priority_date: Option<String>,
    pub status: GroupStatus,
    pub discovered: u64,
    pub skipped: u64,
    pub processed: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub batches_planned: u64,
    pub batches_run: u64,
    #[serde(default)]
    pub failed_items: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl GroupReport {
    pub fn new(rank: usize, name: &str, priority_date: Option<String>) -> Self {
        Self {
            rank,
            name: name.to_string(),
            priority_date,
            status: GroupStatus::Empty,
            discovered: 0,
            skipped: 0,
            processed: 0,
            failed: 0,
            cancelled: 0,
            batches_planned: 0,
            batches_run: 0,
            failed_items: Vec::new(),
            error: None,
        }
    }

    /// Whether the converter was invoked (or about to be) for this folder.
    pub fn attempted(&self) -> bool {
        self.batches_run > 0 || matches!(self.status, GroupStatus::Failed)
    }
}

/// Run-wide counters. Built only from finished `GroupReport`s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub groups_total: u64,
    pub groups_attempted: u64,
    pub groups_empty: u64,
    pub groups_skipped: u64,
    pub groups_failed: u64,
    pub groups_cancelled: u64,
    pub discovered: u64,
    pub skipped: u64,
    pub processed: u64,
    pub failed: u64,
    pub cancelled: u64,
}

impl RunStats {
    pub fn record(&mut self, g: &GroupReport) {
        self.groups_total += 1;
        if g.attempted() {
            self.groups_attempted += 1;
        }
        match g.status {
            GroupStatus::Empty => self.groups_empty += 1,
            GroupStatus::AlreadyComplete => self.groups_skipped += 1,
            GroupStatus::Failed => self.groups_failed += 1,
            GroupStatus::Cancelled => self.groups_cancelled += 1,
            GroupStatus::Completed | GroupStatus::CompletedWithFailures => {}
        }
        self.discovered += g.discovered;
        self.skipped += g.skipped;
        self.processed += g.processed;
        self.failed += g.failed;
        self.cancelled += g.cancelled;
    }

    /// Every discovered document is accounted for exactly once.
    pub fn is_consistent(&self) -> bool {
        self.discovered == self.skipped + self.processed + self.failed + self.cancelled
    }

    pub fn log_summary(&self) {
        info!("=== run summary ===");
        info!("documents discovered: {}", self.discovered);
        info!("documents skipped (already done): {}", self.skipped);
        info!("documents processed: {}", self.processed);
        info!("documents failed: {}", self.failed);
        if self.cancelled > 0 {
            info!("documents not attempted (cancelled): {}", self.cancelled);
        }
        info!("folders total: {}", self.groups_total);
        info!("folders attempted: {}", self.groups_attempted);
        info!("folders skipped (already done): {}", self.groups_skipped);
        info!("folders empty: {}", self.groups_empty);
        info!("folders failed: {}", self.groups_failed);
        info!("===================");
        if !self.is_consistent() {
            warn!(
                "statistics do not add up: discovered={} skipped={} processed={} \
                 failed={} cancelled={}",
                self.discovered, self.skipped, self.processed, self.failed, self.cancelled
            );
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_name: String,
    pub started: String,
    pub finished: String,
    pub config_sha256: String,
    pub input_root: String,
    pub output_root: String,
    pub cancelled: bool,
    pub totals: RunStats,
    pub groups: Vec<GroupReport>,
}
