use crate::discover::WorkItem;
use serde::Serialize;
use std::num::NonZeroUsize;

#[derive(Debug, Clone, Serialize)]
pub struct BatchPlan {
    pub item_count: usize,
    pub batch_size: usize,
    pub batches: Vec<Batch>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Batch {
    /// 0-based position within the group.
    pub index: usize,
    pub first_item: usize, // 1-based inclusive
    pub last_item: usize,  // 1-based inclusive
    pub items: Vec<WorkItem>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl BatchPlan {
    /// Contiguous batches of `batch_size` items; the last may be shorter.
    /// Input order is preserved and an empty input yields no batches.
    pub fn partition(items: Vec<WorkItem>, batch_size: NonZeroUsize) -> BatchPlan {
        let size = batch_size.get();
        let item_count = items.len();
        let mut batches = Vec::with_capacity(item_count.div_ceil(size));

        let mut iter = items.into_iter().peekable();
        let mut start = 0usize;
        while iter.peek().is_some() {
            let chunk: Vec<WorkItem> = iter.by_ref().take(size).collect();
            let end = start + chunk.len();
            batches.push(Batch {
                index: batches.len(),
                first_item: start + 1,
                last_item: end,
                items: chunk,
            });
            start = end;
        }

        BatchPlan {
            item_count,
            batch_size: size,
            batches,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.batches.iter().map(Batch::len).collect()
    }
}
