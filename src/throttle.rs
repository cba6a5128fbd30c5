//! Static pacing between converter calls, and the run's cancellation flag.

use crate::config::Config;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How a delay is actually spent.
pub trait Pause {
    fn pause(&self, dur: Duration, cancel: &CancelFlag);
}

/// Sleeps in short slices so cancellation cuts the wait short.
pub struct Sleep;

impl Pause for Sleep {
    fn pause(&self, dur: Duration, cancel: &CancelFlag) {
        let slice = Duration::from_millis(100);
        let deadline = Instant::now() + dur;
        while !cancel.is_cancelled() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep(slice.min(deadline - now));
        }
    }
}

pub struct Throttle {
    inter_batch: Duration,
    inter_group: Duration,
    pause: Box<dyn Pause>,
    cancel: CancelFlag,
}

impl Throttle {
    pub fn new(
        inter_batch: Duration,
        inter_group: Duration,
        pause: Box<dyn Pause>,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            inter_batch,
            inter_group,
            pause,
            cancel,
        }
    }

    pub fn from_config(cfg: &Config, cancel: CancelFlag) -> Self {
        Self::new(
            secs(cfg.batching.inter_batch_delay_seconds),
            secs(cfg.batching.inter_group_delay_seconds),
            Box::new(Sleep),
            cancel,
        )
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn between_batches(&self) {
        self.wait(self.inter_batch, "batch");
    }

    pub fn between_groups(&self) {
        self.wait(self.inter_group, "folder");
    }

    fn wait(&self, dur: Duration, what: &str) {
        if dur.is_zero() || self.cancel.is_cancelled() {
            return;
        }
        info!("waiting {:.1}s before the next {what}", dur.as_secs_f64());
        self.pause.pause(dur, &self.cancel);
    }
}

fn secs(s: f64) -> Duration {
    Duration::try_from_secs_f64(s).unwrap_or(Duration::ZERO)
}
