#![allow(dead_code)]

use anyhow::{Result, bail};
use paper_batch::{
    config::Config,
    converter::{ConvertBatch, ConvertOut, Converter, DocDiag, ItemResult},
    driver::Driver,
    throttle::{CancelFlag, Pause, Throttle},
};
use std::cell::RefCell;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

/// Writes `{name}.md` for every item it accepts, like the real runner.
#[derive(Default)]
pub struct FakeConverter {
    /// Items reported as failed.
    pub fail_items: HashSet<String>,
    /// Items silently left out of the result list.
    pub drop_items: HashSet<String>,
    /// Output folders (by last path component) whose calls error out.
    pub fail_groups: HashSet<String>,
    /// Raise this flag during the n-th call (1-based) and then error.
    pub cancel_on_call: Option<(usize, CancelFlag)>,
    pub calls: RefCell<Vec<(String, Vec<String>)>>,
}

impl FakeConverter {
    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn groups_called(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for (g, _) in self.calls.borrow().iter() {
            if !seen.contains(g) {
                seen.push(g.clone());
            }
        }
        seen
    }
}

impl Converter for FakeConverter {
    fn doctor(&self) -> Result<DocDiag> {
        Ok(DocDiag {
            python_exe: "fake".into(),
            python_version: "0".into(),
            mineru_version: None,
            ok: true,
            error: None,
        })
    }

    fn convert(&self, batch: &ConvertBatch) -> Result<ConvertOut> {
        let group = Path::new(&batch.output_dir)
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.calls.borrow_mut().push((
            group.clone(),
            batch.items.iter().map(|i| i.name.clone()).collect(),
        ));

        if let Some((n, flag)) = &self.cancel_on_call {
            if *n == self.call_count() {
                flag.cancel();
                bail!("interrupted");
            }
        }
        if self.fail_groups.contains(&group) {
            bail!("model server unavailable for {group}");
        }

        let mut results = Vec::new();
        for item in &batch.items {
            if self.drop_items.contains(&item.name) {
                continue;
            }
            if self.fail_items.contains(&item.name) {
                results.push(ItemResult {
                    name: item.name.clone(),
                    ok: false,
                    pages: None,
                    artifacts: Vec::new(),
                    error: Some("layout model crashed".into()),
                });
                continue;
            }
            let dir = Path::new(&batch.output_dir)
                .join(&item.name)
                .join(&batch.options.pipeline_subdir);
            std::fs::create_dir_all(&dir)?;
            let md = format!("{}.md", item.name);
            std::fs::write(dir.join(&md), format!("# {}", item.name))?;
            results.push(ItemResult {
                name: item.name.clone(),
                ok: true,
                pages: Some(1),
                artifacts: vec![md],
                error: None,
            });
        }
        Ok(ConvertOut {
            results,
            warnings: Vec::new(),
        })
    }
}

/// Records requested delays instead of sleeping.
#[derive(Clone, Default)]
pub struct RecordPause(pub Rc<RefCell<Vec<Duration>>>);

impl Pause for RecordPause {
    fn pause(&self, dur: Duration, _cancel: &CancelFlag) {
        self.0.borrow_mut().push(dur);
    }
}

pub const BATCH_DELAY: Duration = Duration::from_millis(200);
pub const GROUP_DELAY: Duration = Duration::from_millis(300);

pub fn driver<'a>(
    cfg: &Config,
    conv: &'a FakeConverter,
    pause: RecordPause,
    cancel: CancelFlag,
) -> Driver<&'a FakeConverter> {
    let throttle = Throttle::new(BATCH_DELAY, GROUP_DELAY, Box::new(pause), cancel);
    Driver::new(cfg, conv, throttle)
}

pub fn config(batch_size: usize) -> Config {
    let mut cfg = Config::default();
    cfg.batching.batch_size = batch_size;
    cfg
}

pub fn add_docs(input: &Path, group: &str, names: &[&str]) -> PathBuf {
    let dir = input.join(group);
    std::fs::create_dir_all(&dir).unwrap();
    for n in names {
        std::fs::write(dir.join(format!("{n}.pdf")), b"%PDF-1.4 test").unwrap();
    }
    dir
}
