use crate::{config::Config, discover::WorkItem};
use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::fs::File;
use std::io::Read;

#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub name: String,
    /// Path as handed to the converter.
    pub path: String,
    pub file_bytes: u64,
}

/// Check that the document can be opened and read before it is handed to the
/// converter.
pub fn probe_item(cfg: &Config, item: &WorkItem) -> Result<ProbeResult> {
    let Some(path) = item.path.to_str() else {
        bail!("input path is not valid UTF-8: {}", item.path.display());
    };
    let mut f = File::open(&item.path)
        .with_context(|| format!("open input: {}", item.path.display()))?;
    let meta = f.metadata().with_context(|| "stat input")?;
    if !meta.is_file() {
        bail!("input is not a regular file: {}", item.path.display());
    }

    let file_bytes = meta.len();
    if file_bytes == 0 {
        bail!("input is empty: {}", item.path.display());
    }
    if cfg.limits.max_input_file_bytes > 0 && file_bytes > cfg.limits.max_input_file_bytes {
        bail!(
            "input exceeds max_input_file_bytes: {} > {}",
            file_bytes,
            cfg.limits.max_input_file_bytes
        );
    }

    let mut head = [0u8; 1];
    f.read_exact(&mut head)
        .with_context(|| format!("read input: {}", item.path.display()))?;

    Ok(ProbeResult {
        name: item.name.clone(),
        path: path.to_string(),
        file_bytes,
    })
}
