use crate::config::{Config, MakeMode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocDiag {
    pub python_exe: String,
    pub python_version: String,
    pub mineru_version: Option<String>,
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertItem {
    pub name: String,
    pub path: String,
    pub lang: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseOptions {
    pub backend: String,
    pub server_url: Option<String>,
    pub formula_enable: bool,
    pub table_enable: bool,
    pub start_page: u32,
    pub end_page: Option<u32>,
    pub make_md_mode: MakeMode,
    pub pipeline_subdir: String,
    pub draw_layout_bbox: bool,
    pub dump_orig_pdf: bool,
    pub dump_md: bool,
    pub dump_middle_json: bool,
    pub dump_content_list: bool,
    pub dump_model_output: bool,
}

impl ParseOptions {
    pub fn from_config(cfg: &Config) -> Self {
        let c = &cfg.converter;
        let o = &cfg.output;
        Self {
            backend: c.backend.clone(),
            server_url: Some(c.server_url.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            formula_enable: c.formula_enable,
            table_enable: c.table_enable,
            start_page: c.start_page,
            end_page: c.end_page,
            make_md_mode: c.make_md_mode,
            pipeline_subdir: cfg.completion.pipeline_subdir.clone(),
            draw_layout_bbox: o.draw_layout_bbox,
            dump_orig_pdf: o.dump_orig_pdf,
            dump_md: o.dump_md,
            dump_middle_json: o.dump_middle_json,
            dump_content_list: o.dump_content_list,
            dump_model_output: o.dump_model_output,
        }
    }
}

/// One converter call: every item is written under `output_dir/{name}/{pipeline_subdir}/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertBatch {
    pub output_dir: String,
    pub batch_index: usize,
    pub items: Vec<ConvertItem>,
    pub options: ParseOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemResult {
    pub name: String,
    pub ok: bool,
    #[serde(default)]
    pub pages: Option<u32>,
    #[serde(default)]
    pub artifacts: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConvertOut {
    #[serde(default)]
    pub results: Vec<ItemResult>,
    #[serde(default)]
    pub warnings: Vec<String>,
}
