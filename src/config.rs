use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub discovery: Discovery,
    #[serde(default)]
    pub batching: Batching,
    #[serde(default)]
    pub completion: Completion,
    #[serde(default)]
    pub converter: Converter,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub debug: Debug,
    #[serde(default)]
    pub security: Security,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batching.batch_size == 0 {
            bail!("batching.batch_size must be at least 1");
        }
        if self.completion.pipeline_subdir.trim().is_empty() {
            bail!("completion.pipeline_subdir must not be empty");
        }
        if self.completion.result_extensions.is_empty() {
            bail!("completion.result_extensions must name at least one extension");
        }
        if self.discovery.document_extensions.is_empty() {
            bail!("discovery.document_extensions must name at least one extension");
        }
        if let Some(end) = self.converter.end_page {
            if end < self.converter.start_page {
                bail!(
                    "converter.end_page ({end}) is before converter.start_page ({})",
                    self.converter.start_page
                );
            }
        }
        Ok(())
    }

    /// A stable, normalization-friendly string for hashing.
    pub fn normalized_for_hash(&self) -> String {
        toml::to_string(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Global {
    pub run_name: String,
    pub skip_completed: bool,
    pub print_summary: bool,
}
impl Default for Global {
    fn default() -> Self {
        Self {
            run_name: "default".into(),
            skip_completed: true,
            print_summary: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub input_root: String,
    pub output_root: String,
    pub scripts_dir: String,
    pub log_dir: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            input_root: "input".into(),
            output_root: "output".into(),
            scripts_dir: "scripts".into(),
            log_dir: "logs".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Discovery {
    /// Matched case-insensitively, without the leading dot.
    pub document_extensions: Vec<String>,
    pub include_hidden: bool,
}
impl Default for Discovery {
    fn default() -> Self {
        Self {
            document_extensions: vec!["pdf".into()],
            include_hidden: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Batching {
    pub batch_size: usize,
    pub inter_batch_delay_seconds: f64,
    pub inter_group_delay_seconds: f64,
}
impl Default for Batching {
    fn default() -> Self {
        Self {
            batch_size: 5,
            inter_batch_delay_seconds: 2.0,
            inter_group_delay_seconds: 3.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionMode {
    /// Any non-empty result file in the pipeline subdirectory.
    AnyResult,
    /// Every artifact enabled under `[output]` must be present.
    AllEnabledArtifacts,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Completion {
    pub mode: CompletionMode,
    pub pipeline_subdir: String,
    pub result_extensions: Vec<String>,
}
impl Default for Completion {
    fn default() -> Self {
        Self {
            mode: CompletionMode::AnyResult,
            pipeline_subdir: "vlm".into(),
            result_extensions: vec!["md".into(), "json".into(), "txt".into()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MakeMode {
    /// Markdown with images inline.
    MmMd,
    /// Text-only markdown.
    NlpMd,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Converter {
    pub python_exe: String,
    pub runner_script: String,
    pub backend: String,
    pub server_url: String,
    pub lang: String,
    pub formula_enable: bool,
    pub table_enable: bool,
    /// 0-based, inclusive.
    pub start_page: u32,
    /// 0-based, inclusive. Absent means "to the last page".
    pub end_page: Option<u32>,
    pub make_md_mode: MakeMode,
    /// 0 disables the timeout.
    pub batch_timeout_seconds: u64,
    pub env: BTreeMap<String, String>,
}
impl Default for Converter {
    fn default() -> Self {
        Self {
            python_exe: "python3".into(),
            runner_script: "vlm_runner.py".into(),
            backend: "vlm-transformers".into(),
            server_url: "".into(),
            lang: "en".into(),
            formula_enable: true,
            table_enable: true,
            start_page: 0,
            end_page: None,
            make_md_mode: MakeMode::MmMd,
            batch_timeout_seconds: 0,
            env: Default::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Output {
    pub draw_layout_bbox: bool,
    pub dump_orig_pdf: bool,
    pub dump_md: bool,
    pub dump_middle_json: bool,
    pub dump_content_list: bool,
    pub dump_model_output: bool,
    pub write_run_report: bool,
    pub run_report_filename: String,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            draw_layout_bbox: true,
            dump_orig_pdf: false,
            dump_md: true,
            dump_middle_json: true,
            dump_content_list: true,
            dump_model_output: true,
            write_run_report: true,
            run_report_filename: "run-report.json".into(),
        }
    }
}

impl Output {
    /// File names the converter writes for `name` under the enabled toggles.
    pub fn expected_artifacts(&self, name: &str) -> Vec<String> {
        let mut out = Vec::new();
        if self.dump_md {
            out.push(format!("{name}.md"));
        }
        if self.dump_middle_json {
            out.push(format!("{name}_middle.json"));
        }
        if self.dump_content_list {
            out.push(format!("{name}_content_list.json"));
        }
        if self.dump_model_output {
            out.push(format!("{name}_model_output.txt"));
        }
        if self.dump_orig_pdf {
            out.push(format!("{name}_origin.pdf"));
        }
        if self.draw_layout_bbox {
            out.push(format!("{name}_layout.pdf"));
        }
        out
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// 0 disables the check.
    pub max_input_file_bytes: u64,
}
impl Default for Limits {
    fn default() -> Self {
        Self {
            max_input_file_bytes: 2 * 1024 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: true,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Debug {
    pub keep_python_stderr: bool,
    pub dump_effective_config: bool,
}
impl Default for Debug {
    fn default() -> Self {
        Self {
            keep_python_stderr: true,
            dump_effective_config: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Security {
    pub pin_scripts_dir: bool,
}
impl Default for Security {
    fn default() -> Self {
        Self {
            pin_scripts_dir: true,
        }
    }
}
