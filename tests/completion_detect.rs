use paper_batch::{
    completion::{CompletionStatus, check},
    config::{CompletionMode, Config},
};
use std::fs;
use tempfile::TempDir;

fn vlm_dir(root: &TempDir, name: &str) -> std::path::PathBuf {
    let dir = root.path().join(name).join("vlm");
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn markdown_result_is_complete() {
    let cfg = Config::default();
    let out = TempDir::new().unwrap();
    let dir = vlm_dir(&out, "paper");
    fs::write(dir.join("paper.md"), "# Title").unwrap();

    assert_eq!(check(&cfg, out.path(), "paper"), CompletionStatus::Complete);
}

#[test]
fn absent_output_is_missing() {
    let cfg = Config::default();
    let out = TempDir::new().unwrap();
    assert_eq!(check(&cfg, out.path(), "paper"), CompletionStatus::Missing);
}

#[test]
fn item_dir_without_pipeline_dir_is_not_complete() {
    let cfg = Config::default();
    let out = TempDir::new().unwrap();
    fs::create_dir_all(out.path().join("paper").join("images")).unwrap();

    assert_eq!(check(&cfg, out.path(), "paper"), CompletionStatus::NoPipelineDir);
}

#[test]
fn empty_pipeline_dir_is_not_complete() {
    let cfg = Config::default();
    let out = TempDir::new().unwrap();
    vlm_dir(&out, "paper");

    let status = check(&cfg, out.path(), "paper");
    assert!(matches!(status, CompletionStatus::Incomplete { .. }));
    assert!(!status.is_complete());
}

#[test]
fn only_non_result_files_is_not_complete() {
    let cfg = Config::default();
    let out = TempDir::new().unwrap();
    let dir = vlm_dir(&out, "paper");
    fs::write(dir.join("paper_layout.pdf"), b"%PDF").unwrap();
    fs::create_dir_all(dir.join("images.md")).unwrap();

    assert!(!check(&cfg, out.path(), "paper").is_complete());
}

#[test]
fn zero_length_result_does_not_count() {
    let cfg = Config::default();
    let out = TempDir::new().unwrap();
    let dir = vlm_dir(&out, "paper");
    fs::write(dir.join("paper.md"), "").unwrap();

    assert!(!check(&cfg, out.path(), "paper").is_complete());
}

#[test]
fn result_extensions_are_configurable() {
    let mut cfg = Config::default();
    cfg.completion.result_extensions = vec!["html".into()];
    let out = TempDir::new().unwrap();
    let dir = vlm_dir(&out, "paper");
    fs::write(dir.join("paper.md"), "x").unwrap();
    assert!(!check(&cfg, out.path(), "paper").is_complete());

    fs::write(dir.join("paper.html"), "<p>x</p>").unwrap();
    assert!(check(&cfg, out.path(), "paper").is_complete());
}

#[test]
fn pipeline_subdir_is_configurable() {
    let mut cfg = Config::default();
    cfg.completion.pipeline_subdir = "auto".into();
    let out = TempDir::new().unwrap();
    let dir = vlm_dir(&out, "paper");
    fs::write(dir.join("paper.md"), "x").unwrap();
    assert!(!check(&cfg, out.path(), "paper").is_complete());
}

#[test]
fn all_enabled_artifacts_mode_requires_every_enabled_file() {
    let mut cfg = Config::default();
    cfg.completion.mode = CompletionMode::AllEnabledArtifacts;
    cfg.output.draw_layout_bbox = false;
    cfg.output.dump_model_output = false;

    let out = TempDir::new().unwrap();
    let dir = vlm_dir(&out, "paper");
    fs::write(dir.join("paper.md"), "x").unwrap();
    fs::write(dir.join("paper_middle.json"), "{}").unwrap();

    match check(&cfg, out.path(), "paper") {
        CompletionStatus::Incomplete { missing } => {
            assert_eq!(missing, vec!["paper_content_list.json".to_string()]);
        }
        other => panic!("expected incomplete, got {other:?}"),
    }

    fs::write(dir.join("paper_content_list.json"), "[]").unwrap();
    assert!(check(&cfg, out.path(), "paper").is_complete());
}
