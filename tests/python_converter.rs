use paper_batch::{
    config::Config,
    converter::{ConvertBatch, ConvertItem, Converter, ParseOptions, python::PythonConverter},
    throttle::CancelFlag,
};
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;

const ECHO: &str = r#"
import json, os, sys
req = json.load(sys.stdin)
items = req["batch"]["items"]
json.dump({
    "results": [
        {"name": i["name"], "ok": True, "pages": 2, "artifacts": [i["name"] + ".md"]}
        for i in items
    ],
    "warnings": [os.environ.get("PAPER_BATCH_MARK", "")],
}, sys.stdout)
"#;

const SLOW: &str = "import time\ntime.sleep(30)\n";

const CRASH: &str = "import sys\nsys.stderr.write('model weights missing\\n')\nsys.exit(3)\n";

const GARBAGE: &str = "import sys\nsys.stdin.read()\nprint('this is not json')\n";

fn with_runner(dir: &Path, script: &str) -> Config {
    fs::write(dir.join("runner.py"), script).unwrap();
    let mut cfg = Config::default();
    cfg.paths.scripts_dir = dir.display().to_string();
    cfg.converter.runner_script = "runner.py".into();
    cfg.security.pin_scripts_dir = false;
    cfg
}

fn batch(cfg: &Config, n: usize) -> ConvertBatch {
    ConvertBatch {
        output_dir: "/tmp/paper-batch-out".into(),
        batch_index: 0,
        items: (0..n)
            .map(|i| ConvertItem {
                name: format!("doc{i:05}"),
                path: format!("/data/papers/2020-01-01_A/doc{i:05}.pdf"),
                lang: "en".into(),
            })
            .collect(),
        options: ParseOptions::from_config(cfg),
    }
}

#[test]
fn results_and_env_come_back_from_the_runner() {
    let dir = TempDir::new().unwrap();
    let mut cfg = with_runner(dir.path(), ECHO);
    cfg.converter
        .env
        .insert("PAPER_BATCH_MARK".into(), "from-config".into());

    let conv = PythonConverter::new(&cfg).unwrap();
    let out = conv.convert(&batch(&cfg, 2)).unwrap();

    assert_eq!(out.results.len(), 2);
    assert!(out.results.iter().all(|r| r.ok));
    assert_eq!(out.results[1].pages, Some(2));
    assert_eq!(out.results[0].artifacts, vec!["doc00000.md".to_string()]);
    assert_eq!(out.warnings, vec!["from-config".to_string()]);
}

#[test]
fn missing_runner_script_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut cfg = with_runner(dir.path(), ECHO);
    cfg.converter.runner_script = "absent.py".into();
    assert!(PythonConverter::new(&cfg).is_err());
}

#[test]
fn hung_runner_is_killed_at_the_timeout() {
    let dir = TempDir::new().unwrap();
    let mut cfg = with_runner(dir.path(), SLOW);
    cfg.converter.batch_timeout_seconds = 1;

    let conv = PythonConverter::new(&cfg).unwrap();
    let started = Instant::now();
    let err = conv.convert(&batch(&cfg, 1)).unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(format!("{err:#}").contains("timeout"), "{err:#}");
}

#[test]
fn cancellation_kills_a_running_call() {
    let dir = TempDir::new().unwrap();
    let cfg = with_runner(dir.path(), SLOW);
    let cancel = CancelFlag::new();
    let conv = PythonConverter::new(&cfg).unwrap().with_cancel(cancel.clone());

    let trigger = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(300));
        cancel.cancel();
    });
    let started = Instant::now();
    let err = conv.convert(&batch(&cfg, 1)).unwrap_err();
    trigger.join().unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(format!("{err:#}").contains("cancellation"), "{err:#}");
}

#[test]
fn non_zero_exit_reports_runner_stderr() {
    let dir = TempDir::new().unwrap();
    let cfg = with_runner(dir.path(), CRASH);
    let conv = PythonConverter::new(&cfg).unwrap();

    let err = conv.convert(&batch(&cfg, 1)).unwrap_err();
    assert!(format!("{err:#}").contains("model weights missing"), "{err:#}");
}

#[test]
fn runner_dying_before_reading_input_is_reported() {
    // Large enough to overflow the pipe buffer, so the write itself fails.
    let dir = TempDir::new().unwrap();
    let cfg = with_runner(dir.path(), CRASH);
    let conv = PythonConverter::new(&cfg).unwrap();

    let err = conv.convert(&batch(&cfg, 5_000)).unwrap_err();
    assert!(format!("{err:#}").contains("model weights missing"), "{err:#}");
}

#[test]
fn unparseable_output_is_an_error() {
    let dir = TempDir::new().unwrap();
    let cfg = with_runner(dir.path(), GARBAGE);
    let conv = PythonConverter::new(&cfg).unwrap();

    let err = conv.convert(&batch(&cfg, 1)).unwrap_err();
    assert!(format!("{err:#}").contains("parsing runner JSON"), "{err:#}");
}
