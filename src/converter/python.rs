use super::{Converter, types::*};
use crate::{config::Config, throttle::CancelFlag};
use anyhow::{Context, Result, anyhow};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Runs the VLM runner script once per batch, exchanging JSON over stdin/stdout.
pub struct PythonConverter {
    cfg: Config,
    runner: PathBuf,
    python_exe: PathBuf,
    cancel: Option<CancelFlag>,
}

impl PythonConverter {
    pub fn new(cfg: &Config) -> Result<Self> {
        let scripts_dir = PathBuf::from(&cfg.paths.scripts_dir);
        if cfg.security.pin_scripts_dir {
            let cwd = std::env::current_dir().with_context(|| "current_dir")?;
            let canon = scripts_dir
                .canonicalize()
                .with_context(|| format!("canonicalize scripts_dir: {}", scripts_dir.display()))?;
            if !canon.starts_with(&cwd) {
                return Err(anyhow!(
                    "scripts_dir is outside cwd while pin_scripts_dir=true: {}",
                    canon.display()
                ));
            }
        }
        let runner = scripts_dir.join(&cfg.converter.runner_script);
        if !runner.exists() {
            return Err(anyhow!("missing runner script: {}", runner.display()));
        }
        Ok(Self {
            cfg: cfg.clone(),
            runner,
            python_exe: expand_tilde(cfg.converter.python_exe.trim()),
            cancel: None,
        })
    }

    /// Kill the runner process when `cancel` is raised mid-call.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn run_json<I: serde::Serialize, O: for<'de> serde::Deserialize<'de>>(
        &self,
        input: &I,
        timeout: Option<Duration>,
    ) -> Result<O> {
        debug!("python run {} timeout={:?}", self.runner.display(), timeout);
        let mut cmd = Command::new(&self.python_exe);
        cmd.arg(&self.runner);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        for (k, v) in &self.cfg.converter.env {
            cmd.env(k, v);
        }

        let request = serde_json::to_vec(input)?;
        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning python: {}", self.runner.display()))?;

        if let Err(e) = write_request(&mut child, &request) {
            // The runner most likely died before reading its input.
            let reason = format!("writing request to runner failed: {e}");
            kill(&mut child, &reason);
            let stderr =
                join_reader(spawn_reader(child.stderr.take()), "stderr").unwrap_or_default();
            return Err(runner_error(&reason, &stderr));
        }

        let output = wait_for(&mut child, timeout, self.cancel.as_ref())?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "runner exited with {}: {}\n{}",
                output.status,
                self.runner.display(),
                stderr.trim()
            ));
        }

        if self.cfg.debug.keep_python_stderr && !output.stderr.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("runner stderr: {}", stderr.trim());
        }

        serde_json::from_slice(&output.stdout)
            .with_context(|| format!("parsing runner JSON output: {}", self.runner.display()))
    }
}

impl Converter for PythonConverter {
    fn doctor(&self) -> Result<DocDiag> {
        self.run_json(
            &serde_json::json!({"cmd": "doctor"}),
            Some(Duration::from_secs(120)),
        )
    }

    fn convert(&self, batch: &ConvertBatch) -> Result<ConvertOut> {
        let timeout = match self.cfg.converter.batch_timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        let out: ConvertOut =
            self.run_json(&serde_json::json!({"cmd": "convert", "batch": batch}), timeout)?;
        for w in &out.warnings {
            warn!("runner warning (batch {}): {w}", batch.batch_index + 1);
        }
        Ok(out)
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

fn wait_for(
    child: &mut Child,
    timeout: Option<Duration>,
    cancel: Option<&CancelFlag>,
) -> Result<Output> {
    // Drain pipes while waiting so a chatty runner can't block on a full pipe.
    let stdout_thread = spawn_reader(child.stdout.take());
    let stderr_thread = spawn_reader(child.stderr.take());

    let start = Instant::now();
    let abort_reason = loop {
        if let Some(status) = child.try_wait().with_context(|| "try_wait")? {
            let stdout = join_reader(stdout_thread, "stdout")?;
            let stderr = join_reader(stderr_thread, "stderr")?;
            return Ok(Output {
                status,
                stdout,
                stderr,
            });
        }

        if let Some(limit) = timeout {
            if start.elapsed() > limit {
                break format!("runner exceeded timeout ({limit:?})");
            }
        }
        if cancel.is_some_and(CancelFlag::is_cancelled) {
            break "runner interrupted by cancellation".to_string();
        }

        std::thread::sleep(Duration::from_millis(50));
    };

    kill(child, &abort_reason);
    let _ = join_reader(stdout_thread, "stdout");
    let stderr = join_reader(stderr_thread, "stderr").unwrap_or_default();
    Err(runner_error(&abort_reason, &stderr))
}

/// Write the request and close stdin so the runner sees EOF.
fn write_request(child: &mut Child, request: &[u8]) -> std::io::Result<()> {
    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| std::io::Error::other("runner stdin not captured"))?;
    stdin.write_all(request)?;
    stdin.flush()
}

fn kill(child: &mut Child, reason: &str) {
    warn!("{reason}; killing runner");
    let _ = child.kill();
    if let Err(e) = child.wait() {
        warn!("wait after kill: {e}");
    }
}

fn runner_error(reason: &str, stderr: &[u8]) -> anyhow::Error {
    anyhow!("{reason}; stderr: {}", String::from_utf8_lossy(stderr).trim())
}

type Reader = std::thread::JoinHandle<Result<Vec<u8>>>;

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> Reader {
    std::thread::spawn(move || -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut p) = pipe {
            p.read_to_end(&mut buf).with_context(|| "read runner pipe")?;
        }
        Ok(buf)
    })
}

fn join_reader(handle: Reader, what: &str) -> Result<Vec<u8>> {
    handle
        .join()
        .map_err(|_| anyhow!("{what} reader thread panicked"))?
}
