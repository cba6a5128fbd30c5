use crate::{
    config::Config,
    converter::{Converter, python::PythonConverter},
    driver::Driver,
    orchestrator,
    throttle::{CancelFlag, Throttle},
    util::{ensure_dir, file_timestamp},
};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "paper-batch")]
#[command(about = "Resumable, prioritized batch orchestrator for VLM document conversion")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./paper-batch.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check that the converter runtime is usable.
    Doctor {},
    /// Print folder order, pending documents and batch layout without converting.
    Plan {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        batch_size: Option<usize>,
    },
    /// Convert every pending document under the input root.
    Run {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        batch_size: Option<usize>,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg_path = resolve_config_path(args.config.as_deref());
    let mut cfg = Config::load(&cfg_path)?;

    match &args.cmd {
        Command::Doctor {} => {
            let _guard = init_logging(&args, &cfg, None)?;
            doctor(&cfg)
        }
        Command::Plan {
            input,
            output,
            batch_size,
        } => {
            apply_overrides(&mut cfg, input.as_deref(), output.as_deref(), *batch_size)?;
            let _guard = init_logging(&args, &cfg, None)?;
            plan(&cfg)
        }
        Command::Run {
            input,
            output,
            batch_size,
        } => {
            apply_overrides(&mut cfg, input.as_deref(), output.as_deref(), *batch_size)?;
            let log_path = resolve_log_path(&cfg);
            // Held for the whole run; dropping it flushes the log file.
            let _guard = init_logging(&args, &cfg, log_path.as_deref())?;
            if let Some(p) = &log_path {
                info!("log file: {}", p.display());
            }
            run(&cfg)
        }
    }
}

fn resolve_config_path(user: Option<&Path>) -> PathBuf {
    if let Some(p) = user {
        return p.to_path_buf();
    }
    let default = PathBuf::from("paper-batch.toml");
    if default.exists() {
        default
    } else {
        PathBuf::from("paper-batch.example.toml")
    }
}

fn apply_overrides(
    cfg: &mut Config,
    input: Option<&Path>,
    output: Option<&Path>,
    batch_size: Option<usize>,
) -> Result<()> {
    if let Some(p) = input {
        cfg.paths.input_root = p.display().to_string();
    }
    if let Some(p) = output {
        cfg.paths.output_root = p.display().to_string();
    }
    if let Some(n) = batch_size {
        cfg.batching.batch_size = n;
    }
    cfg.validate()
}

fn init_logging(
    args: &Args,
    cfg: &Config,
    file_path: Option<&Path>,
) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stdout_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(false).boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(false)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }
    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }
    Some(PathBuf::from(&cfg.paths.log_dir).join(format!("paper-batch_{}.log", file_timestamp())))
}

fn doctor(cfg: &Config) -> Result<()> {
    let converter = PythonConverter::new(cfg)?;
    let diag = converter.doctor()?;
    println!("{}", serde_json::to_string_pretty(&diag)?);
    Ok(())
}

fn plan(cfg: &Config) -> Result<()> {
    let folders = orchestrator::plan(
        cfg,
        Path::new(&cfg.paths.input_root),
        Path::new(&cfg.paths.output_root),
    )?;
    println!("{}", serde_json::to_string_pretty(&folders)?);
    Ok(())
}

fn run(cfg: &Config) -> Result<()> {
    let input_root = PathBuf::from(&cfg.paths.input_root);
    let output_root = PathBuf::from(&cfg.paths.output_root);

    info!("input root: {}", input_root.display());
    info!("output root: {}", output_root.display());
    info!("batch size: {}", cfg.batching.batch_size);
    info!(
        "backend={} lang={} formula={} table={} md_mode={:?} pages={}..{}",
        cfg.converter.backend,
        cfg.converter.lang,
        cfg.converter.formula_enable,
        cfg.converter.table_enable,
        cfg.converter.make_md_mode,
        cfg.converter.start_page,
        cfg.converter
            .end_page
            .map(|p| p.to_string())
            .unwrap_or_else(|| "end".into())
    );

    ensure_dir(&output_root)?;
    if cfg.debug.dump_effective_config {
        let raw = toml::to_string(cfg).unwrap_or_default();
        std::fs::write(output_root.join("effective-config.toml"), raw)?;
    }

    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            warn!("interrupt received; stopping the run");
            cancel.cancel();
        }) {
            warn!("could not install Ctrl-C handler: {e}");
        }
    }

    let converter = PythonConverter::new(cfg)?.with_cancel(cancel.clone());
    let driver = Driver::new(cfg, converter, Throttle::from_config(cfg, cancel));

    let report = orchestrator::run(cfg, &input_root, &output_root, &driver)?;

    if cfg.output.write_run_report {
        if let Err(e) = orchestrator::write_report(cfg, &output_root, &report) {
            warn!("{e:#}");
        }
    }

    if cfg.global.print_summary {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "run_name": report.run_name,
                "output_root": report.output_root,
                "cancelled": report.cancelled,
                "totals": report.totals,
            }))?
        );
    }

    info!("all folders handled");
    Ok(())
}
