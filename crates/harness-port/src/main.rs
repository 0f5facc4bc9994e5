use std::path::PathBuf;

use anyhow::Context as _;
use env_flags::env_flags;
use once_cell::sync::OnceCell;
use tracing_subscriber::layer::Layered;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use harness_port::config::{UserConfig, expand_home, load_user_config};
use harness_port::pipeline::{self, Settings};

type FilteredRegistry = Layered<EnvFilter, Registry>;
type BoxedLayer = Box<dyn Layer<FilteredRegistry> + Send + Sync>;

#[derive(Debug, Clone, Copy)]
enum LogStyle {
    Json,
    Compact,
    Pretty,
    Full,
}

fn fmt_layer<W>(style: LogStyle, ansi: bool, writer: W) -> BoxedLayer
where
    W: for<'w> tracing_subscriber::fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    let base = tracing_subscriber::fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_target(true)
        .with_ansi(ansi)
        .with_writer(writer);
    match style {
        LogStyle::Json => base.json().boxed(),
        LogStyle::Compact => base.compact().boxed(),
        LogStyle::Pretty => base.pretty().boxed(),
        LogStyle::Full => base.boxed(),
    }
}

fn port_home() -> PathBuf {
    env_flags! {
        /// harness-port home directory (absolute). Defaults to $HOME/.harness-port
        PORT_HOME: &str = "";
    }
    if !(*PORT_HOME).is_empty() {
        PathBuf::from((*PORT_HOME).to_string())
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".harness-port")
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".harness-port")
    }
}

fn init_tracing(home: &std::path::Path, user_cfg: Option<&UserConfig>) {
    env_flags! {
        /// Tracing filter, e.g. "info", "debug", or targets format.
        RUST_LOG: &str = "info";
        /// Preferred filter env (alias). If set, overrides RUST_LOG.
        TRACING_FILTER: &str = "";
        /// Pretty formatting for logs (ignored if TRACING_JSON=true).
        TRACING_PRETTY: bool = false;
        /// Compact single-line formatting for logs (ignored if TRACING_JSON=true)
        TRACING_COMPACT: bool = true;
        /// JSON formatting for logs
        TRACING_JSON: bool = false;
        /// If true, also log to file under <PORT_HOME>/logs or LOG_DIR
        LOG_TO_FILE: bool = false;
        /// Optional explicit log directory (absolute). Defaults to <PORT_HOME>/logs
        LOG_DIR: &str = "";
    }

    use tracing_subscriber::prelude::*;

    let env_set = |k: &str| std::env::var_os(k).is_some();

    // TRACING_FILTER first, then RUST_LOG, then user config.
    let mut rust_log = if !(*TRACING_FILTER).is_empty() {
        (*TRACING_FILTER).to_string()
    } else {
        (*RUST_LOG).to_string()
    };
    let mut tracing_json = *TRACING_JSON;
    let mut tracing_compact = *TRACING_COMPACT;
    let mut tracing_pretty = *TRACING_PRETTY;
    let mut log_to_file = *LOG_TO_FILE;
    let mut log_dir: Option<PathBuf> = if !(*LOG_DIR).is_empty() {
        Some(PathBuf::from((*LOG_DIR).to_string()))
    } else {
        None
    };

    if let Some(cfg) = user_cfg.and_then(|c| c.logging.as_ref()) {
        if !(env_set("TRACING_FILTER") || env_set("RUST_LOG"))
            && let Some(level) = cfg.level.as_ref()
        {
            rust_log = level.clone();
        }
        if !env_set("TRACING_JSON")
            && let Some(v) = cfg.json
        {
            tracing_json = v;
        }
        if !env_set("TRACING_COMPACT")
            && let Some(v) = cfg.compact
        {
            tracing_compact = v;
        }
        if !env_set("TRACING_PRETTY")
            && let Some(v) = cfg.pretty
        {
            tracing_pretty = v;
        }
        if !env_set("LOG_TO_FILE")
            && let Some(v) = cfg.to_file
        {
            log_to_file = v;
        }
        if !env_set("LOG_DIR")
            && let Some(dir) = cfg.dir.as_ref()
        {
            log_dir = Some(expand_home(dir));
        }
    }

    let style = if tracing_json {
        LogStyle::Json
    } else if tracing_compact {
        LogStyle::Compact
    } else if tracing_pretty {
        LogStyle::Pretty
    } else {
        LogStyle::Full
    };

    let filter = EnvFilter::try_new(rust_log).unwrap_or_else(|_| EnvFilter::new("info"));

    // stderr keeps stdout free for the JSON report.
    let mut layers: Vec<BoxedLayer> = vec![fmt_layer(style, true, std::io::stderr)];

    static FILE_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();
    let mut file_dir_error = None;
    if log_to_file {
        let dir = log_dir.unwrap_or_else(|| home.join("logs"));
        match std::fs::create_dir_all(&dir) {
            Ok(()) => {
                let appender = tracing_appender::rolling::daily(&dir, "harness-port.log");
                let (nb, guard) = tracing_appender::non_blocking(appender);
                let _ = FILE_GUARD.set(guard);
                layers.push(fmt_layer(style, false, nb));
            }
            Err(e) => file_dir_error = Some((dir, e)),
        }
    }

    let subscriber = tracing_subscriber::registry().with(filter).with(layers);
    if let Err(e) = subscriber.try_init() {
        tracing::debug!("tracing already set: {:?}", e);
    }
    if let Some((dir, e)) = file_dir_error {
        tracing::warn!("failed to create log dir {}: {}", dir.display(), e);
    }
}

fn resolve_settings(user_cfg: Option<&UserConfig>) -> anyhow::Result<(Settings, bool)> {
    env_flags! {
        /// Workspace directory. If empty, defaults to the current execution directory.
        WORKSPACE_DIR: &str = "";
        /// Clone or pull the source repository before converting.
        PORT_SYNC: bool = true;
        /// Source repository URL.
        PORT_REPO_URL: &str = "https://github.com/coleam00/Archon.git";
        /// Local checkout directory (relative to the workspace unless absolute).
        PORT_REPO_DIR: &str = "archon_source";
        /// Project directory inside the checkout.
        PORT_SOURCE_SUBDIR: &str = "archon-example-workflow";
        /// Output directory for converted commands.
        PORT_OUTPUT_DIR: &str = "commands/archon";
        /// Aggregated context file written in the workspace.
        PORT_CONTEXT_FILE: &str = "GEMINI.md";
        /// Skip writing the aggregated context file.
        PORT_SKIP_CONTEXT: bool = false;
        /// Extension for converted command files.
        PORT_OUTPUT_EXT: &str = "toml";
        /// Optional TOML rule file; built-in rules when empty.
        PORT_RULES_FILE: &str = "";
        /// Abort on the first document that fails to convert.
        PORT_FAIL_FAST: bool = false;
        /// Print the batch report as JSON on stdout.
        PORT_REPORT_JSON: bool = false;
    }

    let env_set = |k: &str| std::env::var_os(k).is_some();

    let workspace_dir = if !(*WORKSPACE_DIR).is_empty() {
        expand_home(*WORKSPACE_DIR)
    } else {
        std::env::current_dir().context("resolve current directory")?
    };
    tracing::info!("workspace_dir={}", workspace_dir.display());

    let resolve = |p: &str| -> PathBuf {
        let pb = expand_home(p);
        if pb.is_absolute() {
            pb
        } else {
            workspace_dir.join(pb)
        }
    };
    // Env wins when set, else user config, else the flag default.
    let pick_str = |key: &str, flag: &str, cfg: Option<&String>| -> String {
        if env_set(key) {
            flag.to_string()
        } else {
            cfg.cloned().unwrap_or_else(|| flag.to_string())
        }
    };
    let pick_bool = |key: &str, flag: bool, cfg: Option<bool>| -> bool {
        if env_set(key) { flag } else { cfg.unwrap_or(flag) }
    };

    let source = user_cfg.and_then(|c| c.source.as_ref());
    let output = user_cfg.and_then(|c| c.output.as_ref());
    let rules = user_cfg.and_then(|c| c.rules.as_ref());
    let batch = user_cfg.and_then(|c| c.batch.as_ref());

    let repo_dir = pick_str(
        "PORT_REPO_DIR",
        *PORT_REPO_DIR,
        source.and_then(|s| s.repo_dir.as_ref()),
    );
    let subdir = pick_str(
        "PORT_SOURCE_SUBDIR",
        *PORT_SOURCE_SUBDIR,
        source.and_then(|s| s.subdir.as_ref()),
    );
    let mut settings = Settings::with_layout(
        workspace_dir.clone(),
        &resolve(&repo_dir),
        std::path::Path::new(&subdir),
    );

    settings.sync = pick_bool("PORT_SYNC", *PORT_SYNC, source.and_then(|s| s.sync));
    settings.repo_url = pick_str(
        "PORT_REPO_URL",
        *PORT_REPO_URL,
        source.and_then(|s| s.repo_url.as_ref()),
    );
    settings.output_dir = resolve(&pick_str(
        "PORT_OUTPUT_DIR",
        *PORT_OUTPUT_DIR,
        output.and_then(|o| o.dir.as_ref()),
    ));
    settings.context_file = pick_str(
        "PORT_CONTEXT_FILE",
        *PORT_CONTEXT_FILE,
        output.and_then(|o| o.context_file.as_ref()),
    );
    settings.skip_context = pick_bool(
        "PORT_SKIP_CONTEXT",
        *PORT_SKIP_CONTEXT,
        output.and_then(|o| o.skip_context),
    );
    settings.output_extension = pick_str(
        "PORT_OUTPUT_EXT",
        *PORT_OUTPUT_EXT,
        output.and_then(|o| o.extension.as_ref()),
    );
    let rules_file = pick_str(
        "PORT_RULES_FILE",
        *PORT_RULES_FILE,
        rules.and_then(|r| r.file.as_ref()),
    );
    settings.rules_file = (!rules_file.trim().is_empty()).then(|| resolve(rules_file.trim()));
    settings.fail_fast = pick_bool(
        "PORT_FAIL_FAST",
        *PORT_FAIL_FAST,
        batch.and_then(|b| b.fail_fast),
    );
    let report_json = pick_bool(
        "PORT_REPORT_JSON",
        *PORT_REPORT_JSON,
        batch.and_then(|b| b.report_json),
    );

    tracing::debug!("settings: {:?}", settings);
    Ok((settings, report_json))
}

fn main() -> anyhow::Result<()> {
    let home = port_home();
    let user_cfg = match load_user_config(&home) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("ignoring unreadable {}/config.toml: {e:#}", home.display());
            None
        }
    };
    init_tracing(&home, user_cfg.as_ref());
    tracing::info!("starting harness-port {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("port_home={}", home.display());

    let (settings, report_json) = resolve_settings(user_cfg.as_ref())?;
    let report = pipeline::run(&settings)?;

    if report_json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serialize batch report")?
        );
    }
    if !report.is_success() {
        for f in &report.failures {
            tracing::error!("failed: {} ({})", f.path.display(), f.message);
        }
        anyhow::bail!(
            "{} of {} command document(s) failed to convert",
            report.failures.len(),
            report.failures.len() + report.written.len()
        );
    }
    tracing::info!("done");
    Ok(())
}
