use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use sandpit_config::{EngineProviderKind, MIN_DEBOUNCE_MS, SandpitConfig, ensure_workspace_config};
use sandpit_engine::{AnalysisEngine, EngineOverrides, load_engine};
use sandpit_rules::RuleSet;
use sandpit_share::{AddressBar, ExampleSet, parse_url};
use sandpitd::report::{ReportFormat, write_report};
use sandpitd::runtime::{SessionEvent, run_session};
use sandpitd::session::{Session, restore_startup};
use sandpitd::watch::run_file_watch;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about = "PHP playground session host")]
struct Cli {
    #[arg(long, default_value = ".", help = "Workspace holding .sandpit/config.toml")]
    workspace: PathBuf,

    #[arg(long, help = "PHP source file; watched for changes unless --once is set")]
    file: Option<PathBuf>,

    #[arg(long, help = "Share link to restore the session from")]
    url: Option<String>,

    #[arg(long, help = "Run one analysis, print the report and exit")]
    once: bool,

    #[arg(long, help = "Debounce window for edits, overrides the config")]
    debounce_ms: Option<u64>,

    #[arg(long, value_parser = parse_engine_provider, help = "Engine provider: mock or process")]
    engine: Option<EngineProviderKind>,

    #[arg(long, help = "Command for the process engine")]
    engine_command: Option<String>,

    #[arg(long, help = "Print the share link after every report")]
    print_url: bool,

    #[arg(long, help = "Print reports as JSON lines")]
    json: bool,
}

fn main() -> Result<()> {
    init_logging();
    let cli = parse_cli();
    run(cli)
}

fn parse_cli() -> Cli {
    let mut args: Vec<_> = std::env::args_os().collect();
    if args.get(1).is_some_and(|arg| arg == OsStr::new("--")) {
        args.remove(1);
    }

    Cli::parse_from(args)
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("SANDPIT_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: Cli) -> Result<()> {
    let workspace = cli.workspace.canonicalize().with_context(|| {
        format!(
            "failed to resolve workspace path {}",
            cli.workspace.display()
        )
    })?;

    let config = ensure_workspace_config(&workspace).with_context(|| {
        format!(
            "failed to load or create workspace config at {}",
            workspace.join(".sandpit/config.toml").display()
        )
    })?;

    let loaded = load_engine(
        &config.engine,
        EngineOverrides {
            provider: cli.engine,
            command: cli.engine_command.clone(),
            args: None,
        },
    )
    .context("failed to load analysis engine")?;
    tracing::info!(engine = %loaded.engine_name, "engine loaded");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    runtime.block_on(serve(cli, config, loaded.engine))
}

async fn serve(cli: Cli, config: SandpitConfig, engine: Arc<dyn AnalysisEngine>) -> Result<()> {
    let definitions = engine
        .definitions()
        .await
        .context("failed to read rule definitions from engine")?;
    let rules = RuleSet::initialize(&definitions).context("engine returned unusable definitions")?;
    let examples = ExampleSet::builtin();

    let link = cli
        .url
        .as_deref()
        .map(parse_url)
        .transpose()
        .context("invalid --url")?;
    let base = parse_url(&config.share.base_url).context("invalid share.base_url in config")?;

    let file_source = match &cli.file {
        Some(path) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?,
        ),
        None => None,
    };

    let (url, restored) = restore_startup(
        link.as_ref(),
        &base,
        &examples,
        config.session.php_version,
        file_source.as_deref(),
    );

    let debounce_ms = cli
        .debounce_ms
        .unwrap_or(config.session.debounce_ms)
        .max(MIN_DEBOUNCE_MS);
    let mut session = Session::new(
        rules,
        examples,
        AddressBar::new(url),
        Duration::from_millis(debounce_ms),
    );

    let format = if cli.json {
        ReportFormat::Json
    } else {
        ReportFormat::Text
    };

    if cli.once {
        let ticket = session.load(restored);
        let result = engine
            .analyze(&ticket.source, None, &ticket.settings)
            .await;
        session.complete(ticket.seq, result);

        let view = session.view().context("analysis produced no result")?;
        write_report(view, format, cli.print_url, &mut std::io::stdout().lock())?;
        return Ok(());
    }

    let Some(path) = cli.file else {
        anyhow::bail!("--file is required unless --once is set");
    };

    let (events_tx, events_rx) = mpsc::channel(64);
    let (views_tx, mut views_rx) = mpsc::channel(16);

    events_tx
        .send(SessionEvent::Load(restored))
        .await
        .context("session closed before it started")?;

    let watch_tx = events_tx.clone();
    let initial = file_source.unwrap_or_default();
    std::thread::spawn(move || {
        if let Err(err) = run_file_watch(&path, initial, watch_tx) {
            tracing::error!(error = %err, "file watch stopped");
        }
    });
    drop(events_tx);

    let print_url = cli.print_url;
    let printer = tokio::spawn(async move {
        while let Some(view) = views_rx.recv().await {
            if let Err(err) = write_report(&view, format, print_url, &mut std::io::stdout().lock()) {
                tracing::error!(error = %err, "failed to write report");
            }
        }
    });

    run_session(session, engine, events_rx, views_tx).await;
    printer.await.context("report printer failed")?;
    Ok(())
}

fn parse_engine_provider(value: &str) -> Result<EngineProviderKind, String> {
    value.parse()
}
