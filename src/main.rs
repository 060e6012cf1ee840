//! lexloop — court-issue resolution orchestrator
//!
//! Usage:
//!   lexloop run                  → run one batch in the foreground
//!   lexloop serve                → start the control gateway
//!   lexloop status               → print the recorded agent status
//!   lexloop --config path.toml   → load settings from TOML

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use lexloop_core::LexloopConfig;
use lexloop_engine::{CancellationToken, Orchestrator, RemoteCollaborator};
use lexloop_gateway::{ControlPlane, GatewayState, StatusStore, UnixProcessControl};
use lexloop_store::{CheckpointStore, EventLog};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "lexloop",
    about = "Routes court issues through research and evidence-review pipelines",
    version = env!("CARGO_PKG_VERSION"),
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Write logs to a file (in addition to stderr)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one orchestrator batch in the foreground
    Run,
    /// Start the HTTP control gateway
    Serve {
        /// Override the configured gateway port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print the recorded agent status
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_file.as_deref());

    let config = LexloopConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Run => run_batch(config).await,
        Commands::Serve { port } => serve_gateway(config, port).await,
        Commands::Status => print_status(config).await,
    }
}

fn init_tracing(
    log_file: Option<&std::path::Path>,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "lexloop=info,tower_http=info".into());
    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer());

    if let Some(path) = log_file {
        let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
        let file = path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("lexloop.log"));
        let (writer, guard) =
            tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file));
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(writer),
            )
            .init();
        Some(guard)
    } else {
        registry.init();
        None
    }
}

struct Runtime {
    orchestrator: Arc<Orchestrator>,
    checkpoints: Arc<CheckpointStore>,
    events: Arc<EventLog>,
}

fn build_runtime(config: &LexloopConfig) -> Runtime {
    let collaborator = Arc::new(RemoteCollaborator::new(&config.collaborator));
    let checkpoints = Arc::new(CheckpointStore::new(
        config.paths.checkpoint_dir.clone(),
        config.limits.max_history,
    ));
    let events = Arc::new(EventLog::new(config.paths.events.clone()));
    let orchestrator = Arc::new(Orchestrator::new(
        config,
        collaborator.clone(),
        collaborator,
        checkpoints.clone(),
        events.clone(),
    ));
    Runtime {
        orchestrator,
        checkpoints,
        events,
    }
}

async fn run_batch(config: LexloopConfig) -> anyhow::Result<()> {
    let runtime = build_runtime(&config);

    // Ctrl-C cancels cooperatively; in-flight checkpoint writes finish first.
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling batch");
            interrupt.cancel();
        }
    });

    let result = runtime.orchestrator.run(cancel).await?;
    info!(issues = result.issues.len(), "batch finished");
    println!("{}", serde_json::to_string_pretty(&result.report)?);
    Ok(())
}

async fn serve_gateway(config: LexloopConfig, port: Option<u16>) -> anyhow::Result<()> {
    let runtime = build_runtime(&config);
    let control = Arc::new(ControlPlane::new(
        runtime.orchestrator,
        StatusStore::new(config.paths.status.clone()),
        Arc::new(UnixProcessControl),
        runtime.checkpoints,
        runtime.events,
    ));

    let mut gateway = config.gateway.clone();
    if let Some(port) = port {
        gateway.port = port;
    }
    lexloop_gateway::serve(&gateway, Arc::new(GatewayState { control })).await
}

async fn print_status(config: LexloopConfig) -> anyhow::Result<()> {
    let runtime = build_runtime(&config);
    let control = ControlPlane::new(
        runtime.orchestrator,
        StatusStore::new(config.paths.status.clone()),
        Arc::new(UnixProcessControl),
        runtime.checkpoints,
        runtime.events,
    );
    let record = control.status().await?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
