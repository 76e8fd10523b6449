//! mqm-ui - MQM annotation workbench
//!
//! Serves the annotation page and the session API. Datasets are read from
//! `<root>/input`, annotations and scores are appended under `<root>/output`.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use mqm_common::config::{self, TomlConfig};
use mqm_common::dataset::DatasetCatalog;
use mqm_common::raters::RaterRoster;
use mqm_common::writer::FileRecordWriter;
use mqm_common::SessionController;
use mqm_ui::sync::MirrorSync;
use mqm_ui::{build_router, AppState};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for mqm-ui
#[derive(Parser, Debug)]
#[command(name = "mqm-ui")]
#[command(about = "MQM translation annotation workbench")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides config)
    #[arg(short, long, env = "MQM_PORT")]
    port: Option<u16>,

    /// Address to bind (overrides config)
    #[arg(long, env = "MQM_HOST")]
    host: Option<String>,

    /// Root folder holding input/ and output/
    #[arg(short, long, env = "MQM_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long, env = "MQM_CONFIG")]
    config: Option<PathBuf>,

    /// Dataset file name to load at startup (inside the input folder)
    #[arg(short, long, env = "MQM_DATASET")]
    dataset: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().or_else(config::default_config_path);
    let config = match &config_path {
        Some(path) => config::load_toml_config(path).context("Failed to load configuration")?,
        None => TomlConfig::default(),
    };

    init_tracing(&config)?;

    // Build identification right after tracing init
    info!(
        "Starting MQM annotation workbench (mqm-ui) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config_path {
        Some(path) if path.exists() => info!("Configuration: {}", path.display()),
        Some(path) => warn!("Config file not found at {}, using defaults", path.display()),
        None => warn!("No config directory available, using defaults"),
    }

    let root = config::resolve_root_folder(args.root_folder.as_deref(), &config);
    let input_dir = config.input_dir(&root);
    let output_dir = config.output_dir(&root);
    std::fs::create_dir_all(&input_dir)
        .with_context(|| format!("Failed to create input folder {}", input_dir.display()))?;
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output folder {}", output_dir.display()))?;
    info!("Input folder: {}", input_dir.display());
    info!("Output folder: {}", output_dir.display());

    let roster = RaterRoster::new(&config.raters).context("Invalid rater roster")?;
    let catalog = DatasetCatalog::new(&input_dir);

    let writer = FileRecordWriter::new(&output_dir)
        .with_format(config.annotation_format)
        .with_score_file(config.write_score_file);
    let mut controller = SessionController::new(Box::new(writer));

    match args.dataset.as_deref().or(config.default_dataset.as_deref()) {
        Some(name) => {
            match catalog
                .resolve(name)
                .and_then(|path| controller.load_dataset(&path))
            {
                Ok(()) => info!("Default dataset loaded: {}", name),
                Err(e) => warn!("Default dataset {} not loaded ({}), starting idle", name, e),
            }
        }
        None => info!("No default dataset configured, waiting for a selection"),
    }

    let mut state = AppState::new(controller, roster, catalog, &output_dir);

    if let Some(mirror_dir) = &config.sync.mirror_dir {
        let sync = MirrorSync::new(&output_dir, mirror_dir);
        info!("Output mirroring to {}", mirror_dir.display());
        state = state.with_sync(sync);

        if let (Some(sync), Some(secs)) = (&state.sync, config.sync.interval_secs) {
            if secs > 0 {
                Arc::clone(sync).spawn_periodic(Duration::from_secs(secs));
                info!("Periodic output sync every {}s", secs);
            }
        }
    }

    let app = build_router(state);

    let host = args.host.unwrap_or(config.host);
    let port = args.port.unwrap_or(config.port);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("mqm-ui listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Install the tracing subscriber
///
/// `RUST_LOG` wins over the configured level. With `logging.file` set,
/// output goes to that file instead of stderr.
fn init_tracing(config: &TomlConfig) -> Result<()> {
    let level = &config.logging.level;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "mqm_ui={level},mqm_common={level},tower_http={level}"
        ))
    });

    let file_layer = match &config.logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };
    let stderr_layer = file_layer.is_none().then(|| fmt::layer());

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
