// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
use anyhow::{Context, Result};
use clap::Parser;
use lg_cache::CacheService;
use lg_config::{load_config, validate_config, GatewayConfig};
use lg_daemon::{build_app, AppState};
use lg_jobs::JobManager;
use lg_store::Store;
use lg_workspace::WorkspaceManager;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "lg-daemon", version, about = "Lint gateway HTTP daemon")]
struct Args {
    /// Bind address.
    #[arg(long, default_value = "127.0.0.1:8070")]
    bind: String,

    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref()).context("load configuration")?;
    let warnings = validate_config(&config).context("validate configuration")?;

    init_tracing(&config);

    for warning in &warnings {
        warn!(target: "lintgate.daemon", %warning, "configuration warning");
    }

    let store = Arc::new(
        Store::open(&config.database_path, 5)
            .await
            .with_context(|| format!("open store at {}", config.database_path))?,
    );

    let cache = Arc::new(CacheService::new(Arc::clone(&store), config.cache.ttl_secs));

    let workspace_dir = config
        .workspace_dir
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("lintgate-workspaces").display().to_string());
    let limits = workspace_limits_from_config(&config);
    let workspace = Arc::new(WorkspaceManager::new(workspace_dir, limits));

    let jobs = Arc::new(JobManager::new(
        Arc::clone(&store),
        Arc::clone(&cache),
        Arc::clone(&workspace),
        &config.jobs,
    ));

    let state = Arc::new(AppState {
        store: Arc::clone(&store),
        cache: Arc::clone(&cache),
        workspace: Arc::clone(&workspace),
        jobs: Arc::clone(&jobs),
        config: Arc::new(config.clone()),
        shutting_down: Arc::new(AtomicBool::new(false)),
    });

    spawn_sweeps(Arc::clone(&state));

    let app = build_app(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("bind {}", args.bind))?;
    info!(bind = %args.bind, "lg-daemon listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .context("serve")
}

fn init_tracing(config: &GatewayConfig) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if config.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

fn workspace_limits_from_config(config: &GatewayConfig) -> lg_workspace::Limits {
    let defaults = lg_workspace::Limits::default();
    lg_workspace::Limits {
        max_file_bytes: config.workspace.max_file_bytes,
        max_total_bytes: config.workspace.max_total_bytes,
        max_file_count: config.workspace.max_file_count,
        max_age: std::time::Duration::from_secs(config.workspace.max_age_secs),
        ..defaults
    }
}

/// Periodic background sweeps for expired cache entries, stale workspaces,
/// and old completed jobs. Mirrors the retention windows in `GatewayConfig`.
fn spawn_sweeps(state: Arc<AppState>) {
    let cache_interval = state.config.cache.sweep_interval_secs;
    if cache_interval > 0 {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(cache_interval));
            loop {
                ticker.tick().await;
                match state.cache.sweep_expired().await {
                    Ok(n) if n > 0 => info!(target: "lintgate.daemon", removed = n, "swept expired cache entries"),
                    Ok(_) => {}
                    Err(err) => warn!(target: "lintgate.daemon", %err, "cache sweep failed"),
                }
            }
        });
    }

    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(300));
            loop {
                ticker.tick().await;
                match state.workspace.cleanup_expired() {
                    Ok(n) if n > 0 => info!(target: "lintgate.daemon", removed = n, "swept expired workspaces"),
                    Ok(_) => {}
                    Err(err) => warn!(target: "lintgate.daemon", %err, "workspace sweep failed"),
                }
            }
        });
    }

    {
        let retention_days = i64::from(state.config.jobs.retention_days);
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(24 * 60 * 60));
            loop {
                ticker.tick().await;
                match state.jobs.sweep_old_jobs(retention_days).await {
                    Ok(n) if n > 0 => info!(target: "lintgate.daemon", removed = n, "purged old jobs"),
                    Ok(_) => {}
                    Err(err) => warn!(target: "lintgate.daemon", %err, "job sweep failed"),
                }
            }
        });
    }
}

async fn shutdown_signal(state: Arc<AppState>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    state.shutting_down.store(true, Ordering::SeqCst);
    info!(target: "lintgate.daemon", "graceful shutdown initiated");
}
