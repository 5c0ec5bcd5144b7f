use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reseedjump_core::{
    load_config, validate_config, Config, DownloaderClient, JobHandle, JobScheduler, LogNotifier,
    Notifier, QBittorrentClient, RunOrchestrator, Schedule, SqliteKvStore, StatsAggregator,
    WebhookNotifier,
};
use reseedjump_server::{api::create_router, state::AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    let json = std::env::var("RESEEDJUMP_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn run() -> Result<()> {
    init_logging();

    // Determine config path
    let config_path = std::env::var("RESEEDJUMP_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Database path: {:?}", config.database.path);

    // Statistics store
    let store = Arc::new(
        SqliteKvStore::new(&config.database.path).context("Failed to create statistics store")?,
    );
    let stats = Arc::new(StatsAggregator::new(store));
    info!("Statistics store initialized");

    // Apply a changed tracker mapping to the stored history
    match stats.sync_mapping(&config.job.mapping()) {
        Ok(Some(report)) => info!(
            daily_entries = report.daily_entries,
            total_entries = report.total_entries,
            "Statistics reclassified with the new tracker mapping"
        ),
        Ok(None) => {}
        Err(e) => warn!(error = %e, "Failed to apply tracker mapping to statistics"),
    }

    let clients = build_clients(&config);
    let notifier = build_notifier(&config)?;

    let orchestrator = Arc::new(RunOrchestrator::new(
        config.job.clone(),
        clients,
        Arc::clone(&stats),
        notifier,
    ));

    // Start the scheduler
    let job_handles: Vec<JobHandle> = if config.job.enabled {
        let problems = config.job.readiness_problems();
        if problems.is_empty() {
            let schedules = Schedule::for_job(&config.job).context("Invalid job schedule")?;
            if config.job.run_once {
                info!("Running reseed once shortly");
            }
            info!(cron = config.job.effective_cron(), "Reseed job scheduled");
            schedules
                .into_iter()
                .map(|schedule| JobScheduler::start(Arc::clone(&orchestrator), schedule))
                .collect()
        } else {
            for problem in &problems {
                warn!("Reseed job not scheduled: {}", problem);
            }
            Vec::new()
        }
    } else {
        info!("Reseed job disabled in config");
        Vec::new()
    };

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        stats,
        Some(Arc::clone(&orchestrator)),
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Stop scheduling; an in-flight run completes first
    if !job_handles.is_empty() {
        info!("Stopping job scheduler...");
        for handle in job_handles {
            handle.stop().await;
        }
        info!("Job scheduler stopped");
    }

    info!("Server shut down");
    Ok(())
}

/// Create a client for every selected downloader, in selection order.
fn build_clients(config: &Config) -> Vec<Arc<dyn DownloaderClient>> {
    let mut clients: Vec<Arc<dyn DownloaderClient>> = Vec::new();

    for name in &config.job.downloaders {
        let Some(downloader) = config.downloaders.iter().find(|d| &d.name == name) else {
            error!("Selected downloader '{}' is not configured", name);
            continue;
        };

        info!("Initializing qBittorrent client '{}' at {}", name, downloader.url);
        match QBittorrentClient::new(downloader.clone()) {
            Ok(client) => clients.push(Arc::new(client)),
            Err(e) => error!("Failed to create qBittorrent client '{}': {}", name, e),
        }
    }

    clients
}

fn build_notifier(config: &Config) -> Result<Arc<dyn Notifier>> {
    match &config.notifier.webhook_url {
        Some(url) if !url.trim().is_empty() => {
            info!("Notifications will be sent to webhook");
            let notifier =
                WebhookNotifier::new(url.trim()).context("Failed to create webhook notifier")?;
            Ok(Arc::new(notifier))
        }
        _ => {
            info!("No webhook configured, notifications go to the log");
            Ok(Arc::new(LogNotifier::new()))
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
