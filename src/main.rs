use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use visiotrack::cli::{self, Cli};
use visiotrack::config::Config;
use visiotrack::AppState;

/// How often expired bearer tokens are swept from the session table
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(600);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)?;

    // Initialize logging. Client commands stay quiet unless asked otherwise.
    let log_level = match (&cli.log_level, &cli.command) {
        (Some(level), _) => level.clone(),
        (None, Some(_)) => "warn".to_string(),
        (None, None) => config.logging.level.clone(),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if cli.command.is_some() {
        return cli::run_command(&cli, &config).await;
    }

    run_server(config).await
}

async fn run_server(config: Config) -> Result<()> {
    tracing::info!("Starting visiotrack v{}", env!("CARGO_PKG_VERSION"));

    let db = visiotrack::db::init(config.seed.demo_data)?;
    let state = Arc::new(AppState::new(config.clone(), db.clone()));

    // Sweep expired sessions in the background
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let purged = db.purge_expired_sessions();
            if purged > 0 {
                tracing::debug!(purged, "Purged expired sessions");
            }
        }
    });

    let app = visiotrack::api::create_router(state);

    let api_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("Failed to bind {}", api_addr))?;

    tracing::info!("API server listening on http://{}", api_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
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

    tracing::info!("Shutdown signal received");
}
