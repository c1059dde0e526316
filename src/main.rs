mod api;
mod bot;
mod command;
mod config;
mod errors;
mod line;
mod queue;
mod search;

use std::net::SocketAddr;
use std::sync::Arc;
use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

use crate::api::AppState;
use crate::bot::Bot;
use crate::config::Config;
use crate::line::LineClient;
use crate::queue::TaskQueue;
use crate::search::HttpFetcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,line_search_bot=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!("line-search-bot v{} starting", env!("CARGO_PKG_VERSION"));

    let config = match Config::from_env() {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    let fetcher = HttpFetcher::new(config.fetch_timeout)
        .context("Failed to build page fetcher")?;
    let replier = LineClient::new(&config.line_api_base, &config.channel_token)
        .context("Failed to build LINE client")?;

    let bot = Arc::new(Bot::new(Arc::new(fetcher), Arc::new(replier)));
    let (queue, worker) = TaskQueue::spawn(config.queue_capacity, bot.clone());

    let state = AppState {
        config: config.clone(),
        queue,
        bot,
    };

    let app = crate::api::router(state).layer(
        tower_http::trace::TraceLayer::new_for_http(),
    );

    let addr: SocketAddr = config
        .bind_addr()
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.bind_addr()))?;

    info!(addr = %addr, "HTTP server listening");
    info!("Webhook endpoint: http://{}/callback", addr);
    info!("Health check:     http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind TCP listener")?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // The router and every queue handle are gone once `serve` returns.
    info!(deadline = ?config.shutdown_drain, "Draining task queue");
    if !worker.shutdown(config.shutdown_drain).await {
        error!("Task queue not fully drained, some events were not answered");
    }

    info!("line-search-bot shutdown complete");
    Ok(())
}

/// Listen for Ctrl-C or SIGTERM for graceful shutdown
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c  => info!("Received Ctrl-C"),
        _ = sigterm => info!("Received SIGTERM"),
    }

    info!("Initiating graceful shutdown...");
}
