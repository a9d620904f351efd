//! Wobble Warriors server
//!
//! Runs the jelly brawler authoritatively: every browser tab opens one
//! WebSocket session whose task owns both fighters and steps them on a fixed
//! frame clock. Banter lines and roster bios are fetched from Gemini in the
//! background and fall back to canned text when it is unavailable.

mod app;
mod config;
mod dialogue;
mod game;
mod http;
mod util;
mod ws;

use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::AppState;
use crate::config::Config;
use crate::http::build_router;
use crate::util::time::init_server_time;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(&config.log_level);
    init_server_time();

    info!(
        addr = %config.server_addr,
        frame_rate = config.frame_rate,
        snapshot_every = config.snapshot_every,
        "Wobble Warriors server starting"
    );
    match &config.gemini_api_key {
        Some(_) => info!(model = %config.dialogue_model, "Dialogue generation enabled"),
        None => warn!("GEMINI_API_KEY not set, battles will use fallback dialogue"),
    }

    let listener = TcpListener::bind(config.server_addr).await?;
    let router = build_router(AppState::new(config.clone()));

    info!(
        "Arena open at ws://{}/ws (roster at http://{}/roster)",
        config.server_addr, config.server_addr
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("All sessions closed, server stopped");
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` overrides `LOG_LEVEL`
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl+C received, draining sessions"),
        _ = terminate => info!("SIGTERM received, draining sessions"),
    }
}
