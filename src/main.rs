mod alerts;
mod api;
mod browser;
mod config;
mod error;
mod monitor;
mod scraper;
mod telegram;
mod types;

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::alerts::{AlertDispatcher, AlertStore};
use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::api::{router, ApiState};
use crate::browser::WebDriverFactory;
use crate::config::Config;
use crate::error::Result;
use crate::monitor::MonitorLoop;
use crate::telegram::{CallbackPoller, TelegramClient};

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    info!(
        listing = %cfg.scrape.listing_url,
        webdriver = %cfg.webdriver_url,
        headless = cfg.headless,
        group_chat = cfg.group_chat_id,
        admin_chat = cfg.admin_chat_id,
        "Starting live odds monitor"
    );

    // --- Shared state ---
    let store = AlertStore::new();
    let health = Arc::new(HealthState::new());
    let latency = Arc::new(LatencyStats::new());

    // --- Adapters ---
    let telegram = Arc::new(TelegramClient::new(&cfg.telegram_api_url, &cfg.telegram_token)?);
    let factory = Arc::new(WebDriverFactory::new(&cfg.webdriver_url, cfg.headless)?);

    let dispatcher = Arc::new(AlertDispatcher::new(
        telegram.clone(),
        Arc::clone(&store),
        cfg.group_chat_id,
        cfg.admin_chat_id,
    ));

    // --- Spawn tasks ---

    // Monitor loop (scrape → match → alert)
    let monitor = MonitorLoop::new(
        factory,
        Arc::clone(&dispatcher),
        cfg.scrape.clone(),
        Arc::clone(&health),
        Arc::clone(&latency),
    )
    .with_timing(cfg.poll_interval, cfg.error_backoff, cfg.inter_alert_delay);
    tokio::spawn(async move { monitor.run().await });

    // Status-control callbacks
    let poller = CallbackPoller::new(telegram, Arc::clone(&dispatcher));
    tokio::spawn(async move { poller.run().await });

    // HTTP status API
    let app = router(ApiState { store, health, latency });
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await?;

    Ok(())
}
