// =============================================================================
// BaseSwap Auto Trader — Main Entry Point
// =============================================================================
//
// Serves `POST /auto`: buy a token on the configured router, watch its quote
// until take-profit / stop-loss / timeout, sell, answer. The signing key is
// read per request; only the RPC endpoint is required at startup.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod config;
mod credential;
mod error;
mod exchange;
mod execution;
mod exit;
mod notifier;
mod position_engine;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::config::{BotConfig, EnvConfig};
use crate::exchange::router::{RouterConnector, RouterSettings};
use crate::notifier::TelegramNotifier;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        BaseSwap Auto Trader — Starting Up               ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let config_path =
        std::env::var("BOT_CONFIG").unwrap_or_else(|_| "bot_config.json".to_string());
    let config = BotConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load bot config, using defaults");
        BotConfig::default()
    });
    config.validate()?;

    // RPC is mandatory; without it the process never binds.
    let env = EnvConfig::from_env()?;

    info!(
        rpc_host = env.rpc_url.host_str().unwrap_or("?"),
        router = %config.router_address,
        buy_amount_eth = %config.buy_amount_eth,
        poll_interval_secs = config.poll_interval_secs,
        watch_timeout_secs = config.watch_timeout_secs,
        liquidate_on_timeout = config.liquidate_on_timeout,
        notifications = env.telegram.is_some(),
        "Configuration resolved"
    );

    // ── 2. Collaborators ─────────────────────────────────────────────────
    let connector = RouterConnector::new(
        env.rpc_url.clone(),
        RouterSettings {
            router: config.router()?,
            base_token: config.base_token()?,
            gas_limit: config.gas_limit,
            receipt_timeout: config.receipt_timeout(),
        },
    )?;
    let notifier = TelegramNotifier::new(&config.telegram_api_base, env.telegram.clone())?;

    let state = Arc::new(AppState::new(
        &config,
        Arc::new(connector),
        Arc::new(notifier),
    )?);

    // ── 3. API server ────────────────────────────────────────────────────
    let app = api::rest::router(state.clone());
    let listener = tokio::net::TcpListener::bind(env.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", env.bind_addr))?;
    info!(addr = %env.bind_addr, "API server listening");

    // ── 4. Graceful shutdown ─────────────────────────────────────────────
    let shutdown = state.shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            warn!("Shutdown signal received — cancelling in-flight trades");
            shutdown.cancel();
        })
        .await
        .context("API server failed")?;

    info!("BaseSwap Auto Trader shut down complete.");
    Ok(())
}
