//! GridPay - Virtual World Money Module
//!
//! Standalone entry point. Architecture:
//!
//! ```text
//! ┌──────────┐    ┌─────────────┐    ┌──────────┐    ┌──────────┐
//! │  World   │───▶│ Coordinator │───▶│  Ledger  │───▶│ Callback │
//! │ (host)   │    │ (txn+escrow)│    │  (HTTP)  │    │  server  │
//! └──────────┘    └─────────────┘    └──────────┘    └──────────┘
//!
//! Coordinator responsibilities:
//! - Record transaction before dispatch (restart-safe correlation)
//! - Register escrow assets for transfers that carry goods
//! - Turn completion callbacks into notifications
//! ```

use std::sync::Arc;
use std::time::Duration;

use gridpay::auth::AuthFlow;
use gridpay::config::AppConfig;
use gridpay::escrow::reaper::{PendingReaper, ReaperConfig};
use gridpay::escrow::registry::AssetRegistry;
use gridpay::host::logging::LoggingHost;
use gridpay::http::{self, AppState};
use gridpay::ledger::http::HttpLedgerClient;
use gridpay::link::cache::AccountLinkCache;
use gridpay::login::LoginBalanceDedup;
use gridpay::txn::coordinator::TransactionCoordinator;
use gridpay::txn::types::CallbackUrls;

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let mut app_config = AppConfig::load(&env);
    if let Some(port) = get_port_override() {
        app_config.callbacks.port = port;
    }
    let _log_guard = gridpay::logging::init_logging(&app_config);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        git = env!("GIT_HASH"),
        "Starting GridPay in {} mode",
        env
    );

    let (link_store, txn_store) = gridpay::store::connect(&app_config.store).await?;
    let links = Arc::new(AccountLinkCache::new(link_store));

    // No simulator attached in standalone mode; the logging host stands in
    // for session lookup, delivery, and notifications.
    let host = Arc::new(LoggingHost);
    let registry = Arc::new(AssetRegistry::new(host.clone(), host.clone(), host.clone()));

    let transport = Arc::new(HttpLedgerClient::new(app_config.ledger.clone())?);
    let auth = Arc::new(AuthFlow::new(
        &app_config.ledger,
        &app_config.callbacks.external_base,
        links.clone(),
        transport.clone(),
    ));
    let dedup = Arc::new(LoginBalanceDedup::new(Duration::from_secs(
        app_config.login_dedup.window_secs,
    )));

    let coordinator = Arc::new(TransactionCoordinator::new(
        &app_config.ledger.app_key,
        CallbackUrls::from_base(&app_config.callbacks.external_base),
        links,
        registry.clone(),
        txn_store,
        transport,
        host,
        auth.clone(),
        dedup,
    ));

    if app_config.reaper.enabled {
        let reaper = PendingReaper::new(registry.clone(), ReaperConfig::from(&app_config.reaper));
        tokio::spawn(async move { reaper.run().await });
    }

    let state = AppState {
        coordinator,
        registry,
        auth,
    };
    http::run_server(&app_config.callbacks, state).await
}
