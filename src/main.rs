use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use bonding_desk::{
    config::Config,
    logger,
    notifier::HttpNotifier,
    prices::CoinGeckoClient,
    AlertRegistry, CurveStateStore, PriceMonitor, TokenCatalog, TradeExecutor,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load local .env if present (no-op in prod/systemd envs)
    let _ = dotenvy::dotenv();

    logger::init_tracing();

    let cfg = Config::from_env()?;
    info!(?cfg, "boot");

    let catalog = Arc::new(match cfg.token_catalog_path.as_deref() {
        Some(path) => TokenCatalog::load(path)?,
        None => TokenCatalog::builtin(),
    });
    let store = Arc::new(CurveStateStore::new(catalog.curves()));
    let executor = TradeExecutor::new(store, catalog.clone());

    for (symbol, snap) in executor.curves().await? {
        info!(
            %symbol,
            price = snap.current_price,
            supply = snap.state.supply,
            reserve = snap.state.reserve,
            deployed = snap.is_deployed,
            "curve.ready"
        );
    }

    let registry = Arc::new(AlertRegistry::new());
    let feed = CoinGeckoClient::new(
        cfg.price_api_base_url.clone(),
        cfg.price_api_key.clone(),
        cfg.price_symbols.clone(),
        cfg.http_timeout,
    )?;
    let notifier = HttpNotifier::new(cfg.email_relay(), cfg.http_timeout)?;
    let monitor = PriceMonitor::new(
        registry,
        Arc::new(feed),
        Arc::new(notifier),
        cfg.price_symbols.clone(),
        cfg.monitor_interval,
    );

    if cfg.monitor_autostart {
        monitor.start().await;
    } else {
        warn!("monitor.autostart disabled");
    }

    let mut heartbeat = tokio::time::interval(cfg.heartbeat);
    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                let st = monitor.status().await;
                info!(active = st.is_active, alerts = st.active_alerts, ticks = st.ticks, "heartbeat");
            }
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    warn!(error = %e, "ctrl_c listener failed");
                }
                break;
            }
        }
    }

    monitor.stop().await;
    info!("shutdown");
    Ok(())
}
