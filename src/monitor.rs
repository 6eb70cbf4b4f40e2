use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
    time::Duration,
};
use tokio::{
    sync::{Mutex, RwLock},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tracing::{debug, error, info, warn};

use crate::alerts::{check_condition, Alert, AlertFilter, AlertRegistry};
use crate::notifier::AlertNotifier;
use crate::prices::{PriceFeed, SymbolMap};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedPrice {
    pub symbol: String,
    pub price: f64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorStatus {
    pub is_active: bool,
    /// Milliseconds between checks.
    pub interval: u64,
    pub active_alerts: usize,
    pub cached_prices: Vec<CachedPrice>,
    /// Checks run since construction, scheduled or manual.
    pub ticks: u64,
}

/// Polls the price feed and fires alerts whose condition is met.
///
/// Stopped until `start`. Each timer tick spawns an independent check, so
/// `stop` only halts scheduling: a check already in flight runs to the end.
/// Dropping the last clone ends polling as well.
#[derive(Clone)]
pub struct PriceMonitor {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Arc<AlertRegistry>,
    feed: Arc<dyn PriceFeed>,
    notifier: Arc<dyn AlertNotifier>,
    symbols: SymbolMap,
    interval: Duration,
    timer: Mutex<Option<JoinHandle<()>>>,
    cache: RwLock<HashMap<String, CachedPrice>>,
    ticks: AtomicU64,
}

impl PriceMonitor {
    pub fn new(
        registry: Arc<AlertRegistry>,
        feed: Arc<dyn PriceFeed>,
        notifier: Arc<dyn AlertNotifier>,
        symbols: SymbolMap,
        interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                feed,
                notifier,
                symbols,
                interval,
                timer: Mutex::new(None),
                cache: RwLock::new(HashMap::new()),
                ticks: AtomicU64::new(0),
            }),
        }
    }

    /// Starts polling: one check right away, then one per interval.
    /// Calling it while running changes nothing.
    pub async fn start(&self) -> MonitorStatus {
        {
            let mut timer = self.inner.timer.lock().await;
            if timer.is_some() {
                info!("monitor.start.already_running");
            } else {
                // The timer holds a weak handle so dropping every monitor ends it.
                let weak: Weak<Inner> = Arc::downgrade(&self.inner);
                let period = self.inner.interval;
                *timer = Some(tokio::spawn(async move {
                    let mut ticker = tokio::time::interval(period);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    loop {
                        ticker.tick().await;
                        let Some(inner) = weak.upgrade() else {
                            break;
                        };
                        tokio::spawn(async move { inner.check().await });
                    }
                }));
                info!(interval_ms = millis(period), "monitor.start");
            }
        }
        self.status().await
    }

    pub async fn stop(&self) -> MonitorStatus {
        match self.inner.timer.lock().await.take() {
            Some(handle) => {
                handle.abort();
                info!("monitor.stop");
            }
            None => debug!("monitor.stop.not_running"),
        }
        self.status().await
    }

    /// Runs one check inline and returns the resulting status.
    pub async fn check_now(&self) -> MonitorStatus {
        self.inner.check().await;
        self.status().await
    }

    pub async fn status(&self) -> MonitorStatus {
        let is_active = self.inner.timer.lock().await.is_some();
        let active_alerts = self.inner.registry.get_alerts(&AlertFilter::active()).await.len();
        let mut cached_prices: Vec<CachedPrice> = self.inner.cache.read().await.values().cloned().collect();
        cached_prices.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        MonitorStatus {
            is_active,
            interval: millis(self.inner.interval),
            active_alerts,
            cached_prices,
            ticks: self.inner.ticks.load(Ordering::Relaxed),
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(handle) = self.timer.get_mut().take() {
            handle.abort();
        }
    }
}

impl Inner {
    /// One pass over active alerts. Never fails: every error is logged and
    /// the next tick starts from scratch.
    async fn check(&self) {
        let tick = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;

        let active = self.registry.get_alerts(&AlertFilter::active()).await;
        if active.is_empty() {
            debug!(tick, "monitor.tick.idle");
            return;
        }

        let snapshot = match self.feed.get_all_prices().await {
            Ok(s) => s,
            Err(e) => {
                error!(tick, error = %e, "monitor.fetch_failed");
                return;
            }
        };

        let mut fired = 0usize;
        for alert in &active {
            let Some(price) = self.symbols.price_of(&snapshot, &alert.symbol) else {
                continue;
            };
            self.cache_price(&alert.symbol, price).await;
            self.registry.set_current_price(&alert.id, price).await;

            if !check_condition(alert, price) {
                continue;
            }
            // Cancelled or already fired since the listing above.
            let Some(triggered) = self.registry.trigger_alert(&alert.id, price).await else {
                continue;
            };
            self.dispatch(&triggered).await;
            self.registry.mark_notified(&triggered.id).await;
            fired += 1;
        }

        info!(tick, checked = active.len(), fired, "monitor.tick");
    }

    async fn cache_price(&self, symbol: &str, price: f64) {
        self.cache.write().await.insert(
            symbol.to_string(),
            CachedPrice { symbol: symbol.to_string(), price, updated_at: Utc::now() },
        );
    }

    /// Email and webhook are attempted independently; failures are logged.
    async fn dispatch(&self, alert: &Alert) {
        if let Some(to) = alert.email.as_deref() {
            if let Err(e) = self.notifier.send_email(to, alert).await {
                warn!(id = %alert.id, error = %e, "monitor.notify.email_failed");
            }
        }
        if let Some(url) = alert.webhook.as_deref() {
            if let Err(e) = self.notifier.send_webhook(url, alert).await {
                warn!(id = %alert.id, error = %e, "monitor.notify.webhook_failed");
            }
        }
    }
}
