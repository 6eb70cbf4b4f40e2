use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    str::FromStr,
    sync::atomic::{AtomicU64, Ordering},
};
use tokio::sync::RwLock;
use tracing::info;

use crate::error::{DeskError, Result};

const DEFAULT_USER: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertCondition {
    Above,
    Below,
}

impl FromStr for AlertCondition {
    type Err = DeskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "above" => Ok(Self::Above),
            "below" => Ok(Self::Below),
            _ => Err(DeskError::validation(format!("condition must be 'above' or 'below', got '{s}'"))),
        }
    }
}

impl fmt::Display for AlertCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Above => "above",
            Self::Below => "below",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Triggered,
    Cancelled,
    /// Reserved; nothing moves an alert here yet.
    Expired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub symbol: String,
    pub condition: AlertCondition,
    pub target_price: f64,
    pub current_price: Option<f64>,
    pub status: AlertStatus,
    pub created_at: DateTime<Utc>,
    pub triggered_at: Option<DateTime<Utc>>,
    pub user_id: String,
    pub email: Option<String>,
    pub webhook: Option<String>,
    pub notified: bool,
    #[serde(skip)]
    seq: u64,
}

/// Alert creation input. Fields are optional so missing ones surface as
/// validation errors rather than deserialization failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAlert {
    pub symbol: Option<String>,
    pub condition: Option<String>,
    pub target_price: Option<f64>,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub webhook: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertPatch {
    pub condition: Option<String>,
    pub target_price: Option<f64>,
    pub email: Option<String>,
    pub webhook: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    pub user_id: Option<String>,
    pub symbol: Option<String>,
    pub status: Option<AlertStatus>,
}

impl AlertFilter {
    pub fn active() -> Self {
        Self { status: Some(AlertStatus::Active), ..Self::default() }
    }

    fn matches(&self, alert: &Alert) -> bool {
        self.user_id.as_deref().map_or(true, |u| alert.user_id == u)
            && self
                .symbol
                .as_deref()
                .map_or(true, |s| alert.symbol.eq_ignore_ascii_case(s))
            && self.status.map_or(true, |s| alert.status == s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertStats {
    pub total: usize,
    pub active: usize,
    pub triggered: usize,
    pub cancelled: usize,
    pub expired: usize,
    pub by_symbol: BTreeMap<String, usize>,
}

/// `above` fires at or over the target, `below` at or under it.
pub fn check_condition(alert: &Alert, current_price: f64) -> bool {
    match alert.condition {
        AlertCondition::Above => current_price >= alert.target_price,
        AlertCondition::Below => current_price <= alert.target_price,
    }
}

fn validate_target(price: f64) -> Result<f64> {
    if !price.is_finite() || price <= 0.0 {
        return Err(DeskError::validation("targetPrice must be a positive number"));
    }
    Ok(price)
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// In-memory alert store. IDs are `alert_<n>` with `n` increasing from 1.
#[derive(Default)]
pub struct AlertRegistry {
    alerts: RwLock<HashMap<String, Alert>>,
    next_seq: AtomicU64,
}

impl AlertRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create_alert(&self, cfg: NewAlert) -> Result<Alert> {
        let symbol = non_blank(cfg.symbol)
            .ok_or_else(|| DeskError::validation("symbol is required"))?
            .to_uppercase();
        let condition: AlertCondition = cfg
            .condition
            .as_deref()
            .ok_or_else(|| DeskError::validation("condition is required"))?
            .parse()?;
        let target_price = validate_target(
            cfg.target_price
                .ok_or_else(|| DeskError::validation("targetPrice is required"))?,
        )?;

        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let alert = Alert {
            id: format!("alert_{seq}"),
            symbol,
            condition,
            target_price,
            current_price: None,
            status: AlertStatus::Active,
            created_at: Utc::now(),
            triggered_at: None,
            user_id: non_blank(cfg.user_id).unwrap_or_else(|| DEFAULT_USER.to_string()),
            email: non_blank(cfg.email),
            webhook: non_blank(cfg.webhook),
            notified: false,
            seq,
        };

        self.alerts.write().await.insert(alert.id.clone(), alert.clone());
        info!(id = %alert.id, symbol = %alert.symbol, condition = %alert.condition, target = alert.target_price, "alerts.created");
        Ok(alert)
    }

    pub async fn get_alert(&self, id: &str) -> Option<Alert> {
        self.alerts.read().await.get(id).cloned()
    }

    /// Matching alerts, newest first.
    pub async fn get_alerts(&self, filter: &AlertFilter) -> Vec<Alert> {
        let mut out: Vec<Alert> = self
            .alerts
            .read()
            .await
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.seq.cmp(&a.seq)));
        out
    }

    pub async fn update_alert(&self, id: &str, patch: AlertPatch) -> Result<Option<Alert>> {
        let condition = patch.condition.as_deref().map(str::parse::<AlertCondition>).transpose()?;
        let target = patch.target_price.map(validate_target).transpose()?;

        let mut alerts = self.alerts.write().await;
        let Some(alert) = alerts.get_mut(id) else {
            return Ok(None);
        };
        if let Some(c) = condition {
            alert.condition = c;
        }
        if let Some(t) = target {
            alert.target_price = t;
        }
        if patch.email.is_some() {
            alert.email = non_blank(patch.email);
        }
        if patch.webhook.is_some() {
            alert.webhook = non_blank(patch.webhook);
        }
        info!(%id, "alerts.updated");
        Ok(Some(alert.clone()))
    }

    pub async fn delete_alert(&self, id: &str) -> bool {
        let removed = self.alerts.write().await.remove(id).is_some();
        if removed {
            info!(%id, "alerts.deleted");
        }
        removed
    }

    /// Cancels an active alert. Triggered and cancelled alerts are final and
    /// come back unchanged; `None` only when the id is unknown.
    pub async fn cancel_alert(&self, id: &str) -> Option<Alert> {
        let mut alerts = self.alerts.write().await;
        let alert = alerts.get_mut(id)?;
        if alert.status == AlertStatus::Active {
            alert.status = AlertStatus::Cancelled;
            info!(%id, "alerts.cancelled");
        }
        Some(alert.clone())
    }

    /// Moves an active alert to triggered. Returns `None` if the alert is
    /// gone or no longer active, so an alert fires at most once.
    pub async fn trigger_alert(&self, id: &str, price: f64) -> Option<Alert> {
        let mut alerts = self.alerts.write().await;
        let alert = alerts.get_mut(id)?;
        if alert.status != AlertStatus::Active {
            return None;
        }
        alert.status = AlertStatus::Triggered;
        alert.current_price = Some(price);
        alert.triggered_at = Some(Utc::now());
        alert.notified = false;
        info!(%id, symbol = %alert.symbol, price, target = alert.target_price, "alerts.triggered");
        Some(alert.clone())
    }

    pub async fn mark_notified(&self, id: &str) -> Option<Alert> {
        let mut alerts = self.alerts.write().await;
        let alert = alerts.get_mut(id)?;
        alert.notified = true;
        Some(alert.clone())
    }

    /// Records the latest observed price without changing status.
    pub async fn set_current_price(&self, id: &str, price: f64) {
        if let Some(alert) = self.alerts.write().await.get_mut(id) {
            alert.current_price = Some(price);
        }
    }

    pub async fn get_alert_stats(&self, user_id: Option<&str>) -> AlertStats {
        let alerts = self.alerts.read().await;
        let mut stats = AlertStats::default();
        for alert in alerts.values().filter(|a| user_id.map_or(true, |u| a.user_id == u)) {
            stats.total += 1;
            match alert.status {
                AlertStatus::Active => stats.active += 1,
                AlertStatus::Triggered => stats.triggered += 1,
                AlertStatus::Cancelled => stats.cancelled += 1,
                AlertStatus::Expired => stats.expired += 1,
            }
            *stats.by_symbol.entry(alert.symbol.clone()).or_default() += 1;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_alert(symbol: &str, condition: &str, target: f64) -> NewAlert {
        NewAlert {
            symbol: Some(symbol.into()),
            condition: Some(condition.into()),
            target_price: Some(target),
            ..NewAlert::default()
        }
    }

    #[tokio::test]
    async fn create_assigns_sequential_ids_and_defaults() {
        let reg = AlertRegistry::new();
        let a = reg.create_alert(new_alert("btc", "above", 100.0)).await.unwrap();
        let b = reg.create_alert(new_alert("eth", "BELOW", 10.0)).await.unwrap();
        assert_eq!(a.id, "alert_1");
        assert_eq!(b.id, "alert_2");
        assert_eq!(a.symbol, "BTC");
        assert_eq!(b.condition, AlertCondition::Below);
        assert_eq!(a.status, AlertStatus::Active);
        assert_eq!(a.user_id, "default");
        assert!(!a.notified);
        assert!(a.current_price.is_none());
    }

    #[tokio::test]
    async fn create_validates_required_fields() {
        let reg = AlertRegistry::new();
        let cases = [
            NewAlert { symbol: None, ..new_alert("x", "above", 1.0) },
            NewAlert { symbol: Some("  ".into()), ..new_alert("x", "above", 1.0) },
            new_alert("BTC", "sideways", 1.0),
            NewAlert { condition: None, ..new_alert("BTC", "above", 1.0) },
            new_alert("BTC", "above", 0.0),
            new_alert("BTC", "above", -5.0),
            NewAlert { target_price: None, ..new_alert("BTC", "above", 1.0) },
        ];
        for case in cases {
            let err = reg.create_alert(case).await.unwrap_err();
            assert!(matches!(err, DeskError::Validation(_)), "{err:?}");
        }
        assert!(reg.get_alerts(&AlertFilter::default()).await.is_empty());
    }

    #[tokio::test]
    async fn condition_boundaries_are_inclusive() {
        let reg = AlertRegistry::new();
        let above = reg.create_alert(new_alert("BTC", "above", 100.0)).await.unwrap();
        assert!(check_condition(&above, 100.0));
        assert!(!check_condition(&above, 99.999999));

        let below = reg.create_alert(new_alert("BTC", "below", 100.0)).await.unwrap();
        assert!(check_condition(&below, 100.0));
        assert!(!check_condition(&below, 100.000001));
    }

    #[tokio::test]
    async fn listing_filters_and_sorts_newest_first() {
        let reg = AlertRegistry::new();
        for sym in ["BTC", "ETH", "BTC"] {
            reg.create_alert(NewAlert { user_id: Some("u1".into()), ..new_alert(sym, "above", 1.0) })
                .await
                .unwrap();
        }
        reg.create_alert(new_alert("BTC", "below", 1.0)).await.unwrap();
        reg.cancel_alert("alert_1").await.unwrap();

        let all: Vec<String> = reg.get_alerts(&AlertFilter::default()).await.into_iter().map(|a| a.id).collect();
        assert_eq!(all, vec!["alert_4", "alert_3", "alert_2", "alert_1"]);

        let u1_btc = reg
            .get_alerts(&AlertFilter { user_id: Some("u1".into()), symbol: Some("btc".into()), status: None })
            .await;
        assert_eq!(u1_btc.len(), 2);

        let active = reg.get_alerts(&AlertFilter::active()).await;
        assert_eq!(active.len(), 3);
        assert!(active.iter().all(|a| a.id != "alert_1"));
    }

    #[tokio::test]
    async fn update_patches_and_revalidates() {
        let reg = AlertRegistry::new();
        reg.create_alert(new_alert("SOL", "above", 150.0)).await.unwrap();

        let patched = reg
            .update_alert(
                "alert_1",
                AlertPatch {
                    condition: Some("below".into()),
                    target_price: Some(120.0),
                    webhook: Some("https://hooks.example/a".into()),
                    ..AlertPatch::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(patched.condition, AlertCondition::Below);
        assert_eq!(patched.target_price, 120.0);
        assert_eq!(patched.webhook.as_deref(), Some("https://hooks.example/a"));

        let err = reg
            .update_alert("alert_1", AlertPatch { target_price: Some(0.0), ..AlertPatch::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, DeskError::Validation(_)));
        assert_eq!(reg.get_alert("alert_1").await.unwrap().target_price, 120.0);

        assert!(reg.update_alert("alert_9", AlertPatch::default()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lifecycle_trigger_once_then_notify() {
        let reg = AlertRegistry::new();
        reg.create_alert(new_alert("ETH", "above", 3000.0)).await.unwrap();

        let fired = reg.trigger_alert("alert_1", 3100.0).await.unwrap();
        assert_eq!(fired.status, AlertStatus::Triggered);
        assert_eq!(fired.current_price, Some(3100.0));
        assert!(fired.triggered_at.is_some());
        assert!(!fired.notified);

        assert!(reg.trigger_alert("alert_1", 3200.0).await.is_none());
        assert!(reg.mark_notified("alert_1").await.unwrap().notified);
        assert_eq!(reg.get_alert("alert_1").await.unwrap().current_price, Some(3100.0));
    }

    #[tokio::test]
    async fn cancelled_alerts_do_not_trigger() {
        let reg = AlertRegistry::new();
        reg.create_alert(new_alert("ETH", "above", 1.0)).await.unwrap();
        assert_eq!(reg.cancel_alert("alert_1").await.unwrap().status, AlertStatus::Cancelled);
        assert!(reg.trigger_alert("alert_1", 5.0).await.is_none());
        assert!(reg.cancel_alert("missing").await.is_none());
    }

    #[tokio::test]
    async fn triggered_alerts_cannot_be_cancelled() {
        let reg = AlertRegistry::new();
        reg.create_alert(new_alert("ETH", "above", 1.0)).await.unwrap();
        reg.trigger_alert("alert_1", 2.0).await.unwrap();

        let after = reg.cancel_alert("alert_1").await.unwrap();
        assert_eq!(after.status, AlertStatus::Triggered);
        assert!(after.triggered_at.is_some());

        let stats = reg.get_alert_stats(None).await;
        assert_eq!(stats.triggered, 1);
        assert_eq!(stats.cancelled, 0);
    }

    #[tokio::test]
    async fn delete_is_permanent() {
        let reg = AlertRegistry::new();
        reg.create_alert(new_alert("ETH", "above", 1.0)).await.unwrap();
        assert!(reg.delete_alert("alert_1").await);
        assert!(!reg.delete_alert("alert_1").await);
        assert!(reg.get_alert("alert_1").await.is_none());

        // ids are never reused
        let next = reg.create_alert(new_alert("ETH", "above", 1.0)).await.unwrap();
        assert_eq!(next.id, "alert_2");
    }

    #[tokio::test]
    async fn stats_count_by_status_and_symbol() {
        let reg = AlertRegistry::new();
        for (sym, user) in [("BTC", "a"), ("BTC", "a"), ("ETH", "a"), ("ETH", "b")] {
            reg.create_alert(NewAlert { user_id: Some(user.into()), ..new_alert(sym, "above", 1.0) })
                .await
                .unwrap();
        }
        reg.cancel_alert("alert_2").await;
        reg.trigger_alert("alert_3", 2.0).await;

        let all = reg.get_alert_stats(None).await;
        assert_eq!(all.total, 4);
        assert_eq!(all.active, 2);
        assert_eq!(all.cancelled, 1);
        assert_eq!(all.triggered, 1);
        assert_eq!(all.by_symbol["BTC"], 2);

        let b = reg.get_alert_stats(Some("b")).await;
        assert_eq!(b.total, 1);
        assert_eq!(b.by_symbol.get("BTC"), None);
    }
}
