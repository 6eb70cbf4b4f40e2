use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, RwLock};

use crate::curve::{CurveConfig, CurveMap};
use crate::error::{DeskError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CurveState {
    pub supply: f64,
    /// ETH backing the curve.
    pub reserve: f64,
    pub total_trades: u64,
    pub total_volume: f64,
}

impl CurveState {
    pub fn initial(cfg: &CurveConfig) -> Self {
        Self {
            supply: cfg.initial_supply,
            reserve: cfg.initial_reserve,
            total_trades: 0,
            total_volume: 0.0,
        }
    }
}

/// Mutable curve state for every configured token.
///
/// Configs are fixed at construction. Each token's state sits behind its own
/// mutex so a trade's check-then-act runs without interleaving with another
/// trade on the same token, while different tokens trade in parallel.
pub struct CurveStateStore {
    configs: CurveMap,
    states: RwLock<HashMap<String, Arc<Mutex<CurveState>>>>,
}

impl CurveStateStore {
    pub fn new(configs: CurveMap) -> Self {
        Self { configs, states: RwLock::new(HashMap::new()) }
    }

    pub fn configs(&self) -> &CurveMap {
        &self.configs
    }

    pub fn config(&self, symbol: &str) -> Option<&CurveConfig> {
        self.configs.get(symbol)
    }

    pub fn symbols(&self) -> Vec<String> {
        let mut out: Vec<String> = self.configs.keys().cloned().collect();
        out.sort();
        out
    }

    async fn slot(&self, symbol: &str) -> Result<(CurveConfig, Arc<Mutex<CurveState>>)> {
        let cfg = *self
            .configs
            .get(symbol)
            .ok_or_else(|| DeskError::UnknownToken(symbol.to_string()))?;

        if let Some(slot) = self.states.read().await.get(symbol) {
            return Ok((cfg, slot.clone()));
        }

        let mut states = self.states.write().await;
        let slot = states
            .entry(symbol.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(CurveState::initial(&cfg))))
            .clone();
        Ok((cfg, slot))
    }

    /// Current state, created from config defaults on first access.
    pub async fn state(&self, symbol: &str) -> Result<CurveState> {
        let (_, slot) = self.slot(symbol).await?;
        let st = *slot.lock().await;
        Ok(st)
    }

    /// Runs `f` with exclusive access to one token's state.
    ///
    /// `f` must leave the state untouched when it returns `Err`.
    pub async fn with_state<R>(
        &self,
        symbol: &str,
        f: impl FnOnce(&CurveConfig, &mut CurveState) -> Result<R>,
    ) -> Result<R> {
        let (cfg, slot) = self.slot(symbol).await?;
        let mut st = slot.lock().await;
        f(&cfg, &mut st)
    }
}
