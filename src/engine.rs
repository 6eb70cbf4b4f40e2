use chrono::Utc;
use std::{collections::BTreeMap, sync::Arc};
use tracing::{info, warn};

use crate::curve::CurveConfig;
use crate::domain::{CurveSnapshot, TradeRequest, TradeResult, TradeType};
use crate::error::{DeskError, Result};
use crate::state::{CurveState, CurveStateStore};
use crate::tokens::TokenCatalog;

/// Applies buys and sells to the curve state store.
#[derive(Clone)]
pub struct TradeExecutor {
    store: Arc<CurveStateStore>,
    catalog: Arc<TokenCatalog>,
}

/// Post-trade figures computed from a state snapshot.
struct Fill {
    output: f64,
    slippage: f64,
    next: CurveState,
}

impl TradeExecutor {
    pub fn new(store: Arc<CurveStateStore>, catalog: Arc<TokenCatalog>) -> Self {
        Self { store, catalog }
    }

    /// Entry point for untyped requests.
    pub async fn execute(&self, req: TradeRequest) -> Result<TradeResult> {
        let trade_type: TradeType = req.trade_type.parse()?;
        self.execute_trade(trade_type, req.amount, &req.token).await
    }

    pub async fn execute_trade(&self, trade_type: TradeType, amount: f64, token: &str) -> Result<TradeResult> {
        let symbol = normalize(token, amount)?;

        let res = self
            .store
            .with_state(&symbol, |cfg, st| {
                let fill = plan(cfg, st, &symbol, trade_type, amount)?;
                let price = cfg.price(st.supply);
                *st = fill.next;
                Ok((price, fill))
            })
            .await;

        let (price, fill) = match res {
            Ok(v) => v,
            Err(e) => {
                warn!(%symbol, %trade_type, amount, error = %e, "engine.trade.rejected");
                return Err(e);
            }
        };

        let result = self.result(&symbol, trade_type, amount, price, &fill);
        info!(
            %symbol,
            %trade_type,
            input = amount,
            output = result.output_amount,
            new_supply = result.new_supply,
            slippage = result.slippage,
            simulated = result.is_simulated,
            "engine.trade"
        );
        Ok(result)
    }

    /// Same figures as `execute_trade` without touching state.
    pub async fn quote(&self, trade_type: TradeType, amount: f64, token: &str) -> Result<TradeResult> {
        let symbol = normalize(token, amount)?;
        let cfg = *self
            .store
            .config(&symbol)
            .ok_or_else(|| DeskError::UnknownToken(symbol.clone()))?;
        let st = self.store.state(&symbol).await?;
        let fill = plan(&cfg, &st, &symbol, trade_type, amount)?;
        Ok(self.result(&symbol, trade_type, amount, cfg.price(st.supply), &fill))
    }

    pub async fn curve(&self, token: &str) -> Result<CurveSnapshot> {
        let symbol = token.trim().to_uppercase();
        let cfg = *self
            .store
            .config(&symbol)
            .ok_or_else(|| DeskError::UnknownToken(symbol.clone()))?;
        let state = self.store.state(&symbol).await?;
        let current_price = cfg.price(state.supply);
        let supply_progress = if cfg.max_supply > 0.0 {
            state.supply / cfg.max_supply * 100.0
        } else {
            0.0
        };

        Ok(CurveSnapshot {
            current_price,
            market_cap: current_price * state.supply,
            supply_progress,
            max_supply: cfg.max_supply,
            is_deployed: self.catalog.is_token_deployed(&symbol),
            clanker_url: self.catalog.clanker_url(&symbol),
            trading_url: self.catalog.trading_url(&symbol),
            symbol,
            state,
        })
    }

    pub async fn curves(&self) -> Result<BTreeMap<String, CurveSnapshot>> {
        let mut out = BTreeMap::new();
        for symbol in self.store.symbols() {
            let snap = self.curve(&symbol).await?;
            out.insert(symbol, snap);
        }
        Ok(out)
    }

    fn result(&self, symbol: &str, trade_type: TradeType, amount: f64, price: f64, fill: &Fill) -> TradeResult {
        let cfg = self.store.config(symbol);
        TradeResult {
            trade_type,
            token: symbol.to_string(),
            input_amount: amount,
            output_amount: fill.output,
            price,
            new_price: cfg.map(|c| c.price(fill.next.supply)).unwrap_or(0.0),
            slippage: fill.slippage,
            new_supply: fill.next.supply,
            is_simulated: !self.catalog.is_token_deployed(symbol),
            timestamp: Utc::now(),
        }
    }
}

fn normalize(token: &str, amount: f64) -> Result<String> {
    let symbol = token.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(DeskError::validation("token is required"));
    }
    if !amount.is_finite() || amount <= 0.0 {
        return Err(DeskError::validation(format!("amount must be a positive number, got {amount}")));
    }
    Ok(symbol)
}

/// Checks business rules and computes the next state. Pure.
fn plan(cfg: &CurveConfig, st: &CurveState, symbol: &str, trade_type: TradeType, amount: f64) -> Result<Fill> {
    match trade_type {
        TradeType::Buy => {
            let tokens_out = cfg.buy_amount(amount, st.supply);
            if !tokens_out.is_finite() || tokens_out <= 0.0 {
                return Err(DeskError::validation(format!(
                    "{symbol} curve yields no tokens for {amount} ETH"
                )));
            }
            let attempted = st.supply + tokens_out;
            if attempted > cfg.max_supply {
                return Err(DeskError::MaxSupplyExceeded {
                    symbol: symbol.to_string(),
                    attempted,
                    max: cfg.max_supply,
                });
            }
            Ok(Fill {
                output: tokens_out,
                slippage: cfg.slippage(tokens_out, st.supply, true),
                next: CurveState {
                    supply: attempted,
                    reserve: st.reserve + amount,
                    total_trades: st.total_trades + 1,
                    total_volume: st.total_volume + amount,
                },
            })
        }
        TradeType::Sell => {
            let eth_out = cfg.sell_amount(amount, st.supply);
            if eth_out > st.reserve {
                return Err(DeskError::InsufficientReserve {
                    symbol: symbol.to_string(),
                    requested: eth_out,
                    available: st.reserve,
                });
            }
            if amount > st.supply {
                return Err(DeskError::InsufficientSupply {
                    symbol: symbol.to_string(),
                    requested: amount,
                    available: st.supply,
                });
            }
            Ok(Fill {
                output: eth_out,
                slippage: cfg.slippage(amount, st.supply, false),
                next: CurveState {
                    supply: st.supply - amount,
                    reserve: st.reserve - eth_out,
                    total_trades: st.total_trades + 1,
                    total_volume: st.total_volume + eth_out,
                },
            })
        }
    }
}
