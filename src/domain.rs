use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::DeskError;
use crate::state::CurveState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeType {
    Buy,
    Sell,
}

impl FromStr for TradeType {
    type Err = DeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(Self::Buy),
            "SELL" => Ok(Self::Sell),
            _ => Err(DeskError::InvalidTradeType(s.to_string())),
        }
    }
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        })
    }
}

/// Trade as it arrives from the HTTP layer, before the type is parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRequest {
    #[serde(rename = "type")]
    pub trade_type: String,
    pub amount: f64,
    pub token: String,
}

/// Outcome of a trade. Returned to the caller, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeResult {
    #[serde(rename = "type")]
    pub trade_type: TradeType,
    pub token: String,
    /// ETH for a buy, tokens for a sell.
    pub input_amount: f64,
    /// Tokens for a buy, ETH for a sell.
    pub output_amount: f64,
    /// Price before the trade.
    pub price: f64,
    pub new_price: f64,
    /// Percent.
    pub slippage: f64,
    pub new_supply: f64,
    pub is_simulated: bool,
    pub timestamp: DateTime<Utc>,
}

/// Curve state plus the figures a UI derives from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurveSnapshot {
    pub symbol: String,
    #[serde(flatten)]
    pub state: CurveState,
    pub current_price: f64,
    pub market_cap: f64,
    /// Percent of max supply in circulation.
    pub supply_progress: f64,
    pub max_supply: f64,
    pub is_deployed: bool,
    pub clanker_url: Option<String>,
    pub trading_url: Option<String>,
}
