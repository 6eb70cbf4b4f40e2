use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fixed supply window used to average the start and end price of a buy.
///
/// This is not derived from the trade size, so `buy_amount` is an
/// approximation rather than the integral of the curve. Quotes depend on
/// it staying exactly this value.
pub const BUY_LOOKAHEAD: f64 = 1_000_000.0;

/// Linear bonding curve `price(supply) = a * supply + b`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurveConfig {
    /// Slope: marginal price increase per unit of supply.
    pub a: f64,
    /// Intercept: price floor at zero supply.
    pub b: f64,
    pub initial_supply: f64,
    pub initial_reserve: f64,
    pub max_supply: f64,
}

impl CurveConfig {
    pub fn arya() -> Self {
        Self {
            a: 0.000_000_000_01,
            b: 0.000_01,
            initial_supply: 1_000_000.0,
            initial_reserve: 0.01,
            max_supply: 1_000_000_000.0,
        }
    }

    pub fn price(&self, supply: f64) -> f64 {
        self.a * supply + self.b
    }

    /// Tokens received for `eth_in`, priced at the average of the current
    /// price and the price `BUY_LOOKAHEAD` units further up the curve.
    pub fn buy_amount(&self, eth_in: f64, supply: f64) -> f64 {
        let avg = (self.price(supply) + self.price(supply + BUY_LOOKAHEAD)) / 2.0;
        if avg <= 0.0 {
            return 0.0;
        }
        eth_in / avg
    }

    /// ETH received for selling `tokens_in` back down the curve.
    pub fn sell_amount(&self, tokens_in: f64, supply: f64) -> f64 {
        let avg = (self.price(supply) + self.price(supply - tokens_in)) / 2.0;
        avg * tokens_in
    }

    /// Percentage distance between the average execution price of moving
    /// `amount` tokens and the current mid price.
    pub fn slippage(&self, amount: f64, supply: f64, is_buy: bool) -> f64 {
        let mid = self.price(supply);
        if mid == 0.0 {
            return 0.0;
        }
        let end_supply = if is_buy { supply + amount } else { supply - amount };
        let avg_exec = (mid + self.price(end_supply)) / 2.0;
        (avg_exec - mid).abs() / mid * 100.0
    }

    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("a", self.a),
            ("b", self.b),
            ("initialSupply", self.initial_supply),
            ("initialReserve", self.initial_reserve),
            ("maxSupply", self.max_supply),
        ];
        for (name, v) in fields {
            if !v.is_finite() {
                return Err(format!("{name} must be finite"));
            }
        }
        if self.a < 0.0 {
            return Err("a (slope) must be non-negative".into());
        }
        if self.b <= 0.0 {
            return Err("b (base price) must be positive".into());
        }
        if self.initial_supply < 0.0 || self.initial_reserve < 0.0 {
            return Err("initial supply and reserve must be non-negative".into());
        }
        if self.max_supply < self.initial_supply {
            return Err("maxSupply cannot be below initialSupply".into());
        }
        Ok(())
    }
}

pub type CurveMap = HashMap<String, CurveConfig>;

// Token-keyed lookups. Unknown tokens price at zero; callers that need to
// distinguish "unknown" from "free" must check the map first.

pub fn price(curves: &CurveMap, token: &str, supply: f64) -> f64 {
    curves.get(token).map(|c| c.price(supply)).unwrap_or(0.0)
}

pub fn buy_amount(curves: &CurveMap, eth_in: f64, token: &str, supply: f64) -> f64 {
    curves.get(token).map(|c| c.buy_amount(eth_in, supply)).unwrap_or(0.0)
}

pub fn sell_amount(curves: &CurveMap, tokens_in: f64, token: &str, supply: f64) -> f64 {
    curves.get(token).map(|c| c.sell_amount(tokens_in, supply)).unwrap_or(0.0)
}

pub fn slippage(curves: &CurveMap, amount: f64, supply: f64, token: &str, is_buy: bool) -> f64 {
    curves
        .get(token)
        .map(|c| c.slippage(amount, supply, is_buy))
        .unwrap_or(0.0)
}
