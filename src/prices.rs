use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, time::Duration};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UsdQuote {
    pub usd: f64,
}

/// Prices keyed by CoinGecko id, e.g. `{"bitcoin": {"usd": 64000.0}}`.
pub type PriceSnapshot = HashMap<String, UsdQuote>;

#[async_trait]
pub trait PriceFeed: Send + Sync {
    async fn get_all_prices(&self) -> Result<PriceSnapshot>;
}

/// Ticker symbols the monitor can price, mapped to CoinGecko ids.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolMap {
    entries: Vec<(String, String)>,
}

impl Default for SymbolMap {
    fn default() -> Self {
        Self::parse("BTC:bitcoin,ETH:ethereum,SOL:solana,USDC:usd-coin,DOGE:dogecoin")
            .unwrap_or(Self { entries: vec![] })
    }
}

impl SymbolMap {
    /// Parses `SYM:id,SYM:id`.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut entries: Vec<(String, String)> = Vec::new();
        for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (sym, id) = pair
                .split_once(':')
                .ok_or_else(|| anyhow!("expected SYMBOL:coingecko-id, got '{pair}'"))?;
            let (sym, id) = (sym.trim().to_uppercase(), id.trim().to_string());
            if sym.is_empty() || id.is_empty() {
                return Err(anyhow!("empty symbol or id in '{pair}'"));
            }
            if entries.iter().any(|(s, _)| *s == sym) {
                return Err(anyhow!("duplicate symbol {sym}"));
            }
            entries.push((sym, id));
        }
        if entries.is_empty() {
            return Err(anyhow!("symbol map is empty"));
        }
        Ok(Self { entries })
    }

    pub fn id_for(&self, symbol: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(s, _)| s.eq_ignore_ascii_case(symbol))
            .map(|(_, id)| id.as_str())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, id)| id.as_str())
    }

    /// USD price for `symbol` if it is mapped and present in the snapshot.
    pub fn price_of(&self, snapshot: &PriceSnapshot, symbol: &str) -> Option<f64> {
        let id = self.id_for(symbol)?;
        snapshot.get(id).map(|q| q.usd).filter(|p| p.is_finite())
    }
}

#[derive(Clone)]
pub struct CoinGeckoClient {
    base_url: String,
    api_key: Option<String>,
    symbols: SymbolMap,
    http: Client,
}

#[derive(Debug, Clone, Serialize)]
struct SimplePriceQuery {
    ids: String,
    vs_currencies: &'static str,
}

impl CoinGeckoClient {
    pub fn new(base_url: String, api_key: Option<String>, symbols: SymbolMap, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            symbols,
            http,
        })
    }
}

#[async_trait]
impl PriceFeed for CoinGeckoClient {
    async fn get_all_prices(&self) -> Result<PriceSnapshot> {
        let url = format!("{}/simple/price", self.base_url);
        let query = SimplePriceQuery {
            ids: self.symbols.ids().collect::<Vec<_>>().join(","),
            vs_currencies: "usd",
        };
        let mut req = self.http.get(url).query(&query);
        if let Some(key) = self.api_key.as_deref() {
            req = req.header("x-cg-demo-api-key", key);
        }
        let resp = req.send().await?.error_for_status()?;
        Ok(resp.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_symbol_pairs() {
        let map = SymbolMap::parse(" btc:bitcoin , eth:ethereum ").unwrap();
        assert_eq!(map.id_for("BTC"), Some("bitcoin"));
        assert_eq!(map.id_for("eth"), Some("ethereum"));
        assert_eq!(map.id_for("SOL"), None);
        assert_eq!(map.ids().collect::<Vec<_>>(), vec!["bitcoin", "ethereum"]);
    }

    #[test]
    fn rejects_malformed_maps() {
        assert!(SymbolMap::parse("").is_err());
        assert!(SymbolMap::parse("BTC").is_err());
        assert!(SymbolMap::parse("BTC:bitcoin,btc:wrapped-bitcoin").is_err());
        assert!(SymbolMap::parse(":bitcoin").is_err());
    }

    #[test]
    fn default_map_covers_majors() {
        let map = SymbolMap::default();
        assert_eq!(map.id_for("SOL"), Some("solana"));
        assert_eq!(map.id_for("USDC"), Some("usd-coin"));
    }

    #[test]
    fn snapshot_decodes_coingecko_shape() {
        let raw = r#"{"bitcoin":{"usd":64123.5},"ethereum":{"usd":3100}}"#;
        let snap: PriceSnapshot = serde_json::from_str(raw).unwrap();
        let map = SymbolMap::default();
        assert_eq!(map.price_of(&snap, "BTC"), Some(64123.5));
        assert_eq!(map.price_of(&snap, "ETH"), Some(3100.0));
        assert_eq!(map.price_of(&snap, "SOL"), None);
        assert_eq!(map.price_of(&snap, "ARYA"), None);
    }
}
