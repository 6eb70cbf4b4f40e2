use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::Path};

use crate::curve::{CurveConfig, CurveMap};

const CLANKER_BASE_URL: &str = "https://www.clanker.world/clanker";
const UNISWAP_SWAP_URL: &str = "https://app.uniswap.org/swap?chain=base&outputCurrency=";

/// One tradable token: its curve and, once launched, its on-chain address.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDefinition {
    pub symbol: String,
    pub name: String,
    pub curve: CurveConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
}

/// Static token metadata keyed by uppercase symbol.
#[derive(Debug, Clone)]
pub struct TokenCatalog {
    tokens: BTreeMap<String, TokenDefinition>,
}

impl TokenCatalog {
    pub fn builtin() -> Self {
        let arya = TokenDefinition {
            symbol: "ARYA".into(),
            name: "Arya".into(),
            curve: CurveConfig::arya(),
            contract_address: None,
        };
        Self { tokens: BTreeMap::from([(arya.symbol.clone(), arya)]) }
    }

    pub fn from_definitions(defs: Vec<TokenDefinition>) -> Result<Self> {
        let mut tokens = BTreeMap::new();
        for mut def in defs {
            def.symbol = def.symbol.trim().to_uppercase();
            if def.symbol.is_empty() {
                return Err(anyhow!("token definition with empty symbol"));
            }
            def.curve
                .validate()
                .map_err(|e| anyhow!("invalid curve for {}: {e}", def.symbol))?;
            if def.contract_address.as_deref().is_some_and(|a| a.trim().is_empty()) {
                def.contract_address = None;
            }
            if tokens.contains_key(&def.symbol) {
                return Err(anyhow!("duplicate token symbol: {}", def.symbol));
            }
            tokens.insert(def.symbol.clone(), def);
        }
        Ok(Self { tokens })
    }

    /// Reads a JSON array of token definitions.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading token catalog {}", path.display()))?;
        let defs: Vec<TokenDefinition> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing token catalog {}", path.display()))?;
        Self::from_definitions(defs)
    }

    pub fn get(&self, symbol: &str) -> Option<&TokenDefinition> {
        self.tokens.get(&symbol.to_uppercase())
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.tokens.keys().map(String::as_str)
    }

    pub fn curves(&self) -> CurveMap {
        self.tokens
            .iter()
            .map(|(sym, def)| (sym.clone(), def.curve))
            .collect()
    }

    pub fn is_token_deployed(&self, symbol: &str) -> bool {
        self.get(symbol).is_some_and(|d| d.contract_address.is_some())
    }

    pub fn clanker_url(&self, symbol: &str) -> Option<String> {
        let addr = self.get(symbol)?.contract_address.as_deref()?;
        Some(format!("{CLANKER_BASE_URL}/{addr}"))
    }

    pub fn trading_url(&self, symbol: &str) -> Option<String> {
        let addr = self.get(symbol)?.contract_address.as_deref()?;
        Some(format!("{UNISWAP_SWAP_URL}{addr}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn launched(symbol: &str, addr: Option<&str>) -> TokenDefinition {
        TokenDefinition {
            symbol: symbol.into(),
            name: symbol.into(),
            curve: CurveConfig::arya(),
            contract_address: addr.map(str::to_string),
        }
    }

    #[test]
    fn builtin_arya_is_not_deployed() {
        let cat = TokenCatalog::builtin();
        assert!(cat.get("arya").is_some());
        assert!(!cat.is_token_deployed("ARYA"));
        assert_eq!(cat.clanker_url("ARYA"), None);
        assert_eq!(cat.trading_url("ARYA"), None);
    }

    #[test]
    fn deployed_tokens_expose_links() {
        let cat = TokenCatalog::from_definitions(vec![launched("pulse", Some("0xabc"))]).unwrap();
        assert!(cat.is_token_deployed("PULSE"));
        assert_eq!(cat.clanker_url("PULSE").as_deref(), Some("https://www.clanker.world/clanker/0xabc"));
        assert!(cat.trading_url("pulse").unwrap().ends_with("outputCurrency=0xabc"));
    }

    #[test]
    fn rejects_duplicates_after_uppercasing() {
        let err = TokenCatalog::from_definitions(vec![launched("arya", None), launched("ARYA", None)]);
        assert!(err.is_err());
    }

    #[test]
    fn blank_address_counts_as_undeployed() {
        let cat = TokenCatalog::from_definitions(vec![launched("X", Some("  "))]).unwrap();
        assert!(!cat.is_token_deployed("X"));
    }

    #[test]
    fn rejects_curves_without_a_price() {
        let mut def = launched("ZERO", None);
        def.curve = CurveConfig { a: 0.0, b: 0.0, initial_supply: 0.0, initial_reserve: 0.0, max_supply: 10.0 };
        assert!(TokenCatalog::from_definitions(vec![def]).is_err());
    }

    #[test]
    fn parses_camel_case_json() {
        let raw = r#"[{"symbol":"nova","name":"Nova","curve":{"a":0.0,"b":0.5,"initialSupply":0.0,"initialReserve":0.0,"maxSupply":100.0}}]"#;
        let defs: Vec<TokenDefinition> = serde_json::from_str(raw).unwrap();
        let cat = TokenCatalog::from_definitions(defs).unwrap();
        assert_eq!(cat.symbols().collect::<Vec<_>>(), vec!["NOVA"]);
        assert_eq!(cat.curves()["NOVA"].max_supply, 100.0);
    }
}
