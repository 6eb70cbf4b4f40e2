use anyhow::{anyhow, Result};
use std::time::Duration;

use crate::notifier::EmailRelay;
use crate::prices::SymbolMap;

#[derive(Debug, Clone)]
pub struct Config {
    // Price feed
    pub price_api_base_url: String,
    pub price_api_key: Option<String>,
    pub price_symbols: SymbolMap,
    pub http_timeout: Duration,

    // Monitor
    pub monitor_interval: Duration,
    pub monitor_autostart: bool,
    pub heartbeat: Duration,

    // Tokens
    pub token_catalog_path: Option<String>,

    // Notifications
    pub email_api_url: Option<String>,
    pub email_api_key: Option<String>,
    pub email_from: String,
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).ok().map(|s| s.trim().to_lowercase()) {
        None => default,
        Some(v) if v.is_empty() => default,
        Some(v) if v == "1" || v == "true" || v == "yes" || v == "y" || v == "on" => true,
        Some(v) if v == "0" || v == "false" || v == "no" || v == "n" || v == "off" => false,
        Some(_) => default,
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|x| x.trim().parse().ok())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let price_api_base_url = env_opt("PRICE_API_BASE_URL")
            .unwrap_or_else(|| "https://api.coingecko.com/api/v3".to_string());
        let price_api_key = env_opt("PRICE_API_KEY");
        let price_symbols = match env_opt("PRICE_SYMBOLS") {
            Some(raw) => SymbolMap::parse(&raw).map_err(|e| anyhow!("PRICE_SYMBOLS: {e}"))?,
            None => SymbolMap::default(),
        };
        let http_timeout = Duration::from_millis(env_parse::<u64>("HTTP_TIMEOUT_MS").unwrap_or(10_000));

        let interval_secs = env_parse::<u64>("MONITOR_INTERVAL_SECS").unwrap_or(30);
        if interval_secs == 0 {
            return Err(anyhow!("MONITOR_INTERVAL_SECS must be greater than 0"));
        }
        let monitor_autostart = env_bool("MONITOR_AUTOSTART", true);
        let heartbeat_secs = env_parse::<u64>("HEARTBEAT_SECS").unwrap_or(60).max(1);

        let token_catalog_path = env_opt("TOKEN_CATALOG_PATH");

        let email_api_url = env_opt("EMAIL_API_URL");
        let email_api_key = env_opt("EMAIL_API_KEY");
        let email_from = env_opt("EMAIL_FROM").unwrap_or_else(|| "alerts@localhost".to_string());

        Ok(Self {
            price_api_base_url,
            price_api_key,
            price_symbols,
            http_timeout,
            monitor_interval: Duration::from_secs(interval_secs),
            monitor_autostart,
            heartbeat: Duration::from_secs(heartbeat_secs),
            token_catalog_path,
            email_api_url,
            email_api_key,
            email_from,
        })
    }

    pub fn email_relay(&self) -> Option<EmailRelay> {
        Some(EmailRelay {
            url: self.email_api_url.clone()?,
            api_key: self.email_api_key.clone(),
            from: self.email_from.clone(),
        })
    }
}
