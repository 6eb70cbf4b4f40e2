//! Bonding-curve trading desk: linear curve pricing, simulated trade
//! execution against per-token reserves, and a polling price-alert monitor.
//!
//! Everything is in memory and owned by explicitly constructed stores, so an
//! HTTP layer (or a test) builds the pieces it needs and shares them via `Arc`.

pub mod alerts;
pub mod config;
pub mod curve;
pub mod domain;
pub mod engine;
pub mod error;
pub mod logger;
pub mod monitor;
pub mod notifier;
pub mod prices;
pub mod state;
pub mod tokens;

pub use alerts::{Alert, AlertCondition, AlertFilter, AlertPatch, AlertRegistry, AlertStats, AlertStatus, NewAlert};
pub use curve::CurveConfig;
pub use domain::{CurveSnapshot, TradeRequest, TradeResult, TradeType};
pub use engine::TradeExecutor;
pub use error::DeskError;
pub use monitor::{MonitorStatus, PriceMonitor};
pub use state::{CurveState, CurveStateStore};
pub use tokens::TokenCatalog;
