use thiserror::Error;

pub type Result<T> = std::result::Result<T, DeskError>;

/// Failures surfaced to callers of trade and alert operations.
///
/// Trade rejections are raised before any state is touched, so an `Err`
/// always means the curve is exactly as it was.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DeskError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unknown token: {0}")]
    UnknownToken(String),

    #[error("max supply exceeded for {symbol}: trade would reach {attempted}, max is {max}")]
    MaxSupplyExceeded { symbol: String, attempted: f64, max: f64 },

    #[error("insufficient reserve for {symbol}: sell needs {requested} ETH, reserve holds {available}")]
    InsufficientReserve { symbol: String, requested: f64, available: f64 },

    #[error("insufficient supply for {symbol}: cannot sell {requested} tokens, supply is {available}")]
    InsufficientSupply { symbol: String, requested: f64, available: f64 },

    #[error("invalid trade type: {0} (expected BUY or SELL)")]
    InvalidTradeType(String),
}

impl DeskError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Stable machine-readable code for the HTTP layer.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::UnknownToken(_) => "UNKNOWN_TOKEN",
            Self::MaxSupplyExceeded { .. } => "MAX_SUPPLY_EXCEEDED",
            Self::InsufficientReserve { .. } => "INSUFFICIENT_RESERVE",
            Self::InsufficientSupply { .. } => "INSUFFICIENT_SUPPLY",
            Self::InvalidTradeType(_) => "INVALID_TRADE_TYPE",
        }
    }
}
