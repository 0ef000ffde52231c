use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// OHLCV candlestick for one bar of the trading session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Entry and stop thresholds for one symbol for one session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BreakoutLevels {
    pub symbol: String,
    pub trigger_price: f64,
    pub stop_price: f64,
}

/// An open long position, owned by the monitor of its symbol
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub id: Uuid,
    pub symbol: String,
    pub entry_price: f64,
    pub stop_price: f64,
    pub quantity: u64,
    pub opened_at: DateTime<Utc>,
    pub broker_order_id: Option<String>,
}

impl Position {
    /// P&L if the whole position were closed at `price`
    pub fn pnl_at(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.quantity as f64
    }
}

/// Why a position was closed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExitReason {
    #[serde(rename = "SL Triggered")]
    StopLoss,
    #[serde(rename = "Time Exit")]
    TimeExit,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::StopLoss => "SL Triggered",
            ExitReason::TimeExit => "Time Exit",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state transition of a symbol monitor (the audit trail)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TradeEvent {
    Entry {
        symbol: String,
        price: f64,
        stop_price: f64,
        quantity: u64,
        at: DateTime<Utc>,
    },
    Exit {
        symbol: String,
        entry_price: f64,
        exit_price: f64,
        quantity: u64,
        pnl: f64,
        reason: ExitReason,
        at: DateTime<Utc>,
    },
}

impl TradeEvent {
    pub fn symbol(&self) -> &str {
        match self {
            TradeEvent::Entry { symbol, .. } | TradeEvent::Exit { symbol, .. } => symbol,
        }
    }

    /// Realized P&L, only present on exits
    pub fn pnl(&self) -> Option<f64> {
        match self {
            TradeEvent::Exit { pnl, .. } => Some(*pnl),
            TradeEvent::Entry { .. } => None,
        }
    }
}

/// Broker-side state of an acknowledged order. Paper fills are synchronous.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderStatus {
    Filled,
}

/// Broker acknowledgement of an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderResult {
    pub status: OrderStatus,
    pub broker_order_id: Option<String>,
}

/// Aggregate engine status reported to the control surface
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineStatus {
    pub running: bool,
}
