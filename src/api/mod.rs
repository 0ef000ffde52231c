// External collaborators: market data and order routing
pub mod paper;
pub mod replay;
pub mod simulated;

use async_trait::async_trait;

use crate::error::{MarketDataError, OrderError};
use crate::models::{Candle, OrderResult};

pub use paper::{Fill, PaperBroker, Side};
pub use replay::ReplayFeed;
pub use simulated::SimulatedMarket;

/// Source of prices and session candles
#[async_trait]
pub trait MarketDataPort: Send + Sync {
    /// Last traded price
    async fn latest_price(&self, symbol: &str) -> Result<f64, MarketDataError>;

    /// Candles of the current session counted from the open, oldest first,
    /// at most `window` of them
    async fn recent_candles(
        &self,
        symbol: &str,
        window: usize,
    ) -> Result<Vec<Candle>, MarketDataError>;
}

/// Broker order routing. Timeouts are the implementation's concern.
#[async_trait]
pub trait OrderPort: Send + Sync {
    async fn place_buy(&self, symbol: &str, quantity: u64) -> Result<OrderResult, OrderError>;

    async fn place_sell(&self, symbol: &str, quantity: u64) -> Result<OrderResult, OrderError>;
}
