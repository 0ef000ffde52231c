use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use super::MarketDataPort;
use crate::error::MarketDataError;
use crate::models::Candle;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Step {
    Price(f64),
    Outage,
}

#[derive(Debug, Default)]
struct Script {
    candles: Vec<Candle>,
    steps: VecDeque<Step>,
    last_price: Option<f64>,
}

/// Scripted market data: fixed session candles and a queue of price steps
///
/// Each `latest_price` call consumes one step. Once the queue runs dry the
/// last price keeps being reported, the way a quiet market would.
#[derive(Debug, Default)]
pub struct ReplayFeed {
    scripts: Mutex<HashMap<String, Script>>,
}

impl ReplayFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_candles(self, symbol: &str, candles: Vec<Candle>) -> Self {
        self.set_candles(symbol, candles);
        self
    }

    pub fn with_prices(self, symbol: &str, prices: &[f64]) -> Self {
        for &price in prices {
            self.push_price(symbol, price);
        }
        self
    }

    pub fn set_candles(&self, symbol: &str, candles: Vec<Candle>) {
        self.with_script(symbol, |script| script.candles = candles);
    }

    pub fn push_price(&self, symbol: &str, price: f64) {
        self.with_script(symbol, |script| script.steps.push_back(Step::Price(price)));
    }

    /// Queue one failed price fetch
    pub fn push_outage(&self, symbol: &str) {
        self.with_script(symbol, |script| script.steps.push_back(Step::Outage));
    }

    fn with_script<T>(&self, symbol: &str, f: impl FnOnce(&mut Script) -> T) -> T {
        let mut scripts = self.scripts.lock().unwrap_or_else(|e| e.into_inner());
        f(scripts.entry(symbol.to_string()).or_default())
    }
}

fn unavailable(symbol: &str, reason: &str) -> MarketDataError {
    MarketDataError::DataUnavailable {
        symbol: symbol.to_string(),
        reason: reason.to_string(),
    }
}

#[async_trait]
impl MarketDataPort for ReplayFeed {
    async fn latest_price(&self, symbol: &str) -> Result<f64, MarketDataError> {
        self.with_script(symbol, |script| match script.steps.pop_front() {
            Some(Step::Price(price)) => {
                script.last_price = Some(price);
                Ok(price)
            }
            Some(Step::Outage) => Err(unavailable(symbol, "scripted outage")),
            None => script
                .last_price
                .ok_or_else(|| unavailable(symbol, "no prices recorded")),
        })
    }

    async fn recent_candles(
        &self,
        symbol: &str,
        window: usize,
    ) -> Result<Vec<Candle>, MarketDataError> {
        self.with_script(symbol, |script| {
            Ok(script.candles.iter().take(window).cloned().collect())
        })
    }
}
