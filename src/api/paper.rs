use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::OrderPort;
use crate::error::OrderError;
use crate::models::{OrderResult, OrderStatus};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

/// A simulated execution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fill {
    pub order_id: String,
    pub symbol: String,
    pub side: Side,
    pub quantity: u64,
    pub at: DateTime<Utc>,
}

/// Paper trading broker: every order fills immediately, nothing leaves the process
#[derive(Debug, Default)]
pub struct PaperBroker {
    fills: Mutex<Vec<Fill>>,
    rejecting: AtomicBool,
}

impl PaperBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every order until switched back (simulates a broker outage)
    pub fn set_rejecting(&self, rejecting: bool) {
        self.rejecting.store(rejecting, Ordering::SeqCst);
    }

    /// All fills so far, oldest first
    pub fn fills(&self) -> Vec<Fill> {
        self.fills
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn execute(&self, symbol: &str, side: Side, quantity: u64) -> Result<OrderResult, OrderError> {
        if self.rejecting.load(Ordering::SeqCst) {
            return Err(OrderError::OrderRejected {
                symbol: symbol.to_string(),
                reason: "paper broker is rejecting orders".to_string(),
            });
        }
        if quantity == 0 {
            return Err(OrderError::OrderRejected {
                symbol: symbol.to_string(),
                reason: "quantity must be positive".to_string(),
            });
        }

        let order_id = Uuid::new_v4().to_string();
        self.fills
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Fill {
                order_id: order_id.clone(),
                symbol: symbol.to_string(),
                side,
                quantity,
                at: Utc::now(),
            });

        tracing::debug!(symbol, ?side, quantity, %order_id, "Paper order filled");

        Ok(OrderResult {
            status: OrderStatus::Filled,
            broker_order_id: Some(order_id),
        })
    }
}

#[async_trait]
impl OrderPort for PaperBroker {
    async fn place_buy(&self, symbol: &str, quantity: u64) -> Result<OrderResult, OrderError> {
        self.execute(symbol, Side::Buy, quantity)
    }

    async fn place_sell(&self, symbol: &str, quantity: u64) -> Result<OrderResult, OrderError> {
        self.execute(symbol, Side::Sell, quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_orders_fill_immediately() {
        let broker = PaperBroker::new();

        let buy = broker.place_buy("INFY", 10).await.unwrap();
        assert_eq!(buy.status, OrderStatus::Filled);
        assert!(buy.broker_order_id.is_some());

        broker.place_sell("INFY", 10).await.unwrap();

        let fills = broker.fills();
        assert_eq!(fills.len(), 2);
        assert_eq!(fills[0].side, Side::Buy);
        assert_eq!(fills[1].side, Side::Sell);
        assert_eq!(fills[1].quantity, 10);
    }

    #[tokio::test]
    async fn test_rejecting_broker_records_nothing() {
        let broker = PaperBroker::new();
        broker.set_rejecting(true);

        let result = broker.place_buy("INFY", 10).await;
        assert!(matches!(result, Err(OrderError::OrderRejected { .. })));
        assert!(broker.fills().is_empty());

        broker.set_rejecting(false);
        assert!(broker.place_buy("INFY", 10).await.is_ok());
    }

    #[tokio::test]
    async fn test_zero_quantity_rejected() {
        let broker = PaperBroker::new();
        assert!(broker.place_sell("INFY", 0).await.is_err());
    }
}
