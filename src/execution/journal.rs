use std::sync::{Arc, Mutex};

use crate::models::TradeEvent;

/// Append-only record of every entry and exit, shared by all monitors
#[derive(Debug, Clone, Default)]
pub struct TradeJournal {
    events: Arc<Mutex<Vec<TradeEvent>>>,
}

impl TradeJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: TradeEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }

    /// Snapshot of all events, in the order they were recorded
    pub fn events(&self) -> Vec<TradeEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn events_for(&self, symbol: &str) -> Vec<TradeEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.symbol() == symbol)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of P&L over all closed trades
    pub fn realized_pnl(&self) -> f64 {
        self.events().iter().filter_map(TradeEvent::pnl).sum()
    }

    /// One line per trade for the end-of-run summary
    pub fn log_summary(&self) {
        let events = self.events();
        let exits: Vec<&TradeEvent> = events.iter().filter(|e| e.pnl().is_some()).collect();
        let winners = exits.iter().filter(|e| e.pnl().unwrap_or(0.0) > 0.0).count();

        tracing::info!("📊 Session Summary:");
        tracing::info!("  Closed trades: {} ({} winners)", exits.len(), winners);
        tracing::info!("  Realized P&L: {:.2}", self.realized_pnl());

        for event in exits {
            if let TradeEvent::Exit {
                symbol,
                entry_price,
                exit_price,
                quantity,
                pnl,
                reason,
                ..
            } = event
            {
                tracing::info!(
                    "    {} | Entry: {:.2} | Exit: {:.2} | Qty: {} | P&L: {:.2} | {}",
                    symbol,
                    entry_price,
                    exit_price,
                    quantity,
                    pnl,
                    reason
                );
            }
        }
    }
}
