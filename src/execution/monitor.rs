use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::{Clock, TradeJournal, TradingSession};
use crate::api::{MarketDataPort, OrderPort};
use crate::error::{LevelError, MarketDataError, MonitorError};
use crate::models::{BreakoutLevels, ExitReason, Position, TradeEvent};
use crate::risk::PositionSizer;
use crate::strategy::LevelCalculator;

const TRADES_TARGET: &str = "breakoutbot::trades";

/// Everything a monitor needs that is shared, read-only, across symbols
pub struct MonitorContext {
    pub market: Arc<dyn MarketDataPort>,
    pub orders: Arc<dyn OrderPort>,
    pub strategy: Arc<dyn LevelCalculator>,
    pub sizer: PositionSizer,
    pub session: TradingSession,
    pub clock: Arc<dyn Clock>,
    pub journal: TradeJournal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SymbolState {
    Watching,
    Positioned(Position),
}

/// What a single tick did
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Nothing to do: outside the entry window, levels skipped, or already traded today
    Idle,
    /// Armed and below the trigger
    Waiting { price: f64, trigger: f64 },
    /// Trigger crossed but the risk rule sized the trade to zero
    SizedOut { price: f64 },
    Entered(TradeEvent),
    Holding { price: f64, unrealized_pnl: f64 },
    Exited(TradeEvent),
    /// Recoverable failure; state is unchanged
    Failed(MonitorError),
}

#[derive(Debug, Clone, PartialEq)]
enum Levels {
    Pending,
    Armed(BreakoutLevels),
    Skipped,
}

/// Per-session bookkeeping, reset when the exchange date rolls over
#[derive(Debug, Clone)]
struct SessionDay {
    date: NaiveDate,
    levels: Levels,
    traded: bool,
}

impl SessionDay {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            levels: Levels::Pending,
            traded: false,
        }
    }
}

/// Breakout state machine for one symbol
///
/// Watching → Positioned on a trigger cross, Positioned → Watching on stop
/// loss or the session cutoff. One trade per session; levels are computed
/// once per session and never while a position is open.
pub struct SymbolMonitor {
    symbol: String,
    state: SymbolState,
    day: Option<SessionDay>,
    ctx: Arc<MonitorContext>,
}

impl SymbolMonitor {
    pub fn new(symbol: impl Into<String>, ctx: Arc<MonitorContext>) -> Self {
        Self {
            symbol: symbol.into(),
            state: SymbolState::Watching,
            day: None,
            ctx,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn state(&self) -> &SymbolState {
        &self.state
    }

    pub fn position(&self) -> Option<&Position> {
        match &self.state {
            SymbolState::Positioned(position) => Some(position),
            SymbolState::Watching => None,
        }
    }

    /// Levels armed for the current session, if any
    pub fn levels(&self) -> Option<&BreakoutLevels> {
        match self.day.as_ref().map(|day| &day.levels) {
            Some(Levels::Armed(levels)) => Some(levels),
            _ => None,
        }
    }

    /// Run one evaluation. Never fails: errors are logged and returned as
    /// [`TickOutcome::Failed`] with the state untouched.
    pub async fn tick(&mut self) -> TickOutcome {
        match self.try_tick().await {
            Ok(outcome) => outcome,
            Err(MonitorError::Levels(e @ LevelError::InsufficientData { .. })) => {
                tracing::debug!(symbol = %self.symbol, "Collecting data... ({})", e);
                TickOutcome::Failed(e.into())
            }
            Err(e) => {
                let state = match self.state {
                    SymbolState::Watching => "watching",
                    SymbolState::Positioned(_) => "positioned",
                };
                tracing::warn!(symbol = %self.symbol, state, error = %e, "Tick failed, state unchanged");
                TickOutcome::Failed(e)
            }
        }
    }

    async fn try_tick(&mut self) -> Result<TickOutcome, MonitorError> {
        let now = self.ctx.clock.now();

        match self.position().cloned() {
            Some(position) => self.manage_position(position, now).await,
            None => self.watch(now).await,
        }
    }

    async fn watch(&mut self, now: DateTime<Utc>) -> Result<TickOutcome, MonitorError> {
        let session = self.ctx.session;
        if !session.accepts_entries(now) {
            return Ok(TickOutcome::Idle);
        }

        let date = session.date_of(now);
        if self.day.as_ref().map(|day| day.date) != Some(date) {
            self.day = Some(SessionDay::new(date));
        }

        let current = self
            .day
            .as_ref()
            .filter(|day| !day.traded)
            .map(|day| day.levels.clone());
        if matches!(current, Some(Levels::Skipped) | None) {
            return Ok(TickOutcome::Idle);
        }

        let price = self.latest_price().await?;
        let levels = match current {
            Some(Levels::Armed(levels)) => levels,
            _ => match self.arm().await? {
                Some(levels) => levels,
                None => return Ok(TickOutcome::Idle),
            },
        };

        if price < levels.trigger_price {
            return Ok(TickOutcome::Waiting {
                price,
                trigger: levels.trigger_price,
            });
        }

        let quantity = self.ctx.sizer.size(levels.trigger_price, levels.stop_price);
        if quantity == 0 {
            tracing::debug!(
                symbol = %self.symbol,
                price,
                trigger = levels.trigger_price,
                stop = levels.stop_price,
                "Trigger crossed but risk rule sized trade to zero"
            );
            return Ok(TickOutcome::SizedOut { price });
        }

        let order = self.ctx.orders.place_buy(&self.symbol, quantity).await?;

        let position = Position {
            id: Uuid::new_v4(),
            symbol: self.symbol.clone(),
            entry_price: levels.trigger_price,
            stop_price: levels.stop_price,
            quantity,
            opened_at: now,
            broker_order_id: order.broker_order_id,
        };
        self.state = SymbolState::Positioned(position);

        let event = TradeEvent::Entry {
            symbol: self.symbol.clone(),
            price: levels.trigger_price,
            stop_price: levels.stop_price,
            quantity,
            at: now,
        };
        tracing::info!(
            target: TRADES_TARGET,
            symbol = %self.symbol,
            price = levels.trigger_price,
            stop = levels.stop_price,
            quantity,
            last = price,
            "ENTRY SIGNAL"
        );
        self.ctx.journal.record(event.clone());

        Ok(TickOutcome::Entered(event))
    }

    /// Latest price, with non-finite quotes treated as missing data
    async fn latest_price(&self) -> Result<f64, MonitorError> {
        let price = self.ctx.market.latest_price(&self.symbol).await?;
        if !price.is_finite() {
            return Err(MarketDataError::DataUnavailable {
                symbol: self.symbol.clone(),
                reason: format!("non-finite price {}", price),
            }
            .into());
        }
        Ok(price)
    }

    /// Compute the session's levels. `Ok(None)` means the symbol is skipped today.
    async fn arm(&mut self) -> Result<Option<BreakoutLevels>, MonitorError> {
        let candles = self
            .ctx
            .market
            .recent_candles(&self.symbol, self.ctx.strategy.window())
            .await?;

        let levels = match self.ctx.strategy.compute_levels(&self.symbol, &candles) {
            Ok(levels) => levels,
            Err(e @ LevelError::InvalidLevels { .. }) => {
                tracing::warn!(
                    symbol = %self.symbol,
                    strategy = self.ctx.strategy.name(),
                    error = %e,
                    "Skipping symbol for this session"
                );
                self.set_levels(Levels::Skipped);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            symbol = %self.symbol,
            strategy = self.ctx.strategy.name(),
            trigger = levels.trigger_price,
            stop = levels.stop_price,
            "Levels armed"
        );
        self.set_levels(Levels::Armed(levels.clone()));
        Ok(Some(levels))
    }

    fn set_levels(&mut self, levels: Levels) {
        if let Some(day) = self.day.as_mut() {
            day.levels = levels;
        }
    }

    async fn manage_position(
        &mut self,
        position: Position,
        now: DateTime<Utc>,
    ) -> Result<TickOutcome, MonitorError> {
        let price = self.latest_price().await?;

        // Stop loss wins when both conditions hold
        let reason = if price <= position.stop_price {
            ExitReason::StopLoss
        } else if now >= self.ctx.session.cutoff_for(position.opened_at) {
            ExitReason::TimeExit
        } else {
            return Ok(TickOutcome::Holding {
                price,
                unrealized_pnl: position.pnl_at(price),
            });
        };

        self.ctx
            .orders
            .place_sell(&self.symbol, position.quantity)
            .await?;

        let pnl = position.pnl_at(price);
        self.state = SymbolState::Watching;
        if let Some(day) = self.day.as_mut() {
            day.traded = true;
        }

        let event = TradeEvent::Exit {
            symbol: self.symbol.clone(),
            entry_price: position.entry_price,
            exit_price: price,
            quantity: position.quantity,
            pnl,
            reason,
            at: now,
        };
        tracing::info!(
            target: TRADES_TARGET,
            symbol = %self.symbol,
            price,
            quantity = position.quantity,
            pnl,
            reason = %reason,
            "EXIT SIGNAL"
        );
        self.ctx.journal.record(event.clone());

        Ok(TickOutcome::Exited(event))
    }
}
