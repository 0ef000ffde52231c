use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::{Clock, MonitorContext, SymbolMonitor, SystemClock, TradeJournal, TradingSession};
use crate::api::{MarketDataPort, OrderPort};
use crate::config::EngineConfig;
use crate::error::SchedulerError;
use crate::models::{EngineStatus, Position};
use crate::risk::PositionSizer;
use crate::strategy;

struct Running {
    shutdown: watch::Sender<bool>,
    tasks: Vec<(String, JoinHandle<SymbolMonitor>)>,
}

#[derive(Default)]
struct Inner {
    running: Option<Running>,
    /// Monitors from the last run, kept so open positions stay visible
    parked: Vec<SymbolMonitor>,
}

/// Owns one monitor task per symbol and drives them on a fixed interval
pub struct Scheduler {
    market: Arc<dyn MarketDataPort>,
    orders: Arc<dyn OrderPort>,
    clock: Arc<dyn Clock>,
    journal: TradeJournal,
    is_running: AtomicBool,
    inner: Mutex<Inner>,
}

impl Scheduler {
    pub fn new(market: Arc<dyn MarketDataPort>, orders: Arc<dyn OrderPort>) -> Self {
        Self {
            market,
            orders,
            clock: Arc::new(SystemClock),
            journal: TradeJournal::new(),
            is_running: AtomicBool::new(false),
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            running: self.is_running.load(Ordering::SeqCst),
        }
    }

    pub fn journal(&self) -> TradeJournal {
        self.journal.clone()
    }

    /// Validate `config` and spawn one monitor per symbol
    ///
    /// Fails with `AlreadyRunning` (spawning nothing) if a run is active.
    pub async fn start(
        &self,
        symbols: Vec<String>,
        config: EngineConfig,
    ) -> Result<(), SchedulerError> {
        let mut inner = self.inner.lock().await;
        if inner.running.is_some() {
            tracing::warn!("Start requested while already running, ignoring");
            return Err(SchedulerError::AlreadyRunning);
        }

        config.validate(&symbols)?;
        let strategy = strategy::from_config(&config.strategy)?;
        let session = TradingSession::from_config(&config.session)?;
        let period = config.poll_interval();

        tracing::info!("🚀 Starting breakout engine");
        tracing::info!("  Strategy: {}", strategy.name());
        tracing::info!("  Capital: {:.2}", config.risk.capital);
        tracing::info!("  Risk per trade: {}%", config.risk.risk_fraction * 100.0);
        tracing::info!("  Session: {} - {}", config.session.start, config.session.end);
        tracing::info!("  Poll interval: {:?}", period);
        tracing::info!("  Symbols: {}", symbols.join(", "));

        let ctx = Arc::new(MonitorContext {
            market: self.market.clone(),
            orders: self.orders.clone(),
            strategy,
            sizer: PositionSizer::from_config(&config.risk),
            session,
            clock: self.clock.clone(),
            journal: self.journal.clone(),
        });

        let (shutdown, shutdown_rx) = watch::channel(false);
        let tasks = symbols
            .into_iter()
            .map(|symbol| {
                let monitor = SymbolMonitor::new(symbol.clone(), ctx.clone());
                let handle = tokio::spawn(run_monitor(monitor, period, shutdown_rx.clone()));
                (symbol, handle)
            })
            .collect();

        inner.parked.clear();
        inner.running = Some(Running { shutdown, tasks });
        self.is_running.store(true, Ordering::SeqCst);

        Ok(())
    }

    /// Signal every monitor to stop and wait for in-flight ticks to finish
    ///
    /// Open positions are left open. Calling this when stopped is a no-op.
    pub async fn stop(&self) {
        let mut inner = self.inner.lock().await;
        let Some(running) = inner.running.take() else {
            tracing::debug!("Stop requested while not running");
            return;
        };

        tracing::info!("⚠️  Stopping {} monitors...", running.tasks.len());
        // Receivers only go away when their task has already exited
        let _ = running.shutdown.send(true);

        for (symbol, handle) in running.tasks {
            match handle.await {
                Ok(monitor) => {
                    if let Some(position) = monitor.position() {
                        tracing::warn!(
                            symbol = %symbol,
                            entry = position.entry_price,
                            stop = position.stop_price,
                            quantity = position.quantity,
                            "Position left open on stop"
                        );
                    }
                    inner.parked.push(monitor);
                }
                Err(e) => {
                    tracing::error!(symbol = %symbol, "Monitor task failed: {}", e);
                }
            }
        }

        self.is_running.store(false, Ordering::SeqCst);
        tracing::info!("👋 Engine stopped");
        self.journal.log_summary();
    }

    /// Positions still open on monitors parked by the last `stop()`
    pub async fn open_positions(&self) -> Vec<Position> {
        let inner = self.inner.lock().await;
        inner
            .parked
            .iter()
            .filter_map(|monitor| monitor.position().cloned())
            .collect()
    }
}

/// Tick `monitor` every `period` until shutdown is signalled
///
/// The tick runs in the select arm's body, not as a branch, so a shutdown
/// never interrupts an order in flight.
async fn run_monitor(
    mut monitor: SymbolMonitor,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> SymbolMonitor {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::debug!(symbol = %monitor.symbol(), "Monitor started");

    while !*shutdown.borrow() {
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = ticker.tick() => {
                monitor.tick().await;
            }
        }
    }

    tracing::debug!(symbol = %monitor.symbol(), "Monitor stopped");
    monitor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{PaperBroker, ReplayFeed};
    use crate::execution::ManualClock;
    use crate::strategy::test_support::candles;
    use chrono::{TimeZone, Utc};

    fn fast_config() -> EngineConfig {
        EngineConfig {
            poll_interval_ms: 5,
            ..EngineConfig::default()
        }
    }

    fn scheduler(feed: Arc<ReplayFeed>, broker: Arc<PaperBroker>) -> Scheduler {
        // 10:00 IST
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 4, 4, 30, 0).unwrap(),
        ));
        Scheduler::new(feed, broker).with_clock(clock)
    }

    #[tokio::test]
    async fn test_start_stop_status() {
        let s = scheduler(Arc::new(ReplayFeed::new()), Arc::new(PaperBroker::new()));
        assert!(!s.status().running);

        s.start(vec!["A".to_string(), "B".to_string()], fast_config())
            .await
            .unwrap();
        assert!(s.status().running);

        s.stop().await;
        assert!(!s.status().running);
    }

    #[tokio::test]
    async fn test_double_start_is_rejected() {
        let s = scheduler(Arc::new(ReplayFeed::new()), Arc::new(PaperBroker::new()));

        s.start(vec!["A".to_string()], fast_config()).await.unwrap();
        let second = s.start(vec!["A".to_string()], fast_config()).await;
        assert_eq!(second, Err(SchedulerError::AlreadyRunning));
        assert!(s.status().running);

        s.stop().await;
    }

    #[tokio::test]
    async fn test_invalid_config_refuses_to_start() {
        let s = scheduler(Arc::new(ReplayFeed::new()), Arc::new(PaperBroker::new()));

        let mut config = fast_config();
        config.risk.risk_fraction = 2.0;
        let result = s.start(vec!["A".to_string()], config).await;

        assert!(matches!(result, Err(SchedulerError::Config(_))));
        assert!(!s.status().running);

        let result = s.start(Vec::new(), fast_config()).await;
        assert!(matches!(result, Err(SchedulerError::Config(_))));
    }

    #[tokio::test]
    async fn test_stop_twice_is_noop() {
        let s = scheduler(Arc::new(ReplayFeed::new()), Arc::new(PaperBroker::new()));
        s.start(vec!["A".to_string()], fast_config()).await.unwrap();

        s.stop().await;
        let after_first = (s.status(), s.open_positions().await, s.journal().len());
        s.stop().await;
        let after_second = (s.status(), s.open_positions().await, s.journal().len());

        assert_eq!(after_first, after_second);
    }

    #[tokio::test]
    async fn test_stop_leaves_positions_open() {
        let feed = Arc::new(
            ReplayFeed::new()
                .with_candles("X", candles(&[(110.0, 95.0), (108.0, 96.0), (105.0, 97.0)]))
                .with_prices("X", &[111.0]),
        );
        let broker = Arc::new(PaperBroker::new());
        let s = scheduler(feed, broker.clone());

        s.start(vec!["X".to_string()], fast_config()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        s.stop().await;

        let open = s.open_positions().await;
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].symbol, "X");
        // Only the entry was sent to the broker
        assert_eq!(broker.fills().len(), 1);
        assert_eq!(s.journal().len(), 1);
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let s = scheduler(Arc::new(ReplayFeed::new()), Arc::new(PaperBroker::new()));

        s.start(vec!["A".to_string()], fast_config()).await.unwrap();
        s.stop().await;
        s.start(vec!["B".to_string()], fast_config()).await.unwrap();
        assert!(s.status().running);
        s.stop().await;
    }
}
